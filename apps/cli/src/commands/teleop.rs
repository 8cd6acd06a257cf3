//! 键盘遥操作命令
//!
//! 连接 → 会话循环 → 收起 → 断开。Ctrl+C / SIGTERM 只设置取消标志，
//! 关机流程由会话自己执行。

use super::config::{CliConfig, default_calibration_file};
use crate::validation::{PathValidator, validate_robot_id};
use anyhow::{Context, Result};
use clap::Args;
use soarm_driver::{DriverBuilder, DriverType};
use soarm_teleop::{CancelToken, Session, TeleopConfig, TerminationReason};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 遥操作命令参数
#[derive(Args, Debug, Default)]
pub struct TeleopCommand {
    /// 串口设备（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 机械臂标识（用于查找标定文件）
    #[arg(long)]
    pub id: Option<String>,

    /// 波特率
    #[arg(long)]
    pub baud_rate: Option<u32>,

    /// 标定文件（覆盖配置）
    #[arg(long)]
    pub calibration: Option<PathBuf>,

    /// 不连接硬件，只打印命令
    #[arg(long)]
    pub dry_run: bool,

    /// 每次按键的增量
    #[arg(long)]
    pub step: Option<f64>,

    /// tick 周期（毫秒）
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// 收起后的等待时间（毫秒）
    #[arg(long)]
    pub grace_ms: Option<u64>,
}

/// 合并后的运行参数
#[derive(Debug, Clone, PartialEq)]
pub struct TeleopPlan {
    pub driver_type: DriverType,
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub calibration: Option<PathBuf>,
    pub teleop: TeleopConfig,
}

impl TeleopPlan {
    fn driver_builder(&self) -> DriverBuilder {
        let mut builder = DriverBuilder::new().with_driver_type(self.driver_type);
        if let Some(port) = &self.port {
            builder = builder.port(port.clone());
        }
        if let Some(baud_rate) = self.baud_rate {
            builder = builder.baud_rate(baud_rate);
        }
        if let Some(calibration) = &self.calibration {
            builder = builder.calibration(calibration.clone());
        }
        builder
    }
}

impl TeleopCommand {
    /// 命令行参数优先，其次配置文件
    ///
    /// `calibration_dir` 为 `None` 时使用默认配置目录查找 `<id>.json`。
    pub fn resolve(&self, config: &CliConfig, calibration_dir: Option<&Path>) -> Result<TeleopPlan> {
        let mut teleop = config.teleop.clone();
        if let Some(step) = self.step {
            teleop.step = step;
        }
        if let Some(tick_ms) = self.tick_ms {
            teleop.tick_ms = tick_ms;
        }
        if let Some(grace_ms) = self.grace_ms {
            teleop.grace_ms = grace_ms;
        }
        teleop.validate()?;

        if self.dry_run {
            return Ok(TeleopPlan {
                driver_type: DriverType::DryRun,
                port: None,
                baud_rate: None,
                calibration: None,
                teleop,
            });
        }

        let port = self
            .port
            .clone()
            .or_else(|| config.port.clone())
            .context("No serial port configured (use --port or `soarm-cli config set --port`)")?;
        PathValidator::new()
            .must_exist()
            .validate("serial port", Path::new(&port))?;

        let calibration = match self.calibration.clone().or_else(|| config.calibration.clone()) {
            Some(path) => {
                PathValidator::new()
                    .must_be_readable()
                    .validate("calibration file", &path)?;
                Some(path)
            },
            None => match self.id.as_ref().or(config.id.as_ref()) {
                Some(id) => {
                    validate_robot_id(id)?;
                    let path = match calibration_dir {
                        Some(dir) => dir.join(format!("{id}.json")),
                        None => default_calibration_file(id)?,
                    };
                    if path.exists() {
                        Some(path)
                    } else {
                        warn!("No calibration found for {id} at {}", path.display());
                        None
                    }
                },
                None => None,
            },
        };

        Ok(TeleopPlan {
            driver_type: DriverType::Feetech,
            port: Some(port),
            baud_rate: self.baud_rate.or(config.baud_rate),
            calibration,
            teleop,
        })
    }

    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let plan = self.resolve(config, None)?;
        run_session(plan)
    }
}

#[cfg(unix)]
fn run_session(plan: TeleopPlan) -> Result<()> {
    use soarm_teleop::TerminalKeys;

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())
        .context("Failed to install Ctrl+C handler")?;

    // 先打开终端，避免在没有键盘的情况下让舵机上力
    let mut keys = TerminalKeys::open(cancel.clone(), plan.teleop.escape_timeout())
        .context("Failed to open the controlling terminal")?;

    println!("🔌 Connecting to robot...");
    let driver = plan
        .driver_builder()
        .connect()
        .context("Failed to connect to robot")?;
    info!(
        "Connected ({:?}), {} joints",
        plan.driver_type,
        driver.declared_joints().len()
    );

    let session = Session::new(driver, plan.teleop, cancel)?;
    let outcome = session.run(&mut keys);

    info!(
        "Session finished after {} ticks, shutdown clean: {}",
        outcome.ticks,
        outcome.shutdown.is_clean()
    );

    match outcome.reason {
        TerminationReason::Fault(e) => Err(anyhow::Error::new(e).context("Teleop session aborted")),
        TerminationReason::QuitKey | TerminationReason::Interrupted => Ok(()),
    }
}

#[cfg(not(unix))]
fn run_session(_plan: TeleopPlan) -> Result<()> {
    anyhow::bail!("Keyboard teleoperation needs a Unix terminal")
}

#[cfg(test)]
mod tests {
    use super::*;
    use soarm_driver::Joint;

    #[test]
    fn test_dry_run_needs_no_port() {
        let cmd = TeleopCommand {
            dry_run: true,
            step: Some(5.0),
            ..Default::default()
        };
        let plan = cmd.resolve(&CliConfig::default(), None).unwrap();
        assert_eq!(plan.driver_type, DriverType::DryRun);
        assert_eq!(plan.teleop.step, 5.0);
        assert!(plan.port.is_none());
    }

    #[test]
    fn test_missing_port_is_error() {
        let err = TeleopCommand::default()
            .resolve(&CliConfig::default(), None)
            .unwrap_err();
        assert!(err.to_string().contains("No serial port"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let port = dir.path().join("ttyFAKE0");
        std::fs::write(&port, b"").unwrap();

        let mut config = CliConfig {
            port: Some("/nonexistent/ttyACM0".to_string()),
            baud_rate: Some(500_000),
            ..Default::default()
        };
        config.teleop.grace_ms = 2000;
        config.teleop.folded = Some([(Joint::ElbowFlex, 70.0)].into_iter().collect());

        let cmd = TeleopCommand {
            port: Some(port.display().to_string()),
            grace_ms: Some(500),
            ..Default::default()
        };
        let plan = cmd.resolve(&config, Some(dir.path())).unwrap();
        assert_eq!(plan.driver_type, DriverType::Feetech);
        assert_eq!(plan.port.as_deref(), Some(port.to_str().unwrap()));
        assert_eq!(plan.baud_rate, Some(500_000));
        assert_eq!(plan.teleop.grace_ms, 500);
        assert!(plan.teleop.folded.is_some());
        assert!(plan.calibration.is_none());
    }

    #[test]
    fn test_calibration_found_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let port = dir.path().join("ttyFAKE0");
        std::fs::write(&port, b"").unwrap();
        let calibration = dir.path().join("sodapop.json");
        std::fs::write(&calibration, "{}").unwrap();

        let cmd = TeleopCommand {
            port: Some(port.display().to_string()),
            id: Some("sodapop".to_string()),
            ..Default::default()
        };
        let plan = cmd.resolve(&CliConfig::default(), Some(dir.path())).unwrap();
        assert_eq!(plan.calibration, Some(calibration));
    }

    #[test]
    fn test_invalid_step_rejected() {
        let cmd = TeleopCommand {
            dry_run: true,
            step: Some(0.0),
            ..Default::default()
        };
        assert!(cmd.resolve(&CliConfig::default(), None).is_err());
    }
}
