//! 配置管理命令
//!
//! 管理 CLI 配置文件（串口、机械臂标识、标定文件、会话参数）。
//!
//! ```toml
//! port = "/dev/ttyACM0"
//! id = "sodapop"
//!
//! [teleop]
//! step = 3.0
//! grace_ms = 1000
//!
//! [teleop.folded]
//! shoulder_lift = -90.0
//! elbow_flex = 90.0
//! ```

use crate::validation::{PathValidator, validate_robot_id};
use anyhow::{Context, Result};
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use soarm_driver::Calibration;
use soarm_teleop::TeleopConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 默认配置目录（`~/.config/soarm`）
pub fn config_dir() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine config directory"))?;
    path.push("soarm");
    Ok(path)
}

/// 默认配置文件
pub fn default_config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// 按机械臂标识查找的默认标定文件
pub fn default_calibration_file(id: &str) -> Result<PathBuf> {
    Ok(config_dir()?.join("calibration").join(format!("{id}.json")))
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 默认串口设备
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    /// 机械臂标识
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,

    /// 标定文件（缺省时按 id 查找）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<PathBuf>,

    /// 会话参数
    pub teleop: TeleopConfig,
}

impl CliConfig {
    /// 加载配置，文件不存在时返回默认值
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// 保存配置（自动创建目录）
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, format!("# SO-ARM CLI configuration\n\n{content}"))
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// 某一项的显示值
    fn value_of(&self, key: &str) -> Option<String> {
        match key {
            "port" => self.port.clone(),
            "id" => self.id.clone(),
            "baud_rate" => self.baud_rate.map(|b| b.to_string()),
            "calibration" => self.calibration.as_ref().map(|p| p.display().to_string()),
            "step" => Some(self.teleop.step.to_string()),
            "tick_ms" => Some(self.teleop.tick_ms.to_string()),
            "grace_ms" => Some(self.teleop.grace_ms.to_string()),
            "gripper_open" => Some(self.teleop.gripper_open.to_string()),
            _ => None,
        }
    }
}

/// 可查询的配置项
pub const KEYS: &[&str] = &[
    "port",
    "id",
    "baud_rate",
    "calibration",
    "step",
    "tick_ms",
    "grace_ms",
    "gripper_open",
];

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 串口设备（如 /dev/ttyACM0）
        #[arg(short, long)]
        port: Option<String>,

        /// 机械臂标识
        #[arg(long)]
        id: Option<String>,

        /// 波特率
        #[arg(long)]
        baud_rate: Option<u32>,

        /// 标定文件
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// 每次按键的增量
        #[arg(long)]
        step: Option<f64>,

        /// tick 周期（毫秒）
        #[arg(long)]
        tick_ms: Option<u64>,

        /// 收起后的等待时间（毫秒）
        #[arg(long)]
        grace_ms: Option<u64>,

        /// 夹爪张开值
        #[arg(long)]
        gripper_open: Option<f64>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Set {
                port,
                id,
                baud_rate,
                calibration,
                step,
                tick_ms,
                grace_ms,
                gripper_open,
            } => {
                let mut config = CliConfig::load(path)?;
                let mut changed = Vec::new();

                if let Some(port) = port {
                    config.port = Some(port);
                    changed.push("port");
                }
                if let Some(id) = id {
                    validate_robot_id(&id)?;
                    config.id = Some(id);
                    changed.push("id");
                }
                if let Some(baud_rate) = baud_rate {
                    config.baud_rate = Some(baud_rate);
                    changed.push("baud_rate");
                }
                if let Some(calibration) = calibration {
                    config.calibration = Some(calibration);
                    changed.push("calibration");
                }
                if let Some(step) = step {
                    config.teleop.step = step;
                    changed.push("step");
                }
                if let Some(tick_ms) = tick_ms {
                    config.teleop.tick_ms = tick_ms;
                    changed.push("tick_ms");
                }
                if let Some(grace_ms) = grace_ms {
                    config.teleop.grace_ms = grace_ms;
                    changed.push("grace_ms");
                }
                if let Some(gripper_open) = gripper_open {
                    config.teleop.gripper_open = gripper_open;
                    changed.push("gripper_open");
                }

                if changed.is_empty() {
                    anyhow::bail!("Nothing to set (see `soarm-cli config set --help`)");
                }
                config.teleop.validate()?;
                config.save(path)?;

                for key in changed {
                    println!(
                        "✅ {key} = {}",
                        config.value_of(key).unwrap_or_default()
                    );
                }
                Ok(())
            },

            ConfigCommand::Get { key } => {
                let config = CliConfig::load(path)?;
                if key == "all" {
                    println!("SO-ARM CLI config ({}):", path.display());
                    for key in KEYS {
                        let value = config.value_of(key).unwrap_or_else(|| "(unset)".to_string());
                        println!("  {key:<13} {value}");
                    }
                    return Ok(());
                }

                if !KEYS.contains(&key.as_str()) {
                    anyhow::bail!("Unknown config key {key:?} (expected one of {})", KEYS.join(", "));
                }
                println!(
                    "{}",
                    config.value_of(&key).unwrap_or_else(|| "(unset)".to_string())
                );
                Ok(())
            },

            ConfigCommand::Check => check(path),
        }
    }
}

/// 检查配置文件，以及其中引用的串口和标定文件
fn check(path: &Path) -> Result<()> {
    println!("Config file: {}", path.display());
    if !path.exists() {
        println!("  (not found, using defaults)");
    }

    let config = CliConfig::load(path)?;
    config.teleop.validate()?;
    println!("  ✅ teleop settings valid");

    let mut problems = 0;

    match &config.port {
        Some(port) => match PathValidator::new().must_exist().validate("serial port", Path::new(port)) {
            Ok(()) => println!("  ✅ port {port}"),
            Err(e) => {
                println!("  ⚠️  {e}");
                problems += 1;
            },
        },
        None => println!("  ⚠️  no port set (use --port or `config set --port`)"),
    }

    let calibration = match (&config.calibration, &config.id) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(id)) => {
            validate_robot_id(id)?;
            Some(default_calibration_file(id)?)
        },
        (None, None) => None,
    };
    match calibration {
        Some(file) => {
            let loaded = PathValidator::new()
                .must_be_readable()
                .validate("calibration file", &file)
                .and_then(|()| Calibration::load(&file).map_err(anyhow::Error::from));
            match loaded {
                Ok(calibration) => println!(
                    "  ✅ calibration {} ({} joints)",
                    file.display(),
                    calibration.joints().len()
                ),
                Err(e) => {
                    println!("  ⚠️  {e}");
                    problems += 1;
                },
            }
        },
        None => println!("  ⚠️  no calibration (full servo range will be used)"),
    }

    if problems > 0 {
        anyhow::bail!("{problems} problem(s) found in {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use soarm_driver::Joint;

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CliConfig {
            port: Some("/dev/ttyACM0".to_string()),
            id: Some("sodapop".to_string()),
            ..Default::default()
        };
        config.teleop.step = 5.0;
        config.save(&path).unwrap();

        let loaded = CliConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_parse_with_folded_override() {
        let config: CliConfig = toml::from_str(
            r#"
            port = "/dev/ttyUSB0"

            [teleop]
            grace_ms = 1500

            [teleop.folded]
            elbow_flex = 80.0
            "#,
        )
        .unwrap();
        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.teleop.grace_ms, 1500);
        assert_eq!(config.teleop.step, 3.0);
        assert_eq!(
            config.teleop.folded.unwrap().get(Joint::ElbowFlex),
            Some(80.0)
        );
    }

    #[test]
    fn test_bad_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "step = [").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }

    #[test]
    fn test_value_of() {
        let config = CliConfig::default();
        assert_eq!(config.value_of("port"), None);
        assert_eq!(config.value_of("step").as_deref(), Some("3"));
        assert_eq!(config.value_of("nope"), None);
        for key in KEYS {
            // 每个公开的键都可以查询（可能未设置）
            let _ = config.value_of(key);
        }
    }
}
