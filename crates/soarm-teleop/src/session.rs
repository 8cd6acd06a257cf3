//! 遥操作会话
//!
//! [`Session`] 独占驱动连接，负责：
//!
//! - 启动时下发 neutral 并打印键位说明
//! - 每个 tick：读取一个按键 → 更新位置 → 回显 → 下发 → 休眠 tick 周期
//! - 任何终止原因（退出键、外部中断、故障）都只进入一次关机流程
//!
//! ```text
//! RUNNING ──k──────────────┐
//!    │ ──Ctrl+C / cancel───┼──> TERMINATING ──> ShutdownSequencer (once)
//!    │ ──error / panic─────┘
//! ```

use crate::cancel::CancelToken;
use crate::config::TeleopConfig;
use crate::error::TeleopError;
use crate::key::{KeyError, KeySource};
use crate::position::{BINDINGS, Command, PositionRules, Presets};
use crate::shutdown::{ShutdownReport, ShutdownSequencer};
use soarm_driver::{Driver, JointPositions};
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// 控制循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminating,
}

/// 终止原因
#[derive(Debug)]
pub enum TerminationReason {
    /// 操作员按下退出键
    QuitKey,
    /// 中断字符或外部信号
    Interrupted,
    /// 控制循环出错
    Fault(TeleopError),
}

impl TerminationReason {
    pub fn is_fault(&self) -> bool {
        matches!(self, TerminationReason::Fault(_))
    }
}

/// 会话结果
#[derive(Debug)]
pub struct SessionOutcome {
    pub reason: TerminationReason,
    /// 控制循环中成功下发的命令数（不含启动时的 neutral）
    pub ticks: u64,
    pub shutdown: ShutdownReport,
}

/// 键盘遥操作会话
pub struct Session<D: Driver> {
    driver: D,
    config: TeleopConfig,
    presets: Presets,
    rules: PositionRules,
    positions: JointPositions,
    /// 最后一次被驱动接受的命令
    last_sent: JointPositions,
    state: LoopState,
    ticks: u64,
    cancel: CancelToken,
    sequencer: ShutdownSequencer,
    out: Box<dyn Write>,
}

impl<D: Driver> Session<D> {
    /// 基于已连接的驱动创建会话，输出到 stdout
    pub fn new(driver: D, config: TeleopConfig, cancel: CancelToken) -> Result<Self, TeleopError> {
        Self::with_output(driver, config, cancel, Box::new(io::stdout()))
    }

    /// 指定帮助文本和回显的输出位置
    pub fn with_output(
        driver: D,
        config: TeleopConfig,
        cancel: CancelToken,
        out: Box<dyn Write>,
    ) -> Result<Self, TeleopError> {
        config.validate()?;

        let presets = Presets::new(driver.declared_joints(), config.folded.as_ref());
        let positions = presets.neutral.clone();
        Ok(Self {
            rules: config.rules(),
            sequencer: ShutdownSequencer::new(config.grace_period()),
            last_sent: positions.clone(),
            positions,
            presets,
            driver,
            config,
            state: LoopState::Running,
            ticks: 0,
            cancel,
            out,
        })
    }

    pub fn positions(&self) -> &JointPositions {
        &self.positions
    }

    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// 运行到终止，然后执行关机流程
    ///
    /// 控制循环中的 panic 被捕获并作为故障处理。
    pub fn run<K: KeySource + ?Sized>(mut self, keys: &mut K) -> SessionOutcome {
        let reason = match panic::catch_unwind(AssertUnwindSafe(|| self.run_loop(keys))) {
            Ok(Ok(reason)) => reason,
            Ok(Err(e)) => TerminationReason::Fault(e),
            Err(payload) => TerminationReason::Fault(TeleopError::from_panic(payload)),
        };

        self.state = LoopState::Terminating;
        self.announce(&reason);

        let shutdown = self.shutdown().unwrap_or_default();
        SessionOutcome {
            reason,
            ticks: self.ticks,
            shutdown,
        }
    }

    fn run_loop<K: KeySource + ?Sized>(
        &mut self,
        keys: &mut K,
    ) -> Result<TerminationReason, TeleopError> {
        info!(
            "Teleop session started: {} joints, step {}",
            self.positions.len(),
            self.rules.step
        );
        self.dispatch()?;
        self.print_help()?;

        let tick = self.config.tick_period();
        loop {
            if self.cancel.is_cancelled() {
                return Ok(TerminationReason::Interrupted);
            }

            let key = match keys.read_key() {
                Ok(key) => key,
                Err(KeyError::Interrupted) => return Ok(TerminationReason::Interrupted),
                Err(e) => return Err(e.into()),
            };

            match Command::from_key(key) {
                Command::Quit if key.is_interrupt() => return Ok(TerminationReason::Interrupted),
                Command::Quit => return Ok(TerminationReason::QuitKey),
                command => {
                    self.rules
                        .apply(command, &mut self.positions, &self.presets.neutral)
                },
            }

            writeln!(self.out, "{}", self.positions)?;
            self.out.flush()?;

            self.dispatch()?;
            self.ticks += 1;
            debug!("tick {}: {:?} -> {}", self.ticks, key, self.positions);

            if !tick.is_zero() {
                spin_sleep::sleep(tick);
            }
        }
    }

    fn dispatch(&mut self) -> Result<(), TeleopError> {
        self.driver.send(&self.positions)?;
        self.last_sent.clone_from(&self.positions);
        Ok(())
    }

    fn print_help(&mut self) -> io::Result<()> {
        writeln!(self.out, "Robot control started:")?;
        for (keys, action) in BINDINGS {
            writeln!(self.out, "  {keys:<14} {action}")?;
        }
        writeln!(self.out, "Press 'k' or Ctrl+C to quit.")?;
        self.out.flush()
    }

    fn announce(&mut self, reason: &TerminationReason) {
        let message = match reason {
            TerminationReason::QuitKey => {
                info!("Quit key pressed");
                "Quitting...".to_string()
            },
            TerminationReason::Interrupted => {
                info!("Interrupt received");
                "Interrupt received, exiting...".to_string()
            },
            TerminationReason::Fault(e) => {
                error!("Teleop loop failed: {}", e);
                format!("Error: {e}")
            },
        };
        let _ = writeln!(self.out, "\n{message}");
    }

    /// 执行关机流程（每个会话最多一次）
    fn shutdown(&mut self) -> Option<ShutdownReport> {
        if self.sequencer.has_run() {
            return None;
        }
        self.state = LoopState::Terminating;

        let folded = self.presets.folded_over(&self.last_sent);
        let _ = writeln!(self.out, "Moving to folding position...");
        let _ = self.out.flush();

        let report = self.sequencer.run(&mut self.driver, &folded)?;
        if report.disconnect_error.is_none() {
            let _ = writeln!(self.out, "Disconnected from robot.");
        }
        let _ = self.out.flush();
        Some(report)
    }
}

impl<D: Driver> Drop for Session<D> {
    fn drop(&mut self) {
        if !self.sequencer.has_run() {
            warn!("Session dropped before shutdown, folding arm now");
            self.shutdown();
        }
    }
}
