//! 关机流程
//!
//! 1. 下发收起姿态
//! 2. 无条件等待宽限期
//! 3. 释放驱动连接
//!
//! 每一步独立尽力执行：错误（包括 panic）被记录到 [`ShutdownReport`] 并以 `warn!` 输出，
//! 不会向上传播，也不会阻止下一步。整个流程每个会话最多执行一次。

use soarm_driver::{Driver, DriverError, JointPositions};
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{info, warn};

/// 关机结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    /// 实际下发的收起姿态
    pub folded: Option<JointPositions>,
    /// 收起命令失败原因
    pub fold_error: Option<String>,
    /// 断开连接失败原因
    pub disconnect_error: Option<String>,
}

impl ShutdownReport {
    /// 所有步骤都成功
    pub fn is_clean(&self) -> bool {
        self.fold_error.is_none() && self.disconnect_error.is_none()
    }
}

/// 单次关机流程
#[derive(Debug)]
pub struct ShutdownSequencer {
    grace: Duration,
    done: bool,
}

impl ShutdownSequencer {
    pub fn new(grace: Duration) -> Self {
        Self { grace, done: false }
    }

    pub fn has_run(&self) -> bool {
        self.done
    }

    /// 执行关机流程
    ///
    /// 已经执行过时返回 `None`，不再触碰驱动。
    pub fn run<D: Driver + ?Sized>(
        &mut self,
        driver: &mut D,
        folded: &JointPositions,
    ) -> Option<ShutdownReport> {
        if self.done {
            return None;
        }
        self.done = true;

        let mut report = ShutdownReport::default();

        info!("Moving to folded position: {}", folded);
        match guarded(|| driver.send(folded)) {
            Ok(()) => report.folded = Some(folded.clone()),
            Err(e) => {
                warn!("Failed to send folded position: {}", e);
                report.fold_error = Some(e);
            },
        }

        if !self.grace.is_zero() {
            spin_sleep::sleep(self.grace);
        }

        match guarded(|| driver.disconnect()) {
            Ok(()) => info!("Driver disconnected"),
            Err(e) => {
                warn!("Failed to disconnect driver: {}", e);
                report.disconnect_error = Some(e);
            },
        }

        Some(report)
    }
}

/// 执行一步，把错误和 panic 都转成字符串
fn guarded<F>(step: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), DriverError>,
{
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(crate::TeleopError::from_panic(payload).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soarm_driver::{DryRunDriver, Joint};

    struct PanickingDriver {
        disconnected: bool,
    }

    impl Driver for PanickingDriver {
        fn declared_joints(&self) -> &[Joint] {
            &Joint::ALL
        }

        fn send(&mut self, _: &JointPositions) -> Result<(), DriverError> {
            panic!("bus exploded");
        }

        fn disconnect(&mut self) -> Result<(), DriverError> {
            self.disconnected = true;
            Ok(())
        }
    }

    #[test]
    fn test_runs_once() {
        let mut driver = DryRunDriver::connect();
        let folded = JointPositions::zeros(&Joint::ALL);
        let mut sequencer = ShutdownSequencer::new(Duration::ZERO);

        let report = sequencer.run(&mut driver, &folded).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.folded.as_ref(), Some(&folded));
        assert_eq!(driver.sent(), 1);

        assert!(sequencer.has_run());
        assert!(sequencer.run(&mut driver, &folded).is_none());
        assert_eq!(driver.sent(), 1);
    }

    #[test]
    fn test_panicking_fold_still_disconnects() {
        let mut driver = PanickingDriver {
            disconnected: false,
        };
        let mut sequencer = ShutdownSequencer::new(Duration::ZERO);
        let report = sequencer
            .run(&mut driver, &JointPositions::zeros(&Joint::ALL))
            .unwrap();

        assert!(driver.disconnected);
        assert!(report.folded.is_none());
        assert!(report.fold_error.unwrap().contains("bus exploded"));
        assert!(report.disconnect_error.is_none());
    }

    #[test]
    fn test_grace_period_is_waited() {
        let mut driver = DryRunDriver::connect();
        let mut sequencer = ShutdownSequencer::new(Duration::from_millis(30));
        let start = std::time::Instant::now();
        sequencer.run(&mut driver, &JointPositions::zeros(&Joint::ALL));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
