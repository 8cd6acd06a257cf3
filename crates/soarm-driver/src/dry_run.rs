//! Dry-run 驱动
//!
//! 不连接任何硬件，只记录日志。用于在没有机械臂时演练键位和控制循环。

use crate::{Driver, DriverError, Joint, JointPositions};
use tracing::{debug, info};

/// 只打印命令的驱动
#[derive(Debug)]
pub struct DryRunDriver {
    joints: Vec<Joint>,
    sent: u64,
    last: Option<JointPositions>,
    connected: bool,
}

impl DryRunDriver {
    /// 声明全部六个关节
    pub fn connect() -> Self {
        info!("Dry-run driver connected (no hardware)");
        Self {
            joints: Joint::ALL.to_vec(),
            sent: 0,
            last: None,
            connected: true,
        }
    }

    /// 已发送的命令数
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// 最近一次发送的命令
    pub fn last(&self) -> Option<&JointPositions> {
        self.last.as_ref()
    }
}

impl Driver for DryRunDriver {
    fn declared_joints(&self) -> &[Joint] {
        &self.joints
    }

    fn send(&mut self, positions: &JointPositions) -> Result<(), DriverError> {
        if !self.connected {
            return Err(DriverError::Disconnected);
        }
        if let Some(joint) = positions.first_undeclared(&self.joints) {
            return Err(DriverError::UndeclaredJoint(joint));
        }
        self.sent += 1;
        debug!("dry-run command #{}: {}", self.sent, positions);
        self.last = Some(positions.clone());
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        if self.connected {
            self.connected = false;
            info!("Dry-run driver disconnected after {} commands", self.sent);
        }
        Ok(())
    }
}
