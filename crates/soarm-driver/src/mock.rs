//! Mock 驱动
//!
//! 记录每一次调用（包括失败的调用），并可按脚本注入故障。
//! 通过 [`MockHandle`] 在驱动被移交给会话之后继续观察调用记录。

use crate::{Driver, DriverError, Joint, JointPositions};
use parking_lot::Mutex;
use std::sync::Arc;

/// 记录的调用
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Send(JointPositions),
    Disconnect,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<MockCall>,
    successful_sends: usize,
    /// 成功 N 次后所有 send 失败
    fail_send_after: Option<usize>,
    fail_disconnect: bool,
}

/// 记录调用的 Mock 驱动
#[derive(Debug)]
pub struct MockDriver {
    joints: Vec<Joint>,
    state: Arc<Mutex<MockState>>,
}

/// 调用记录的共享句柄
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// 声明全部六个关节
    pub fn new() -> Self {
        Self::with_joints(&Joint::ALL)
    }

    /// 只声明给定关节
    pub fn with_joints(joints: &[Joint]) -> Self {
        Self {
            joints: joints.to_vec(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// 成功 `n` 次之后所有 send 返回错误（`n = 0` 表示始终失败）
    pub fn fail_send_after(self, n: usize) -> Self {
        self.state.lock().fail_send_after = Some(n);
        self
    }

    /// disconnect 返回错误
    pub fn fail_disconnect(self) -> Self {
        self.state.lock().fail_disconnect = true;
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: self.state.clone(),
        }
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// 全部调用（按时间顺序）
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// 全部 send 尝试的参数
    pub fn sends(&self) -> Vec<JointPositions> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                MockCall::Send(positions) => Some(positions.clone()),
                MockCall::Disconnect => None,
            })
            .collect()
    }

    pub fn disconnect_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, MockCall::Disconnect))
            .count()
    }

    /// 从现在起所有 send 失败
    pub fn fail_sends_from_now(&self) {
        let mut state = self.state.lock();
        state.fail_send_after = Some(state.successful_sends);
    }
}

impl Driver for MockDriver {
    fn declared_joints(&self) -> &[Joint] {
        &self.joints
    }

    fn send(&mut self, positions: &JointPositions) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Send(positions.clone()));

        if let Some(joint) = positions.first_undeclared(&self.joints) {
            return Err(DriverError::UndeclaredJoint(joint));
        }
        if state
            .fail_send_after
            .is_some_and(|n| state.successful_sends >= n)
        {
            return Err(DriverError::Rejected("mock send failure".to_string()));
        }
        state.successful_sends += 1;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Disconnect);
        if state.fail_disconnect {
            return Err(DriverError::Rejected("mock disconnect failure".to_string()));
        }
        Ok(())
    }
}
