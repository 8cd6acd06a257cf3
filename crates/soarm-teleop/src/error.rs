//! 遥操作层错误类型

use crate::key::KeyError;
use soarm_driver::DriverError;
use thiserror::Error;

/// 遥操作错误
#[derive(Error, Debug)]
pub enum TeleopError {
    /// 按键读取失败
    #[error("Key input error: {0}")]
    Key(#[from] KeyError),

    /// 驱动命令失败
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 终端输出失败
    #[error("Terminal output error: {0}")]
    Io(#[from] std::io::Error),

    /// 配置无效
    #[error("Invalid teleop config: {0}")]
    Config(String),

    /// 控制循环内部 panic
    #[error("Control loop panicked: {0}")]
    Panic(String),
}

impl TeleopError {
    /// 把 `catch_unwind` 的载荷转换为错误
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        TeleopError::Panic(message)
    }
}
