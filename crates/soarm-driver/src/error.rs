//! 驱动层错误类型定义

use crate::Joint;
use soarm_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口 IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 串口打开失败
    #[cfg(feature = "feetech")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 舵机无应答
    #[error("Servo {id} did not respond")]
    NoResponse { id: u8 },

    /// 舵机上报故障位
    #[error("Servo {id} reported fault flags 0x{flags:02X}")]
    ServoFault { id: u8, flags: u8 },

    /// 命令包含驱动未声明的关节
    #[error("Joint {0} is not controlled by this driver")]
    UndeclaredJoint(Joint),

    /// 标定文件错误
    #[error("Calibration error: {0}")]
    Calibration(String),

    /// 连接已释放
    #[error("Driver is disconnected")]
    Disconnected,

    /// 驱动拒绝命令
    #[error("Command rejected: {0}")]
    Rejected(String),
}
