//! # SO-ARM Driver
//!
//! 驱动层：向机械臂下发关节位置命令。
//!
//! - [`Driver`] trait：上层唯一依赖的接口（声明关节、发送位置、断开）
//! - [`FeetechDriver`]：Feetech STS 串口总线驱动（限位、单位换算在此完成）
//! - [`DryRunDriver`]：无硬件演练
//! - `MockDriver`：记录调用的测试驱动（`mock` feature）
//!
//! 连接由具体驱动的构造函数完成，参见 [`DriverBuilder`]。

mod builder;
pub mod calibration;
pub mod dry_run;
mod error;
pub mod feetech;
mod joint;
#[cfg(feature = "mock")]
pub mod mock;

pub use builder::{DriverBuilder, DriverType};
pub use calibration::{Calibration, MotorCalibration};
pub use dry_run::DryRunDriver;
pub use error::DriverError;
pub use feetech::{FeetechDriver, ServoTuning};
pub use joint::{Joint, JointPositions, UnknownJointName};
#[cfg(feature = "mock")]
pub use mock::{MockCall, MockDriver, MockHandle};

/// 机械臂驱动接口
///
/// # 约定
///
/// - `send` 的关节集合必须是 `declared_joints()` 的子集，否则返回
///   [`DriverError::UndeclaredJoint`]
/// - `disconnect` 之后不再使用驱动；重复调用应为空操作
/// - 超出关节范围的值由驱动截断或拒绝
pub trait Driver {
    /// 可控关节（能力描述）
    fn declared_joints(&self) -> &[Joint];

    /// 下发一帧目标位置
    fn send(&mut self, positions: &JointPositions) -> Result<(), DriverError>;

    /// 释放连接
    fn disconnect(&mut self) -> Result<(), DriverError>;
}

impl<D: Driver + ?Sized> Driver for Box<D> {
    fn declared_joints(&self) -> &[Joint] {
        (**self).declared_joints()
    }

    fn send(&mut self, positions: &JointPositions) -> Result<(), DriverError> {
        (**self).send(positions)
    }

    fn disconnect(&mut self) -> Result<(), DriverError> {
        (**self).disconnect()
    }
}
