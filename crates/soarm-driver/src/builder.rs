//! Builder 模式实现
//!
//! 提供链式构造驱动实例的便捷方式。

use crate::calibration::Calibration;
use crate::dry_run::DryRunDriver;
use crate::{Driver, DriverError};
use std::path::PathBuf;
use tracing::warn;

/// 驱动类型选择
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriverType {
    /// Feetech 串口总线（默认）
    #[default]
    Feetech,
    /// 不连接硬件，只打印命令
    DryRun,
}

/// Driver Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use soarm_driver::{DriverBuilder, DriverType};
///
/// // 真实机械臂
/// let driver = DriverBuilder::new()
///     .port("/dev/ttyACM0")
///     .calibration("follower.json")
///     .connect()
///     .unwrap();
///
/// // 无硬件演练
/// let driver = DriverBuilder::new()
///     .with_driver_type(DriverType::DryRun)
///     .connect()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct DriverBuilder {
    /// 串口设备路径
    port: Option<String>,
    /// 波特率（默认 1M）
    baud_rate: Option<u32>,
    /// 标定文件
    calibration: Option<PathBuf>,
    driver_type: DriverType,
}

impl DriverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 显式指定驱动类型（可选，默认 Feetech）
    pub fn with_driver_type(mut self, driver_type: DriverType) -> Self {
        self.driver_type = driver_type;
        self
    }

    /// 设置串口设备（Feetech 必需）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 设置波特率（可选，默认 1M）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// 设置标定文件（可选；缺省时使用全量程并给出警告）
    pub fn calibration(mut self, path: impl Into<PathBuf>) -> Self {
        self.calibration = Some(path.into());
        self
    }

    /// 加载标定（Dry-run 不需要）
    fn load_calibration(&self) -> Result<Calibration, DriverError> {
        match &self.calibration {
            Some(path) => Calibration::load(path),
            None => {
                warn!("No calibration file given, using full servo range");
                Ok(Calibration::full_range())
            },
        }
    }

    /// 建立连接
    pub fn connect(self) -> Result<Box<dyn Driver>, DriverError> {
        match self.driver_type {
            DriverType::DryRun => Ok(Box::new(DryRunDriver::connect())),
            DriverType::Feetech => self.connect_feetech(),
        }
    }

    #[cfg(feature = "feetech")]
    fn connect_feetech(self) -> Result<Box<dyn Driver>, DriverError> {
        use crate::feetech::{DEFAULT_BAUD_RATE, FeetechDriver, ServoTuning};

        let port = self
            .port
            .clone()
            .ok_or_else(|| DriverError::Rejected("no serial port configured".to_string()))?;
        let calibration = self.load_calibration()?;
        let driver = FeetechDriver::connect(
            &port,
            self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
            calibration,
            ServoTuning::default(),
        )?;
        Ok(Box::new(driver))
    }

    #[cfg(not(feature = "feetech"))]
    fn connect_feetech(self) -> Result<Box<dyn Driver>, DriverError> {
        // 仍然校验标定，便于在无串口支持的构建中发现配置错误
        self.load_calibration()?;
        Err(DriverError::Rejected(
            "built without the `feetech` feature".to_string(),
        ))
    }
}
