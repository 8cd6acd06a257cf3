//! 标定数据与单位换算
//!
//! 每个关节记录舵机 ID、方向（`drive_mode`）以及标定时记录的原始刻度范围
//! `range_min..=range_max`。操作员单位与原始刻度之间按线性映射换算：
//!
//! - 身体关节：`[-100, 100]` → `[range_min, range_max]`
//! - 夹爪：`[0, 100]` → `[range_min, range_max]`
//!
//! 文件格式为 JSON，键为关节名：
//!
//! ```json
//! {
//!   "shoulder_pan": { "id": 1, "drive_mode": 0, "homing_offset": 12, "range_min": 758, "range_max": 3292 },
//!   "gripper":      { "id": 6, "drive_mode": 0, "homing_offset": 0,  "range_min": 2031, "range_max": 3476 }
//! }
//! ```
//!
//! `homing_offset` 已写入舵机 EEPROM，此处忽略。

use crate::{DriverError, Joint};
use serde::{Deserialize, Serialize};
use soarm_protocol::MAX_TICK;
use std::collections::BTreeMap;
use std::path::Path;

/// 单个关节的标定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorCalibration {
    /// 舵机总线 ID
    pub id: u8,
    /// 1 表示方向取反
    #[serde(default)]
    pub drive_mode: u8,
    /// 标定最小刻度
    pub range_min: u16,
    /// 标定最大刻度
    pub range_max: u16,
}

impl MotorCalibration {
    /// 未标定时的默认值：全量程
    pub fn full_range(id: u8) -> Self {
        Self {
            id,
            drive_mode: 0,
            range_min: 0,
            range_max: MAX_TICK,
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.drive_mode == 1
    }
}

/// 整条总线的标定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Calibration(BTreeMap<Joint, MotorCalibration>);

impl Calibration {
    /// 全部关节、出厂 ID、全量程
    pub fn full_range() -> Self {
        Self(
            Joint::ALL
                .into_iter()
                .map(|joint| (joint, MotorCalibration::full_range(joint.default_servo_id())))
                .collect(),
        )
    }

    /// 从 JSON 文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DriverError::Calibration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
            .map_err(|e| DriverError::Calibration(format!("{}: {e}", path.display())))
    }

    /// 从 JSON 字符串解析并校验
    pub fn from_json(content: &str) -> Result<Self, DriverError> {
        let calibration: Self = serde_json::from_str(content)
            .map_err(|e| DriverError::Calibration(format!("bad calibration JSON: {e}")))?;
        calibration.validate()?;
        Ok(calibration)
    }

    fn validate(&self) -> Result<(), DriverError> {
        if self.0.is_empty() {
            return Err(DriverError::Calibration("no joints calibrated".to_string()));
        }
        for (joint, motor) in &self.0 {
            if motor.range_min >= motor.range_max || motor.range_max > MAX_TICK {
                return Err(DriverError::Calibration(format!(
                    "{joint}: invalid range {}..{}",
                    motor.range_min, motor.range_max
                )));
            }
        }
        Ok(())
    }

    /// 已标定的关节（升序）
    pub fn joints(&self) -> Vec<Joint> {
        self.0.keys().copied().collect()
    }

    pub fn get(&self, joint: Joint) -> Option<&MotorCalibration> {
        self.0.get(&joint)
    }

    /// 操作员单位 → 原始刻度
    ///
    /// 超出关节范围的值先被截断到范围边界（限位由驱动负责）。
    pub fn to_raw(&self, joint: Joint, value: f64) -> Result<u16, DriverError> {
        let motor = self
            .get(joint)
            .ok_or(DriverError::UndeclaredJoint(joint))?;
        let (lo, hi) = joint.range();

        let value = if motor.is_inverted() {
            // 以范围中点为轴翻转
            lo + hi - value
        } else {
            value
        };
        let bounded = value.clamp(lo, hi);
        let fraction = (bounded - lo) / (hi - lo);
        let span = f64::from(motor.range_max - motor.range_min);
        Ok((fraction * span + f64::from(motor.range_min)).round() as u16)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::full_range()
    }
}
