//! 会话参数

use crate::error::TeleopError;
use crate::position::PositionRules;
use serde::{Deserialize, Serialize};
use soarm_driver::JointPositions;
use std::time::Duration;

/// 遥操作会话配置
///
/// 可以直接作为 CLI 配置文件中的 `[teleop]` 表反序列化，缺省字段取默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleopConfig {
    /// 每次按键的增量
    pub step: f64,
    /// 每次下发后的最短间隔（毫秒）
    pub tick_ms: u64,
    /// 收起后等待运动完成的时间（毫秒）
    pub grace_ms: u64,
    /// ESC 之后等待后续字节的时间（毫秒）
    pub escape_timeout_ms: u64,
    pub gripper_open: f64,
    pub gripper_closed: f64,
    /// 自定义收起姿态（可只给部分关节）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folded: Option<JointPositions>,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        Self {
            step: 3.0,
            tick_ms: 10,
            grace_ms: 1000,
            escape_timeout_ms: 50,
            gripper_open: 90.0,
            gripper_closed: 0.0,
            folded: None,
        }
    }
}

impl TeleopConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn escape_timeout(&self) -> Duration {
        Duration::from_millis(self.escape_timeout_ms)
    }

    pub fn rules(&self) -> PositionRules {
        PositionRules {
            step: self.step,
            gripper_closed: self.gripper_closed,
            gripper_open: self.gripper_open,
        }
    }

    /// 检查参数
    pub fn validate(&self) -> Result<(), TeleopError> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(TeleopError::Config(format!(
                "step must be a positive number, got {}",
                self.step
            )));
        }
        if !self.gripper_open.is_finite() || !self.gripper_closed.is_finite() {
            return Err(TeleopError::Config(
                "gripper values must be finite".to_string(),
            ));
        }
        if self.gripper_open == self.gripper_closed {
            return Err(TeleopError::Config(format!(
                "gripper open and closed values are both {}",
                self.gripper_open
            )));
        }
        if let Some(folded) = &self.folded
            && let Some((joint, value)) = folded.iter().find(|(_, v)| !v.is_finite())
        {
            return Err(TeleopError::Config(format!(
                "folded position for {joint} is not finite: {value}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soarm_driver::Joint;

    #[test]
    fn test_defaults() {
        let config = TeleopConfig::default();
        assert_eq!(config.step, 3.0);
        assert_eq!(config.tick_period(), Duration::from_millis(10));
        assert_eq!(config.grace_period(), Duration::from_secs(1));
        assert_eq!(config.escape_timeout(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: TeleopConfig = toml::from_str(
            r#"
            step = 5.0
            [folded]
            elbow_flex = 80.0
            "#,
        )
        .unwrap();
        assert_eq!(config.step, 5.0);
        assert_eq!(config.grace_ms, 1000);
        let folded = config.folded.unwrap();
        assert_eq!(folded.get(Joint::ElbowFlex), Some(80.0));
        assert_eq!(folded.len(), 1);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = TeleopConfig {
            step: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(TeleopError::Config(_))));

        let config = TeleopConfig {
            gripper_open: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TeleopConfig {
            folded: Some([(Joint::Gripper, f64::NAN)].into_iter().collect()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
