//! 关节与关节位置表
//!
//! 驱动通过 [`Driver::declared_joints`](crate::Driver::declared_joints) 声明可控关节集合，
//! 上层只会向驱动发送该集合子集上的 [`JointPositions`]。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// SO-101 机械臂关节
///
/// 声明顺序即舵机总线 ID 顺序（1..=6），也是 [`JointPositions`] 的遍历顺序。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    ShoulderPan,
    ShoulderLift,
    ElbowFlex,
    WristFlex,
    WristRoll,
    Gripper,
}

impl Joint {
    /// 全部关节（按舵机 ID 排序）
    pub const ALL: [Joint; 6] = [
        Joint::ShoulderPan,
        Joint::ShoulderLift,
        Joint::ElbowFlex,
        Joint::WristFlex,
        Joint::WristRoll,
        Joint::Gripper,
    ];

    /// 关节名（标定文件、配置文件中使用）
    pub fn name(self) -> &'static str {
        match self {
            Joint::ShoulderPan => "shoulder_pan",
            Joint::ShoulderLift => "shoulder_lift",
            Joint::ElbowFlex => "elbow_flex",
            Joint::WristFlex => "wrist_flex",
            Joint::WristRoll => "wrist_roll",
            Joint::Gripper => "gripper",
        }
    }

    /// 动作键名（如 `shoulder_pan.pos`），用于显示
    pub fn action_key(self) -> &'static str {
        match self {
            Joint::ShoulderPan => "shoulder_pan.pos",
            Joint::ShoulderLift => "shoulder_lift.pos",
            Joint::ElbowFlex => "elbow_flex.pos",
            Joint::WristFlex => "wrist_flex.pos",
            Joint::WristRoll => "wrist_roll.pos",
            Joint::Gripper => "gripper.pos",
        }
    }

    /// 出厂默认舵机 ID
    pub fn default_servo_id(self) -> u8 {
        self as u8 + 1
    }

    /// 操作员单位下的取值范围
    ///
    /// 身体关节为 `[-100, 100]`，夹爪为 `[0, 100]`。
    pub fn range(self) -> (f64, f64) {
        match self {
            Joint::Gripper => (0.0, 100.0),
            _ => (-100.0, 100.0),
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_key())
    }
}

/// 关节名解析错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown joint name: {0}")]
pub struct UnknownJointName(pub String);

impl FromStr for Joint {
    type Err = UnknownJointName;

    /// 同时接受 `shoulder_pan` 与 `shoulder_pan.pos` 两种写法
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_suffix(".pos").unwrap_or(s);
        Joint::ALL
            .into_iter()
            .find(|joint| joint.name() == name)
            .ok_or_else(|| UnknownJointName(s.to_string()))
    }
}

/// 关节位置表
///
/// 关节 → 目标位置（操作员单位）。内部使用 `BTreeMap`，遍历顺序固定为关节声明顺序。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointPositions(BTreeMap<Joint, f64>);

impl JointPositions {
    /// 创建空表
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// 给定关节全部置零
    pub fn zeros(joints: &[Joint]) -> Self {
        joints.iter().map(|&joint| (joint, 0.0)).collect()
    }

    pub fn get(&self, joint: Joint) -> Option<f64> {
        self.0.get(&joint).copied()
    }

    pub fn get_mut(&mut self, joint: Joint) -> Option<&mut f64> {
        self.0.get_mut(&joint)
    }

    /// 插入或覆盖
    pub fn insert(&mut self, joint: Joint, position: f64) -> Option<f64> {
        self.0.insert(joint, position)
    }

    pub fn contains(&self, joint: Joint) -> bool {
        self.0.contains_key(&joint)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 关节集合（升序）
    pub fn joints(&self) -> impl Iterator<Item = Joint> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Joint, f64)> + '_ {
        self.0.iter().map(|(&joint, &position)| (joint, position))
    }

    /// 第一个不在 `declared` 中的关节（用于检查子集约束）
    pub fn first_undeclared(&self, declared: &[Joint]) -> Option<Joint> {
        self.joints().find(|joint| !declared.contains(joint))
    }

    /// 以 `base` 为底，覆盖本表中同时存在于 `base` 的关节
    ///
    /// 结果的关节集合与 `base` 完全相同：本表缺少的关节保留 `base` 的值，
    /// 本表多出的关节被丢弃。
    pub fn overlay_on(&self, base: &JointPositions) -> JointPositions {
        base.iter()
            .map(|(joint, position)| (joint, self.get(joint).unwrap_or(position)))
            .collect()
    }
}

impl FromIterator<(Joint, f64)> for JointPositions {
    fn from_iter<I: IntoIterator<Item = (Joint, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for JointPositions {
    /// `{'shoulder_pan.pos': 6.0, 'shoulder_lift.pos': -3.0, ...}`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (joint, position)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{}': {:.1}", joint.action_key(), position)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_order_matches_servo_ids() {
        let ids: Vec<u8> = Joint::ALL.iter().map(|j| j.default_servo_id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

        let mut sorted = Joint::ALL;
        sorted.sort();
        assert_eq!(sorted, Joint::ALL);
    }

    #[test]
    fn test_joint_from_str() {
        assert_eq!("elbow_flex".parse::<Joint>().unwrap(), Joint::ElbowFlex);
        assert_eq!("gripper.pos".parse::<Joint>().unwrap(), Joint::Gripper);
        assert_eq!(
            "elbow".parse::<Joint>(),
            Err(UnknownJointName("elbow".to_string()))
        );
    }

    #[test]
    fn test_zeros() {
        let positions = JointPositions::zeros(&Joint::ALL);
        assert_eq!(positions.len(), 6);
        assert!(positions.iter().all(|(_, p)| p == 0.0));
    }

    #[test]
    fn test_first_undeclared() {
        let positions = JointPositions::zeros(&[Joint::ShoulderPan, Joint::Gripper]);
        assert_eq!(positions.first_undeclared(&Joint::ALL), None);
        assert_eq!(
            positions.first_undeclared(&[Joint::ShoulderPan]),
            Some(Joint::Gripper)
        );
    }

    #[test]
    fn test_overlay_on_keeps_base_key_set() {
        let mut base = JointPositions::zeros(&[Joint::ShoulderPan, Joint::ElbowFlex]);
        base.insert(Joint::ShoulderPan, 12.0);

        let partial: JointPositions = [(Joint::ElbowFlex, 90.0), (Joint::Gripper, 50.0)]
            .into_iter()
            .collect();

        let merged = partial.overlay_on(&base);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get(Joint::ShoulderPan), Some(12.0));
        assert_eq!(merged.get(Joint::ElbowFlex), Some(90.0));
        assert!(!merged.contains(Joint::Gripper));
    }

    #[test]
    fn test_display() {
        let positions: JointPositions = [(Joint::ShoulderPan, 6.0), (Joint::ShoulderLift, -3.0)]
            .into_iter()
            .collect();
        assert_eq!(
            positions.to_string(),
            "{'shoulder_pan.pos': 6.0, 'shoulder_lift.pos': -3.0}"
        );
    }

    #[test]
    fn test_serde_uses_joint_names() {
        let positions: JointPositions = [(Joint::WristFlex, -90.0)].into_iter().collect();
        let json = serde_json::to_string(&positions).unwrap();
        assert_eq!(json, r#"{"wrist_flex":-90.0}"#);

        let back: JointPositions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, positions);
    }
}
