//! 位置状态
//!
//! 按键 → [`Command`] → 对 [`JointPositions`] 的增量修改。
//!
//! 规则层只做增量和重置，不做限位（由驱动负责）；
//! 不会向位置表中引入新的关节。

use crate::key::KeyEvent;
use soarm_driver::{Joint, JointPositions};

/// 运动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Negative,
    Positive,
}

impl Direction {
    fn sign(self) -> f64 {
        match self {
            Direction::Negative => -1.0,
            Direction::Positive => 1.0,
        }
    }
}

/// 按键对应的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 单关节步进
    Nudge { joint: Joint, direction: Direction },
    /// 夹爪开合切换
    ToggleGripper,
    /// 全部回到 neutral
    Reset,
    /// 结束会话
    Quit,
    /// 未绑定的按键
    Ignore,
}

/// 键位绑定表（帮助文本也从这里生成）
pub const BINDINGS: &[(&str, &str)] = &[
    ("a / d", "shoulder pan  -/+"),
    ("w / s", "shoulder lift -/+"),
    ("Up / Down", "elbow flex    -/+"),
    ("q / e", "wrist flex    -/+"),
    ("Left / Right", "wrist roll    -/+"),
    ("space", "toggle gripper open/closed"),
    ("n", "reset to neutral"),
    ("k / Ctrl+C", "fold arm and quit"),
];

impl Command {
    pub fn from_key(key: KeyEvent) -> Self {
        use Direction::{Negative, Positive};

        let nudge = |joint, direction| Command::Nudge { joint, direction };
        match key {
            KeyEvent::Char('a') => nudge(Joint::ShoulderPan, Negative),
            KeyEvent::Char('d') => nudge(Joint::ShoulderPan, Positive),
            KeyEvent::Char('w') => nudge(Joint::ShoulderLift, Negative),
            KeyEvent::Char('s') => nudge(Joint::ShoulderLift, Positive),
            KeyEvent::Up => nudge(Joint::ElbowFlex, Negative),
            KeyEvent::Down => nudge(Joint::ElbowFlex, Positive),
            KeyEvent::Char('q') => nudge(Joint::WristFlex, Negative),
            KeyEvent::Char('e') => nudge(Joint::WristFlex, Positive),
            KeyEvent::Left => nudge(Joint::WristRoll, Negative),
            KeyEvent::Right => nudge(Joint::WristRoll, Positive),
            KeyEvent::Char(' ') => Command::ToggleGripper,
            KeyEvent::Char('n') => Command::Reset,
            KeyEvent::Char('k') => Command::Quit,
            key if key.is_interrupt() => Command::Quit,
            _ => Command::Ignore,
        }
    }
}

/// 位置修改规则
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionRules {
    /// 每次按键的增量
    pub step: f64,
    pub gripper_closed: f64,
    pub gripper_open: f64,
}

impl Default for PositionRules {
    fn default() -> Self {
        Self {
            step: 3.0,
            gripper_closed: 0.0,
            gripper_open: 90.0,
        }
    }
}

impl PositionRules {
    /// 应用一条命令
    ///
    /// 只修改命令涉及的关节；位置表中不存在的关节保持缺失。
    /// `Quit` / `Ignore` 不修改状态。
    pub fn apply(&self, command: Command, positions: &mut JointPositions, neutral: &JointPositions) {
        match command {
            Command::Nudge { joint, direction } => {
                if let Some(position) = positions.get_mut(joint) {
                    *position += direction.sign() * self.step;
                }
            },
            Command::ToggleGripper => {
                if let Some(position) = positions.get_mut(Joint::Gripper) {
                    *position = if *position == self.gripper_closed {
                        self.gripper_open
                    } else {
                        self.gripper_closed
                    };
                }
            },
            Command::Reset => *positions = neutral.clone(),
            Command::Quit | Command::Ignore => {},
        }
    }

    /// 按键版本的 [`apply`](Self::apply)
    pub fn apply_key(&self, key: KeyEvent, positions: &mut JointPositions, neutral: &JointPositions) {
        self.apply(Command::from_key(key), positions, neutral);
    }
}

/// 会话预设姿态
#[derive(Debug, Clone, PartialEq)]
pub struct Presets {
    /// 全部声明关节为 0
    pub neutral: JointPositions,
    /// 收起姿态（可能只覆盖部分关节）
    pub folded: JointPositions,
}

impl Presets {
    /// 由驱动声明的关节集合生成预设
    ///
    /// `folded_override` 为 `None` 时使用 [`default_folded`](Self::default_folded)。
    pub fn new(declared: &[Joint], folded_override: Option<&JointPositions>) -> Self {
        let folded = folded_override
            .cloned()
            .unwrap_or_else(Self::default_folded);
        Self {
            neutral: JointPositions::zeros(declared),
            folded,
        }
    }

    /// 出厂收起姿态
    pub fn default_folded() -> JointPositions {
        [
            (Joint::ShoulderPan, 0.0),
            (Joint::ShoulderLift, -90.0),
            (Joint::ElbowFlex, 90.0),
            (Joint::WristFlex, -90.0),
            (Joint::WristRoll, 0.0),
            (Joint::Gripper, 0.0),
        ]
        .into_iter()
        .collect()
    }

    /// 以最后一次命令为底的收起姿态
    ///
    /// 收起姿态未覆盖的关节保持最后命令值，驱动未声明的关节被丢弃。
    pub fn folded_over(&self, last: &JointPositions) -> JointPositions {
        self.folded.overlay_on(last)
    }
}
