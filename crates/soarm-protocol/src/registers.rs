//! STS3215 控制表寄存器地址
//!
//! EEPROM 区（地址 < 40）写入前需要关闭扭矩并解锁（`LOCK = 0`）。

/// 应答延时（单位 2us）
pub const RETURN_DELAY_TIME: u8 = 7;
/// 位置环 P 系数
pub const P_COEFFICIENT: u8 = 21;
/// 位置环 D 系数
pub const D_COEFFICIENT: u8 = 22;
/// 位置环 I 系数
pub const I_COEFFICIENT: u8 = 23;
/// 运行模式（见 [`OperatingMode`]）
pub const OPERATING_MODE: u8 = 33;
/// 扭矩开关
pub const TORQUE_ENABLE: u8 = 40;
/// 加速度
pub const ACCELERATION: u8 = 41;
/// 目标位置（2 字节）
pub const GOAL_POSITION: u8 = 42;
/// EEPROM 写锁
pub const LOCK: u8 = 55;
/// 当前位置（2 字节，只读）
pub const PRESENT_POSITION: u8 = 56;

/// 一圈的编码器刻度数（12 位分辨率）
pub const TICKS_PER_REV: u16 = 4096;

/// 编码器最大刻度
pub const MAX_TICK: u16 = TICKS_PER_REV - 1;

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum OperatingMode {
    /// 位置伺服模式
    #[default]
    Position = 0,
    /// 恒速模式
    Velocity = 1,
    /// PWM 开环模式
    Pwm = 2,
    /// 步进模式
    Step = 3,
}

impl OperatingMode {
    /// 转换为寄存器值
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}
