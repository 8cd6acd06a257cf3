//! 指令码定义

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 广播 ID（所有舵机接收，均不应答）
pub const BROADCAST_ID: u8 = 0xFE;

/// 指令码
///
/// 只列出本项目使用的指令；`REG_WRITE`/`ACTION`/`RESET` 等未使用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Instruction {
    /// 查询舵机是否在线
    Ping = 0x01,
    /// 读寄存器
    Read = 0x02,
    /// 写寄存器
    Write = 0x03,
    /// 同步写（广播，多舵机同一地址）
    SyncWrite = 0x83,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_codes() {
        assert_eq!(u8::from(Instruction::Ping), 0x01);
        assert_eq!(u8::from(Instruction::SyncWrite), 0x83);
        assert_eq!(Instruction::try_from(0x02).unwrap(), Instruction::Read);
        assert!(Instruction::try_from(0x55).is_err());
    }
}
