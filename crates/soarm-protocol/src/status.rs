//! 状态包解析
//!
//! ```text
//! FF FF | ID | LEN | ERROR | PARAM... | CHECKSUM
//! ```

use crate::{HEADER, ProtocolError, checksum};

/// 状态包错误位
///
/// 舵机在 ERROR 字节中按位报告故障，0 表示正常。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags(pub u8);

impl StatusFlags {
    pub const VOLTAGE: u8 = 1 << 0;
    pub const ANGLE_SENSOR: u8 = 1 << 1;
    pub const OVERHEAT: u8 = 1 << 2;
    pub const OVERCURRENT: u8 = 1 << 3;
    pub const OVERLOAD: u8 = 1 << 5;

    /// 无故障
    pub fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// 指定位是否置位
    pub fn contains(self, bit: u8) -> bool {
        self.0 & bit != 0
    }
}

/// 状态包（舵机 → 主机）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    /// 应答舵机 ID
    pub id: u8,
    /// 错误位
    pub error: StatusFlags,
    /// 参数区（READ 的返回数据）
    pub params: Vec<u8>,
}

impl StatusPacket {
    /// 包头 4 字节（FF FF ID LEN）之后还需读取的字节数
    pub fn remaining_len(head: &[u8; 4]) -> Result<usize, ProtocolError> {
        if head[..2] != HEADER {
            return Err(ProtocolError::InvalidHeader([head[0], head[1]]));
        }
        let len = head[3] as usize;
        // 至少包含 ERROR 与 CHECKSUM
        if len < 2 {
            return Err(ProtocolError::InvalidLength {
                expected: 2,
                actual: len,
            });
        }
        Ok(len)
    }

    /// 从完整字节流解析
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < 6 {
            return Err(ProtocolError::InvalidLength {
                expected: 6,
                actual: bytes.len(),
            });
        }
        let head = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let total = 4 + Self::remaining_len(&head)?;
        if bytes.len() != total {
            return Err(ProtocolError::InvalidLength {
                expected: total,
                actual: bytes.len(),
            });
        }

        let expected = checksum(&bytes[2..total - 1]);
        let actual = bytes[total - 1];
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            id: bytes[2],
            error: StatusFlags(bytes[4]),
            params: bytes[5..total - 1].to_vec(),
        })
    }

    /// 校验应答来自期望的舵机
    pub fn expect_id(self, id: u8) -> Result<Self, ProtocolError> {
        if self.id != id {
            return Err(ProtocolError::UnexpectedId {
                expected: id,
                actual: self.id,
            });
        }
        Ok(self)
    }
}
