//! # SO-ARM Protocol
//!
//! Feetech STS 串行总线舵机协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `instruction`: 指令码与广播 ID
//! - `registers`: 控制表寄存器地址
//! - `status`: 状态包（舵机应答）解析
//!
//! ## 帧格式
//!
//! ```text
//! FF FF | ID | LEN | INSTR | PARAM... | CHECKSUM
//! ```
//!
//! - `LEN = PARAM 数量 + 2`
//! - `CHECKSUM = !(ID + LEN + INSTR + ΣPARAM)`（只取低 8 位）
//!
//! ## 字节序
//!
//! STS 系列多字节寄存器使用小端字节序（低字节在前）。

pub mod instruction;
pub mod registers;
pub mod status;

pub use instruction::{BROADCAST_ID, Instruction};
pub use registers::*;
pub use status::{StatusFlags, StatusPacket};

use thiserror::Error;

/// 包头
pub const HEADER: [u8; 2] = [0xFF, 0xFF];

/// 单个包参数区的最大长度（LEN 字段为 u8，需预留 INSTR 与 CHECKSUM）
pub const MAX_PARAMS: usize = 253;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid packet length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid packet header: {0:02X?}")]
    InvalidHeader([u8; 2]),

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Packet too long: {len} parameter bytes (max {MAX_PARAMS})")]
    PacketTooLong { len: usize },

    #[error("Sync write entry for servo {id} has {actual} bytes, expected {expected}")]
    SyncWriteEntryLength { id: u8, expected: usize, actual: usize },

    #[error("Unexpected status from servo {actual} (expected {expected})")]
    UnexpectedId { expected: u8, actual: u8 },
}

/// 计算校验和
///
/// `data` 为 ID 起到最后一个参数为止的字节。
pub fn checksum(data: &[u8]) -> u8 {
    !data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// 小端字节序转 u16
pub fn bytes_to_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// u16 转小端字节序
pub fn u16_to_bytes_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// 指令包（主机 → 舵机）
///
/// # 示例
///
/// ```rust
/// use soarm_protocol::{Instruction, InstructionPacket};
///
/// let packet = InstructionPacket::ping(1);
/// assert_eq!(packet.instruction, Instruction::Ping);
/// assert_eq!(packet.encode(), vec![0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstructionPacket {
    /// 目标舵机 ID（广播为 0xFE）
    pub id: u8,
    /// 指令码
    pub instruction: Instruction,
    /// 参数区
    pub params: Vec<u8>,
}

impl InstructionPacket {
    /// 通用构造器
    pub fn new(id: u8, instruction: Instruction, params: Vec<u8>) -> Result<Self, ProtocolError> {
        if params.len() > MAX_PARAMS {
            return Err(ProtocolError::PacketTooLong { len: params.len() });
        }
        Ok(Self {
            id,
            instruction,
            params,
        })
    }

    /// PING 指令
    pub fn ping(id: u8) -> Self {
        Self {
            id,
            instruction: Instruction::Ping,
            params: Vec::new(),
        }
    }

    /// READ 指令：从 `address` 起读取 `len` 字节
    pub fn read(id: u8, address: u8, len: u8) -> Self {
        Self {
            id,
            instruction: Instruction::Read,
            params: vec![address, len],
        }
    }

    /// WRITE 指令：从 `address` 起写入 `data`
    pub fn write(id: u8, address: u8, data: &[u8]) -> Result<Self, ProtocolError> {
        let mut params = Vec::with_capacity(data.len() + 1);
        params.push(address);
        params.extend_from_slice(data);
        Self::new(id, Instruction::Write, params)
    }

    /// SYNC_WRITE 指令：一次写入多个舵机的同一段寄存器
    ///
    /// 每个条目为 `(舵机 ID, 数据)`，数据长度必须都等于 `data_len`。
    /// 同步写为广播包，舵机不返回状态包。
    pub fn sync_write(
        address: u8,
        data_len: u8,
        entries: &[(u8, &[u8])],
    ) -> Result<Self, ProtocolError> {
        let mut params = Vec::with_capacity(2 + entries.len() * (data_len as usize + 1));
        params.push(address);
        params.push(data_len);
        for &(id, data) in entries {
            if data.len() != data_len as usize {
                return Err(ProtocolError::SyncWriteEntryLength {
                    id,
                    expected: data_len as usize,
                    actual: data.len(),
                });
            }
            params.push(id);
            params.extend_from_slice(data);
        }
        Self::new(BROADCAST_ID, Instruction::SyncWrite, params)
    }

    /// 该指令是否会收到状态包
    pub fn expects_status(&self) -> bool {
        self.id != BROADCAST_ID && self.instruction != Instruction::SyncWrite
    }

    /// 编码为线上字节
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(6 + self.params.len());
        bytes.extend_from_slice(&HEADER);
        bytes.push(self.id);
        bytes.push((self.params.len() + 2) as u8);
        bytes.push(self.instruction.into());
        bytes.extend_from_slice(&self.params);
        bytes.push(checksum(&bytes[2..]));
        bytes
    }
}
