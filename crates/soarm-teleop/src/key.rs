//! 按键解码
//!
//! 把原始字节流解码为逻辑按键：
//!
//! - 普通字节 → `KeyEvent::Char`（`>= 0x80` 的字节按 UTF-8 序列解码）
//! - `ESC [ A/B/C/D` → 上/下/右/左方向键
//! - 单独的 `ESC`，或 `ESC` 后跟无法识别的字节 → `KeyEvent::Char('\x1b')`，
//!   已读取的后续字节被丢弃，不会被当作运动按键重放
//!
//! `ESC` 之后的字节最多等待 `escape_timeout`，因此单独按下 ESC 不会卡住读取。
//!
//! 字节来源抽象为 [`ByteSource`]，按键来源抽象为 [`KeySource`]，
//! 测试中可以用 [`ScriptedBytes`] / [`ScriptedKeys`] 注入有限序列。

use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// ESC 字节
pub const ESC: u8 = 0x1B;

/// 原始模式下 Ctrl+C 产生的字符
pub const INTERRUPT_CHAR: char = '\x03';

/// 逻辑按键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    Char(char),
    Up,
    Down,
    Left,
    Right,
}

impl KeyEvent {
    /// 终端中断字符（Ctrl+C）
    pub fn is_interrupt(self) -> bool {
        self == KeyEvent::Char(INTERRUPT_CHAR)
    }
}

/// 按键读取错误
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Terminal IO error: {0}")]
    Io(#[from] io::Error),

    /// 输入已关闭
    #[error("Key input closed")]
    Eof,

    /// 读取被取消（外部中断信号）
    #[error("Key read interrupted")]
    Interrupted,
}

#[cfg(unix)]
impl From<nix::errno::Errno> for KeyError {
    fn from(errno: nix::errno::Errno) -> Self {
        KeyError::Io(io::Error::from(errno))
    }
}

/// 原始字节来源
pub trait ByteSource {
    /// 读取一个字节
    ///
    /// - `timeout = None`：阻塞直到有字节
    /// - `timeout = Some(t)`：`t` 内无字节返回 `Ok(None)`
    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>, KeyError>;
}

/// 逻辑按键来源
pub trait KeySource {
    /// 阻塞读取一个完整按键
    fn read_key(&mut self) -> Result<KeyEvent, KeyError>;
}

/// 从字节来源解码一个按键
pub fn decode_key<S: ByteSource + ?Sized>(
    source: &mut S,
    escape_timeout: Duration,
) -> Result<KeyEvent, KeyError> {
    let first = loop {
        if let Some(byte) = source.read_byte(None)? {
            break byte;
        }
    };

    match first {
        ESC => decode_escape(source, escape_timeout),
        byte if byte < 0x80 => Ok(KeyEvent::Char(byte as char)),
        lead => decode_utf8(source, lead, escape_timeout),
    }
}

fn decode_escape<S: ByteSource + ?Sized>(
    source: &mut S,
    timeout: Duration,
) -> Result<KeyEvent, KeyError> {
    let plain = KeyEvent::Char(ESC as char);

    if source.read_byte(Some(timeout))? != Some(b'[') {
        return Ok(plain);
    }
    let key = match source.read_byte(Some(timeout))? {
        Some(b'A') => KeyEvent::Up,
        Some(b'B') => KeyEvent::Down,
        Some(b'C') => KeyEvent::Right,
        Some(b'D') => KeyEvent::Left,
        _ => plain,
    };
    Ok(key)
}

fn decode_utf8<S: ByteSource + ?Sized>(
    source: &mut S,
    lead: u8,
    timeout: Duration,
) -> Result<KeyEvent, KeyError> {
    let width = match lead {
        b if b & 0xE0 == 0xC0 => 2,
        b if b & 0xF0 == 0xE0 => 3,
        b if b & 0xF8 == 0xF0 => 4,
        _ => return Ok(KeyEvent::Char(char::REPLACEMENT_CHARACTER)),
    };

    let mut buf = [lead, 0, 0, 0];
    for slot in buf.iter_mut().take(width).skip(1) {
        match source.read_byte(Some(timeout))? {
            Some(byte) => *slot = byte,
            None => return Ok(KeyEvent::Char(char::REPLACEMENT_CHARACTER)),
        }
    }

    let ch = std::str::from_utf8(&buf[..width])
        .ok()
        .and_then(|s| s.chars().next())
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    Ok(KeyEvent::Char(ch))
}

/// 基于任意 [`ByteSource`] 的按键解码器
#[derive(Debug)]
pub struct KeyDecoder<S> {
    source: S,
    escape_timeout: Duration,
}

impl<S: ByteSource> KeyDecoder<S> {
    pub fn new(source: S, escape_timeout: Duration) -> Self {
        Self {
            source,
            escape_timeout,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: ByteSource> KeySource for KeyDecoder<S> {
    fn read_key(&mut self) -> Result<KeyEvent, KeyError> {
        decode_key(&mut self.source, self.escape_timeout)
    }
}

/// 预设字节序列
///
/// 耗尽后：带超时的读取返回 `Ok(None)`，阻塞读取返回 [`KeyError::Eof`]。
#[derive(Debug, Clone, Default)]
pub struct ScriptedBytes {
    bytes: VecDeque<u8>,
}

impl ScriptedBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into().into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

impl ByteSource for ScriptedBytes {
    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>, KeyError> {
        match (self.bytes.pop_front(), timeout) {
            (Some(byte), _) => Ok(Some(byte)),
            (None, Some(_)) => Ok(None),
            (None, None) => Err(KeyError::Eof),
        }
    }
}

/// 预设按键序列，耗尽后返回 [`KeyError::Eof`]
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<KeyEvent>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = KeyEvent>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// 每个字符一个按键
    pub fn from_chars(chars: &str) -> Self {
        Self::new(chars.chars().map(KeyEvent::Char))
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl KeySource for ScriptedKeys {
    fn read_key(&mut self) -> Result<KeyEvent, KeyError> {
        self.keys.pop_front().ok_or(KeyError::Eof)
    }
}
