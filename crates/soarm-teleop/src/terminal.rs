//! 终端按键来源（Unix）
//!
//! 每次 [`KeySource::read_key`] 调用期间把 `/dev/tty` 切换到原始模式（无回显、无行缓冲），
//! 离开调用时由 [`RawModeGuard`] 恢复原模式，包括出错返回的路径。
//!
//! 阻塞读取按 [`POLL_SLICE`] 分片 `poll`，每片之间检查 [`CancelToken`]，
//! 因此外部中断信号可以打断读取并进入关机流程。

use crate::cancel::CancelToken;
use crate::key::{ByteSource, KeyError, KeyEvent, KeySource, decode_key};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use nix::sys::termios::{SetArg, Termios, cfmakeraw, tcgetattr, tcsetattr};
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// 控制终端设备
pub const TTY_PATH: &str = "/dev/tty";

/// 单次 poll 的最长等待
pub const POLL_SLICE: Duration = Duration::from_millis(100);

/// 原始模式守卫
///
/// 创建时保存当前终端属性并切换到原始模式，Drop 时恢复。
pub struct RawModeGuard<'fd> {
    fd: BorrowedFd<'fd>,
    original: Termios,
}

impl<'fd> RawModeGuard<'fd> {
    pub fn enter(fd: BorrowedFd<'fd>) -> Result<Self, KeyError> {
        let original = tcgetattr(fd)?;
        let mut raw = original.clone();
        cfmakeraw(&mut raw);
        tcsetattr(fd, SetArg::TCSADRAIN, &raw)?;
        Ok(Self { fd, original })
    }
}

impl Drop for RawModeGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = tcsetattr(self.fd, SetArg::TCSADRAIN, &self.original) {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// 可取消的 TTY 字节读取
struct TtyBytes<'a> {
    tty: &'a File,
    cancel: &'a CancelToken,
}

impl TtyBytes<'_> {
    /// 等待可读，`deadline = None` 表示无限等待
    fn wait_readable(&self, deadline: Option<Instant>) -> Result<bool, KeyError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(KeyError::Interrupted);
            }

            // 截止时间已到时仍以零超时 poll 一次，已缓冲的字节不会被漏掉
            let (slice, last) = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    (left.min(POLL_SLICE), left.is_zero())
                },
                None => (POLL_SLICE, false),
            };

            let timeout_ms = slice.as_millis().min(u128::from(u16::MAX)) as u16;
            let mut fds = [PollFd::new(self.tty.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, PollTimeout::from(timeout_ms)) {
                Ok(0) if last => return Ok(false),
                Ok(0) => continue,
                Ok(_) => return Ok(true),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl ByteSource for TtyBytes<'_> {
    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>, KeyError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        if !self.wait_readable(deadline)? {
            return Ok(None);
        }

        let mut buf = [0u8; 1];
        loop {
            match self.tty.read(&mut buf) {
                Ok(0) => return Err(KeyError::Eof),
                Ok(_) => {
                    trace!("tty byte 0x{:02X}", buf[0]);
                    return Ok(Some(buf[0]));
                },
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// 控制终端按键来源
pub struct TerminalKeys {
    tty: File,
    cancel: CancelToken,
    escape_timeout: Duration,
}

impl TerminalKeys {
    /// 打开控制终端
    pub fn open(cancel: CancelToken, escape_timeout: Duration) -> Result<Self, KeyError> {
        let tty = OpenOptions::new().read(true).write(true).open(TTY_PATH)?;
        Ok(Self::from_file(tty, cancel, escape_timeout))
    }

    /// 使用已打开的终端设备（如伪终端从端）
    pub fn from_file(tty: File, cancel: CancelToken, escape_timeout: Duration) -> Self {
        Self {
            tty,
            cancel,
            escape_timeout,
        }
    }
}

impl KeySource for TerminalKeys {
    fn read_key(&mut self) -> Result<KeyEvent, KeyError> {
        let _raw = RawModeGuard::enter(self.tty.as_fd())?;
        let mut bytes = TtyBytes {
            tty: &self.tty,
            cancel: &self.cancel,
        };
        decode_key(&mut bytes, self.escape_timeout)
    }
}
