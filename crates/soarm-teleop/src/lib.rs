//! # SO-ARM Teleop
//!
//! 键盘遥操作核心：按键解码 → 位置状态 → 固定周期下发 → 安全关机。
//!
//! ```rust,no_run
//! # #[cfg(unix)]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use soarm_driver::DryRunDriver;
//! use soarm_teleop::{CancelToken, Session, TeleopConfig, TerminalKeys};
//!
//! let config = TeleopConfig::default();
//! let cancel = CancelToken::new();
//! let mut keys = TerminalKeys::open(cancel.clone(), config.escape_timeout())?;
//!
//! let session = Session::new(DryRunDriver::connect(), config, cancel)?;
//! let outcome = session.run(&mut keys);
//! println!("{} ticks", outcome.ticks);
//! # Ok(())
//! # }
//! # #[cfg(not(unix))]
//! # fn main() {}
//! ```

mod cancel;
mod config;
mod error;
pub mod key;
pub mod position;
mod session;
pub mod shutdown;
#[cfg(unix)]
pub mod terminal;

pub use cancel::CancelToken;
pub use config::TeleopConfig;
pub use error::TeleopError;
pub use key::{ByteSource, KeyDecoder, KeyError, KeyEvent, KeySource, ScriptedBytes, ScriptedKeys};
pub use position::{Command, Direction, PositionRules, Presets};
pub use session::{LoopState, Session, SessionOutcome, TerminationReason};
pub use shutdown::{ShutdownReport, ShutdownSequencer};
#[cfg(unix)]
pub use terminal::{RawModeGuard, TerminalKeys};
