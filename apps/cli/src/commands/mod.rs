//! 命令定义和实现

pub mod config;
pub mod ports;
pub mod teleop;

pub use config::ConfigCommand;
pub use teleop::TeleopCommand;
