//! # SO-ARM CLI
//!
//! Keyboard teleoperation for SO-ARM robot arms.
//!
//! ```bash
//! # 配置默认串口和机械臂标识
//! soarm-cli config set --port /dev/ttyACM0 --id sodapop
//!
//! # 键盘遥操作（退出时自动收起并断开）
//! soarm-cli teleop
//!
//! # 无硬件演练
//! soarm-cli teleop --dry-run
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod validation;

use commands::config::{CliConfig, default_config_file};
use commands::{ConfigCommand, TeleopCommand};

/// 默认日志过滤（可用 RUST_LOG 覆盖）
const DEFAULT_LOG_FILTER: &str = "warn,soarm_cli=info,soarm_teleop=info,soarm_driver=info";

/// SO-ARM CLI - 机械臂键盘遥操作工具
#[derive(Parser, Debug)]
#[command(name = "soarm-cli")]
#[command(about = "Keyboard teleoperation for SO-ARM robot arms", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 ~/.config/soarm/config.toml）
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 键盘遥操作
    Teleop {
        #[command(flatten)]
        args: TeleopCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 列出可用串口
    Ports,
}

fn main() -> Result<()> {
    // 日志输出到 stderr，stdout 留给帮助文本和位置回显
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_file()?,
    };

    match cli.command {
        Commands::Teleop { args } => {
            let config = CliConfig::load(&config_path)?;
            args.execute(&config)
        },
        Commands::Config(cmd) => cmd.execute(&config_path),
        Commands::Ports => commands::ports::execute(),
    }
}
