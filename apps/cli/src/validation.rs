//! 输入验证模块

use anyhow::{Context, Result};
use std::path::Path;

/// 文件路径验证器
#[derive(Debug, Clone, Copy, Default)]
pub struct PathValidator {
    /// 是否检查文件存在
    check_exists: bool,
    /// 是否要求文件可读
    check_readable: bool,
}

impl PathValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 要求文件存在
    pub fn must_exist(mut self) -> Self {
        self.check_exists = true;
        self
    }

    /// 要求文件可读
    pub fn must_be_readable(mut self) -> Self {
        self.check_readable = true;
        self
    }

    /// 验证路径
    pub fn validate(&self, what: &str, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            anyhow::bail!("{what} path is empty");
        }

        if (self.check_exists || self.check_readable) && !path.exists() {
            anyhow::bail!("{what} does not exist: {}", path.display());
        }

        if self.check_readable {
            std::fs::File::open(path)
                .with_context(|| format!("Cannot read {what}: {}", path.display()))?;
        }

        Ok(())
    }
}

/// 机械臂标识（用作标定文件名）
pub fn validate_robot_id(id: &str) -> Result<()> {
    if id.is_empty() {
        anyhow::bail!("Robot id is empty");
    }
    if id.contains(['/', '\\']) || id == "." || id == ".." {
        anyhow::bail!("Robot id must be a plain name, got {id:?}");
    }
    Ok(())
}
