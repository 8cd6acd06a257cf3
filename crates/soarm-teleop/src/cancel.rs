//! 取消标志
//!
//! 信号处理函数只做一次原子写入；控制循环和终端读取在阻塞片之间检查该标志。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 跨线程共享的取消标志
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求终止（可在信号处理线程中调用）
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
