//! 日志接收器
//!
//! 回退引擎的结构化失败事件通过可插拔的接收器输出，默认写标准错误流。
//! 所有内置实现在写出前都会经过凭证清理。

use crate::sanitizer::sanitize;
use std::sync::Mutex;

/// 日志接收器
///
/// `log` 只追加、不返回错误，实现必须可重复调用。
pub trait LogSink: Send + Sync {
    /// 写入一条消息
    fn log(&self, message: &str);
}

/// 标准错误流接收器（默认）
#[derive(Debug, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn log(&self, message: &str) {
        eprintln!("{}", sanitize(message));
    }
}

/// tracing 桥接接收器
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        tracing::warn!(target: "ragcast::fallback", "{}", sanitize(message));
    }
}

/// 内存接收器
///
/// 保留全部消息，供测试和界面日志视图读取。
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<String>>,
}

impl MemorySink {
    /// 创建空的内存接收器
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取已写入的全部消息
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(sanitize(message));
        }
    }
}
