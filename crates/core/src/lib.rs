//! 核心类型和工具模块
//!
//! 包含凭证编排（优先级池 / 轮换 / 回退）、统一响应模型、
//! 指纹与日志接收器等基础功能。

pub mod errors;
pub mod fingerprint;
pub mod logger;
pub mod orchestrator;
pub mod response;
pub mod sanitizer;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
