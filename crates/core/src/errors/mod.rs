//! 错误类型模块
//!
//! 定义路由核心的四类错误语义。
//!
//! ## 模块结构
//! - `route_error`: 路由错误（ValidationError, EmptyPoolError, OperationError, AllPoolsExhaustedError）

pub mod route_error;

pub use route_error::{AllPoolsExhaustedError, EmptyPoolError, OperationError, ValidationError};
