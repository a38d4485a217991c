//! 凭证编排模块
//!
//! 提供优先级池、密钥轮换与回退执行的路由核心。
//!
//! ## 模块结构
//!
//! - `spec` - Provider 规格
//! - `pool` - 优先级池
//! - `family` - 池家族与重试预算
//! - `rotation` - 密钥轮换选择器
//! - `fallback` - 回退执行引擎

mod fallback;
mod family;
mod pool;
mod rotation;
mod spec;

pub use fallback::{FallbackStrategy, OperationFn, ProviderOperation};
pub use family::{FamilyPolicy, PoolFamily, RetryPolicyTable};
pub use pool::PriorityPool;
pub use rotation::{Clock, KeyRotator};
pub use spec::ProviderSpec;
