//! 密钥轮换选择器
//!
//! 无状态的池内选择：按注入时钟对池大小取模得到起始下标。
//! 只负责挑选一个池的起始规格，池内的逐次轮换由回退引擎按下标推进。

use super::spec::ProviderSpec;
use crate::errors::EmptyPoolError;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// 时钟函数，返回秒级时间戳
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

/// 密钥轮换器
#[derive(Clone)]
pub struct KeyRotator {
    clock: Clock,
}

impl KeyRotator {
    /// 使用墙钟创建
    pub fn new() -> Self {
        Self::with_clock(Arc::new(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        }))
    }

    /// 使用自定义时钟创建（测试可控）
    pub fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    /// 选择起始规格，返回下标和规格
    ///
    /// 单元素池直接返回，不消耗时钟；多时间戳下选择近似均匀。
    pub fn select_spec<'a>(
        &self,
        pool: &'a [ProviderSpec],
    ) -> Result<(usize, &'a ProviderSpec), EmptyPoolError> {
        match pool.len() {
            0 => Err(EmptyPoolError),
            1 => Ok((0, &pool[0])),
            len => {
                let index = (self.clock)() as usize % len;
                Ok((index, &pool[index]))
            }
        }
    }

    /// 环形推进到下一个规格
    pub fn next_spec<'a>(
        &self,
        pool: &'a [ProviderSpec],
        current: usize,
    ) -> Result<(usize, &'a ProviderSpec), EmptyPoolError> {
        if pool.is_empty() {
            return Err(EmptyPoolError);
        }
        let index = (current + 1) % pool.len();
        Ok((index, &pool[index]))
    }
}

impl Default for KeyRotator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRotator").finish_non_exhaustive()
    }
}
