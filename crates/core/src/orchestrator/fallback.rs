//! 回退执行引擎
//!
//! 按优先级遍历凭证池，在池内从轮换器选出的起始下标开始重试调用方
//! 注入的操作，任一次成功立即短路返回；全部耗尽时聚合为一个终态错误。
//!
//! 引擎不持有跨调用状态，可重入；失败事件以 JSON 行写入注入的日志
//! 接收器，只携带密钥指纹，不携带原始密钥。

use super::family::{PoolFamily, RetryPolicyTable};
use super::pool::PriorityPool;
use super::rotation::KeyRotator;
use super::spec::ProviderSpec;
use crate::errors::{AllPoolsExhaustedError, OperationError};
use crate::fingerprint::key_fingerprint;
use crate::logger::{LogSink, StderrSink};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// 单次尝试操作
///
/// 一次 `call` 对应对某个具体凭证的一次完整调用；
/// 超时与单次调用内部的重试由操作自身负责。
#[async_trait]
pub trait ProviderOperation: Send + Sync {
    /// 成功结果类型
    type Output: Send;

    /// 用给定规格执行一次操作
    async fn call(&self, spec: &ProviderSpec) -> Result<Self::Output, OperationError>;
}

/// 把异步闭包适配成操作
pub struct OperationFn<F>(pub F);

#[async_trait]
impl<F, Fut, T> ProviderOperation for OperationFn<F>
where
    F: Fn(ProviderSpec) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, OperationError>> + Send,
    T: Send,
{
    type Output = T;

    async fn call(&self, spec: &ProviderSpec) -> Result<T, OperationError> {
        (self.0)(spec.clone()).await
    }
}

/// 回退执行引擎
pub struct FallbackStrategy {
    pool: PriorityPool,
    rotator: KeyRotator,
    policies: RetryPolicyTable,
    sink: Arc<dyn LogSink>,
}

impl FallbackStrategy {
    /// 创建引擎，使用墙钟轮换器、默认预算表和标准错误流接收器
    pub fn new(pool: PriorityPool) -> Self {
        Self {
            pool,
            rotator: KeyRotator::new(),
            policies: RetryPolicyTable::defaults(),
            sink: Arc::new(StderrSink),
        }
    }

    /// 设置轮换器
    pub fn with_rotator(mut self, rotator: KeyRotator) -> Self {
        self.rotator = rotator;
        self
    }

    /// 设置预算表
    pub fn with_policies(mut self, policies: RetryPolicyTable) -> Self {
        self.policies = policies;
        self
    }

    /// 设置日志接收器
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// 执行操作
    ///
    /// 池按优先级升序尝试：空池和预算为 0 的家族直接跳过；池内从
    /// 轮换器选出的起始下标开始，失败则环形推进到下一个规格，直到
    /// 该池预算耗尽再进入下一个池。任一次成功立即返回，之后的池不再
    /// 尝试；全部耗尽时返回包裹最后一次失败原因的聚合错误。
    pub async fn execute<O: ProviderOperation>(
        &self,
        operation: &O,
    ) -> Result<O::Output, AllPoolsExhaustedError> {
        let mut last_error: Option<OperationError> = None;
        let mut total_failures: u32 = 0;

        for priority in 0..self.pool.pool_count() {
            let pool = self.pool.get_pool(priority);
            if pool.is_empty() {
                continue;
            }

            let family = PoolFamily::classify(pool);
            let max_attempts = self.policies.resolve(family, pool.len());
            if max_attempts == 0 {
                tracing::debug!("池 {priority} 家族 {family} 预算为 0，跳过");
                continue;
            }

            let Ok((start, _)) = self.rotator.select_spec(pool) else {
                continue;
            };

            let mut index = start;
            let mut tried_fingerprints = Vec::with_capacity(max_attempts);

            for attempt in 1..=max_attempts {
                let spec = &pool[index];
                match operation.call(spec).await {
                    Ok(output) => {
                        tracing::debug!(
                            "池 {priority} 第 {attempt} 次尝试成功: {} / {}",
                            spec.provider(),
                            spec.model()
                        );
                        return Ok(output);
                    }
                    Err(err) => {
                        total_failures += 1;
                        let fingerprint = key_fingerprint(spec.api_key());
                        self.sink.log(
                            &serde_json::json!({
                                "event": "attempt_failed",
                                "pool": priority,
                                "family": family.name(),
                                "provider": spec.provider(),
                                "model": spec.model(),
                                "key_fingerprint": fingerprint.as_str(),
                                "attempt": attempt,
                                "max_attempts": max_attempts,
                                "message": err.to_string(),
                            })
                            .to_string(),
                        );
                        tried_fingerprints.push(fingerprint);
                        last_error = Some(err);
                        if attempt < max_attempts {
                            index = (index + 1) % pool.len();
                        }
                    }
                }
            }

            self.sink.log(
                &serde_json::json!({
                    "event": "pool_exhausted",
                    "pool": priority,
                    "family": family.name(),
                    "fingerprints": tried_fingerprints,
                    "max_attempts": max_attempts,
                })
                .to_string(),
            );
        }

        Err(AllPoolsExhaustedError {
            attempts: total_failures,
            last_error,
        })
    }
}
