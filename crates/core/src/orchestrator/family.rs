//! 池家族与重试预算
//!
//! 家族是按池计算的派生分类，驱动重试预算策略。
//! 每次执行时从池的第一个规格重新计算，不落盘。

use super::spec::ProviderSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 池家族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolFamily {
    /// 免费档：预算不限（= 池大小）
    Free,
    /// 托管档：只试一个
    Hosted,
    /// 混合档：最多试两个
    Hybrid,
    /// 未分类：预算不限
    Default,
}

impl PoolFamily {
    /// 从池的第一个规格分类
    ///
    /// 依次读取 solution.metadata 的 plan / tier / latency_tier（取第一个
    /// 存在的字段），按固定归一化表映射；没有任何字段时归入 Default。
    pub fn classify(pool: &[ProviderSpec]) -> Self {
        let Some(first) = pool.first() else {
            return PoolFamily::Default;
        };

        let token = ["plan", "tier", "latency_tier"]
            .iter()
            .find_map(|key| first.solution_metadata_str(key));

        match token {
            None => PoolFamily::Default,
            Some(token) => match token.trim().to_lowercase().as_str() {
                "free-tier" | "freemium" | "starter" => PoolFamily::Free,
                "hosted" | "managed" => PoolFamily::Hosted,
                _ => PoolFamily::Hybrid,
            },
        }
    }

    /// 从字符串解析（配置覆盖用）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(PoolFamily::Free),
            "hosted" => Some(PoolFamily::Hosted),
            "hybrid" => Some(PoolFamily::Hybrid),
            "default" => Some(PoolFamily::Default),
            _ => None,
        }
    }

    /// 家族名称
    pub fn name(&self) -> &'static str {
        match self {
            PoolFamily::Free => "free",
            PoolFamily::Hosted => "hosted",
            PoolFamily::Hybrid => "hybrid",
            PoolFamily::Default => "default",
        }
    }
}

impl std::fmt::Display for PoolFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 家族重试预算
///
/// `max_attempts = None` 表示不限（解析为池大小）。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FamilyPolicy {
    /// 最大尝试次数
    pub max_attempts: Option<u32>,
}

/// 家族预算表
#[derive(Debug, Clone)]
pub struct RetryPolicyTable {
    policies: HashMap<PoolFamily, FamilyPolicy>,
}

impl RetryPolicyTable {
    /// 默认预算：free 不限、hybrid 2、hosted 1、default 不限
    pub fn defaults() -> Self {
        let mut policies = HashMap::new();
        policies.insert(PoolFamily::Free, FamilyPolicy { max_attempts: None });
        policies.insert(
            PoolFamily::Hybrid,
            FamilyPolicy {
                max_attempts: Some(2),
            },
        );
        policies.insert(
            PoolFamily::Hosted,
            FamilyPolicy {
                max_attempts: Some(1),
            },
        );
        policies.insert(PoolFamily::Default, FamilyPolicy { max_attempts: None });
        Self { policies }
    }

    /// 在默认预算之上应用调用方覆盖
    pub fn with_overrides(overrides: HashMap<PoolFamily, FamilyPolicy>) -> Self {
        let mut table = Self::defaults();
        table.policies.extend(overrides);
        table
    }

    /// 解析某家族对给定池大小的实际尝试上限
    ///
    /// 0 表示整个池跳过；非零值被夹到 [1, 池大小]。
    pub fn resolve(&self, family: PoolFamily, pool_size: usize) -> usize {
        let policy = self
            .policies
            .get(&family)
            .copied()
            .unwrap_or(FamilyPolicy { max_attempts: None });

        match policy.max_attempts {
            None => pool_size,
            Some(0) => 0,
            Some(n) => {
                if pool_size == 0 {
                    0
                } else {
                    (n as usize).clamp(1, pool_size)
                }
            }
        }
    }
}

impl Default for RetryPolicyTable {
    fn default() -> Self {
        Self::defaults()
    }
}
