//! 路由配置加载
//!
//! 解析 YAML 路由配置：嵌套的池列表（字面规格或目录引用）和家族预算
//! 覆盖。目录本身的发现与加载由宿主负责，这里只做引用解析。

use ragcast_core::errors::ValidationError;
use ragcast_core::orchestrator::{
    FamilyPolicy, PoolFamily, PriorityPool, ProviderSpec, RetryPolicyTable,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML 解析失败: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("未知家族: {0}")]
    UnknownFamily(String),

    #[error("目录中不存在引用: {0}")]
    UnresolvedRef(String),
}

/// 池条目：目录引用或字面规格
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PoolEntry {
    /// 目录引用
    Ref {
        #[serde(rename = "ref")]
        name: String,
    },
    /// 字面规格
    Literal {
        provider: String,
        model: String,
        api_key: String,
        #[serde(default = "default_solution")]
        solution: Value,
    },
}

fn default_solution() -> Value {
    Value::Object(serde_json::Map::new())
}

/// 家族预算覆盖
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FamilyPolicyOverride {
    /// 最大尝试次数（null 表示不限）
    pub max_attempts: Option<u32>,
}

/// 路由配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteConfig {
    /// 优先级池（外层按优先级有序，内层同优先级可互换）
    #[serde(default)]
    pub pools: Vec<Vec<PoolEntry>>,
    /// 家族预算覆盖，键为家族名
    #[serde(default)]
    pub families: HashMap<String, FamilyPolicyOverride>,
}

impl RouteConfig {
    /// 从 YAML 文本解析
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// 从文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// 构建优先级池
    ///
    /// 目录引用通过 `catalog` 解析；字面规格校验失败时错误指明
    /// 池下标和元素下标。
    pub fn build_pool(
        &self,
        catalog: &HashMap<String, ProviderSpec>,
    ) -> Result<PriorityPool, ConfigError> {
        let mut pools = Vec::with_capacity(self.pools.len());
        for (p, entries) in self.pools.iter().enumerate() {
            let mut pool = Vec::with_capacity(entries.len());
            for (i, entry) in entries.iter().enumerate() {
                let spec = match entry {
                    PoolEntry::Ref { name } => catalog
                        .get(name)
                        .cloned()
                        .ok_or_else(|| ConfigError::UnresolvedRef(name.clone()))?,
                    PoolEntry::Literal {
                        provider,
                        model,
                        api_key,
                        solution,
                    } => ProviderSpec::new(
                        provider.clone(),
                        model.clone(),
                        api_key.clone(),
                        solution.clone(),
                    )
                    .map_err(|e| {
                        ValidationError::new(format!("pools[{p}][{i}].{}", e.field), e.message)
                    })?,
                };
                pool.push(spec);
            }
            pools.push(pool);
        }
        Ok(PriorityPool::new(pools))
    }

    /// 构建家族预算表（默认值之上应用覆盖）
    pub fn retry_policies(&self) -> Result<RetryPolicyTable, ConfigError> {
        let mut overrides = HashMap::new();
        for (name, policy) in &self.families {
            let family = PoolFamily::from_str(name)
                .ok_or_else(|| ConfigError::UnknownFamily(name.clone()))?;
            overrides.insert(
                family,
                FamilyPolicy {
                    max_attempts: policy.max_attempts,
                },
            );
        }
        Ok(RetryPolicyTable::with_overrides(overrides))
    }
}
