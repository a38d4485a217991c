//! 优先级池
//!
//! 有序的"池的序列"，每个池是一组可互换的 ProviderSpec。
//! 优先级即数组下标（0 最先尝试）。启动时由配置构建，此后只读。

use super::spec::ProviderSpec;
use crate::errors::ValidationError;
use serde_json::Value;

/// 优先级池
#[derive(Debug, Clone, Default)]
pub struct PriorityPool {
    pools: Vec<Vec<ProviderSpec>>,
}

impl PriorityPool {
    /// 从已校验的规格构建
    pub fn new(pools: Vec<Vec<ProviderSpec>>) -> Self {
        Self { pools }
    }

    /// 从嵌套 JSON 列表构建
    ///
    /// 每个池必须是数组，每个元素必须是合法的规格对象；
    /// 出错时 `ValidationError` 指明池下标和元素下标。空池合法。
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let outer = value
            .as_array()
            .ok_or_else(|| ValidationError::new("pools", "必须是数组"))?;

        let mut pools = Vec::with_capacity(outer.len());
        for (p, pool_value) in outer.iter().enumerate() {
            let entries = pool_value
                .as_array()
                .ok_or_else(|| ValidationError::new(format!("pools[{p}]"), "必须是数组"))?;

            let mut pool = Vec::with_capacity(entries.len());
            for (i, entry) in entries.iter().enumerate() {
                let spec = ProviderSpec::from_value(entry).map_err(|e| {
                    ValidationError::new(format!("pools[{p}][{i}].{}", e.field), e.message)
                })?;
                pool.push(spec);
            }
            pools.push(pool);
        }

        Ok(Self::new(pools))
    }

    /// 获取指定优先级的池，越界返回空切片
    pub fn get_pool(&self, priority: usize) -> &[ProviderSpec] {
        self.pools.get(priority).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 池数量
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// 所有池中的规格总数
    pub fn total_specs(&self) -> usize {
        self.pools.iter().map(Vec::len).sum()
    }

    /// 是否没有任何规格
    pub fn is_empty(&self) -> bool {
        self.pools.iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec_value(key: &str) -> Value {
        json!({"provider": "openai", "model": "gpt-4o", "api_key": key, "solution": {}})
    }

    #[test]
    fn test_out_of_range_returns_empty_slice() {
        let pool = PriorityPool::new(vec![vec![]]);
        assert!(pool.get_pool(7).is_empty());
    }

    #[test]
    fn test_from_value_builds_ordered_pools() {
        let value = json!([[spec_value("k1"), spec_value("k2")], [spec_value("k3")]]);
        let pool = PriorityPool::from_value(&value).unwrap();

        assert_eq!(pool.pool_count(), 2);
        assert_eq!(pool.total_specs(), 3);
        assert_eq!(pool.get_pool(0).len(), 2);
        assert_eq!(pool.get_pool(1)[0].api_key(), "k3");
    }

    #[test]
    fn test_empty_pools_are_legal() {
        let pool = PriorityPool::from_value(&json!([[], [spec_value("k1")]])).unwrap();
        assert_eq!(pool.pool_count(), 2);
        assert!(!pool.is_empty());
    }

    #[test]
    fn test_invalid_entry_names_pool_and_index() {
        let value = json!([[spec_value("k1")], [{"provider": "x", "model": "y", "solution": {}}]]);
        let err = PriorityPool::from_value(&value).unwrap_err();
        assert_eq!(err.field, "pools[1][0].api_key");
    }

    #[test]
    fn test_non_array_pool_rejected() {
        let err = PriorityPool::from_value(&json!([42])).unwrap_err();
        assert_eq!(err.field, "pools[0]");
    }
}
