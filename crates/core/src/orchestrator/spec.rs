//! Provider 规格
//!
//! 描述一条 (provider, model, api_key, solution) 凭证组合。
//! 构造后不可变，由所属的优先级池持有。

use crate::errors::ValidationError;
use crate::fingerprint::key_fingerprint;
use serde_json::Value;

/// Provider 规格
///
/// `solution` 是适配器私有的嵌套配置，核心只透传、不解释
/// （家族分类只读取其中的 `metadata.{plan|tier|latency_tier}`）。
#[derive(Clone, PartialEq)]
pub struct ProviderSpec {
    provider: String,
    model: String,
    api_key: String,
    solution: Value,
}

impl ProviderSpec {
    /// 创建规格
    ///
    /// provider / model / api_key 去除首尾空白后必须非空，
    /// solution 必须是 JSON 对象。
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        solution: Value,
    ) -> Result<Self, ValidationError> {
        let provider = non_empty("provider", provider.into())?;
        let model = non_empty("model", model.into())?;
        let api_key = non_empty("api_key", api_key.into())?;
        if !solution.is_object() {
            return Err(ValidationError::new("solution", "必须是对象"));
        }
        Ok(Self {
            provider,
            model,
            api_key,
            solution,
        })
    }

    /// 从 JSON 对象构造
    ///
    /// 校验 provider / model / api_key / solution 四个字段是否存在且合法，
    /// 出错时指明字段名。
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ValidationError::new("spec", "必须是对象"))?;

        let string_field = |name: &str| -> Result<&str, ValidationError> {
            obj.get(name)
                .ok_or_else(|| ValidationError::new(name, "字段缺失"))?
                .as_str()
                .ok_or_else(|| ValidationError::new(name, "必须是字符串"))
        };

        let provider = string_field("provider")?;
        let model = string_field("model")?;
        let api_key = string_field("api_key")?;
        let solution = obj
            .get("solution")
            .ok_or_else(|| ValidationError::new("solution", "字段缺失"))?;

        Self::new(provider, model, api_key, solution.clone())
    }

    /// `from_value` 的逆投影，往返稳定
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "provider": self.provider,
            "model": self.model,
            "api_key": self.api_key,
            "solution": self.solution,
        })
    }

    /// Provider 名称
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// 模型名称
    pub fn model(&self) -> &str {
        &self.model
    }

    /// API 密钥（密文，禁止写入日志）
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// 适配器私有配置
    pub fn solution(&self) -> &Value {
        &self.solution
    }

    /// 读取 solution.metadata 下的字符串字段
    pub fn solution_metadata_str(&self, key: &str) -> Option<&str> {
        self.solution.get("metadata")?.get(key)?.as_str()
    }
}

impl std::fmt::Debug for ProviderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field(
                "api_key",
                &format_args!("[指纹 {}]", key_fingerprint(&self.api_key)),
            )
            .field("solution", &self.solution)
            .finish()
    }
}

fn non_empty(field: &str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "不能为空"));
    }
    Ok(trimmed.to_string())
}
