//! 统一响应模型
//!
//! 所有 adapter 必须产出的归一化检索载荷。
//! 归一化只在构造边界执行一次，读取时不再校验。

use crate::errors::ValidationError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// 检索文本块
///
/// `text` 构造后保证非空且已去除首尾空白。
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    document_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

impl Chunk {
    /// 创建只含文本的块
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new("text", "文本不能为空"));
        }
        Ok(Self {
            text: trimmed.to_string(),
            score: None,
            document_id: None,
            document_name: None,
            metadata: None,
        })
    }

    /// 设置相关性得分
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// 设置文档 ID（去除空白，空串丢弃）
    pub fn with_document_id(mut self, document_id: &str) -> Self {
        let trimmed = document_id.trim();
        self.document_id = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// 设置文档名称（去除空白，空串丢弃）
    pub fn with_document_name(mut self, document_name: &str) -> Self {
        let trimmed = document_name.trim();
        self.document_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// 设置元数据（原样透传）
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// 从松散类型的 JSON 对象归一化一个块
    ///
    /// `index` 用于错误定位（`chunks[i].field`）。score 若存在必须是
    /// 数字并转为 f64；document_id / document_name 若存在必须是字符串，
    /// 去除空白后为空则丢弃；metadata 若存在必须是对象。
    pub fn from_value(index: usize, value: &Value) -> Result<Self, ValidationError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ValidationError::new(format!("chunks[{index}]"), "必须是对象"))?;

        let text = obj
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ValidationError::new(format!("chunks[{index}].text"), "必须是字符串"))?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::new(
                format!("chunks[{index}].text"),
                "文本不能为空",
            ));
        }

        let score = match obj.get("score") {
            None | Some(Value::Null) => None,
            Some(v) => Some(v.as_f64().ok_or_else(|| {
                ValidationError::new(format!("chunks[{index}].score"), "必须是数字")
            })?),
        };

        let document_id = optional_string(obj, "document_id", index)?;
        let document_name = optional_string(obj, "document_name", index)?;

        let metadata = match obj.get("metadata") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map.clone()),
            Some(_) => {
                return Err(ValidationError::new(
                    format!("chunks[{index}].metadata"),
                    "必须是对象",
                ))
            }
        };

        Ok(Self {
            text: trimmed.to_string(),
            score,
            document_id,
            document_name,
            metadata,
        })
    }

    /// 块文本
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 相关性得分
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// 文档 ID
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// 文档名称
    pub fn document_name(&self) -> Option<&str> {
        self.document_name.as_deref()
    }

    /// 元数据
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    key: &str,
    index: usize,
) -> Result<Option<String>, ValidationError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(_) => Err(ValidationError::new(
            format!("chunks[{index}].{key}"),
            "必须是字符串",
        )),
    }
}

/// 统一检索响应
#[derive(Debug, Clone, Serialize)]
pub struct UnifiedResponse {
    provider: String,
    model: String,
    chunks: Vec<Chunk>,
    provider_metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cost: Option<Map<String, Value>>,
    #[serde(skip)]
    chunk_texts: OnceLock<Vec<String>>,
}

impl UnifiedResponse {
    /// 创建响应
    pub fn new(provider: impl Into<String>, model: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            chunks,
            provider_metadata: Map::new(),
            usage: None,
            cost: None,
            chunk_texts: OnceLock::new(),
        }
    }

    /// 从松散类型的 JSON 块列表归一化构造
    pub fn from_values(
        provider: impl Into<String>,
        model: impl Into<String>,
        chunk_values: &[Value],
    ) -> Result<Self, ValidationError> {
        let chunks = chunk_values
            .iter()
            .enumerate()
            .map(|(i, v)| Chunk::from_value(i, v))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(provider, model, chunks))
    }

    /// 便捷构造，等价于 `new`
    pub fn from_chunks(
        provider: impl Into<String>,
        model: impl Into<String>,
        chunks: Vec<Chunk>,
    ) -> Self {
        Self::new(provider, model, chunks)
    }

    /// 设置 provider 元数据
    pub fn with_provider_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.provider_metadata = metadata;
        self
    }

    /// 设置用量信息
    pub fn with_usage(mut self, usage: Map<String, Value>) -> Self {
        self.usage = Some(usage);
        self
    }

    /// 设置成本信息
    pub fn with_cost(mut self, cost: Map<String, Value>) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Provider 名称
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// 模型名称
    pub fn model(&self) -> &str {
        &self.model
    }

    /// 块列表
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Provider 元数据
    pub fn provider_metadata(&self) -> &Map<String, Value> {
        &self.provider_metadata
    }

    /// 用量信息
    pub fn usage(&self) -> Option<&Map<String, Value>> {
        self.usage.as_ref()
    }

    /// 成本信息
    pub fn cost(&self) -> Option<&Map<String, Value>> {
        self.cost.as_ref()
    }

    /// 所有块文本的投影（响应生命周期内只计算一次）
    pub fn chunk_texts(&self) -> &[String] {
        self.chunk_texts
            .get_or_init(|| self.chunks.iter().map(|c| c.text.clone()).collect())
    }

    /// 块数量
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// 是否没有任何块
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_whitespace_only_text_rejected() {
        let err = UnifiedResponse::from_values("ragie", "default", &[json!({"text": "  \n "})])
            .unwrap_err();
        assert_eq!(err.field, "chunks[0].text");
    }

    #[test]
    fn test_text_only_chunk_accepted() {
        let resp =
            UnifiedResponse::from_values("ragie", "default", &[json!({"text": "hello"})]).unwrap();
        assert_eq!(resp.len(), 1);
        assert_eq!(resp.chunks()[0].text(), "hello");
        assert!(resp.chunks()[0].score().is_none());
    }

    #[test]
    fn test_text_is_trimmed() {
        let resp =
            UnifiedResponse::from_values("ragie", "default", &[json!({"text": "  hi  "})]).unwrap();
        assert_eq!(resp.chunks()[0].text(), "hi");
    }

    #[test]
    fn test_integer_score_coerced_to_float() {
        let resp = UnifiedResponse::from_values("ragie", "default", &[json!({"text": "a", "score": 1})])
            .unwrap();
        assert_eq!(resp.chunks()[0].score(), Some(1.0));
    }

    #[test]
    fn test_non_numeric_score_rejected_with_index() {
        let err = UnifiedResponse::from_values(
            "ragie",
            "default",
            &[json!({"text": "a"}), json!({"text": "b", "score": "high"})],
        )
        .unwrap_err();
        assert_eq!(err.field, "chunks[1].score");
    }

    #[test]
    fn test_empty_document_id_dropped_after_trim() {
        let resp = UnifiedResponse::from_values(
            "ragie",
            "default",
            &[json!({"text": "a", "document_id": "  ", "document_name": " doc "})],
        )
        .unwrap();
        assert!(resp.chunks()[0].document_id().is_none());
        assert_eq!(resp.chunks()[0].document_name(), Some("doc"));
    }

    #[test]
    fn test_metadata_passed_through_verbatim() {
        let resp = UnifiedResponse::from_values(
            "ragie",
            "default",
            &[json!({"text": "a", "metadata": {"origin": "ragie", "nested": {"k": 1}}})],
        )
        .unwrap();
        let metadata = resp.chunks()[0].metadata().unwrap();
        assert_eq!(metadata["nested"]["k"], 1);
    }

    #[test]
    fn test_non_object_metadata_rejected() {
        let err = UnifiedResponse::from_values(
            "ragie",
            "default",
            &[json!({"text": "a", "metadata": [1, 2]})],
        )
        .unwrap_err();
        assert_eq!(err.field, "chunks[0].metadata");
    }

    #[test]
    fn test_chunk_texts_projection_is_stable() {
        let resp = UnifiedResponse::from_values(
            "ragie",
            "default",
            &[json!({"text": "a"}), json!({"text": "b"})],
        )
        .unwrap();

        let first = resp.chunk_texts().as_ptr();
        assert_eq!(resp.chunk_texts().to_vec(), vec!["a", "b"]);
        assert_eq!(resp.chunk_texts().as_ptr(), first);
    }

    #[test]
    fn test_is_empty_iff_zero_chunks() {
        let empty = UnifiedResponse::new("ragie", "default", vec![]);
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);

        let chunk = Chunk::new("x").unwrap();
        let nonempty = UnifiedResponse::from_chunks("ragie", "default", vec![chunk]);
        assert!(!nonempty.is_empty());
    }

    #[test]
    fn test_builders() {
        let chunk = Chunk::new("body")
            .unwrap()
            .with_score(0.9)
            .with_document_id(" doc-1 ")
            .with_document_name("");
        assert_eq!(chunk.document_id(), Some("doc-1"));
        assert!(chunk.document_name().is_none());

        let mut usage = Map::new();
        usage.insert("tokens".into(), json!(42));
        let resp =
            UnifiedResponse::from_chunks("ragie", "default", vec![chunk]).with_usage(usage);
        assert_eq!(resp.usage().unwrap()["tokens"], 42);
    }
}
