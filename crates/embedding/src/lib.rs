//! 向量嵌入服务
//!
//! OpenAI 兼容的 /v1/embeddings 客户端，用于混合检索的写入与查询向量化。
//! 整批文本放进单次请求，返回向量按响应 index 与输入对齐。

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 默认模型
const DEFAULT_MODEL: &str = "text-embedding-3-small";
/// 默认接口地址
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/embeddings";

/// 嵌入服务错误
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// HTTP 层失败（客户端构建、请求发送、读响应体）
    #[error("请求失败: {0}")]
    Http(#[from] reqwest::Error),
    /// 接口返回非 2xx
    #[error("API 错误: {status} - {body}")]
    Api { status: u16, body: String },
    /// 响应体解析失败
    #[error("JSON 解析失败: {0}")]
    Decode(#[from] serde_json::Error),
    /// 接口返回空数据
    #[error("API 返回数据为空")]
    EmptyData,
}

/// Embedding API 请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// 输入文本列表
    pub input: Vec<String>,
    /// 模型名称
    pub model: String,
}

/// Embedding API 响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

/// 向量数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingData {
    /// 向量数组
    pub embedding: Vec<f32>,
    /// 对应的输入下标
    pub index: usize,
}

/// 嵌入客户端
pub struct EmbeddingClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    /// 创建客户端（30 秒超时）
    pub fn new(api_key: impl Into<String>) -> Result<Self, EmbeddingError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// 设置接口地址（OpenAI 兼容服务）
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// 设置模型
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// 当前模型
    pub fn model(&self) -> &str {
        &self.model
    }

    /// 批量获取向量嵌入
    ///
    /// 整批一次请求，返回向量与输入顺序对齐。
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(
            "[嵌入服务] 批量嵌入: count={}, model={}",
            texts.len(),
            self.model
        );

        let req = EmbeddingRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("读取错误响应失败: {e}"));
            tracing::error!("[嵌入服务] API 错误: {} - {}", status, body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let response: EmbeddingResponse = serde_json::from_str(&body)?;
        if response.data.is_empty() {
            return Err(EmbeddingError::EmptyData);
        }

        tracing::debug!("[嵌入服务] 返回向量: count={}", response.data.len());

        Ok(order_by_index(response.data))
    }
}

/// 按响应 index 排序，对齐输入顺序
fn order_by_index(mut data: Vec<EmbeddingData>) -> Vec<Vec<f32>> {
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization_is_batched() {
        let req = EmbeddingRequest {
            input: vec!["一".to_string(), "二".to_string()],
            model: DEFAULT_MODEL.to_string(),
        };

        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""input":["一","二"]"#));
        assert!(json.contains(r#""model":"text-embedding-3-small""#));
    }

    #[test]
    fn test_response_deserialization() {
        let body = r#"{"data": [{"embedding": [0.1, 0.2], "index": 0}]}"#;
        let response: EmbeddingResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.data[0].embedding.len(), 2);
    }

    #[test]
    fn test_vectors_reordered_by_index() {
        let data = vec![
            EmbeddingData {
                embedding: vec![2.0],
                index: 1,
            },
            EmbeddingData {
                embedding: vec![1.0],
                index: 0,
            },
        ];

        let ordered = order_by_index(data);
        assert_eq!(ordered, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_client_builders() {
        let client = EmbeddingClient::new("key-1")
            .unwrap()
            .with_endpoint("http://localhost:9000/v1/embeddings")
            .with_model("bge-small");
        assert_eq!(client.model(), "bge-small");
    }
}
