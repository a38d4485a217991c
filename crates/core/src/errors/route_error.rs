//! 路由错误类型
//!
//! 校验失败是致命错误，立即上抛且不重试；空池属于调用方编程错误；
//! 操作错误由回退引擎在本地恢复（触发轮换/降级）；全部耗尽是唯一
//! 暴露给 `execute` 调用方的聚合终态。

use thiserror::Error;

/// 校验错误
///
/// ProviderSpec / PriorityPool / UnifiedResponse 的输入数据不合法，
/// `field` 指向出错字段（如 `provider`、`pools[1][0].model`、`chunks[3].text`）。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("字段校验失败: {field} - {message}")]
pub struct ValidationError {
    /// 出错字段
    pub field: String,
    /// 错误描述
    pub message: String,
}

impl ValidationError {
    /// 创建校验错误
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// 空池错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("凭证池为空，无法选择")]
pub struct EmptyPoolError;

/// 操作错误
///
/// 调用方注入的操作在单次尝试中返回的错误。
#[derive(Error, Debug)]
#[error("{message}")]
pub struct OperationError {
    /// 错误描述
    pub message: String,
    /// 底层原因
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl OperationError {
    /// 创建操作错误
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带底层原因的操作错误
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// 全部池耗尽错误
///
/// `execute` 的终态失败，`last_error` 是最后一次记录的操作错误
/// （所有池都没有规格时为 None）。
#[derive(Error, Debug)]
#[error("所有凭证池均已耗尽 (共失败 {attempts} 次)")]
pub struct AllPoolsExhaustedError {
    /// 失败尝试总数
    pub attempts: u32,
    /// 最后一次记录的操作错误
    #[source]
    pub last_error: Option<OperationError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("provider", "不能为空");
        assert!(err.to_string().contains("provider"));
    }

    #[test]
    fn test_exhausted_error_wraps_cause() {
        use std::error::Error;

        let err = AllPoolsExhaustedError {
            attempts: 3,
            last_error: Some(OperationError::new("上游 429")),
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains('3'));
    }
}
