//! 凭证清理模块
//!
//! 使用正则表达式从日志文本中清理敏感信息（API 密钥、token 等）

use regex::Regex;
use std::sync::OnceLock;

/// 替换文本
const REPLACEMENT: &str = "[REDACTED]";

/// 内置的敏感信息正则模式
fn builtin_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let patterns = [
            // OpenAI / Anthropic API 密钥
            r"sk-[a-zA-Z0-9_-]{20,}",
            // AWS Access Key
            r"AKIA[0-9A-Z]{16}",
            // Google API 密钥
            r"AIza[0-9A-Za-z_-]{35}",
            // Bearer token
            r"Bearer\s+[a-zA-Z0-9_\-.]+",
            // 通用 key=value 模式
            r"(?i)(api[_-]?key|secret[_-]?key|access[_-]?token|auth[_-]?token|password|secret)\s*[=:]\s*\S+",
        ];
        patterns
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// 清理文本中的敏感信息
pub fn sanitize(text: &str) -> String {
    let mut result = text.to_string();
    for pattern in builtin_patterns() {
        result = pattern.replace_all(&result, REPLACEMENT).to_string();
    }
    result
}

/// 检查文本是否包含敏感信息
pub fn contains_sensitive(text: &str) -> bool {
    builtin_patterns().iter().any(|p| p.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_openai_key() {
        let input = "my key is sk-abc123def456ghi789jkl012mno";
        let result = sanitize(input);
        assert!(!result.contains("sk-abc123"));
        assert!(result.contains("[REDACTED]"));
    }

    #[test]
    fn test_sanitize_key_value() {
        let result = sanitize("api_key=super-secret-value");
        assert!(!result.contains("super-secret-value"));
    }

    #[test]
    fn test_plain_text_untouched() {
        let input = "池 0 第 1 次尝试失败";
        assert_eq!(sanitize(input), input);
        assert!(!contains_sensitive(input));
    }
}
