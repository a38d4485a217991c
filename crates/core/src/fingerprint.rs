//! 凭证指纹
//!
//! 对 API 密钥做单向散列并截取前 8 个十六进制字符，仅用于日志关联。
//! 日志中只允许出现指纹，不允许出现原始密钥。

use sha2::{Digest, Sha256};

/// 计算 API 密钥的 8 位指纹
pub fn key_fingerprint(api_key: &str) -> String {
    let digest = Sha256::digest(api_key.as_bytes());
    hex::encode(&digest[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_length_and_stability() {
        let fp = key_fingerprint("sk-test-123");
        assert_eq!(fp.len(), 8);
        assert_eq!(fp, key_fingerprint("sk-test-123"));
    }

    #[test]
    fn test_fingerprint_does_not_contain_key_material() {
        let fp = key_fingerprint("sk-secret-abcdef");
        assert!(!fp.contains("secret"));
    }

    #[test]
    fn test_fingerprint_distinguishes_keys() {
        assert_ne!(key_fingerprint("key-a"), key_fingerprint("key-b"));
    }
}
