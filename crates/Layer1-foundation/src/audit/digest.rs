//! Argument Digest - 인자 다이제스트
//!
//! 감사 레코드에는 호출 인자 원문 대신 일방향 다이제스트만 남깁니다.
//! 민감 필드는 다이제스트 계산 전에 마스킹되어 해시에도 원문이 들어가지 않습니다.
//! 솔트는 프로세스마다 무작위 생성되며 어디에도 기록되지 않습니다.

use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// 민감 필드 마스킹 마커
pub const REDACTED_MARKER: &str = "[REDACTED]";

// ============================================================================
// Digest Salt
// ============================================================================

/// 프로세스 단위 다이제스트 솔트
#[derive(Clone)]
pub struct DigestSalt([u8; 16]);

impl DigestSalt {
    /// 무작위 솔트 생성
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// 고정 솔트 (테스트용)
    #[cfg(test)]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for DigestSalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 솔트 값은 Debug 출력에도 노출하지 않음
        f.write_str("DigestSalt(..)")
    }
}

// ============================================================================
// Redaction + Digest
// ============================================================================

/// 민감 필드 마스킹
///
/// 최상위 필드만 검사합니다 (인자 스키마가 평탄한 오브젝트이므로).
pub fn redact_args(args: &Value, sensitive_fields: &[String]) -> Value {
    let Some(map) = args.as_object() else {
        return args.clone();
    };

    let mut redacted = map.clone();
    for field in sensitive_fields {
        if let Some(slot) = redacted.get_mut(field) {
            *slot = Value::String(REDACTED_MARKER.to_string());
        }
    }

    Value::Object(redacted)
}

/// 마스킹된 인자의 솔트 SHA-256 다이제스트 (hex)
pub fn args_digest(salt: &DigestSalt, redacted_args: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(canonical_json(redacted_args).as_bytes());
    hex::encode(hasher.finalize())
}

/// 키 정렬된 정규형 JSON 문자열
///
/// 같은 인자는 필드 순서와 무관하게 같은 다이제스트를 가져야 합니다.
fn canonical_json(value: &Value) -> String {
    fn write_canonical(value: &Value, out: &mut String) {
        match value {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                out.push('{');
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&Value::String((*key).clone()).to_string());
                    out.push(':');
                    write_canonical(&map[*key], out);
                }
                out.push('}');
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_canonical(item, out);
                }
                out.push(']');
            }
            other => out.push_str(&other.to_string()),
        }
    }

    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_sensitive_fields() {
        let args = json!({"path": "/mnt", "token": "super-secret"});
        let redacted = redact_args(&args, &["token".to_string()]);

        assert_eq!(redacted["path"], "/mnt");
        assert_eq!(redacted["token"], REDACTED_MARKER);
    }

    #[test]
    fn test_redact_missing_field_is_noop() {
        let args = json!({"path": "/mnt"});
        let redacted = redact_args(&args, &["token".to_string()]);
        assert_eq!(redacted, args);
    }

    #[test]
    fn test_digest_ignores_field_order() {
        let salt = DigestSalt::from_bytes([7u8; 16]);
        let a = json!({"a": 1, "b": "x"});
        let b = json!({"b": "x", "a": 1});

        assert_eq!(args_digest(&salt, &a), args_digest(&salt, &b));
    }

    #[test]
    fn test_digest_depends_on_salt() {
        let a = json!({"path": "/mnt"});
        let d1 = args_digest(&DigestSalt::from_bytes([1u8; 16]), &a);
        let d2 = args_digest(&DigestSalt::from_bytes([2u8; 16]), &a);

        assert_ne!(d1, d2);
    }

    #[test]
    fn test_secret_never_in_digest_input() {
        // 같은 마스킹 결과면 비밀 값이 달라도 다이제스트가 같아야 함
        let salt = DigestSalt::from_bytes([3u8; 16]);
        let sensitive = vec!["token".to_string()];

        let a = redact_args(&json!({"token": "secret-one"}), &sensitive);
        let b = redact_args(&json!({"token": "secret-two"}), &sensitive);

        assert_eq!(args_digest(&salt, &a), args_digest(&salt, &b));
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let salt = DigestSalt::from_bytes([0u8; 16]);
        let digest = args_digest(&salt, &json!({}));

        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
