//! Configuration 타입 정의
//!
//! 게이트웨이 운영 설정 스키마 (settings.json)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// GatewayConfig - 통합 설정
// ============================================================================

/// OpsGate 통합 설정
///
/// 정책 파일 경로, 경로 루트, 실행 제한, 감사/알림 싱크를 하나로 관리합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    // ========================================================================
    // 정책 설정
    // ========================================================================
    /// 정책 문서 경로 (기본: ~/.opsgate/policy.json)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_path: Option<PathBuf>,

    // ========================================================================
    // 경로 루트 설정
    // ========================================================================
    /// 이름 붙은 경로 루트들 (파일 작업은 루트 내부로만 제한)
    #[serde(default)]
    pub roots: Vec<RootConfig>,

    // ========================================================================
    // 실행 설정
    // ========================================================================
    /// 서브프로세스 실행 제한
    #[serde(default)]
    pub exec: ExecConfig,

    // ========================================================================
    // 감사 설정
    // ========================================================================
    /// 감사 로그 싱크
    #[serde(default)]
    pub audit: AuditConfig,

    // ========================================================================
    // 알림 설정
    // ========================================================================
    /// 알림 전송 (ntfy 스타일)
    #[serde(default)]
    pub notify: NotifyConfig,

    // ========================================================================
    // 일반 설정
    // ========================================================================
    /// 호출자 식별자 오버라이드 (기본: user@host)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            policy_path: None,
            roots: Vec::new(),
            exec: ExecConfig::default(),
            audit: AuditConfig::default(),
            notify: NotifyConfig::default(),
            caller: None,
        }
    }
}

impl GatewayConfig {
    /// 이름으로 루트 조회
    pub fn root(&self, name: &str) -> Option<&RootConfig> {
        self.roots.iter().find(|r| r.name == name)
    }

    /// 호출자 식별자 (설정 오버라이드 > user@host)
    pub fn caller_identity(&self) -> String {
        if let Some(ref caller) = self.caller {
            return caller.clone();
        }

        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "localhost".to_string());

        format!("{}@{}", user, host)
    }
}

// ============================================================================
// Root Config
// ============================================================================

/// 경로 루트의 접근 의도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootIntent {
    /// 읽기 전용
    Read,
    /// 쓰기 전용
    Write,
    /// 읽기/쓰기
    ReadWrite,
}

impl RootIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::ReadWrite => "read_write",
        }
    }

    /// 읽기 접근 허용 여부
    pub fn allows_read(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// 쓰기 접근 허용 여부
    pub fn allows_write(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// 이름 붙은 경로 루트
///
/// 정책의 파일 작업은 루트 이름으로만 경로를 참조합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootConfig {
    /// 루트 이름 (정책에서 참조)
    pub name: String,

    /// 절대 경로
    pub path: PathBuf,

    /// 접근 의도
    pub intent: RootIntent,
}

// ============================================================================
// Exec Config
// ============================================================================

/// 서브프로세스 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    /// 실행 허용 프로그램 목록 (argv[0] 허용 리스트)
    #[serde(default)]
    pub allowed_programs: Vec<String>,

    /// 기본 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,

    /// 최대 타임아웃 (초)
    #[serde(default = "default_max_timeout_secs")]
    pub max_timeout_secs: u64,

    /// 기본 출력 상한 (바이트, 스트림별)
    #[serde(default = "default_output_limit")]
    pub default_output_limit_bytes: usize,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_timeout_secs() -> u64 {
    600
}

fn default_output_limit() -> usize {
    64 * 1024
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            allowed_programs: Vec::new(),
            default_timeout_secs: default_timeout_secs(),
            max_timeout_secs: default_max_timeout_secs(),
            default_output_limit_bytes: default_output_limit(),
        }
    }
}

// ============================================================================
// Audit Config
// ============================================================================

/// 감사 로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditConfig {
    /// 감사 로그 활성화
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// JSONL 파일 경로 (기본: <data_dir>/opsgate/audit.jsonl)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

// ============================================================================
// Notify Config
// ============================================================================

/// 알림 설정 (ntfy 스타일 HTTP POST)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyConfig {
    /// 알림 활성화
    #[serde(default)]
    pub enabled: bool,

    /// 서버 베이스 URL (예: https://ntfy.sh)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// 기본 토픽 (도구별 라우팅이 없을 때)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_topic: Option<String>,

    /// 요청 타임아웃 (초)
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_notify_timeout_secs() -> u64 {
    5
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: None,
            default_topic: None,
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(config.roots.is_empty());
        assert!(config.audit.enabled);
        assert!(!config.notify.enabled);
        assert_eq!(config.exec.default_timeout_secs, 30);
    }

    #[test]
    fn test_root_intent() {
        assert!(RootIntent::Read.allows_read());
        assert!(!RootIntent::Read.allows_write());
        assert!(RootIntent::Write.allows_write());
        assert!(!RootIntent::Write.allows_read());
        assert!(RootIntent::ReadWrite.allows_read());
        assert!(RootIntent::ReadWrite.allows_write());
    }

    #[test]
    fn test_root_lookup() {
        let config = GatewayConfig {
            roots: vec![RootConfig {
                name: "staging".to_string(),
                path: PathBuf::from("/srv/staging"),
                intent: RootIntent::Read,
            }],
            ..Default::default()
        };

        assert!(config.root("staging").is_some());
        assert!(config.root("missing").is_none());
    }

    #[test]
    fn test_caller_identity_override() {
        let config = GatewayConfig {
            caller: Some("deploy-bot".to_string()),
            ..Default::default()
        };

        assert_eq!(config.caller_identity(), "deploy-bot");
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{
            "policyPath": "/etc/opsgate/policy.json",
            "roots": [
                {"name": "staging", "path": "/srv/staging", "intent": "read"},
                {"name": "public", "path": "/srv/public", "intent": "write"}
            ],
            "exec": {"allowedPrograms": ["df", "docker"]},
            "notify": {"enabled": true, "baseUrl": "https://ntfy.sh", "defaultTopic": "ops"}
        }"#;

        let config: GatewayConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.roots.len(), 2);
        assert_eq!(config.roots[0].name, "staging");
        assert_eq!(config.roots[0].intent, RootIntent::Read);
        assert_eq!(config.exec.allowed_programs, vec!["df", "docker"]);
        assert_eq!(config.notify.base_url.as_deref(), Some("https://ntfy.sh"));
        assert_eq!(config.exec.max_timeout_secs, 600);
    }
}
