//! Audit Record Types - 감사 레코드 타입 정의
//!
//! 게이트웨이를 거친 모든 호출의 감사 기록 타입입니다.
//! 레코드 하나가 JSONL 한 줄이 되며, 그 자체로 완결된 JSON 오브젝트입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Audit Status
// ============================================================================

/// 호출 결과 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// 성공
    Ok,
    /// 실패 (검증 거부, 실행 실패, 타임아웃 포함)
    Fail,
    /// 확인 필요로 중단됨 (실행 안 됨)
    NeedConfirm,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Fail => "fail",
            Self::NeedConfirm => "need_confirm",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Audit Record
// ============================================================================

/// 감사 레코드
///
/// 호출 한 건당 정확히 하나 기록됩니다. 실행 전에 거부된 요청도 포함.
/// 원본 인자는 절대 기록하지 않고 솔트 다이제스트만 남깁니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// 고유 ID
    pub id: String,

    /// 발생 시간 (UTC)
    pub ts: DateTime<Utc>,

    /// 도구 이름
    pub tool: String,

    /// 인자 다이제스트 (민감 필드 마스킹 후 솔트 SHA-256)
    pub args_digest: String,

    /// 도구의 mutates 플래그
    pub mutates: bool,

    /// 도구의 requires_confirm 플래그
    pub requires_confirm: bool,

    /// 결과 상태
    pub status: AuditStatus,

    /// 종료 코드 (프로세스가 없으면 -1)
    pub exit_code: i32,

    /// 소요 시간 (밀리초)
    pub elapsed_ms: u64,

    /// 호출자 식별자
    pub caller: String,

    /// stdout에서 잘려나간 바이트 수
    pub stdout_truncated_bytes: u64,

    /// stderr에서 잘려나간 바이트 수
    pub stderr_truncated_bytes: u64,

    /// 에러 요약 (실패 시)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// 새 감사 레코드 생성
    pub fn new(tool: impl Into<String>, caller: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts: Utc::now(),
            tool: tool.into(),
            args_digest: String::new(),
            mutates: false,
            requires_confirm: false,
            status: AuditStatus::Fail,
            exit_code: -1,
            elapsed_ms: 0,
            caller: caller.into(),
            stdout_truncated_bytes: 0,
            stderr_truncated_bytes: 0,
            error: None,
        }
    }

    /// 다이제스트 설정
    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.args_digest = digest.into();
        self
    }

    /// 도구 플래그 설정
    pub fn with_flags(mut self, mutates: bool, requires_confirm: bool) -> Self {
        self.mutates = mutates;
        self.requires_confirm = requires_confirm;
        self
    }

    /// 상태 설정
    pub fn with_status(mut self, status: AuditStatus) -> Self {
        self.status = status;
        self
    }

    /// 종료 코드 설정
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = exit_code;
        self
    }

    /// 소요 시간 설정
    pub fn with_elapsed(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// 절단 바이트 수 설정
    pub fn with_truncated(mut self, stdout_bytes: u64, stderr_bytes: u64) -> Self {
        self.stdout_truncated_bytes = stdout_bytes;
        self.stderr_truncated_bytes = stderr_bytes;
        self
    }

    /// 에러 요약 설정
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = AuditRecord::new("disk_space", "ops@host")
            .with_digest("abc123")
            .with_flags(false, false)
            .with_status(AuditStatus::Ok)
            .with_exit_code(0)
            .with_elapsed(42);

        assert_eq!(record.tool, "disk_space");
        assert_eq!(record.caller, "ops@host");
        assert_eq!(record.status, AuditStatus::Ok);
        assert_eq!(record.exit_code, 0);
        assert_eq!(record.elapsed_ms, 42);
        assert!(!record.id.is_empty());
    }

    #[test]
    fn test_record_is_single_line_json() {
        let record = AuditRecord::new("blog_publish", "ops@host")
            .with_status(AuditStatus::NeedConfirm);

        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"need_confirm\""));

        let parsed: AuditRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.status, AuditStatus::NeedConfirm);
        assert_eq!(parsed.tool, "blog_publish");
    }

    #[test]
    fn test_status_as_str() {
        assert_eq!(AuditStatus::Ok.as_str(), "ok");
        assert_eq!(AuditStatus::Fail.as_str(), "fail");
        assert_eq!(AuditStatus::NeedConfirm.as_str(), "need_confirm");
    }

    #[test]
    fn test_timestamp_is_utc_iso8601() {
        let record = AuditRecord::new("ping", "ops@host");
        let line = serde_json::to_string(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        let ts = value["ts"].as_str().unwrap();

        // RFC3339/ISO-8601, UTC
        assert!(ts.ends_with('Z') || ts.contains("+00:00"));
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
