//! Error types for OpsGate
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// OpsGate 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 정책 관련
    // ========================================================================
    /// 정책 문서 로드/검증 실패 (기동 중단)
    #[error("Policy error: {0}")]
    Policy(String),

    #[error("Policy error: tool '{tool}': {message}")]
    PolicyTool { tool: String, message: String },

    // ========================================================================
    // 검증 관련
    // ========================================================================
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 경로 관련
    // ========================================================================
    /// 허용된 루트 밖 접근 시도 (보안 이벤트)
    #[error("Path violation: {0}")]
    PathViolation(String),

    #[error("Unknown root: {0}")]
    UnknownRoot(String),

    // ========================================================================
    // Tool 관련
    // ========================================================================
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {tool} - {message}")]
    ToolExecution { tool: String, message: String },

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    // ========================================================================
    // 감사/알림 관련
    // ========================================================================
    #[error("Audit error: {0}")]
    Audit(String),

    #[error("Notify error: {0}")]
    Notify(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 보안 이벤트로 기록해야 하는 에러인지 확인
    pub fn is_security_event(&self) -> bool {
        matches!(self, Error::PathViolation(_))
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::ToolNotFound(_)
                | Error::PathViolation(_)
                | Error::Validation(_)
                | Error::InvalidInput(_)
                | Error::Timeout(_)
        )
    }

    /// 정책 도구 에러 생성 헬퍼
    pub fn policy_tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::PolicyTool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Tool 실행 에러 생성 헬퍼
    pub fn tool_execution(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ToolExecution {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
