//! # opsgate-foundation
//!
//! Foundation layer for OpsGate:
//! - Error: 중앙 에러 타입 (정책/검증/경로/실행/감사)
//! - Config: 게이트웨이 설정 (settings.json, 루트, 실행 허용 리스트)
//! - Audit: 감사 추적 (JSONL, 솔트 다이제스트)
//! - PathGuard: 경로 검증 (이름 붙은 루트, read/write 의도)
//! - Notify: 운영 알림 (ntfy 스타일, best-effort)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Engine (opsgate-engine)                                │
//! │     │            │             │            │           │
//! │     ▼            ▼             ▼            ▼           │
//! │  Config      PathGuard      Audit        Notify         │
//! │  (설정)      (경로 검증)    (JSONL 기록)  (ntfy POST)    │
//! │                                                         │
//! │  모든 구성요소는 Error/Result 를 공유                     │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod notify;
pub mod pathguard;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    // Loader
    load_config_file,
    strip_json_comments,
    validate_config,
    AuditConfig,
    ConfigLoader,
    ExecConfig,
    // Types
    GatewayConfig,
    NotifyConfig,
    RootConfig,
    RootIntent,
    CONFIG_DIR_NAME,
    CONFIG_ENV_VAR,
    SETTINGS_FILE,
};

// ============================================================================
// Audit (감사 추적)
// ============================================================================
pub use audit::{
    // Digest
    args_digest,
    default_audit_path,
    redact_args,
    // Logger
    AuditLogger,
    AuditLoggerConfig,
    // Types
    AuditRecord,
    AuditStatus,
    DigestSalt,
    REDACTED_MARKER,
};

// ============================================================================
// PathGuard (경로 검증)
// ============================================================================
pub use pathguard::{Access, PathValidator, PathViolation};

// ============================================================================
// Notify (운영 알림)
// ============================================================================
pub use notify::{
    build_sink, NotifyMessage, NotifyPriority, NotifySink, NtfyNotifier, NullSink,
};
