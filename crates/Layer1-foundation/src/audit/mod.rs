//! Audit Trail - 감사 추적
//!
//! 게이트웨이를 거친 모든 호출(거부 포함)의 불변 기록을 남깁니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      AuditLogger                            │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │  record(entry) ──► audit.jsonl (한 줄 = 한 레코드)   │   │
//! │  │        │                                            │   │
//! │  │        └── 싱크 장애 시: 경고 + 바운드 버퍼          │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 사용법
//!
//! ```ignore
//! use opsgate_foundation::audit::{
//!     args_digest, redact_args, AuditLogger, AuditLoggerConfig, AuditRecord,
//!     AuditStatus, DigestSalt,
//! };
//!
//! let logger = AuditLogger::new(AuditLoggerConfig::default()).await;
//! let salt = DigestSalt::generate();
//!
//! let redacted = redact_args(&args, &sensitive_fields);
//! let record = AuditRecord::new("disk_space", "ops@host")
//!     .with_digest(args_digest(&salt, &redacted))
//!     .with_status(AuditStatus::Ok)
//!     .with_exit_code(0)
//!     .with_elapsed(42);
//!
//! logger.record(&record).await;
//! ```

pub mod digest;
pub mod logger;
pub mod types;

// Re-exports
pub use digest::{args_digest, redact_args, DigestSalt, REDACTED_MARKER};
pub use logger::{default_audit_path, AuditLogger, AuditLoggerConfig};
pub use types::{AuditRecord, AuditStatus};
