//! # opsgate-engine
//!
//! Execution engine for OpsGate:
//! - Policy: policy.json 로드와 fail-closed 검증
//! - Schema: 도구 인자 스키마 컴파일/검증 (기본값 채움, 민감 필드)
//! - Registry: 이름 → 도구 조회와 list_tools 카탈로그
//! - Gate: 무상태 확인 게이트
//! - Exec: 템플릿 치환, 셸 없는 하위 프로세스, 트리 발행
//! - Engine: 요청 → 판정 사슬 → 감사/알림 → 응답 봉투
//!
//! ## 판정 사슬
//!
//! ```text
//! Request ─→ Registry ─→ Schema ─→ Gate ─→ Action ─→ Envelope
//!               │           │        │        │
//!               └───────────┴────────┴────────┴──→ Audit (항상)
//! ```

pub mod engine;
pub mod envelope;
pub mod exec;
pub mod gate;
pub mod policy;
pub mod registry;
pub mod schema;

// ============================================================================
// Engine (실행 엔진)
// ============================================================================
pub use engine::Engine;

// ============================================================================
// Envelope (와이어 계약)
// ============================================================================
pub use envelope::{Metrics, Request, RequestMethod, ResponseEnvelope};

// ============================================================================
// Policy (정책)
// ============================================================================
pub use policy::{
    default_policy_path, load_policy_file, validate_policy, NotifyRoute, PolicyDocument,
    ToolAction, ToolDefinition, POLICY_FILE,
};

// ============================================================================
// Registry (레지스트리)
// ============================================================================
pub use registry::{CatalogEntry, RegisteredTool, ToolRegistry};

// ============================================================================
// Schema (인자 스키마)
// ============================================================================
pub use schema::{CompiledSchema, FieldError, FieldType};

// ============================================================================
// Gate (확인 게이트)
// ============================================================================
pub use gate::GateDecision;

// ============================================================================
// Exec (동작 실행)
// ============================================================================
pub use exec::{CapturedStream, CommandOutcome, PublishOutcome};
