//! Policy - 도구 정책
//!
//! policy.json 문서 타입과 로더/검증기.
//!
//! 정책은 기동 시 한 번 읽고 전체를 검증합니다. 어떤 도구 하나라도
//! 위반이 있으면 문서 전체가 거부됩니다 (fail-closed).

pub mod store;
pub mod types;

// Re-exports
pub use store::{default_policy_path, load_policy_file, validate_policy, POLICY_FILE};
pub use types::{NotifyRoute, PolicyDocument, ToolAction, ToolDefinition};
