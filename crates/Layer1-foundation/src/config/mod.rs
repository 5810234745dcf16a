//! Configuration - 게이트웨이 설정
//!
//! settings.json 스키마와 로더.
//!
//! ## 사용법
//!
//! ```ignore
//! use opsgate_foundation::config::{ConfigLoader, GatewayConfig};
//!
//! // 기본 경로 탐색 (~/.opsgate/settings.json, OPSGATE_CONFIG)
//! let config = ConfigLoader::new().load()?;
//!
//! // 명시적 경로
//! let config = ConfigLoader::with_path("/etc/opsgate/settings.json").load()?;
//! ```

pub mod loader;
pub mod types;

// Re-exports
pub use loader::{
    load_config_file, strip_json_comments, validate_config, ConfigLoader, CONFIG_DIR_NAME,
    CONFIG_ENV_VAR, SETTINGS_FILE,
};
pub use types::{AuditConfig, ExecConfig, GatewayConfig, NotifyConfig, RootConfig, RootIntent};
