//! Config Loader - 설정 파일 로더
//!
//! settings.json 탐색/로드/검증. 우선순위:
//! 1. 명시적 경로 (--config)
//! 2. 환경변수 (OPSGATE_CONFIG)
//! 3. 기본 경로 (~/.opsgate/settings.json)
//!
//! 파일이 없으면 내장 기본값을 사용합니다.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::GatewayConfig;

/// 설정 디렉토리 이름
pub const CONFIG_DIR_NAME: &str = ".opsgate";

/// 설정 파일 이름
pub const SETTINGS_FILE: &str = "settings.json";

/// 설정 경로 환경변수
pub const CONFIG_ENV_VAR: &str = "OPSGATE_CONFIG";

// ============================================================================
// ConfigLoader
// ============================================================================

/// 설정 로더
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// 명시적 설정 파일 경로 (CLI 플래그)
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 명시적 경로 지정
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit_path: Some(path.into()),
        }
    }

    /// 기본 설정 파일 경로 (~/.opsgate/settings.json)
    pub fn default_settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(SETTINGS_FILE))
    }

    /// 사용할 설정 파일 경로 결정
    ///
    /// 명시적 경로 > 환경변수 > 기본 경로(존재할 때만)
    pub fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.explicit_path {
            return Some(path.clone());
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            if !env_path.is_empty() {
                return Some(PathBuf::from(env_path));
            }
        }

        match Self::default_settings_path() {
            Some(path) if path.exists() => Some(path),
            _ => None,
        }
    }

    /// 설정 로드
    ///
    /// 명시적/환경변수 경로가 깨져 있으면 에러, 기본 경로가 없으면 기본값.
    pub fn load(&self) -> Result<GatewayConfig> {
        match self.resolve_path() {
            Some(path) => {
                let config = load_config_file(&path)?;
                info!("Loaded gateway settings from {}", path.display());
                validate_config(&config)?;
                Ok(config)
            }
            None => {
                debug!("No settings file found, using built-in defaults");
                Ok(GatewayConfig::default())
            }
        }
    }
}

/// 설정 파일 하나 로드
pub fn load_config_file(path: &Path) -> Result<GatewayConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Cannot read settings at {}: {}", path.display(), e))
    })?;

    // JSONC 허용 (주석 제거)
    let content = strip_json_comments(&content);

    let config: GatewayConfig = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Invalid settings.json at {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(config)
}

/// 설정 자체의 구조 검증
///
/// 루트 이름 중복과 상대 경로는 거부, 디스크에 없는 루트는 경고만.
pub fn validate_config(config: &GatewayConfig) -> Result<()> {
    let mut seen = std::collections::HashSet::new();

    for root in &config.roots {
        if root.name.is_empty() {
            return Err(Error::Config("Root with empty name".to_string()));
        }

        if !seen.insert(root.name.as_str()) {
            return Err(Error::Config(format!("Duplicate root name: {}", root.name)));
        }

        if !root.path.is_absolute() {
            return Err(Error::Config(format!(
                "Root '{}' path must be absolute: {}",
                root.name,
                root.path.display()
            )));
        }

        if !root.path.exists() {
            warn!(
                root = %root.name,
                path = %root.path.display(),
                "Root path does not exist on disk"
            );
        }
    }

    if config.notify.enabled && config.notify.base_url.is_none() {
        return Err(Error::Config(
            "Notify enabled but notify.baseUrl is not set".to_string(),
        ));
    }

    Ok(())
}

/// JSON 주석 제거 (// 및 /* */)
pub fn strip_json_comments(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escape_next = false;

    while let Some(c) = chars.next() {
        if escape_next {
            output.push(c);
            escape_next = false;
            continue;
        }

        if c == '\\' && in_string {
            output.push(c);
            escape_next = true;
            continue;
        }

        if c == '"' && !escape_next {
            in_string = !in_string;
            output.push(c);
            continue;
        }

        if !in_string && c == '/' {
            if let Some(&next) = chars.peek() {
                if next == '/' {
                    // 라인 주석 스킵
                    chars.next();
                    for c in chars.by_ref() {
                        if c == '\n' {
                            output.push(c);
                            break;
                        }
                    }
                    continue;
                } else if next == '*' {
                    // 블록 주석 스킵
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '*' {
                            if let Some(&'/') = chars.peek() {
                                chars.next();
                                break;
                            }
                        }
                    }
                    continue;
                }
            }
        }

        output.push(c);
    }

    output
}

// ============================================================================
// 테스트
// ============================================================================
