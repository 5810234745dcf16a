//! Bootstrap - 게이트웨이 조립
//!
//! 설정 → 정책 → 레지스트리 → 감사/알림 → 엔진 순서로 조립합니다.
//! 어느 단계가 실패해도 게이트웨이는 뜨지 않습니다 (fail-closed).
//! 부분 정책으로 기동하는 경로는 없습니다.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;

use opsgate_engine::{default_policy_path, load_policy_file, Engine, ToolRegistry};
use opsgate_foundation::{
    build_sink, default_audit_path, AuditLogger, AuditLoggerConfig, ConfigLoader, GatewayConfig,
};

/// 조립이 끝난 게이트웨이
pub struct Gateway {
    pub config: GatewayConfig,
    pub engine: Engine,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// 설정과 정책을 읽어 게이트웨이를 조립
///
/// - `config_path`: 명시적 settings.json 경로 (없으면 env → 기본 경로)
/// - `policy_path`: 명시적 policy.json 경로 (없으면 설정 값 → 기본 경로)
pub async fn build(
    config_path: Option<&Path>,
    policy_path: Option<&Path>,
) -> anyhow::Result<Gateway> {
    let loader = match config_path {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("failed to load gateway settings")?;

    let policy_file = resolve_policy_path(policy_path, &config)?;
    let document = load_policy_file(&policy_file, &config)
        .with_context(|| format!("failed to load policy from {}", policy_file.display()))?;
    let registry = ToolRegistry::from_policy(document).context("failed to build tool registry")?;

    let audit = Arc::new(
        AuditLogger::new(AuditLoggerConfig {
            path: config
                .audit
                .path
                .clone()
                .unwrap_or_else(default_audit_path),
            enabled: config.audit.enabled,
        })
        .await,
    );

    let notifier = build_sink(&config.notify).context("failed to build notify sink")?;

    let engine = Engine::new(&config, registry, audit, notifier);

    info!(
        tools = engine.registry().len(),
        roots = config.roots.len(),
        notify = config.notify.enabled,
        "Gateway assembled"
    );

    Ok(Gateway { config, engine })
}

/// 정책 파일 경로 결정: 명시적 인자 > 설정 값 > 기본 경로
fn resolve_policy_path(explicit: Option<&Path>, config: &GatewayConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(ref path) = config.policy_path {
        return Ok(path.clone());
    }

    match default_policy_path() {
        Some(path) if path.is_file() => Ok(path),
        Some(path) => bail!(
            "no policy file found (looked at {}); pass --policy or set policyPath in settings",
            path.display()
        ),
        None => bail!("cannot locate a home directory; pass --policy explicitly"),
    }
}

// ============================================================================
// 테스트
// ============================================================================
