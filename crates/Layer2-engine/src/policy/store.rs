//! Policy Store - 정책 로더
//!
//! policy.json 을 읽어 구조를 검증합니다. 위반 하나라도 있으면
//! 문서 전체를 거부하며, 게이트웨이는 기동하지 않습니다 (fail-closed).
//! 핫 리로드는 없습니다. 재적용은 재시작.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use opsgate_foundation::config::{GatewayConfig, CONFIG_DIR_NAME};
use opsgate_foundation::{strip_json_comments, Error, Result};

use crate::exec::template::argv_placeholders;
use crate::schema::CompiledSchema;

use super::types::{PolicyDocument, ToolAction, ToolDefinition};

/// 정책 파일 이름
pub const POLICY_FILE: &str = "policy.json";

/// 기본 정책 파일 경로 (~/.opsgate/policy.json)
pub fn default_policy_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(POLICY_FILE))
}

/// 정책 문서 로드 + 검증
///
/// 읽기/파싱/검증 중 어떤 실패도 `Error::Policy` 계열로 돌려줍니다.
pub fn load_policy_file(path: &Path, config: &GatewayConfig) -> Result<PolicyDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Policy(format!("Cannot read policy at {}: {}", path.display(), e))
    })?;

    let content = strip_json_comments(&content);

    let document: PolicyDocument = serde_json::from_str(&content).map_err(|e| {
        Error::Policy(format!("Invalid policy.json at {}: {}", path.display(), e))
    })?;

    validate_policy(&document, config)?;

    info!(
        tools = document.tools.len(),
        path = %path.display(),
        "Policy loaded"
    );

    Ok(document)
}

/// 정책 문서 구조 검증
///
/// - 도구 이름 유일성
/// - 인자 스키마 컴파일 가능
/// - exec 프로그램이 허용 리스트에 있음
/// - argv 자리 표시자가 모두 선언된 스칼라 필드이고 값이 항상 존재
/// - publish 루트가 설정에 올바른 의도로 존재
/// - mutates 도구의 requires_confirm 명시
/// - 타임아웃/출력 상한 양수
pub fn validate_policy(document: &PolicyDocument, config: &GatewayConfig) -> Result<()> {
    if document.tools.is_empty() {
        warn!("Policy contains no tools");
    }

    let mut seen = HashSet::new();
    for tool in &document.tools {
        if tool.name.is_empty() {
            return Err(Error::Policy("Tool with empty name".to_string()));
        }

        if !seen.insert(tool.name.as_str()) {
            return Err(Error::Policy(format!("Duplicate tool name: {}", tool.name)));
        }

        validate_tool(tool, config)?;
    }

    Ok(())
}

fn validate_tool(tool: &ToolDefinition, config: &GatewayConfig) -> Result<()> {
    if tool.description.is_empty() {
        warn!(tool = %tool.name, "Tool has no description");
    }

    let schema = CompiledSchema::compile(&tool.args)
        .map_err(|e| Error::policy_tool(&tool.name, e.to_string()))?;

    match &tool.action {
        ToolAction::Exec { program, argv } => {
            if program.is_empty() {
                return Err(Error::policy_tool(&tool.name, "exec program is empty"));
            }

            if !config.exec.allowed_programs.iter().any(|p| p == program) {
                return Err(Error::policy_tool(
                    &tool.name,
                    format!("program '{}' is not in the exec allowlist", program),
                ));
            }

            if which::which(program).is_err() {
                warn!(
                    tool = %tool.name,
                    program = %program,
                    "Allowlisted program not found on PATH"
                );
            }

            for placeholder in argv_placeholders(argv) {
                let Some(ty) = schema.field_type(&placeholder) else {
                    return Err(Error::policy_tool(
                        &tool.name,
                        format!("argv references undeclared argument '{{{}}}'", placeholder),
                    ));
                };

                if ty == crate::schema::FieldType::Array {
                    return Err(Error::policy_tool(
                        &tool.name,
                        format!("argv placeholder '{{{}}}' must be a scalar field", placeholder),
                    ));
                }

                if !schema.always_present(&placeholder) {
                    return Err(Error::policy_tool(
                        &tool.name,
                        format!(
                            "argv placeholder '{{{}}}' must be required or have a default",
                            placeholder
                        ),
                    ));
                }
            }
        }

        ToolAction::PublishTree {
            source_root,
            dest_root,
        } => {
            let source = config.root(source_root).ok_or_else(|| {
                Error::policy_tool(
                    &tool.name,
                    format!("source root '{}' is not configured", source_root),
                )
            })?;
            if !source.intent.allows_read() {
                return Err(Error::policy_tool(
                    &tool.name,
                    format!("source root '{}' does not allow read", source_root),
                ));
            }

            let dest = config.root(dest_root).ok_or_else(|| {
                Error::policy_tool(
                    &tool.name,
                    format!("dest root '{}' is not configured", dest_root),
                )
            })?;
            if !dest.intent.allows_write() {
                return Err(Error::policy_tool(
                    &tool.name,
                    format!("dest root '{}' does not allow write", dest_root),
                ));
            }

            // 발행 대상은 'files' 문자열 배열 인자로 받는다
            match schema.field_type("files") {
                Some(crate::schema::FieldType::Array) => {
                    if schema.items_type("files") != Some(crate::schema::FieldType::String) {
                        return Err(Error::policy_tool(
                            &tool.name,
                            "'files' items must be strings",
                        ));
                    }
                }
                Some(_) => {
                    return Err(Error::policy_tool(
                        &tool.name,
                        "'files' argument must be an array",
                    ));
                }
                None => {
                    return Err(Error::policy_tool(
                        &tool.name,
                        "publish_tree requires a 'files' array argument",
                    ));
                }
            }
        }

        ToolAction::NotifyPing => {
            if !config.notify.enabled {
                warn!(tool = %tool.name, "notify_ping tool present but notify is disabled");
            }
        }
    }

    if tool.mutates && tool.requires_confirm.is_none() {
        return Err(Error::policy_tool(
            &tool.name,
            "mutating tool must set requires_confirm explicitly (false opts out)",
        ));
    }

    if tool.mutates && tool.requires_confirm == Some(false) {
        warn!(tool = %tool.name, "Mutating tool is exempted from confirmation");
    }

    if tool.timeout_secs == Some(0) {
        return Err(Error::policy_tool(&tool.name, "timeout_secs must be positive"));
    }

    if let Some(secs) = tool.timeout_secs {
        if secs > config.exec.max_timeout_secs {
            warn!(
                tool = %tool.name,
                timeout_secs = secs,
                max = config.exec.max_timeout_secs,
                "Timeout exceeds maximum and will be clamped"
            );
        }
    }

    if tool.output_limit_bytes == Some(0) {
        return Err(Error::policy_tool(
            &tool.name,
            "output_limit_bytes must be positive",
        ));
    }

    Ok(())
}

// ============================================================================
// 테스트
// ============================================================================
