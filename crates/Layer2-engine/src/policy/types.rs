//! Policy Types - 정책 문서 타입
//!
//! policy.json 의 선언적 도구 정의. 로드 후 불변입니다.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use opsgate_foundation::config::ExecConfig;

// ============================================================================
// Tool Action
// ============================================================================

/// 도구가 수행하는 동작
///
/// 명령은 항상 argv 벡터로 실행되며 셸 문자열 해석은 없습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolAction {
    /// 서브프로세스 실행 (argv 템플릿, `{placeholder}` 치환)
    Exec {
        program: String,
        #[serde(default)]
        argv: Vec<String>,
    },

    /// 읽기 루트에서 쓰기 루트로 파일 복사 (스테이징 → 공개)
    PublishTree {
        source_root: String,
        dest_root: String,
    },

    /// 알림 싱크 왕복 점검
    NotifyPing,
}

impl ToolAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Exec { .. } => "exec",
            Self::PublishTree { .. } => "publish_tree",
            Self::NotifyPing => "notify_ping",
        }
    }
}

// ============================================================================
// Notify Route
// ============================================================================

/// 도구별 알림 라우팅
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRoute {
    /// 알림 토픽 (없으면 전역 기본 토픽)
    pub topic: String,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// 정책의 도구 정의 하나
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// 도구 이름 (카탈로그 키)
    pub name: String,

    /// 설명 (카탈로그에 노출)
    #[serde(default)]
    pub description: String,

    /// 인자 스키마 (JSON Schema 부분집합)
    #[serde(default = "default_args_schema")]
    pub args: Value,

    /// 수행 동작
    pub action: ToolAction,

    /// 상태를 변경하는 도구인지
    #[serde(default)]
    pub mutates: bool,

    /// 확인 요구 여부
    ///
    /// mutates 도구는 반드시 명시해야 합니다. 명시적 false 가 면제 선언입니다.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_confirm: Option<bool>,

    /// 타임아웃 (초, 없으면 전역 기본값)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// 스트림별 출력 상한 (바이트, 없으면 전역 기본값)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_limit_bytes: Option<usize>,

    /// 알림 라우팅
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<NotifyRoute>,
}

fn default_args_schema() -> Value {
    serde_json::json!({"type": "object", "properties": {}})
}

impl ToolDefinition {
    /// 확인이 필요한 도구인지
    pub fn confirm_required(&self) -> bool {
        self.requires_confirm.unwrap_or(false)
    }

    /// 실효 타임아웃 (전역 기본값 적용, 최대치로 클램프)
    pub fn effective_timeout(&self, exec: &ExecConfig) -> Duration {
        let secs = self
            .timeout_secs
            .unwrap_or(exec.default_timeout_secs)
            .min(exec.max_timeout_secs);
        Duration::from_secs(secs)
    }

    /// 실효 출력 상한 (스트림별)
    pub fn effective_output_limit(&self, exec: &ExecConfig) -> usize {
        self.output_limit_bytes
            .unwrap_or(exec.default_output_limit_bytes)
    }

    /// 알림 토픽 (라우팅이 있으면 그 토픽)
    pub fn notify_topic(&self) -> Option<&str> {
        self.notify.as_ref().map(|r| r.topic.as_str())
    }
}

// ============================================================================
// Policy Document
// ============================================================================

/// 정책 문서
///
/// 도구 목록은 파일에 적힌 순서를 유지합니다. 재적용은 프로세스 재시작.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// 문서 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 도구 정의들 (순서 보존)
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
}

fn default_version() -> u32 {
    1
}

impl PolicyDocument {
    /// 이름으로 도구 조회
    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// 테스트
// ============================================================================
