//! Execution Engine - 실행 엔진
//!
//! 요청 하나를 받아 판정 사슬을 통과시키는 오케스트레이터.
//!
//! ```text
//! Request ─→ 레지스트리 조회 ─→ 스키마 검증 ─→ 확인 게이트
//!                  │                │              │
//!                  ▼                ▼              ▼
//!              unknown tool    invalid args   need_confirm
//!                  │                │              │
//!                  └────────────────┴──────────────┴──→ 감사 기록
//!                                   │
//!                                   ▼ (통과 시)
//!                          동작 실행 (exec / publish / ping)
//!                                   │
//!                                   ▼
//!                          감사 기록 + 알림 ─→ ResponseEnvelope
//! ```
//!
//! 거부를 포함한 모든 call_tool 경로가 감사 기록 하나를 남깁니다.
//! 알림은 최선 노력이며 응답을 지연시키지 않습니다.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, warn};

use opsgate_foundation::{
    args_digest, redact_args, AuditLogger, AuditRecord, AuditStatus, DigestSalt, ExecConfig,
    GatewayConfig, NotifyMessage, NotifyPriority, NotifySink, PathValidator,
};

use crate::envelope::{Request, RequestMethod, ResponseEnvelope};
use crate::exec::{publish_tree, render_argv, run_argv};
use crate::gate::{self, GateDecision};
use crate::policy::{ToolAction, ToolDefinition};
use crate::registry::ToolRegistry;

/// 이름 없는 call_tool 의 감사 기록용 도구 이름
const INVALID_TOOL: &str = "(invalid)";

// ============================================================================
// 엔진
// ============================================================================

/// 게이트웨이 엔진
///
/// 기동 시 한 번 조립되며 이후 공유 참조로만 사용됩니다.
/// 요청 간 상태가 없으므로 동시 호출이 자유롭습니다.
pub struct Engine {
    registry: ToolRegistry,
    validator: PathValidator,
    audit: Arc<AuditLogger>,
    notifier: Arc<dyn NotifySink>,
    exec_config: ExecConfig,
    salt: DigestSalt,
    caller: String,
}

impl Engine {
    /// 검증된 구성 요소로 엔진 조립
    pub fn new(
        config: &GatewayConfig,
        registry: ToolRegistry,
        audit: Arc<AuditLogger>,
        notifier: Arc<dyn NotifySink>,
    ) -> Self {
        Self {
            validator: PathValidator::new(config.roots.clone()),
            registry,
            audit,
            notifier,
            exec_config: config.exec.clone(),
            salt: DigestSalt::generate(),
            caller: config.caller_identity(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    /// 요청 하나 처리
    pub async fn handle(&self, request: &Request) -> ResponseEnvelope {
        match request.method {
            RequestMethod::ListTools => self.list_tools(),
            RequestMethod::CallTool => self.call_tool(request).await,
        }
    }

    /// 카탈로그 반환. 부작용이 없으므로 감사 기록도 없다.
    fn list_tools(&self) -> ResponseEnvelope {
        let started = Instant::now();
        let catalog = self.registry.catalog();

        ResponseEnvelope::ok(format!("{} tool(s) available", catalog.len()))
            .with_data(json!({ "tools": catalog }))
            .with_metrics(elapsed_ms(started), -1)
    }

    async fn call_tool(&self, request: &Request) -> ResponseEnvelope {
        let started = Instant::now();
        let raw_args = request.args.clone().unwrap_or(Value::Null);

        // 이름 없는 call_tool 도 감사 대상이다
        let Some(name) = request.name.as_deref().filter(|n| !n.is_empty()) else {
            let envelope =
                ResponseEnvelope::failure("Malformed request", "call_tool requires a tool name")
                    .with_metrics(elapsed_ms(started), -1);
            self.record_and_notify(
                INVALID_TOOL,
                None,
                self.digest_of(&raw_args, &[]),
                AuditStatus::Fail,
                &envelope,
                (0, 0),
            )
            .await;
            return envelope;
        };

        let Some(tool) = self.registry.get(name) else {
            let envelope = ResponseEnvelope::failure(
                format!("Unknown tool: {}", name),
                format!("unknown tool '{}'", name),
            )
            .with_data(json!({ "tools": self.registry.catalog() }))
            .with_metrics(elapsed_ms(started), -1);
            self.record_and_notify(
                name,
                None,
                self.digest_of(&raw_args, &[]),
                AuditStatus::Fail,
                &envelope,
                (0, 0),
            )
            .await;
            return envelope;
        };

        let definition = &tool.definition;
        let sensitive = tool.schema.sensitive_fields();

        let normalized = match tool.schema.validate(&raw_args) {
            Ok(normalized) => normalized,
            Err(errors) => {
                let envelope = ResponseEnvelope::failure(
                    format!("Invalid arguments for {}", name),
                    format!("{} argument error(s)", errors.len()),
                )
                .with_data(json!({ "errors": errors }))
                .with_metrics(elapsed_ms(started), -1);
                self.record_and_notify(
                    name,
                    Some(definition),
                    self.digest_of(&raw_args, &sensitive),
                    AuditStatus::Fail,
                    &envelope,
                    (0, 0),
                )
                .await;
                return envelope;
            }
        };

        let digest = self.digest_of(&normalized, &sensitive);

        if gate::decide(definition, request.confirm) == GateDecision::NeedConfirm {
            let envelope = ResponseEnvelope::need_confirm(format!(
                "'{}' requires confirmation. Re-send with \"confirm\": true to proceed.",
                name
            ))
            .with_metrics(elapsed_ms(started), -1);
            self.record_and_notify(
                name,
                Some(definition),
                digest,
                AuditStatus::NeedConfirm,
                &envelope,
                (0, 0),
            )
            .await;
            return envelope;
        }

        let (envelope, truncated) = match &definition.action {
            ToolAction::Exec { program, argv } => {
                self.run_exec(name, definition, program, argv, &normalized, started)
                    .await
            }
            ToolAction::PublishTree {
                source_root,
                dest_root,
            } => {
                self.run_publish(name, source_root, dest_root, &normalized, started)
                    .await
            }
            ToolAction::NotifyPing => self.run_ping(definition, started).await,
        };

        let status = if envelope.ok {
            AuditStatus::Ok
        } else {
            AuditStatus::Fail
        };
        self.record_and_notify(name, Some(definition), digest, status, &envelope, truncated)
            .await;

        envelope
    }

    // ========================================================================
    // 동작별 실행
    // ========================================================================

    async fn run_exec(
        &self,
        name: &str,
        definition: &ToolDefinition,
        program: &str,
        argv: &[String],
        args: &Value,
        started: Instant,
    ) -> (ResponseEnvelope, (u64, u64)) {
        let rendered = match render_argv(argv, args) {
            Ok(rendered) => rendered,
            Err(e) => {
                return (
                    ResponseEnvelope::failure(format!("{} failed", name), e.to_string())
                        .with_metrics(elapsed_ms(started), -1),
                    (0, 0),
                );
            }
        };

        let timeout = definition.effective_timeout(&self.exec_config);
        let limit = definition.effective_output_limit(&self.exec_config);

        debug!(tool = name, program, "Executing command");

        let outcome = match run_argv(program, &rendered, timeout, limit).await {
            Ok(outcome) => outcome,
            Err(e) => {
                return (
                    ResponseEnvelope::failure(format!("{} failed", name), e.to_string())
                        .with_metrics(elapsed_ms(started), -1),
                    (0, 0),
                );
            }
        };

        let truncated = (
            outcome.stdout.truncated_bytes,
            outcome.stderr.truncated_bytes,
        );

        let mut data = serde_json::Map::new();
        if truncated.0 > 0 {
            data.insert("stdout_truncated_bytes".to_string(), json!(truncated.0));
        }
        if truncated.1 > 0 {
            data.insert("stderr_truncated_bytes".to_string(), json!(truncated.1));
        }
        let data = if data.is_empty() {
            Value::Null
        } else {
            Value::Object(data)
        };

        let envelope = if outcome.timed_out {
            ResponseEnvelope::failure(
                format!("{} timed out", name),
                format!("timed out after {}s", timeout.as_secs()),
            )
        } else if outcome.exit_code != 0 {
            ResponseEnvelope::failure(
                format!("{} exited with code {}", name, outcome.exit_code),
                format!("exit code {}", outcome.exit_code),
            )
        } else {
            ResponseEnvelope::ok(format!("{} completed", name))
        };

        (
            envelope
                .with_data(data)
                .with_output(outcome.stdout.text, outcome.stderr.text)
                .with_metrics(elapsed_ms(started), outcome.exit_code),
            truncated,
        )
    }

    async fn run_publish(
        &self,
        name: &str,
        source_root: &str,
        dest_root: &str,
        args: &Value,
        started: Instant,
    ) -> (ResponseEnvelope, (u64, u64)) {
        let patterns: Vec<String> = args
            .get("files")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        match publish_tree(&self.validator, source_root, dest_root, &patterns).await {
            Ok(outcome) => (
                ResponseEnvelope::ok(format!(
                    "Published {} file(s) to {}",
                    outcome.files_written, dest_root
                ))
                .with_data(json!({
                    "files_written": outcome.files_written,
                    "bytes_written": outcome.bytes_written,
                }))
                .with_metrics(elapsed_ms(started), -1),
                (0, 0),
            ),
            Err(e) => (
                ResponseEnvelope::failure(format!("{} failed", name), e.to_string())
                    .with_metrics(elapsed_ms(started), -1),
                (0, 0),
            ),
        }
    }

    async fn run_ping(
        &self,
        definition: &ToolDefinition,
        started: Instant,
    ) -> (ResponseEnvelope, (u64, u64)) {
        if !self.notifier.is_enabled() {
            return (
                ResponseEnvelope::failure("Notifications are disabled", "notify sink is disabled")
                    .with_data(json!({ "delivered": false }))
                    .with_metrics(elapsed_ms(started), -1),
                (0, 0),
            );
        }

        let message = NotifyMessage::new(
            "OpsGate ping",
            format!("Test notification requested by {}", self.caller),
        )
        .with_priority(NotifyPriority::Default)
        .with_tag("bell");
        let message = match definition.notify_topic() {
            Some(topic) => message.with_topic(topic),
            None => message,
        };

        match self.notifier.send(&message).await {
            Ok(()) => (
                ResponseEnvelope::ok("Notification delivered")
                    .with_data(json!({ "delivered": true }))
                    .with_metrics(elapsed_ms(started), -1),
                (0, 0),
            ),
            Err(e) => (
                ResponseEnvelope::failure("Notification delivery failed", e.to_string())
                    .with_data(json!({ "delivered": false }))
                    .with_metrics(elapsed_ms(started), -1),
                (0, 0),
            ),
        }
    }

    // ========================================================================
    // 감사 + 알림
    // ========================================================================

    fn digest_of(&self, args: &Value, sensitive: &[String]) -> String {
        let redacted = redact_args(args, sensitive);
        args_digest(&self.salt, &redacted)
    }

    /// 감사 기록을 남기고 알림을 발송한다
    ///
    /// 핑 도구는 실행 자체가 알림이므로 결과 알림을 또 보내지 않는다.
    async fn record_and_notify(
        &self,
        tool_name: &str,
        definition: Option<&ToolDefinition>,
        digest: String,
        status: AuditStatus,
        envelope: &ResponseEnvelope,
        truncated: (u64, u64),
    ) {
        let (mutates, requires_confirm, topic, is_ping) = match definition {
            Some(def) => (
                def.mutates,
                def.confirm_required(),
                def.notify_topic().map(String::from),
                matches!(def.action, ToolAction::NotifyPing),
            ),
            None => (false, false, None, false),
        };

        let mut record = AuditRecord::new(tool_name, &self.caller)
            .with_digest(digest)
            .with_flags(mutates, requires_confirm)
            .with_status(status)
            .with_exit_code(envelope.metrics.exit_code)
            .with_elapsed(envelope.metrics.elapsed_ms)
            .with_truncated(truncated.0, truncated.1);
        if let Some(error) = &envelope.error {
            record = record.with_error(error);
        }
        self.audit.record(&record).await;

        if is_ping || !self.notifier.is_enabled() {
            return;
        }

        let message = NotifyMessage::new(
            format!("{}: {}", tool_name, status.as_str()),
            envelope.summary.clone(),
        )
        .with_priority(NotifyPriority::for_status(status));
        let message = match topic {
            Some(topic) => message.with_topic(topic),
            None => message,
        };

        // 응답을 알림 지연에 묶지 않는다
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&message).await {
                warn!(error = %e, "Notification delivery failed");
            }
        });
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

// ============================================================================
// 테스트
// ============================================================================
