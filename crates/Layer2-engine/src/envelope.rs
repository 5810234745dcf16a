//! Envelope - 요청/응답 와이어 계약
//!
//! 호출자와 주고받는 JSON 형태를 정의합니다. 응답 봉투의 여덟 개
//! 필드는 성공/실패/확인 대기 어느 경우에도 전부 직렬화됩니다.
//! 필드 유무로 분기하는 클라이언트가 생기지 않도록 하기 위한
//! 계약이며, 비어 있는 값은 null / "" / 기본값으로 나갑니다.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// 요청
// ============================================================================

/// 요청 메서드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMethod {
    ListTools,
    CallTool,
}

/// 게이트웨이 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: RequestMethod,
    /// call_tool 의 도구 이름
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// call_tool 의 인자. 생략 시 빈 객체로 취급
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    /// 확인 게이트 통과 플래그
    #[serde(default)]
    pub confirm: bool,
}

impl Request {
    pub fn list_tools() -> Self {
        Self {
            method: RequestMethod::ListTools,
            name: None,
            args: None,
            confirm: false,
        }
    }

    pub fn call_tool(name: impl Into<String>, args: Option<Value>, confirm: bool) -> Self {
        Self {
            method: RequestMethod::CallTool,
            name: Some(name.into()),
            args,
            confirm,
        }
    }
}

// ============================================================================
// 응답
// ============================================================================

/// 실행 측정값
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// 요청 접수부터 응답 작성까지 경과 밀리초
    pub elapsed_ms: u64,
    /// 프로세스 종료 코드. 프로세스가 없었으면 -1
    pub exit_code: i32,
}

impl Metrics {
    pub fn none() -> Self {
        Self {
            elapsed_ms: 0,
            exit_code: -1,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::none()
    }
}

/// 응답 봉투
///
/// 모든 필드가 항상 직렬화됩니다. `skip_serializing_if` 금지.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// 요청한 동작이 수행되어 성공했는지
    pub ok: bool,
    /// 확인이 필요해 실행하지 않았는지
    pub need_confirm: bool,
    /// 사람이 읽는 한 줄 요약
    pub summary: String,
    /// 동작별 구조화 데이터. 없으면 null
    pub data: Value,
    /// 프로세스 표준 출력 (상한 적용 후)
    pub stdout: String,
    /// 프로세스 표준 에러 (상한 적용 후)
    pub stderr: String,
    /// 실패 사유. 성공 시 null
    pub error: Option<String>,
    pub metrics: Metrics,
}

impl ResponseEnvelope {
    /// 성공 응답
    pub fn ok(summary: impl Into<String>) -> Self {
        Self {
            ok: true,
            need_confirm: false,
            summary: summary.into(),
            data: Value::Null,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            metrics: Metrics::none(),
        }
    }

    /// 실패 응답
    pub fn failure(summary: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ok: false,
            need_confirm: false,
            summary: summary.into(),
            data: Value::Null,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(error.into()),
            metrics: Metrics::none(),
        }
    }

    /// 확인 대기 응답. 아무것도 실행되지 않았음
    pub fn need_confirm(summary: impl Into<String>) -> Self {
        Self {
            ok: false,
            need_confirm: true,
            summary: summary.into(),
            data: Value::Null,
            stdout: String::new(),
            stderr: String::new(),
            error: None,
            metrics: Metrics::none(),
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self.stderr = stderr.into();
        self
    }

    pub fn with_metrics(mut self, elapsed_ms: u64, exit_code: i32) -> Self {
        self.metrics = Metrics {
            elapsed_ms,
            exit_code,
        };
        self
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_list_tools_minimal() {
        let request: Request = serde_json::from_str(r#"{"method": "list_tools"}"#).unwrap();

        assert_eq!(request.method, RequestMethod::ListTools);
        assert!(request.name.is_none());
        assert!(request.args.is_none());
        assert!(!request.confirm);
    }

    #[test]
    fn test_request_call_tool_full() {
        let request: Request = serde_json::from_str(
            r#"{"method": "call_tool", "name": "disk_space", "args": {"path": "/var"}, "confirm": true}"#,
        )
        .unwrap();

        assert_eq!(request.method, RequestMethod::CallTool);
        assert_eq!(request.name.as_deref(), Some("disk_space"));
        assert_eq!(request.args, Some(json!({"path": "/var"})));
        assert!(request.confirm);
    }

    #[test]
    fn test_request_unknown_method_rejected() {
        let result: Result<Request, _> = serde_json::from_str(r#"{"method": "drop_tables"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_envelope_serializes_every_field() {
        let envelope = ResponseEnvelope::ok("Disk usage reported")
            .with_output("51% used", "")
            .with_metrics(12, 0);

        let value = serde_json::to_value(&envelope).unwrap();
        let object = value.as_object().unwrap();

        // 여덟 필드 전부, 항상
        for key in [
            "ok",
            "need_confirm",
            "summary",
            "data",
            "stdout",
            "stderr",
            "error",
            "metrics",
        ] {
            assert!(object.contains_key(key), "missing field: {}", key);
        }

        assert_eq!(value["ok"], json!(true));
        assert_eq!(value["need_confirm"], json!(false));
        assert_eq!(value["data"], Value::Null);
        assert_eq!(value["error"], Value::Null);
        assert_eq!(value["metrics"]["elapsed_ms"], json!(12));
        assert_eq!(value["metrics"]["exit_code"], json!(0));
    }

    #[test]
    fn test_failure_envelope() {
        let envelope = ResponseEnvelope::failure("Validation failed", "args.path: not a string")
            .with_data(json!({"errors": [{"field": "path", "reason": "not a string"}]}));

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["need_confirm"], json!(false));
        assert_eq!(value["error"], json!("args.path: not a string"));
        assert_eq!(value["data"]["errors"][0]["field"], json!("path"));
        assert_eq!(value["metrics"]["exit_code"], json!(-1));
    }

    #[test]
    fn test_need_confirm_envelope() {
        let envelope = ResponseEnvelope::need_confirm("blog_publish requires confirmation");

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["need_confirm"], json!(true));
        assert_eq!(value["error"], Value::Null);
        assert_eq!(value["stdout"], json!(""));
    }

    #[test]
    fn test_metrics_default_means_no_process() {
        let metrics = Metrics::none();
        assert_eq!(metrics.elapsed_ms, 0);
        assert_eq!(metrics.exit_code, -1);
    }
}
