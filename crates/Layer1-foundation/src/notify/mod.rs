//! Notify - 운영 알림
//!
//! 호출 결과를 ntfy 스타일 HTTP POST로 전달합니다.
//! 전달은 best-effort: 실패해도 호출 결과에는 영향을 주지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::audit::AuditStatus;
use crate::config::NotifyConfig;
use crate::error::{Error, Result};

// ============================================================================
// Notify Priority
// ============================================================================

/// 알림 긴급도
///
/// 순서 비교 가능: Low < Default < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NotifyPriority {
    /// 성공 보고
    Low,
    /// 확인 대기
    Default,
    /// 실패/보안 이벤트
    High,
}

impl NotifyPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Default => "default",
            Self::High => "high",
        }
    }

    /// 상태에서 긴급도 유도 (성공 < 확인 대기 < 실패)
    pub fn for_status(status: AuditStatus) -> Self {
        match status {
            AuditStatus::Ok => Self::Low,
            AuditStatus::NeedConfirm => Self::Default,
            AuditStatus::Fail => Self::High,
        }
    }

    /// ntfy 숫자 우선순위 (전송 전용 표현)
    fn ntfy_level(&self) -> u8 {
        match self {
            Self::Low => 3,
            Self::Default => 4,
            Self::High => 5,
        }
    }
}

// ============================================================================
// Notify Message
// ============================================================================

/// 알림 메시지
#[derive(Debug, Clone)]
pub struct NotifyMessage {
    /// 토픽 (없으면 기본 토픽 사용)
    pub topic: Option<String>,

    /// 제목
    pub title: String,

    /// 본문
    pub body: String,

    /// 긴급도
    pub priority: NotifyPriority,

    /// 태그
    pub tags: Vec<String>,
}

impl NotifyMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            topic: None,
            title: title.into(),
            body: body.into(),
            priority: NotifyPriority::Default,
            tags: Vec::new(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn with_priority(mut self, priority: NotifyPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

// ============================================================================
// Notify Sink
// ============================================================================

/// 알림 싱크
///
/// 전송 실패는 Err로 돌려주되, 호출자는 경고 로그 이상으로 취급하지 않습니다.
#[async_trait]
pub trait NotifySink: Send + Sync {
    async fn send(&self, message: &NotifyMessage) -> Result<()>;

    /// 실제 전송 가능 여부
    fn is_enabled(&self) -> bool {
        true
    }
}

/// 비활성 싱크 (알림 미설정 시)
pub struct NullSink;

#[async_trait]
impl NotifySink for NullSink {
    async fn send(&self, _message: &NotifyMessage) -> Result<()> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

// ============================================================================
// Ntfy Notifier
// ============================================================================

/// ntfy 스타일 HTTP 알림
///
/// `POST {base_url}/{topic}` + Title/Priority/Tags 헤더.
pub struct NtfyNotifier {
    client: reqwest::Client,
    base_url: String,
    default_topic: Option<String>,
}

impl NtfyNotifier {
    pub fn new(config: &NotifyConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_ref()
            .ok_or_else(|| Error::Notify("notify.baseUrl is not set".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("OpsGate/0.1")
            .build()
            .unwrap_or_default();

        Ok(Self {
            client,
            base_url,
            default_topic: config.default_topic.clone(),
        })
    }
}

#[async_trait]
impl NotifySink for NtfyNotifier {
    async fn send(&self, message: &NotifyMessage) -> Result<()> {
        let topic = message
            .topic
            .as_deref()
            .or(self.default_topic.as_deref())
            .ok_or_else(|| Error::Notify("No topic for notification".to_string()))?;

        let url = format!("{}/{}", self.base_url, topic);

        let mut request = self
            .client
            .post(&url)
            .header("Title", message.title.as_str())
            .header("Priority", message.priority.ntfy_level().to_string())
            .body(message.body.clone());

        if !message.tags.is_empty() {
            request = request.header("Tags", message.tags.join(","));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Notify(format!("POST {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Notify(format!(
                "POST {} returned {}",
                url,
                response.status()
            )));
        }

        Ok(())
    }
}

/// 설정에 맞는 싱크 구성
pub fn build_sink(config: &NotifyConfig) -> Result<Arc<dyn NotifySink>> {
    if config.enabled {
        Ok(Arc::new(NtfyNotifier::new(config)?))
    } else {
        Ok(Arc::new(NullSink))
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_is_ordered() {
        assert!(NotifyPriority::Low < NotifyPriority::Default);
        assert!(NotifyPriority::Default < NotifyPriority::High);
    }

    #[test]
    fn test_priority_for_status() {
        assert_eq!(
            NotifyPriority::for_status(AuditStatus::Ok),
            NotifyPriority::Low
        );
        assert_eq!(
            NotifyPriority::for_status(AuditStatus::NeedConfirm),
            NotifyPriority::Default
        );
        assert_eq!(
            NotifyPriority::for_status(AuditStatus::Fail),
            NotifyPriority::High
        );
    }

    #[test]
    fn test_message_builder() {
        let message = NotifyMessage::new("blog_publish ok", "3 files written")
            .with_topic("ops")
            .with_priority(NotifyPriority::Low)
            .with_tag("white_check_mark");

        assert_eq!(message.topic.as_deref(), Some("ops"));
        assert_eq!(message.priority, NotifyPriority::Low);
        assert_eq!(message.tags, vec!["white_check_mark"]);
    }

    #[tokio::test]
    async fn test_null_sink_is_disabled_noop() {
        let sink = NullSink;
        assert!(!sink.is_enabled());
        assert!(sink.send(&NotifyMessage::new("t", "b")).await.is_ok());
    }

    #[test]
    fn test_build_sink_disabled_by_default() {
        let sink = build_sink(&NotifyConfig::default()).unwrap();
        assert!(!sink.is_enabled());
    }

    #[test]
    fn test_ntfy_requires_base_url() {
        let config = NotifyConfig {
            enabled: true,
            base_url: None,
            ..Default::default()
        };
        assert!(NtfyNotifier::new(&config).is_err());
    }

    #[test]
    fn test_ntfy_trims_trailing_slash() {
        let config = NotifyConfig {
            enabled: true,
            base_url: Some("https://ntfy.sh/".to_string()),
            ..Default::default()
        };
        let notifier = NtfyNotifier::new(&config).unwrap();
        assert_eq!(notifier.base_url, "https://ntfy.sh");
    }
}
