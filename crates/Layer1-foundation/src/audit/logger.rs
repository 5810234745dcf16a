//! Audit Logger - JSONL 감사 로거
//!
//! 레코드 하나를 JSON 한 줄로 append-only 파일에 기록합니다.
//! 쓰기는 단일 핸들을 Mutex로 직렬화하므로 동시 호출에도 줄이 섞이지 않습니다.
//! 싱크 장애 시에는 경고 후 바운드 버퍼에 보관하고 다음 성공 시 함께 기록합니다.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::types::AuditRecord;

/// 쓰기 실패 시 메모리에 보관할 최대 레코드 수
const MAX_PENDING_RECORDS: usize = 256;

// ============================================================================
// Audit Logger Config
// ============================================================================

/// 감사 로거 설정
#[derive(Debug, Clone)]
pub struct AuditLoggerConfig {
    /// JSONL 파일 경로
    pub path: PathBuf,

    /// 비활성화 시 모든 기록이 no-op
    pub enabled: bool,
}

impl Default for AuditLoggerConfig {
    fn default() -> Self {
        Self {
            path: default_audit_path(),
            enabled: true,
        }
    }
}

/// 기본 감사 로그 경로 (<data_local_dir>/opsgate/audit.jsonl)
pub fn default_audit_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("opsgate")
        .join("audit.jsonl")
}

// ============================================================================
// Audit Logger
// ============================================================================

struct WriterState {
    file: Option<File>,
    pending: VecDeque<String>,
}

/// JSONL 감사 로거
///
/// 요청 처리와 분리된 단일 쓰기 지점. 기록 실패가 요청을 실패시키지 않습니다.
pub struct AuditLogger {
    config: AuditLoggerConfig,
    inner: Mutex<WriterState>,
}

impl AuditLogger {
    /// 로거 생성
    ///
    /// 싱크를 즉시 열어보고, 실패하면 경고 후 버퍼 모드로 시작합니다.
    pub async fn new(config: AuditLoggerConfig) -> Self {
        let file = if config.enabled {
            match open_append(&config.path).await {
                Ok(file) => {
                    debug!("Audit log open at {}", config.path.display());
                    Some(file)
                }
                Err(e) => {
                    warn!(
                        path = %config.path.display(),
                        error = %e,
                        "Audit sink unavailable, buffering records in memory"
                    );
                    None
                }
            }
        } else {
            None
        };

        Self {
            config,
            inner: Mutex::new(WriterState {
                file,
                pending: VecDeque::new(),
            }),
        }
    }

    /// 비활성 로거 (테스트/드라이런용)
    pub fn disabled() -> Self {
        Self {
            config: AuditLoggerConfig {
                path: PathBuf::new(),
                enabled: false,
            },
            inner: Mutex::new(WriterState {
                file: None,
                pending: VecDeque::new(),
            }),
        }
    }

    /// 감사 레코드 기록
    ///
    /// 호출당 정확히 한 번 호출되어야 합니다. 실패해도 에러를 돌려주지 않고
    /// 경고 로그 + 버퍼링으로 강등됩니다.
    pub async fn record(&self, record: &AuditRecord) {
        if !self.config.enabled {
            return;
        }

        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Audit record serialization failed, dropping");
                return;
            }
        };

        let mut state = self.inner.lock().await;

        state.pending.push_back(line);
        if state.pending.len() > MAX_PENDING_RECORDS {
            state.pending.pop_front();
            warn!("Audit buffer full, dropping oldest record");
        }

        self.try_flush(&mut state).await;
    }

    /// 버퍼에 남은 레코드 수
    pub async fn buffered_count(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    /// 최근 레코드 조회 (최신 순)
    ///
    /// 깨진 줄은 건너뛰고 경고만 남깁니다.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }

        let content = match tokio::fs::read_to_string(&self.config.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Audit(format!(
                    "Cannot read audit log {}: {}",
                    self.config.path.display(),
                    e
                )))
            }
        };

        let mut corrupt = 0usize;
        let mut records: Vec<AuditRecord> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(_) => {
                    corrupt += 1;
                    None
                }
            })
            .collect();

        if corrupt > 0 {
            warn!(count = corrupt, "Skipped corrupt audit log lines");
        }

        records.reverse();
        records.truncate(limit);
        Ok(records)
    }

    /// 감사 로그 파일 경로
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    async fn try_flush(&self, state: &mut WriterState) {
        if state.file.is_none() {
            match open_append(&self.config.path).await {
                Ok(file) => {
                    debug!("Audit sink recovered, flushing buffered records");
                    state.file = Some(file);
                }
                Err(e) => {
                    warn!(
                        pending = state.pending.len(),
                        error = %e,
                        "Audit sink still unavailable"
                    );
                    return;
                }
            }
        }

        while let Some(line) = state.pending.front() {
            let file = match state.file.as_mut() {
                Some(file) => file,
                None => return,
            };

            let mut framed = String::with_capacity(line.len() + 1);
            framed.push_str(line);
            framed.push('\n');

            if let Err(e) = file.write_all(framed.as_bytes()).await {
                warn!(
                    pending = state.pending.len(),
                    error = %e,
                    "Audit write failed, keeping records buffered"
                );
                state.file = None;
                return;
            }

            state.pending.pop_front();
        }

        if let Some(file) = state.file.as_mut() {
            if let Err(e) = file.flush().await {
                warn!(error = %e, "Audit flush failed");
                state.file = None;
            }
        }
    }
}

async fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path).await
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::AuditStatus;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample_record(tool: &str) -> AuditRecord {
        AuditRecord::new(tool, "test@local")
            .with_digest("d1")
            .with_status(AuditStatus::Ok)
            .with_exit_code(0)
    }

    #[tokio::test]
    async fn test_record_appends_one_line_each() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::new(AuditLoggerConfig {
            path: path.clone(),
            enabled: true,
        })
        .await;

        logger.record(&sample_record("disk_space")).await;
        logger.record(&sample_record("container_list")).await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in lines {
            let parsed: AuditRecord = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.caller, "test@local");
        }
    }

    #[tokio::test]
    async fn test_unwritable_sink_buffers_then_recovers() {
        let dir = tempdir().unwrap();
        // 부모 자리에 일반 파일을 놓아 디렉토리 생성을 막음
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "x").unwrap();
        let path = blocker.join("audit.jsonl");

        let logger = AuditLogger::new(AuditLoggerConfig {
            path: path.clone(),
            enabled: true,
        })
        .await;

        logger.record(&sample_record("disk_space")).await;
        assert_eq!(logger.buffered_count().await, 1);

        // 장애 해소 후 다음 기록에서 버퍼까지 함께 flush
        std::fs::remove_file(&blocker).unwrap();
        logger.record(&sample_record("container_list")).await;
        assert_eq!(logger.buffered_count().await, 0);

        let content = std::fs::read_to_string(&path).unwrap();
        let tools: Vec<String> = content
            .lines()
            .map(|l| serde_json::from_str::<AuditRecord>(l).unwrap().tool)
            .collect();
        assert_eq!(tools, vec!["disk_space", "container_list"]);
    }

    #[tokio::test]
    async fn test_recent_returns_newest_first() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::new(AuditLoggerConfig {
            path,
            enabled: true,
        })
        .await;

        logger.record(&sample_record("first")).await;
        logger.record(&sample_record("second")).await;
        logger.record(&sample_record("third")).await;

        let recent = logger.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].tool, "third");
        assert_eq!(recent[1].tool, "second");
    }

    #[tokio::test]
    async fn test_recent_skips_corrupt_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::new(AuditLoggerConfig {
            path: path.clone(),
            enabled: true,
        })
        .await;

        logger.record(&sample_record("good")).await;
        // 손상된 줄 주입
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(f, "{{not json").unwrap();
        }
        logger.record(&sample_record("after")).await;

        let recent = logger.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].tool, "after");
    }

    #[tokio::test]
    async fn test_disabled_logger_is_noop() {
        let logger = AuditLogger::disabled();
        logger.record(&sample_record("disk_space")).await;
        assert_eq!(logger.buffered_count().await, 0);
        assert!(logger.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_records_stay_line_framed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = Arc::new(
            AuditLogger::new(AuditLoggerConfig {
                path: path.clone(),
                enabled: true,
            })
            .await,
        );

        let mut handles = Vec::new();
        for task in 0..8 {
            let logger = Arc::clone(&logger);
            handles.push(tokio::spawn(async move {
                for i in 0..5 {
                    let record = sample_record(&format!("tool-{}-{}", task, i));
                    logger.record(&record).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 40);
        for line in lines {
            assert!(serde_json::from_str::<AuditRecord>(line).is_ok());
        }
    }
}
