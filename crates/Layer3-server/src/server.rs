//! Stdio Server - 표준 입출력 게이트웨이
//!
//! 한 줄에 JSON 요청 하나, 한 줄에 JSON 응답 하나. 요청은 도착
//! 순서대로 처리되며 응답도 같은 순서로 나갑니다. stdin 이 닫히면
//! 종료합니다. 로그는 전부 stderr 로 나가므로 stdout 은 와이어
//! 전용입니다.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing::{info, warn};

use opsgate_engine::{Engine, Request, ResponseEnvelope};

/// stdio 루프 실행
pub async fn run(engine: Engine) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();
    let mut writer = BufWriter::new(stdout);

    info!(tools = engine.registry().len(), "Gateway listening on stdio");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let envelope = match serde_json::from_str::<Request>(line) {
            Ok(request) => engine.handle(&request).await,
            Err(e) => {
                warn!(error = %e, "Discarding malformed request line");
                ResponseEnvelope::failure("Malformed request", format!("invalid request: {}", e))
            }
        };

        let payload = serde_json::to_string(&envelope)?;
        writer.write_all(payload.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}
