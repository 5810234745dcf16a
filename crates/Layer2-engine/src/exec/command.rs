//! Command Runner - 하위 프로세스 실행
//!
//! argv 벡터를 셸 없이 직접 실행합니다. 문자열 연결로 명령을
//! 만들지 않으므로 셸 주입 벡터 자체가 존재하지 않습니다.
//!
//! - stdout/stderr 는 각각 독립 상한으로 수집
//! - 타임아웃 시 프로세스를 강제 종료하되 그때까지 수집된 출력은 유지
//! - 종료 코드가 없으면 (시그널 종료 등) -1

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use opsgate_foundation::{Error, Result};

// ============================================================================
// 결과 타입
// ============================================================================

/// 상한 적용 후의 스트림 한쪽
#[derive(Debug, Clone, Default)]
pub struct CapturedStream {
    /// 보존된 출력 (UTF-8 손실 변환)
    pub text: String,
    /// 상한 초과로 버려진 바이트 수
    pub truncated_bytes: u64,
}

/// 하위 프로세스 실행 결과
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// 종료 코드. 시그널 종료/타임아웃이면 -1
    pub exit_code: i32,
    /// 타임아웃으로 강제 종료되었는지
    pub timed_out: bool,
    pub stdout: CapturedStream,
    pub stderr: CapturedStream,
    pub elapsed: Duration,
}

impl CommandOutcome {
    /// 정상 완료 + 종료 코드 0
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

// ============================================================================
// 실행
// ============================================================================

/// 프로그램 + 인자 벡터 실행
///
/// stdin 은 닫힌 채로 실행됩니다. 대화형 프로그램은 EOF 를 받습니다.
pub async fn run_argv(
    program: &str,
    args: &[String],
    timeout: Duration,
    output_limit: usize,
) -> Result<CommandOutcome> {
    let started = Instant::now();

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::tool_execution(program, format!("failed to spawn: {}", e)))?;

    // 리더는 별도 태스크로. 타임아웃이 wait 쪽에서 터져도
    // 그 시점까지 읽힌 출력이 리더 태스크에 남는다.
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let stdout_task = tokio::spawn(async move {
        match stdout_pipe {
            Some(pipe) => read_capped(pipe, output_limit).await,
            None => CapturedStream::default(),
        }
    });
    let stderr_task = tokio::spawn(async move {
        match stderr_pipe {
            Some(pipe) => read_capped(pipe, output_limit).await,
            None => CapturedStream::default(),
        }
    });

    let (timed_out, exit_code) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => (false, status.code().unwrap_or(-1)),
        Ok(Err(e)) => {
            return Err(Error::tool_execution(
                program,
                format!("failed to wait for child: {}", e),
            ));
        }
        Err(_) => {
            // kill 은 자식을 종료하고 회수까지 끝낸다. 파이프가 닫히며
            // 리더 태스크는 EOF 로 자연 종료된다.
            let _ = child.kill().await;
            (true, -1)
        }
    };

    let (stdout, stderr) = tokio::join!(stdout_task, stderr_task);
    let stdout = stdout.unwrap_or_default();
    let stderr = stderr.unwrap_or_default();

    Ok(CommandOutcome {
        exit_code,
        timed_out,
        stdout,
        stderr,
        elapsed: started.elapsed(),
    })
}

/// 상한까지만 보존하며 끝까지 읽기
///
/// 상한 도달 후에도 파이프는 계속 비운다. 자식이 가득 찬 파이프에
/// 막혀 멈추지 않아야 한다.
async fn read_capped<R>(mut reader: R, limit: usize) -> CapturedStream
where
    R: AsyncRead + Unpin,
{
    let mut kept: Vec<u8> = Vec::new();
    let mut withheld: u64 = 0;
    let mut buf = [0u8; 8192];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                if kept.len() < limit {
                    let take = (limit - kept.len()).min(n);
                    kept.extend_from_slice(&buf[..take]);
                    withheld += (n - take) as u64;
                } else {
                    withheld += n as u64;
                }
            }
            Err(_) => break,
        }
    }

    CapturedStream {
        text: String::from_utf8_lossy(&kept).into_owned(),
        truncated_bytes: withheld,
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: usize = 64 * 1024;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_echo_succeeds() {
        let outcome = run_argv("echo", &argv(&["hello"]), Duration::from_secs(5), LIMIT)
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.exit_code, 0);
        assert!(!outcome.timed_out);
        assert_eq!(outcome.stdout.text.trim(), "hello");
        assert_eq!(outcome.stdout.truncated_bytes, 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_code() {
        let outcome = run_argv("false", &argv(&[]), Duration::from_secs(5), LIMIT)
            .await
            .unwrap();

        assert!(!outcome.success());
        assert_eq!(outcome.exit_code, 1);
    }

    #[tokio::test]
    async fn test_stderr_captured_separately() {
        let outcome = run_argv(
            "sh",
            &argv(&["-c", "echo out; echo oops >&2; exit 2"]),
            Duration::from_secs(5),
            LIMIT,
        )
        .await
        .unwrap();

        assert_eq!(outcome.exit_code, 2);
        assert_eq!(outcome.stdout.text.trim(), "out");
        assert_eq!(outcome.stderr.text.trim(), "oops");
    }

    #[tokio::test]
    async fn test_timeout_kills_and_keeps_partial_output() {
        let started = Instant::now();
        let outcome = run_argv(
            "sh",
            &argv(&["-c", "echo started; sleep 30"]),
            Duration::from_millis(300),
            LIMIT,
        )
        .await
        .unwrap();

        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, -1);
        assert_eq!(outcome.stdout.text.trim(), "started");
        // sleep 30 을 기다리지 않았음
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_output_cap_reports_withheld_bytes() {
        let outcome = run_argv(
            "seq",
            &argv(&["1", "100000"]),
            Duration::from_secs(10),
            1024,
        )
        .await
        .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.stdout.text.len(), 1024);
        assert!(outcome.stdout.truncated_bytes > 0);
        assert_eq!(outcome.stderr.truncated_bytes, 0);
    }

    #[tokio::test]
    async fn test_caps_are_independent() {
        let outcome = run_argv(
            "sh",
            &argv(&["-c", "seq 1 100000; echo small >&2"]),
            Duration::from_secs(10),
            512,
        )
        .await
        .unwrap();

        assert!(outcome.stdout.truncated_bytes > 0);
        assert_eq!(outcome.stderr.text.trim(), "small");
        assert_eq!(outcome.stderr.truncated_bytes, 0);
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let result = run_argv(
            "/nonexistent/opsgate-test-binary",
            &argv(&[]),
            Duration::from_secs(5),
            LIMIT,
        )
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_argv_is_not_a_shell() {
        // 인자 안의 셸 메타문자는 문자 그대로 전달된다
        let outcome = run_argv(
            "echo",
            &argv(&["a; rm -rf /", "&&", "$(whoami)"]),
            Duration::from_secs(5),
            LIMIT,
        )
        .await
        .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.stdout.text.trim(), "a; rm -rf / && $(whoami)");
    }
}
