//! 게이트웨이 stdio 왕복 통합 테스트
//!
//! 실제 바이너리를 띄워 한 줄 JSON 요청/응답 왕복, 확인 게이트,
//! 경로 차단, 감사 파일까지 바깥에서 검증한다.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_opsgate");

struct Fixture {
    dir: TempDir,
    settings: PathBuf,
}

impl Fixture {
    fn staging(&self) -> PathBuf {
        self.dir.path().join("staging")
    }

    fn public(&self) -> PathBuf {
        self.dir.path().join("public")
    }

    fn audit_file(&self) -> PathBuf {
        self.dir.path().join("audit.jsonl")
    }
}

fn write(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

fn fixture_with_policy(policy: &str) -> Fixture {
    let dir = TempDir::new().unwrap();
    let staging = dir.path().join("staging");
    let public = dir.path().join("public");
    std::fs::create_dir_all(staging.join("posts")).unwrap();
    std::fs::create_dir_all(&public).unwrap();

    write(&staging.join("posts/a.md"), "# first post");
    write(&staging.join("posts/b.md"), "# second post");

    let policy_path = dir.path().join("policy.json");
    write(&policy_path, policy);

    let settings = dir.path().join("settings.json");
    write(
        &settings,
        &format!(
            r#"{{
                "policyPath": "{policy}",
                "roots": [
                    {{"name": "staging", "path": "{staging}", "intent": "read"}},
                    {{"name": "public", "path": "{public}", "intent": "write"}}
                ],
                "exec": {{"allowedPrograms": ["df"]}},
                "audit": {{"enabled": true, "path": "{audit}"}}
            }}"#,
            policy = policy_path.display(),
            staging = staging.display(),
            public = public.display(),
            audit = dir.path().join("audit.jsonl").display(),
        ),
    );

    Fixture { dir, settings }
}

fn fixture() -> Fixture {
    fixture_with_policy(
        r#"{
            "tools": [
                {
                    "name": "disk_space",
                    "description": "Report free disk space",
                    "args": {
                        "type": "object",
                        "properties": {"path": {"type": "string", "default": "/"}}
                    },
                    "action": {"type": "exec", "program": "df", "argv": ["-h", "{path}"]}
                },
                {
                    "name": "blog_publish",
                    "description": "Publish staged posts",
                    "args": {
                        "type": "object",
                        "properties": {
                            "files": {"type": "array", "items": {"type": "string"}, "minItems": 1}
                        },
                        "required": ["files"]
                    },
                    "action": {"type": "publish_tree", "source_root": "staging", "dest_root": "public"},
                    "mutates": true,
                    "requires_confirm": true
                }
            ]
        }"#,
    )
}

/// 요청 줄들을 stdin 으로 흘리고, 응답 줄들과 종료 상태를 돌려받는다
fn run_session(fixture: &Fixture, requests: &[&str]) -> (Vec<Value>, std::process::ExitStatus) {
    let mut child = Command::new(BIN)
        .arg("--config")
        .arg(&fixture.settings)
        .arg("serve")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    {
        let mut stdin = child.stdin.take().unwrap();
        for request in requests {
            writeln!(stdin, "{}", request).unwrap();
        }
        // drop: stdin 닫힘 → 서버는 EOF 에서 종료한다
    }

    let output = child.wait_with_output().unwrap();
    let envelopes = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (envelopes, output.status)
}

fn read_audit_records(fixture: &Fixture) -> Vec<Value> {
    std::fs::read_to_string(fixture.audit_file())
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn test_full_session_over_stdio() {
    let fx = fixture();

    let (responses, status) = run_session(
        &fx,
        &[
            r#"{"method": "list_tools"}"#,
            r#"{"method": "call_tool", "name": "disk_space"}"#,
            r#"{"method": "call_tool", "name": "blog_publish", "args": {"files": ["posts/a.md", "posts/b.md"]}}"#,
            r#"{"method": "call_tool", "name": "blog_publish", "args": {"files": ["posts/a.md", "posts/b.md"]}, "confirm": true}"#,
            r#"{"method": "call_tool", "name": "blog_publish", "args": {"files": ["../../etc/passwd"]}, "confirm": true}"#,
            r#"{"method": "call_tool", "name": "mystery"}"#,
            "this is not json",
            r#"{"method": "list_tools"}"#,
        ],
    );

    assert!(status.success());
    assert_eq!(responses.len(), 8);

    // [0] 카탈로그
    assert_eq!(responses[0]["ok"], Value::Bool(true));
    assert_eq!(responses[0]["data"]["tools"].as_array().unwrap().len(), 2);
    assert_eq!(responses[0]["data"]["tools"][0]["name"], "disk_space");

    // [1] 읽기 전용 exec: 성공, 종료 코드 0
    assert_eq!(responses[1]["ok"], Value::Bool(true));
    assert_eq!(responses[1]["need_confirm"], Value::Bool(false));
    assert_eq!(responses[1]["metrics"]["exit_code"], 0);
    assert!(!responses[1]["stdout"].as_str().unwrap().is_empty());
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
        assert!(
            responses[1].as_object().unwrap().contains_key(key),
            "missing envelope field: {}",
            key
        );
    }

    // [2] 확인 없는 변이 도구: 실행되지 않음
    assert_eq!(responses[2]["ok"], Value::Bool(false));
    assert_eq!(responses[2]["need_confirm"], Value::Bool(true));
    assert!(!fx.public().join("posts/a.md").exists());

    // [3] 확인과 함께: 발행됨
    assert_eq!(responses[3]["ok"], Value::Bool(true));
    assert_eq!(responses[3]["data"]["files_written"], 2);
    let copied = std::fs::read_to_string(fx.public().join("posts/a.md")).unwrap();
    assert_eq!(copied, "# first post");
    assert!(fx.public().join("posts/b.md").is_file());

    // [4] 루트 탈출 경로: 거부
    assert_eq!(responses[4]["ok"], Value::Bool(false));
    assert!(responses[4]["error"]
        .as_str()
        .unwrap()
        .contains("escapes its root"));

    // [5] 미등록 도구: 카탈로그 동봉
    assert_eq!(responses[5]["ok"], Value::Bool(false));
    assert_eq!(responses[5]["data"]["tools"].as_array().unwrap().len(), 2);

    // [6] 깨진 줄: 실패 봉투, 서버는 계속 산다
    assert_eq!(responses[6]["ok"], Value::Bool(false));
    assert_eq!(responses[6]["summary"], "Malformed request");

    // [7] 같은 질문에 같은 답
    assert_eq!(responses[7]["data"]["tools"], responses[0]["data"]["tools"]);
}

#[test]
fn test_audit_trail_covers_every_call() {
    let fx = fixture();

    let (_, status) = run_session(
        &fx,
        &[
            r#"{"method": "call_tool", "name": "disk_space"}"#,
            r#"{"method": "call_tool", "name": "blog_publish", "args": {"files": ["posts/a.md"]}}"#,
            r#"{"method": "call_tool", "name": "blog_publish", "args": {"files": ["posts/a.md"]}, "confirm": true}"#,
            r#"{"method": "call_tool", "name": "blog_publish", "args": {"files": ["../../etc/passwd"]}, "confirm": true}"#,
            r#"{"method": "call_tool", "name": "mystery"}"#,
            r#"{"method": "list_tools"}"#,
        ],
    );
    assert!(status.success());

    let records = read_audit_records(&fx);
    // list_tools 는 기록하지 않는다. call_tool 다섯 건이 다섯 줄.
    assert_eq!(records.len(), 5);

    let statuses: Vec<&str> = records
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["ok", "need_confirm", "ok", "fail", "fail"]);

    for record in &records {
        assert_eq!(record["args_digest"].as_str().unwrap().len(), 64);
        assert!(!record["id"].as_str().unwrap().is_empty());
        assert!(!record["caller"].as_str().unwrap().is_empty());
        // 타임스탬프는 UTC RFC-3339
        let ts = record["ts"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok(), "bad ts: {}", ts);
    }

    assert_eq!(records[1]["mutates"], Value::Bool(true));
    assert_eq!(records[1]["requires_confirm"], Value::Bool(true));
    assert_eq!(records[4]["tool"], "mystery");
}

#[test]
fn test_check_rejects_duplicate_tool_names() {
    let fx = fixture_with_policy(
        r#"{
            "tools": [
                {"name": "disk_space", "action": {"type": "exec", "program": "df", "argv": []}},
                {"name": "disk_space", "action": {"type": "exec", "program": "df", "argv": []}}
            ]
        }"#,
    );

    let output = Command::new(BIN)
        .arg("--config")
        .arg(&fx.settings)
        .arg("check")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Duplicate tool name"), "stderr: {}", stderr);
}

#[test]
fn test_check_rejects_mutating_tool_without_confirm_decision() {
    let fx = fixture_with_policy(
        r#"{
            "tools": [{
                "name": "blog_publish",
                "args": {
                    "type": "object",
                    "properties": {"files": {"type": "array", "items": {"type": "string"}}}
                },
                "action": {"type": "publish_tree", "source_root": "staging", "dest_root": "public"},
                "mutates": true
            }]
        }"#,
    );

    let output = Command::new(BIN)
        .arg("--config")
        .arg(&fx.settings)
        .arg("check")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("requires_confirm"), "stderr: {}", stderr);
}

#[test]
fn test_tools_subcommand_prints_catalog() {
    let fx = fixture();

    let output = Command::new(BIN)
        .arg("--config")
        .arg(&fx.settings)
        .arg("tools")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("disk_space"));
    assert!(stdout.contains("blog_publish"));
}

#[test]
fn test_call_subcommand_exit_codes() {
    let fx = fixture();

    // 성공 → 0
    let output = Command::new(BIN)
        .arg("--config")
        .arg(&fx.settings)
        .arg("call")
        .arg("disk_space")
        .output()
        .unwrap();
    assert!(output.status.success());
    let envelope: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(envelope["ok"], Value::Bool(true));

    // 확인 대기 → 2
    let output = Command::new(BIN)
        .arg("--config")
        .arg(&fx.settings)
        .arg("call")
        .arg("blog_publish")
        .arg("--args")
        .arg(r#"{"files": ["posts/a.md"]}"#)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));

    // 확인 포함 → 0
    let output = Command::new(BIN)
        .arg("--config")
        .arg(&fx.settings)
        .arg("call")
        .arg("blog_publish")
        .arg("--args")
        .arg(r#"{"files": ["posts/a.md"]}"#)
        .arg("--confirm")
        .output()
        .unwrap();
    assert!(output.status.success());

    // 미등록 도구 → 1
    let output = Command::new(BIN)
        .arg("--config")
        .arg(&fx.settings)
        .arg("call")
        .arg("mystery")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}
