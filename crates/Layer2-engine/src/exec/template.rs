//! Argv Template - argv 템플릿 치환
//!
//! 템플릿 원소의 `{name}` 자리에 검증된 인자 값을 끼워 넣습니다.
//! 치환은 항상 원소 하나 안에서 일어나며, 값이 무엇이든 원소가
//! 쪼개지거나 늘어나지 않습니다. 셸 해석 단계 자체가 없습니다.

use serde_json::Value;

use opsgate_foundation::{Error, Result};

/// 템플릿 문자열에서 참조하는 자리 이름들
///
/// `{ident}` 형태만 인식하며 식별자는 `[A-Za-z_][A-Za-z0-9_]*` 입니다.
pub fn placeholders_in(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some((name, end)) = scan_ident(bytes, i + 1) {
                if !names.contains(&name) {
                    names.push(name);
                }
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }

    names
}

/// argv 템플릿 전체가 참조하는 자리 이름들 (중복 제거)
pub fn argv_placeholders(argv: &[String]) -> Vec<String> {
    let mut names = Vec::new();
    for element in argv {
        for name in placeholders_in(element) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// argv 템플릿 렌더링
///
/// `args` 는 스키마 검증을 통과한 정규화 인자여야 합니다.
/// 자리에 해당하는 값이 없으면 에러 (로드 시 검증으로 도달 불가).
pub fn render_argv(argv: &[String], args: &Value) -> Result<Vec<String>> {
    argv.iter().map(|element| render_element(element, args)).collect()
}

fn render_element(template: &str, args: &Value) -> Result<String> {
    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some((name, end)) = scan_ident(bytes, i + 1) {
                let value = args.get(&name).ok_or_else(|| {
                    Error::Internal(format!("template placeholder '{}' has no value", name))
                })?;
                out.push_str(&scalar_to_string(&name, value)?);
                i = end + 1;
                continue;
            }
        }

        // UTF-8 안전: 바이트 단위로 밀되 경계는 char 단위로 복사
        let ch_len = utf8_len(bytes[i]);
        out.push_str(&template[i..i + ch_len]);
        i += ch_len;
    }

    Ok(out)
}

/// `{` 다음 위치부터 식별자 + `}` 를 읽음. 성공 시 (이름, `}` 위치).
fn scan_ident(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut i = start;

    match bytes.get(i) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => i += 1,
        _ => return None,
    }

    while let Some(b) = bytes.get(i) {
        if b.is_ascii_alphanumeric() || *b == b'_' {
            i += 1;
        } else {
            break;
        }
    }

    if bytes.get(i) == Some(&b'}') {
        let name = std::str::from_utf8(&bytes[start..i]).ok()?.to_string();
        Some((name, i))
    } else {
        None
    }
}

fn utf8_len(first_byte: u8) -> usize {
    match first_byte {
        b if b < 0x80 => 1,
        b if b >= 0xF0 => 4,
        b if b >= 0xE0 => 3,
        _ => 2,
    }
}

fn scalar_to_string(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::Internal(format!(
            "template placeholder '{}' must be a scalar",
            name
        ))),
    }
}

// ============================================================================
// 테스트
// ============================================================================
