//! Publish Tree - 파일 트리 발행
//!
//! 읽기 루트에서 쓰기 루트로 파일을 복사합니다. 패턴은 리터럴
//! 경로 또는 glob 이며, 매치된 파일 하나하나가 양쪽 루트에서
//! 다시 검증됩니다. 디렉터리는 건너뛰고 파일만 복사합니다.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use opsgate_foundation::{Access, Error, PathValidator, Result};

/// 발행 결과 집계
#[derive(Debug, Clone, Default)]
pub struct PublishOutcome {
    /// 복사된 파일 수 (중복 매치는 한 번만 센다)
    pub files_written: u64,
    /// 복사된 총 바이트
    pub bytes_written: u64,
}

/// 패턴 목록을 발행
///
/// - 리터럴 패턴: 소스에 없으면 에러
/// - glob 패턴: 매치 0건은 정상 (files_written 0)
/// - 대상 파일이 이미 있으면 덮어씀
pub async fn publish_tree(
    validator: &PathValidator,
    source_root: &str,
    dest_root: &str,
    patterns: &[String],
) -> Result<PublishOutcome> {
    let source_base = validator.resolve(source_root, Path::new("."), Access::Read)?;

    let mut outcome = PublishOutcome::default();
    let mut written: HashSet<PathBuf> = HashSet::new();

    for pattern in patterns {
        if pattern.is_empty() {
            return Err(Error::InvalidInput("empty publish pattern".to_string()));
        }

        if is_glob(pattern) {
            publish_glob(
                validator,
                source_root,
                dest_root,
                &source_base,
                pattern,
                &mut written,
                &mut outcome,
            )
            .await?;
        } else {
            publish_literal(
                validator,
                source_root,
                dest_root,
                pattern,
                &mut written,
                &mut outcome,
            )
            .await?;
        }
    }

    debug!(
        source = source_root,
        dest = dest_root,
        files = outcome.files_written,
        bytes = outcome.bytes_written,
        "Publish complete"
    );

    Ok(outcome)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

async fn publish_literal(
    validator: &PathValidator,
    source_root: &str,
    dest_root: &str,
    pattern: &str,
    written: &mut HashSet<PathBuf>,
    outcome: &mut PublishOutcome,
) -> Result<()> {
    let rel = Path::new(pattern);
    let src = validator.resolve(source_root, rel, Access::Read)?;

    if !src.is_file() {
        return Err(Error::InvalidInput(format!(
            "source file not found: {}",
            pattern
        )));
    }

    let dest = validator.resolve(dest_root, rel, Access::Write)?;
    copy_once(&src, &dest, rel, written, outcome).await
}

async fn publish_glob(
    validator: &PathValidator,
    source_root: &str,
    dest_root: &str,
    source_base: &Path,
    pattern: &str,
    written: &mut HashSet<PathBuf>,
    outcome: &mut PublishOutcome,
) -> Result<()> {
    // glob 은 루트 밑에서만 전개. `..` 와 절대 경로는 전개 전에 거부.
    for component in Path::new(pattern).components() {
        match component {
            Component::ParentDir => {
                warn!(pattern, "Path violation: glob pattern escapes its root");
                return Err(Error::PathViolation(format!(
                    "glob pattern escapes its root: {}",
                    pattern
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                warn!(pattern, "Path violation: absolute glob pattern");
                return Err(Error::PathViolation(format!(
                    "absolute glob pattern not allowed: {}",
                    pattern
                )));
            }
            _ => {}
        }
    }

    let full = source_base.join(pattern);
    let full = full.to_string_lossy();
    let entries = glob::glob(&full)
        .map_err(|e| Error::InvalidInput(format!("invalid glob pattern '{}': {}", pattern, e)))?;

    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(pattern, error = %e, "Skipping unreadable glob entry");
                continue;
            }
        };

        if !path.is_file() {
            continue;
        }

        let rel = match path.strip_prefix(source_base) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => {
                warn!(path = %path.display(), "Glob match outside source base, skipping");
                continue;
            }
        };

        // 매치된 파일도 개별 재검증 (심볼릭 링크 탈출 차단)
        let src = validator.resolve(source_root, &rel, Access::Read)?;
        let dest = validator.resolve(dest_root, &rel, Access::Write)?;
        copy_once(&src, &dest, &rel, written, outcome).await?;
    }

    Ok(())
}

async fn copy_once(
    src: &Path,
    dest: &Path,
    rel: &Path,
    written: &mut HashSet<PathBuf>,
    outcome: &mut PublishOutcome,
) -> Result<()> {
    if !written.insert(rel.to_path_buf()) {
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::Internal(format!(
                "failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let bytes = tokio::fs::copy(src, dest).await.map_err(|e| {
        Error::Internal(format!(
            "failed to copy {} -> {}: {}",
            src.display(),
            dest.display(),
            e
        ))
    })?;

    outcome.files_written += 1;
    outcome.bytes_written += bytes;
    Ok(())
}

// ============================================================================
// 테스트
// ============================================================================
