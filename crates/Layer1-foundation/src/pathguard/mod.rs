//! Path Guard - 경로 검증
//!
//! 파일 작업을 이름 붙은 루트 내부로 제한합니다.
//!
//! ## 기능
//! - 상대 경로만 허용 (절대 경로 입력 거부)
//! - path traversal 방지 (`..` 탈출 거부)
//! - 심볼릭 링크 해석 후 루트 포함 여부 확인
//! - 루트 의도(read/write)와 접근 종류 대조
//!
//! 위반은 보정하지 않고 거부하며, 보안 이벤트로 경고 로그를 남깁니다.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::config::{RootConfig, RootIntent};
use crate::error::Error;

// ============================================================================
// Access
// ============================================================================

/// 요청된 접근 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }

    fn allowed_by(&self, intent: RootIntent) -> bool {
        match self {
            Self::Read => intent.allows_read(),
            Self::Write => intent.allows_write(),
        }
    }
}

// ============================================================================
// Path Violation
// ============================================================================

/// 경로 검증 위반
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathViolation {
    /// 정의되지 않은 루트 참조
    UnknownRoot { name: String },

    /// 루트 의도와 접근 종류 불일치
    IntentMismatch {
        root: String,
        intent: RootIntent,
        access: Access,
    },

    /// 절대 경로 입력 (루트 상대 경로만 허용)
    AbsolutePath { path: PathBuf },

    /// `..` 로 루트 탈출 시도
    Traversal { path: PathBuf },

    /// 해석 결과가 루트 밖 (심볼릭 링크 탈출 포함)
    OutsideRoot {
        path: PathBuf,
        resolved: PathBuf,
        root: PathBuf,
    },

    /// 경로 해석 실패
    Unresolvable { path: PathBuf, reason: String },
}

impl PathViolation {
    pub fn message(&self) -> String {
        match self {
            PathViolation::UnknownRoot { name } => {
                format!("Unknown path root '{}'", name)
            }
            PathViolation::IntentMismatch {
                root,
                intent,
                access,
            } => format!(
                "Root '{}' is {} but {} access was requested",
                root,
                intent.as_str(),
                access.as_str()
            ),
            PathViolation::AbsolutePath { path } => {
                format!("Absolute path not allowed: {}", path.display())
            }
            PathViolation::Traversal { path } => {
                format!("Path escapes its root: {}", path.display())
            }
            PathViolation::OutsideRoot { path, resolved, root } => format!(
                "Path '{}' resolves to '{}' outside root '{}'",
                path.display(),
                resolved.display(),
                root.display()
            ),
            PathViolation::Unresolvable { path, reason } => {
                format!("Cannot resolve path '{}': {}", path.display(), reason)
            }
        }
    }
}

impl From<PathViolation> for Error {
    fn from(violation: PathViolation) -> Self {
        match violation {
            PathViolation::UnknownRoot { name } => Error::UnknownRoot(name),
            other => Error::PathViolation(other.message()),
        }
    }
}

// ============================================================================
// Path Validator
// ============================================================================

/// 경로 검증기
///
/// 루트 목록은 생성 후 불변입니다.
pub struct PathValidator {
    roots: Vec<RootConfig>,
}

impl PathValidator {
    /// 새 검증기 생성
    pub fn new(roots: Vec<RootConfig>) -> Self {
        Self { roots }
    }

    /// 루트 이름 목록
    pub fn root_names(&self) -> Vec<&str> {
        self.roots.iter().map(|r| r.name.as_str()).collect()
    }

    /// 이름으로 루트 조회
    pub fn root(&self, name: &str) -> Option<&RootConfig> {
        self.roots.iter().find(|r| r.name == name)
    }

    /// 루트 상대 경로를 절대 경로로 해석
    ///
    /// 성공 시 루트 내부임이 보장된 절대 경로를 돌려줍니다.
    /// 쓰기 대상처럼 아직 없는 경로는 실재하는 가장 깊은 조상까지
    /// canonicalize 한 뒤 나머지를 이어붙여 검사합니다.
    pub fn resolve(
        &self,
        root_name: &str,
        relative: &Path,
        access: Access,
    ) -> Result<PathBuf, PathViolation> {
        let result = self.resolve_inner(root_name, relative, access);

        if let Err(ref violation) = result {
            warn!(
                root = root_name,
                path = %relative.display(),
                access = access.as_str(),
                "Path violation: {}",
                violation.message()
            );
        }

        result
    }

    fn resolve_inner(
        &self,
        root_name: &str,
        relative: &Path,
        access: Access,
    ) -> Result<PathBuf, PathViolation> {
        let root = self.root(root_name).ok_or_else(|| PathViolation::UnknownRoot {
            name: root_name.to_string(),
        })?;

        if !access.allowed_by(root.intent) {
            return Err(PathViolation::IntentMismatch {
                root: root.name.clone(),
                intent: root.intent,
                access,
            });
        }

        if relative.is_absolute() {
            return Err(PathViolation::AbsolutePath {
                path: relative.to_path_buf(),
            });
        }

        // 어휘적 정규화: `.` 무시, `..` 는 스택 pop, 시작점 위로 pop 시도는 탈출
        let normalized = normalize_relative(relative).ok_or_else(|| PathViolation::Traversal {
            path: relative.to_path_buf(),
        })?;

        let root_canon = root.path.canonicalize().map_err(|e| PathViolation::Unresolvable {
            path: root.path.clone(),
            reason: e.to_string(),
        })?;

        let joined = root_canon.join(&normalized);

        // 심볼릭 링크까지 따라간 실제 위치 확인
        let resolved = resolve_existing_prefix(&joined).map_err(|e| PathViolation::Unresolvable {
            path: joined.clone(),
            reason: e.to_string(),
        })?;

        if !resolved.starts_with(&root_canon) {
            return Err(PathViolation::OutsideRoot {
                path: relative.to_path_buf(),
                resolved,
                root: root_canon,
            });
        }

        Ok(resolved)
    }
}

/// 상대 경로의 어휘적 정규화
///
/// 루트 위로 올라가는 `..` 가 있으면 None.
fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<std::ffi::OsString> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return None;
                }
            }
            Component::Normal(name) => parts.push(name.to_os_string()),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(parts.iter().collect())
}

/// 실재하는 가장 깊은 조상까지 canonicalize 후 나머지를 이어붙임
///
/// 전체가 존재하면 전체 canonicalize 결과와 같습니다.
fn resolve_existing_prefix(path: &Path) -> std::io::Result<PathBuf> {
    if path.exists() {
        return path.canonicalize();
    }

    let mut existing = path.to_path_buf();
    let mut remainder: Vec<std::ffi::OsString> = Vec::new();

    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                remainder.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no existing ancestor",
                ))
            }
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in remainder.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

// ============================================================================
// 테스트
// ============================================================================
