//! Execution - 동작 실행
//!
//! 정책이 허가한 동작의 실제 수행을 담당합니다.
//!
//! - `template`: argv 자리 표시자 치환 (요소 경계 보존)
//! - `command`: 셸 없는 하위 프로세스 실행, 타임아웃, 출력 상한
//! - `publish`: 루트 간 파일 트리 복사

pub mod command;
pub mod publish;
pub mod template;

// Re-exports
pub use command::{run_argv, CapturedStream, CommandOutcome};
pub use publish::{publish_tree, PublishOutcome};
pub use template::{argv_placeholders, render_argv};
