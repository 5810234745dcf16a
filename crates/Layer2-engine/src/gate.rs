//! Confirmation Gate - 확인 게이트
//!
//! 확인이 필요한 도구의 실행 여부를 판정합니다. 게이트는 상태를
//! 갖지 않습니다. 보류 중인 호출을 기억하지 않으며, 같은 요청은
//! 언제나 같은 판정을 받습니다. 확인은 요청 안의 `confirm` 플래그
//! 하나로 전달됩니다.

use crate::policy::ToolDefinition;

/// 게이트 판정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// 실행 진행
    Proceed,
    /// 확인 필요. 실행하지 않고 need_confirm 응답을 돌려준다.
    NeedConfirm,
}

/// 실행 여부 판정
///
/// 확인이 필요 없는 도구에 `confirm: true` 가 와도 무해합니다.
pub fn decide(definition: &ToolDefinition, confirm: bool) -> GateDecision {
    if definition.confirm_required() && !confirm {
        GateDecision::NeedConfirm
    } else {
        GateDecision::Proceed
    }
}

// ============================================================================
// 테스트
// ============================================================================
