//! 错误恢复引擎
//!
//! 根据 StudioError 类型返回 RecoveryAction；没有任何错误会终止进程。

use crate::core::{RecoveryAction, StudioError};

/// 序列生成失败时展示给用户的消息
pub const GENERATION_FAILURE_MESSAGE: &str = "Connection timeout or AI error. Please try again.";
/// 练习会话建立失败时展示给用户的消息
pub const SESSION_FAILURE_MESSAGE: &str = "Audio session could not be established.";

#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &StudioError) -> RecoveryAction {
        match err {
            StudioError::GenerationFailure(_) => RecoveryAction::KeepSequence {
                message: GENERATION_FAILURE_MESSAGE.to_string(),
            },
            StudioError::EnrichmentFailure { id, .. } => RecoveryAction::MarkItem { id: *id },
            StudioError::SessionFailure(_) => RecoveryAction::ReturnToIdle {
                message: SESSION_FAILURE_MESSAGE.to_string(),
            },
            StudioError::EmptySequence
            | StudioError::SessionBusy
            | StudioError::GenerationBusy
            | StudioError::UnknownPose(_) => RecoveryAction::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::CanvasId;

    #[test]
    fn test_recovery_generation_failure_keeps_sequence() {
        let engine = RecoveryEngine::new();
        let action = engine.handle(&StudioError::GenerationFailure("timeout".into()));
        match action {
            RecoveryAction::KeepSequence { message } => {
                assert_eq!(message, GENERATION_FAILURE_MESSAGE);
            }
            _ => panic!("Expected KeepSequence"),
        }
    }

    #[test]
    fn test_recovery_enrichment_failure_is_local() {
        let engine = RecoveryEngine::new();
        let id = CanvasId::new();
        let action = engine.handle(&StudioError::EnrichmentFailure {
            id,
            reason: "500".into(),
        });
        assert_eq!(action, RecoveryAction::MarkItem { id });
    }

    #[test]
    fn test_recovery_session_failure_returns_to_idle() {
        let engine = RecoveryEngine::new();
        let action = engine.handle(&StudioError::SessionFailure("tts".into()));
        assert!(matches!(action, RecoveryAction::ReturnToIdle { .. }));
    }

    #[test]
    fn test_recovery_rejected_commands_are_ignored() {
        let engine = RecoveryEngine::new();
        assert_eq!(engine.handle(&StudioError::EmptySequence), RecoveryAction::Ignore);
        assert_eq!(engine.handle(&StudioError::SessionBusy), RecoveryAction::Ignore);
        assert_eq!(engine.handle(&StudioError::GenerationBusy), RecoveryAction::Ignore);
    }
}
