//! 编排层错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：每种错误都把系统带回明确的前一状态（画布不变 / 会话回到 Idle）。

use thiserror::Error;

use crate::flow::CanvasId;

/// 编排过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StudioError {
    /// 序列生成失败或超时：画布保持不变，输入保留以便重试
    #[error("Sequence generation failed: {0}")]
    GenerationFailure(String),

    /// 单个配图请求失败：只记录在该条目上
    #[error("Image enrichment failed for {id}: {reason}")]
    EnrichmentFailure { id: CanvasId, reason: String },

    /// 引导词或语音合成失败：会话回到 Idle
    #[error("Practice session failed: {0}")]
    SessionFailure(String),

    #[error("Sequence is empty")]
    EmptySequence,

    #[error("A practice session is already active")]
    SessionBusy,

    #[error("A sequence is already being generated")]
    GenerationBusy,

    #[error("Unknown pose: {0}")]
    UnknownPose(String),
}

/// 恢复引擎根据错误类型给出的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryAction {
    /// 画布保持不变，向用户展示消息
    KeepSequence { message: String },
    /// 仅在该条目上标记错误，不做全局提示
    MarkItem { id: CanvasId },
    /// 会话回到 Idle，向用户展示消息
    ReturnToIdle { message: String },
    /// 被拒绝的命令：记录日志即可
    Ignore,
}
