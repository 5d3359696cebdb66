//! 状态定义：StudioState 投影
//!
//! UI 只持有 StudioState（画布快照、生成状态、练习会话、错误）；
//! 完整状态由编排器维护，每次变更后重新投影并通过 watch 通道发布。

use serde::Serialize;

use crate::core::practice::PracticeView;
use crate::flow::SequenceSnapshot;

/// 序列生成状态（UI 投影用）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum GenerationStatus {
    Idle,
    /// 进行中，画布保持旧内容
    Loading { intent: String },
}

/// UI 看到的「投影」状态
#[derive(Clone, Debug, Serialize)]
pub struct StudioState {
    pub sequence: SequenceSnapshot,
    pub generation: GenerationStatus,
    pub practice: PracticeView,
    /// 最近一次生成或会话失败的提示；下一次成功操作时清除
    pub error_message: Option<String>,
    /// 仍在等待配图的条目数
    pub pending_images: usize,
    /// 已成功落地的生成次数；UI 据此判断何时清空意图输入
    pub completed_generations: u64,
}

impl Default for StudioState {
    fn default() -> Self {
        Self {
            sequence: SequenceSnapshot::default(),
            generation: GenerationStatus::Idle,
            practice: PracticeView::default(),
            error_message: None,
            pending_images: 0,
            completed_generations: 0,
        }
    }
}

impl StudioState {
    pub fn is_generating(&self) -> bool {
        matches!(self.generation, GenerationStatus::Loading { .. })
    }
}
