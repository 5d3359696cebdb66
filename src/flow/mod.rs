//! 序列画布层：条目、画布状态与安全检查

pub mod item;
pub mod safety;
pub mod sequence;

pub use item::{CanvasId, SequenceItem};
pub use safety::{evaluate, SafetyWarning};
pub use sequence::{
    ItemView, Sequence, SequenceDefaults, SequenceSnapshot, DEFAULT_DESCRIPTION, DEFAULT_TITLE,
};
