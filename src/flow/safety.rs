//! 解剖学安全检查
//!
//! 纯函数：(体式, 序列位置) → 可选警告。规则按顺序匹配，首条命中即返回。
//! 每次生成快照时按当前顺序重新计算，不做缓存。

use serde::Serialize;

use crate::catalog::{Difficulty, Pose, PoseCategory};

/// 开场强度阈值：大于此值视为高强度
const INTENSE_START_THRESHOLD: u8 = 7;

/// 警告类别
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SafetyWarning {
    /// 第一个体式为高阶或高强度
    IntenseStart,
    /// 以倒立开场
    InversionStart,
    /// 前两个位置出现高阶体式
    ColdPeak,
}

impl SafetyWarning {
    pub fn message(&self) -> &'static str {
        match self {
            SafetyWarning::IntenseStart => {
                "Safety Alert: This advanced pose is high-intensity for a start. \
                 Consider beginning with a gentle warmup like Child's Pose to prevent injury."
            }
            SafetyWarning::InversionStart => {
                "Anatomical Warning: Starting with an inversion requires significant warmup. \
                 Start with grounding poses first."
            }
            SafetyWarning::ColdPeak => {
                "Caution: Your body may not be warm enough for this peak pose yet."
            }
        }
    }
}

pub fn evaluate(pose: &Pose, position: usize) -> Option<SafetyWarning> {
    if position == 0 {
        if pose.difficulty == Difficulty::Advanced || pose.intensity > INTENSE_START_THRESHOLD {
            return Some(SafetyWarning::IntenseStart);
        }
        if pose.category == PoseCategory::Inversion {
            return Some(SafetyWarning::InversionStart);
        }
    }
    if position < 2 && pose.difficulty == Difficulty::Advanced {
        return Some(SafetyWarning::ColdPeak);
    }
    None
}
