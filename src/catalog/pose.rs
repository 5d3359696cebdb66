//! 体式元数据：Pose、类别、难度
//!
//! 目录条目与画布条目共用同一个 Pose 结构；画布持有 Pose 的快照副本。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 体式类别（与体式库侧栏的筛选按钮一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoseCategory {
    Standing,
    Seated,
    Kneeling,
    Inversion,
    Balance,
    Supine,
    Prone,
}

impl PoseCategory {
    /// 侧栏筛选按钮的顺序
    pub const ALL: [PoseCategory; 7] = [
        PoseCategory::Standing,
        PoseCategory::Seated,
        PoseCategory::Kneeling,
        PoseCategory::Inversion,
        PoseCategory::Balance,
        PoseCategory::Supine,
        PoseCategory::Prone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PoseCategory::Standing => "Standing",
            PoseCategory::Seated => "Seated",
            PoseCategory::Kneeling => "Kneeling",
            PoseCategory::Inversion => "Inversion",
            PoseCategory::Balance => "Balance",
            PoseCategory::Supine => "Supine",
            PoseCategory::Prone => "Prone",
        }
    }
}

impl fmt::Display for PoseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoseCategory {
    type Err = String;

    /// 大小写不敏感；模型偶尔会返回 "standing" 或 " Prone "
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        PoseCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown pose category: {s}"))
    }
}

/// 难度
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        [Difficulty::Beginner, Difficulty::Intermediate, Difficulty::Advanced]
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown difficulty: {s}"))
    }
}

/// 强度上限（含）
pub const MAX_INTENSITY: u8 = 10;

/// 单个体式（目录条目，不可变）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pose {
    pub id: String,
    pub name: String,
    pub category: PoseCategory,
    pub difficulty: Difficulty,
    /// 0–10
    pub intensity: u8,
    /// 展示用时长，如 "1 min"、"30s each side"
    pub duration: String,
    pub description: String,
    pub benefits: String,
    pub breathing_guidance: String,
    /// 静态配图；目录条目一般都有
    pub image_url: Option<String>,
    /// 生成配图时使用的提示词；缺省时用 name
    pub image_prompt: Option<String>,
}

impl Pose {
    /// 生成配图时实际使用的提示词
    pub fn prompt_text(&self) -> &str {
        self.image_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.name)
    }
}
