//! 画布条目：体式快照 + 画布内唯一 ID + 配图状态

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::catalog::Pose;

/// 画布内唯一标识（与 pose id 无关，同一体式可出现多次）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CanvasId(Uuid);

impl CanvasId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CanvasId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CanvasId {
    /// 取 simple 形式的前 9 位，足够在界面与日志中区分
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..9])
    }
}

/// 画布上的一个体式实例
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SequenceItem {
    pub canvas_id: CanvasId,
    pub pose: Pose,
    /// 已解析的配图（静态图或 AI 生成图）
    pub image_url: Option<String>,
    pub image_loading: bool,
    pub image_error: bool,
}

impl SequenceItem {
    /// 由体式创建条目：有静态图则直接使用，否则标记为加载中等待补全
    pub fn from_pose(pose: Pose) -> Self {
        let image_url = pose.image_url.clone();
        let image_loading = image_url.is_none();
        Self {
            canvas_id: CanvasId::new(),
            pose,
            image_url,
            image_loading,
            image_error: false,
        }
    }

    /// 是否需要异步配图补全
    pub fn needs_image(&self) -> bool {
        self.image_url.is_none() && !self.image_error
    }
}
