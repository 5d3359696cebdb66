//! 序列画布：用户正在编排的有序体式列表（单文档、无分支、无撤销）
//!
//! 存储采用「条目 arena + 顺序向量」：条目按 CanvasId 存放在 HashMap 中，顺序只由 `order`
//! 决定。重排只是 `order` 上的置换，从不重编号；异步配图回调一律按 ID 定位，
//! 条目被删除后回调自然落空。

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::Pose;
use crate::flow::item::{CanvasId, SequenceItem};
use crate::flow::safety::{self, SafetyWarning};

pub const DEFAULT_TITLE: &str = "ZenFlow Personalized";
pub const DEFAULT_DESCRIPTION: &str = "Enter your physical focus to begin.";

/// clear() 时恢复的占位元数据
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceDefaults {
    pub title: String,
    pub description: String,
}

impl Default for SequenceDefaults {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }
}

/// 快照中的单个条目：条目副本 + 当前位置 + 按当前位置计算的安全警告
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ItemView {
    pub position: usize,
    pub item: SequenceItem,
    pub warning: Option<SafetyWarning>,
}

/// 画布的不可变快照，每次变更后重新生成，供界面与练习会话读取
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SequenceSnapshot {
    pub title: String,
    pub description: String,
    pub items: Vec<ItemView>,
}

impl SequenceSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn ids(&self) -> Vec<CanvasId> {
        self.items.iter().map(|v| v.item.canvas_id).collect()
    }

    pub fn poses(&self) -> impl Iterator<Item = &Pose> {
        self.items.iter().map(|v| &v.item.pose)
    }
}

impl Default for SequenceSnapshot {
    fn default() -> Self {
        Sequence::default().snapshot()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    items: HashMap<CanvasId, SequenceItem>,
    order: Vec<CanvasId>,
    title: String,
    description: String,
    defaults: SequenceDefaults,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(SequenceDefaults::default())
    }
}

impl Sequence {
    pub fn new(defaults: SequenceDefaults) -> Self {
        Self {
            items: HashMap::new(),
            order: Vec::new(),
            title: defaults.title.clone(),
            description: defaults.description.clone(),
            defaults,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: CanvasId) -> Option<&SequenceItem> {
        self.items.get(&id)
    }

    pub fn position(&self, id: CanvasId) -> Option<usize> {
        self.order.iter().position(|x| *x == id)
    }

    pub fn ids(&self) -> &[CanvasId] {
        &self.order
    }

    /// 按练习顺序迭代条目
    pub fn items(&self) -> impl Iterator<Item = &SequenceItem> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// 仍在等待配图的条目数
    pub fn pending_images(&self) -> usize {
        self.items.values().filter(|i| i.image_loading).count()
    }

    /// 追加体式到末尾，返回新条目的 ID
    pub fn append(&mut self, pose: Pose) -> CanvasId {
        let item = SequenceItem::from_pose(pose);
        self.insert_unique(item)
    }

    /// 按 ID 删除一个条目；ID 不存在时静默忽略
    pub fn remove(&mut self, id: CanvasId) -> Option<SequenceItem> {
        let removed = self.items.remove(&id)?;
        self.order.retain(|x| *x != id);
        Some(removed)
    }

    /// 把 `from` 移动到 `to` 当前所在的位置（数组移动语义），其余条目相对顺序不变
    ///
    /// 任一 ID 不存在或两者相同时不做任何事。返回是否发生了移动。
    pub fn reorder(&mut self, from: CanvasId, to: CanvasId) -> bool {
        if from == to {
            return false;
        }
        let (Some(old_index), Some(new_index)) = (self.position(from), self.position(to)) else {
            return false;
        };
        let moved = self.order.remove(old_index);
        self.order.insert(new_index, moved);
        true
    }

    /// 整体替换条目与元数据（AI 生成结果落地时使用），旧条目全部丢弃
    pub fn replace_all(
        &mut self,
        items: Vec<SequenceItem>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.items.clear();
        self.order.clear();
        for item in items {
            self.insert_unique(item);
        }
        self.title = title.into();
        self.description = description.into();
    }

    /// 清空并恢复占位元数据
    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
        self.title = self.defaults.title.clone();
        self.description = self.defaults.description.clone();
    }

    /// 写回一次配图请求的结果：成功则设置图片，失败则置错误标记；两种情况都结束加载状态
    ///
    /// 目标已被删除时返回 false，不做任何修改。
    pub fn update_item_image(&mut self, id: CanvasId, result: Result<String, String>) -> bool {
        let Some(item) = self.items.get_mut(&id) else {
            return false;
        };
        item.image_loading = false;
        match result {
            Ok(url) => {
                item.image_url = Some(url);
                item.image_error = false;
            }
            Err(_) => {
                item.image_error = true;
            }
        }
        true
    }

    /// 生成快照：安全警告按当前位置即时计算
    pub fn snapshot(&self) -> SequenceSnapshot {
        let items = self
            .items()
            .enumerate()
            .map(|(position, item)| ItemView {
                position,
                warning: safety::evaluate(&item.pose, position),
                item: item.clone(),
            })
            .collect();
        SequenceSnapshot {
            title: self.title.clone(),
            description: self.description.clone(),
            items,
        }
    }

    /// 插入到末尾；ID 冲突时重新分配，保证画布内唯一
    fn insert_unique(&mut self, mut item: SequenceItem) -> CanvasId {
        while self.items.contains_key(&item.canvas_id) {
            item.canvas_id = CanvasId::new();
        }
        let id = item.canvas_id;
        self.order.push(id);
        self.items.insert(id, item);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, Difficulty};

    fn pose(id: &str) -> Pose {
        catalog::find_by_id(id).cloned().unwrap()
    }

    fn names(seq: &Sequence) -> Vec<String> {
        seq.items().map(|i| i.pose.id.clone()).collect()
    }

    fn three() -> (Sequence, CanvasId, CanvasId, CanvasId) {
        let mut seq = Sequence::default();
        let a = seq.append(pose("balasana"));
        let b = seq.append(pose("sirsasana"));
        let c = seq.append(pose("sukhasana"));
        (seq, a, b, c)
    }

    #[test]
    fn test_append_keeps_order_and_unique_ids() {
        let mut seq = Sequence::default();
        let a = seq.append(pose("tadasana"));
        let b = seq.append(pose("tadasana"));
        assert_ne!(a, b);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.ids(), &[a, b]);
    }

    #[test]
    fn test_remove_absent_id_is_noop() {
        let (mut seq, ..) = three();
        let before = seq.clone();
        assert!(seq.remove(CanvasId::new()).is_none());
        assert_eq!(seq, before);
    }

    #[test]
    fn test_remove_exactly_one() {
        let (mut seq, a, b, c) = three();
        let removed = seq.remove(b).unwrap();
        assert_eq!(removed.canvas_id, b);
        assert_eq!(seq.ids(), &[a, c]);
    }

    #[test]
    fn test_reorder_moves_to_target_position() {
        let (mut seq, a, b, c) = three();
        assert!(seq.reorder(b, a));
        assert_eq!(seq.ids(), &[b, a, c]);
        assert!(seq.reorder(b, c));
        assert_eq!(seq.ids(), &[a, c, b]);
    }

    #[test]
    fn test_reorder_noop_cases() {
        let (mut seq, a, ..) = three();
        let before = seq.clone();
        assert!(!seq.reorder(a, a));
        assert!(!seq.reorder(a, CanvasId::new()));
        assert!(!seq.reorder(CanvasId::new(), a));
        assert_eq!(seq, before);
    }

    #[test]
    fn test_reorder_inverse_restores_order() {
        let mut seq = Sequence::default();
        let ids: Vec<CanvasId> = ["tadasana", "balasana", "sukhasana", "shavasana", "bakasana"]
            .iter()
            .map(|p| seq.append(pose(p)))
            .collect();
        for from in 0..ids.len() {
            for to in 0..ids.len() {
                let original = seq.ids().to_vec();
                let from_id = original[from];
                let to_id = original[to];
                seq.reorder(from_id, to_id);
                // 反向操作：把它移回原索引处当前的条目位置
                let back_to = seq.ids()[from];
                seq.reorder(from_id, back_to);
                assert_eq!(seq.ids(), original.as_slice());
            }
        }
    }

    #[test]
    fn test_replace_all_swaps_items_and_metadata() {
        let (mut seq, a, ..) = three();
        let fresh = vec![SequenceItem::from_pose(pose("shavasana"))];
        let fresh_id = fresh[0].canvas_id;
        seq.replace_all(fresh, "Evening Wind Down", "Slow and soft");
        assert_eq!(seq.ids(), &[fresh_id]);
        assert!(seq.get(a).is_none());
        assert_eq!(seq.title(), "Evening Wind Down");
        assert_eq!(seq.description(), "Slow and soft");
    }

    #[test]
    fn test_replace_all_reassigns_duplicate_ids() {
        let mut seq = Sequence::default();
        let item = SequenceItem::from_pose(pose("tadasana"));
        seq.replace_all(vec![item.clone(), item], "t", "d");
        assert_eq!(seq.len(), 2);
        assert_ne!(seq.ids()[0], seq.ids()[1]);
    }

    #[test]
    fn test_clear_resets_metadata() {
        let (mut seq, ..) = three();
        seq.replace_all(vec![], "Custom", "Custom description");
        seq.append(pose("tadasana"));
        seq.clear();
        assert!(seq.is_empty());
        assert_eq!(seq.title(), DEFAULT_TITLE);
        assert_eq!(seq.description(), DEFAULT_DESCRIPTION);
    }

    #[test]
    fn test_update_item_image_success_and_failure() {
        let mut seq = Sequence::default();
        let mut bare = pose("tadasana");
        bare.image_url = None;
        let a = seq.append(bare.clone());
        let b = seq.append(bare);
        assert_eq!(seq.pending_images(), 2);

        assert!(seq.update_item_image(a, Ok("data:image/png;base64,AAAA".into())));
        assert!(seq.update_item_image(b, Err("boom".into())));

        let a = seq.get(a).unwrap();
        assert_eq!(a.image_url.as_deref(), Some("data:image/png;base64,AAAA"));
        assert!(!a.image_loading && !a.image_error);
        let b = seq.get(b).unwrap();
        assert!(b.image_url.is_none());
        assert!(!b.image_loading && b.image_error);
        assert_eq!(seq.pending_images(), 0);
    }

    #[test]
    fn test_update_after_remove_does_not_resurrect() {
        let (mut seq, a, b, c) = three();
        seq.remove(b);
        assert!(!seq.update_item_image(b, Ok("late".into())));
        assert_eq!(seq.ids(), &[a, c]);
        assert!(seq.get(b).is_none());
    }

    #[test]
    fn test_snapshot_warnings_follow_reorder() {
        let mut seq = Sequence::default();
        let mut a = pose("balasana");
        a.difficulty = Difficulty::Beginner;
        a.intensity = 2;
        let mut b = pose("bakasana");
        b.difficulty = Difficulty::Advanced;
        b.intensity = 9;
        let a = seq.append(a);
        let b = seq.append(b);
        let c = seq.append(pose("sukhasana"));

        // B 在位置 1：冷身高阶体式
        let snap = seq.snapshot();
        assert_eq!(snap.items[1].warning, Some(SafetyWarning::ColdPeak));

        seq.reorder(b, a);
        let snap = seq.snapshot();
        assert_eq!(snap.ids(), vec![b, a, c]);
        assert_eq!(snap.items[0].warning, Some(SafetyWarning::IntenseStart));
        assert_eq!(snap.items[1].warning, None);
        assert_eq!(snap.items[2].warning, None);
        assert_eq!(names(&seq), vec!["bakasana", "balasana", "sukhasana"]);
    }
}
