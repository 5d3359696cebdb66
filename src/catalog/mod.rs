//! 体式目录：只读的静态体式库，供侧栏检索与 AI 结果合并使用
//!
//! 目录在进程内全局共享、不可变，生命周期长于任何序列。

mod library;
pub mod pose;

pub use library::placeholder_image;
pub use pose::{Difficulty, Pose, PoseCategory, MAX_INTENSITY};

use library::POSE_LIBRARY;

/// 全部体式（按库内顺序）
pub fn all() -> &'static [Pose] {
    POSE_LIBRARY.as_slice()
}

pub fn find_by_id(id: &str) -> Option<&'static Pose> {
    all().iter().find(|p| p.id == id)
}

/// 按名称近似匹配：大小写不敏感，双向子串包含，取第一条
///
/// 注意这是有意保留的模糊行为，"Cow" 会命中 "Cat-Cow Stretch"。
pub fn find_by_approximate_name(name: &str) -> Option<&'static Pose> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    all().iter().find(|p| {
        let hay = p.name.to_lowercase();
        hay.contains(&needle) || needle.contains(&hay)
    })
}

/// 侧栏检索：名称子串（大小写不敏感）+ 可选类别
pub fn filter(query: &str, category: Option<PoseCategory>) -> Vec<&'static Pose> {
    let query = query.trim().to_lowercase();
    all()
        .iter()
        .filter(|p| query.is_empty() || p.name.to_lowercase().contains(&query))
        .filter(|p| category.map_or(true, |c| p.category == c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_approximate_name_both_directions() {
        // 生成结果名称更长：目录名包含于其中
        let p = find_by_approximate_name("Deep Triangle Pose Flow").unwrap();
        assert_eq!(p.id, "trikonasana");
        // 生成结果名称更短：包含于目录名中
        let p = find_by_approximate_name("tadasana").unwrap();
        assert_eq!(p.id, "tadasana");
    }

    #[test]
    fn test_find_by_approximate_name_known_imprecision() {
        let p = find_by_approximate_name("Cow").unwrap();
        assert_eq!(p.id, "marjaryasana");
    }

    #[test]
    fn test_find_by_approximate_name_first_match_wins() {
        // "Warrior" 同时命中 Warrior I / Warrior II，取库内靠前者
        let p = find_by_approximate_name("warrior").unwrap();
        assert_eq!(p.id, "virabhadrasana1");
    }

    #[test]
    fn test_find_by_approximate_name_misses() {
        assert!(find_by_approximate_name("Flying Pigeon").is_none());
        assert!(find_by_approximate_name("   ").is_none());
    }

    #[test]
    fn test_filter_by_query_and_category() {
        let seated = filter("", Some(PoseCategory::Seated));
        assert!(!seated.is_empty());
        assert!(seated.iter().all(|p| p.category == PoseCategory::Seated));

        let hits = filter("POSE", None);
        assert!(hits.iter().all(|p| p.name.to_lowercase().contains("pose")));

        assert!(filter("warrior", Some(PoseCategory::Supine)).is_empty());
        assert_eq!(filter("", None).len(), all().len());
    }
}
