//! 配图补全：为缺少图片的条目并发请求 AI 配图
//!
//! 每批请求在一个后台任务里用 FuturesUnordered 并发执行，先完成的先回报；
//! 结果按 CanvasId 以 `StudioEvent::ImageResolved` 发回编排器，由编排器写回画布。
//! 单个请求失败只影响对应条目，本层不做重试（传输层已重试过）。

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;

use crate::core::orchestrator::StudioEvent;
use crate::flow::{CanvasId, Sequence, SequenceItem};
use crate::services::PoseImageGenerator;

/// 单条配图请求
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageRequest {
    pub id: CanvasId,
    pub prompt: String,
}

pub struct EnrichmentController {
    images: Arc<dyn PoseImageGenerator>,
    events: mpsc::UnboundedSender<StudioEvent>,
}

impl EnrichmentController {
    pub fn new(
        images: Arc<dyn PoseImageGenerator>,
        events: mpsc::UnboundedSender<StudioEvent>,
    ) -> Self {
        Self { images, events }
    }

    /// 画布上需要补图的条目（无图且未失败），按画布顺序
    pub fn requests_for(sequence: &Sequence) -> Vec<ImageRequest> {
        sequence.items().filter_map(Self::request_for).collect()
    }

    /// 单个条目的补图请求（手动添加无图体式时使用）
    pub fn request_for(item: &SequenceItem) -> Option<ImageRequest> {
        item.needs_image().then(|| ImageRequest {
            id: item.canvas_id,
            prompt: item.pose.prompt_text().to_string(),
        })
    }

    /// 发出一批请求；空批次不产生任务
    pub fn dispatch(&self, requests: Vec<ImageRequest>) {
        if requests.is_empty() {
            return;
        }
        tracing::info!("Requesting {} pose image(s)", requests.len());
        let images = self.images.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut pending: FuturesUnordered<_> = requests
                .into_iter()
                .map(|req| {
                    let images = images.clone();
                    async move {
                        let result = images.generate_pose_image(&req.prompt).await;
                        (req.id, result)
                    }
                })
                .collect();

            while let Some((id, result)) = pending.next().await {
                let result = result.map_err(|e| {
                    tracing::warn!("Image for {} failed: {}", id, e);
                    e.to_string()
                });
                if events.send(StudioEvent::ImageResolved { id, result }).is_err() {
                    // 编排器已退出
                    break;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, Pose};
    use crate::services::PlaceholderImageGenerator;

    fn unillustrated(name: &str) -> Pose {
        let mut pose = catalog::find_by_id("balasana").cloned().unwrap();
        pose.id = name.to_lowercase();
        pose.name = name.to_string();
        pose.image_url = None;
        pose
    }

    #[test]
    fn test_requests_skip_illustrated_items() {
        let mut seq = Sequence::default();
        seq.append(catalog::find_by_id("tadasana").cloned().unwrap());
        let id = seq.append(unillustrated("Lizard"));
        let reqs = EnrichmentController::requests_for(&seq);
        assert_eq!(
            reqs,
            vec![ImageRequest {
                id,
                prompt: "Lizard".to_string()
            }]
        );
    }

    #[test]
    fn test_requests_skip_failed_items() {
        let mut seq = Sequence::default();
        let id = seq.append(unillustrated("Lizard"));
        seq.update_item_image(id, Err("500".into()));
        assert!(EnrichmentController::requests_for(&seq).is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_reports_each_result() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = EnrichmentController::new(Arc::new(PlaceholderImageGenerator), tx);
        let a = CanvasId::new();
        let b = CanvasId::new();
        controller.dispatch(vec![
            ImageRequest {
                id: a,
                prompt: "Lizard".into(),
            },
            ImageRequest {
                id: b,
                prompt: "!!!".into(),
            },
        ]);

        let mut ok = None;
        let mut failed = None;
        for _ in 0..2 {
            match rx.recv().await.unwrap() {
                StudioEvent::ImageResolved { id, result } if id == a => ok = Some(result),
                StudioEvent::ImageResolved { id, result } if id == b => failed = Some(result),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert!(ok.unwrap().is_ok());
        assert!(failed.unwrap().is_err());
    }
}
