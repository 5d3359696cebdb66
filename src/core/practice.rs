//! 练习会话：引导音频的生命周期 Idle → Requesting → Playing → Idle
//!
//! 同一时刻最多一个会话处于 Requesting/Playing。每次 start 分配递增的 ticket，
//! 异步完成事件必须携带匹配的 ticket 才会生效，过期事件直接丢弃。
//! 播放持有 CancellationToken，stop 只取消播放，不影响配图补全。

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::StudioError;
use crate::flow::SequenceSnapshot;
use crate::services::PoseSummary;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    Idle,
    Requesting,
    Playing,
}

/// start 成功后交给编排器执行的请求：整个序列快照的标题与按序摘要
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticeRequest {
    pub ticket: u64,
    pub title: String,
    pub poses: Vec<PoseSummary>,
}

/// UI 投影
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PracticeView {
    pub phase: SessionPhase,
    /// 只在 Playing 时存在
    pub script: Option<String>,
    pub started_at: Option<DateTime<Local>>,
}

impl Default for PracticeView {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            script: None,
            started_at: None,
        }
    }
}

#[derive(Debug)]
pub struct PracticeSession {
    phase: SessionPhase,
    ticket: u64,
    script: Option<String>,
    cancel: Option<CancellationToken>,
    started_at: Option<DateTime<Local>>,
}

impl Default for PracticeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeSession {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            ticket: 0,
            script: None,
            cancel: None,
            started_at: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// Idle → Requesting；空序列或已有会话时拒绝且状态不变
    pub fn start(&mut self, snapshot: &SequenceSnapshot) -> Result<PracticeRequest, StudioError> {
        if self.phase != SessionPhase::Idle {
            return Err(StudioError::SessionBusy);
        }
        if snapshot.is_empty() {
            return Err(StudioError::EmptySequence);
        }
        self.ticket += 1;
        self.phase = SessionPhase::Requesting;
        self.script = None;
        tracing::info!("Practice session #{} requesting guidance", self.ticket);
        Ok(PracticeRequest {
            ticket: self.ticket,
            title: snapshot.title.clone(),
            poses: snapshot
                .poses()
                .map(|p| PoseSummary {
                    name: p.name.clone(),
                    duration: p.duration.clone(),
                    breathing_guidance: p.breathing_guidance.clone(),
                    description: p.description.clone(),
                })
                .collect(),
        })
    }

    /// Requesting → Playing，返回本次播放的取消令牌；ticket 不匹配时返回 None
    pub fn begin_playback(&mut self, ticket: u64, script: String) -> Option<CancellationToken> {
        if self.phase != SessionPhase::Requesting || ticket != self.ticket {
            return None;
        }
        let token = CancellationToken::new();
        self.phase = SessionPhase::Playing;
        self.script = Some(script);
        self.cancel = Some(token.clone());
        self.started_at = Some(Local::now());
        tracing::info!("Practice session #{} playing", ticket);
        Some(token)
    }

    /// Requesting 阶段失败 → Idle，不进入 Playing
    pub fn fail_request(&mut self, ticket: u64) -> bool {
        if self.phase != SessionPhase::Requesting || ticket != self.ticket {
            return false;
        }
        tracing::warn!("Practice session #{} could not be established", ticket);
        self.reset();
        true
    }

    /// 用户停止：Playing → Idle，取消播放并丢弃引导词
    pub fn stop(&mut self) -> bool {
        if self.phase != SessionPhase::Playing {
            return false;
        }
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        tracing::info!("Practice session #{} stopped", self.ticket);
        self.reset();
        true
    }

    /// 播放结束（自然结束或设备失败）：Playing → Idle；停止后迟到的完成事件 ticket 不匹配或阶段不符，被忽略
    pub fn finish(&mut self, ticket: u64) -> bool {
        if self.phase != SessionPhase::Playing || ticket != self.ticket {
            return false;
        }
        tracing::info!("Practice session #{} finished", ticket);
        self.reset();
        true
    }

    pub fn view(&self) -> PracticeView {
        PracticeView {
            phase: self.phase,
            script: self.script.clone(),
            started_at: self.started_at,
        }
    }

    fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.script = None;
        self.cancel = None;
        self.started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::flow::Sequence;

    fn snapshot_with(ids: &[&str]) -> SequenceSnapshot {
        let mut seq = Sequence::default();
        for id in ids {
            seq.append(catalog::find_by_id(id).cloned().unwrap());
        }
        seq.snapshot()
    }

    #[test]
    fn test_start_on_empty_sequence_stays_idle() {
        let mut session = PracticeSession::new();
        let err = session.start(&snapshot_with(&[])).unwrap_err();
        assert_eq!(err, StudioError::EmptySequence);
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_start_builds_ordered_request() {
        let mut session = PracticeSession::new();
        let req = session.start(&snapshot_with(&["balasana", "bhujangasana"])).unwrap();
        assert_eq!(session.phase(), SessionPhase::Requesting);
        assert_eq!(req.title, crate::flow::DEFAULT_TITLE);
        let names: Vec<&str> = req.poses.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Child's Pose", "Cobra Pose"]);
        assert_eq!(req.poses[1].breathing_guidance, "Inhale as you lift.");
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let mut session = PracticeSession::new();
        let snap = snapshot_with(&["balasana"]);
        let req = session.start(&snap).unwrap();
        assert_eq!(session.start(&snap).unwrap_err(), StudioError::SessionBusy);
        session.begin_playback(req.ticket, "script".into()).unwrap();
        assert_eq!(session.start(&snap).unwrap_err(), StudioError::SessionBusy);
        assert_eq!(session.ticket(), req.ticket);
    }

    #[test]
    fn test_failure_during_request_returns_to_idle() {
        let mut session = PracticeSession::new();
        let req = session.start(&snapshot_with(&["balasana"])).unwrap();
        assert!(session.fail_request(req.ticket));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.script().is_none());
        // 已回到 Idle，迟到的成功结果不会进入 Playing
        assert!(session.begin_playback(req.ticket, "late".into()).is_none());
        assert_eq!(session.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_stop_cancels_and_discards_script() {
        let mut session = PracticeSession::new();
        let req = session.start(&snapshot_with(&["balasana"])).unwrap();
        let token = session.begin_playback(req.ticket, "Welcome".into()).unwrap();
        assert_eq!(session.script(), Some("Welcome"));
        assert!(session.view().started_at.is_some());

        assert!(session.stop());
        assert!(token.is_cancelled());
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.script().is_none());
        assert!(!session.stop());
    }

    #[test]
    fn test_stale_finish_is_ignored() {
        let mut session = PracticeSession::new();
        let snap = snapshot_with(&["balasana"]);
        let first = session.start(&snap).unwrap();
        session.begin_playback(first.ticket, "one".into()).unwrap();
        session.stop();

        let second = session.start(&snap).unwrap();
        session.begin_playback(second.ticket, "two".into()).unwrap();
        assert!(!session.finish(first.ticket));
        assert_eq!(session.phase(), SessionPhase::Playing);
        assert!(session.finish(second.ticket));
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.script().is_none());
    }

    #[test]
    fn test_stop_is_noop_while_requesting() {
        let mut session = PracticeSession::new();
        session.start(&snapshot_with(&["balasana"])).unwrap();
        assert!(!session.stop());
        assert_eq!(session.phase(), SessionPhase::Requesting);
    }
}
