//! 工作室编排器：主控循环
//!
//! 负责：按配置组装 AI 协作方、建立 cmd/event/state 三通道，并在后台任务中
//! 消费用户命令与内部完成事件，串行修改画布与练习会话，每次变更后发布新的 StudioState。
//! 耗时操作（序列生成、配图、引导词、播放）都在各自的任务里执行，完成后经事件通道回报。

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::catalog;
use crate::config::AppConfig;
use crate::core::enrichment::EnrichmentController;
use crate::core::practice::{PracticeRequest, PracticeSession};
use crate::core::state::{GenerationStatus, StudioState};
use crate::core::{RecoveryAction, RecoveryEngine, StudioError};
use crate::flow::{CanvasId, Sequence, SequenceDefaults};
use crate::llm::{create_deepseek_client, LlmClient, MockLlmClient, OpenAiClient, RetryingLlmClient};
use crate::services::{
    DevicePlayer, GeneratedSequence, GenerationError, LlmSequenceGenerator, NarratedPracticeAudio,
    OpenAiImageGenerator, OpenAiSpeech, PlaceholderImageGenerator, PlaybackOutcome,
    PoseImageGenerator, PracticeGuidance, Services, SilentSpeech, SpeechSynthesizer,
};

/// 从 UI 发往编排器的用户命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 从体式库按 id 追加到画布末尾
    AddPose(String),
    Remove(CanvasId),
    /// 把 `from` 移到 `to` 当前所在的位置
    Reorder { from: CanvasId, to: CanvasId },
    /// 按自由文本意图生成整套序列
    Generate(String),
    /// 清空画布（同时停止正在播放的练习）
    Clear,
    StartPractice,
    StopPractice,
    /// 退出应用
    Quit,
}

/// 后台任务回报给编排器的完成事件
#[derive(Debug)]
pub enum StudioEvent {
    SequenceGenerated {
        intent: String,
        result: Result<GeneratedSequence, GenerationError>,
    },
    ImageResolved {
        id: CanvasId,
        result: Result<String, String>,
    },
    GuidanceReady {
        ticket: u64,
        result: Result<PracticeGuidance, GenerationError>,
    },
    PlaybackFinished {
        ticket: u64,
        result: Result<PlaybackOutcome, GenerationError>,
    },
}

/// 根据配置与环境变量选择文本 LLM（OpenAI 兼容 / DeepSeek / Mock）
pub(crate) fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let has_openai = std::env::var("OPENAI_API_KEY").is_ok();
    let has_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok();
    // provider 指定 deepseek 且有 Key 时优先；否则 OpenAI Key 优先于 DeepSeek Key
    let use_deepseek = has_deepseek && (provider == "deepseek" || !has_openai);

    let client: Arc<dyn LlmClient> = if use_deepseek {
        let model = cfg
            .llm
            .deepseek
            .model
            .clone()
            .or_else(|| cfg.llm.model.clone())
            .unwrap_or_else(|| crate::llm::DEEPSEEK_CHAT.to_string());
        tracing::info!("Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(&model)).with_timeout(cfg.llm.timeouts.request))
    } else if has_openai {
        let model = cfg
            .llm
            .openai
            .model
            .clone()
            .or_else(|| cfg.llm.model.clone())
            .unwrap_or_else(|| "gpt-4o-mini".to_string());
        tracing::info!("Using OpenAI LLM ({})", model);
        Arc::new(
            OpenAiClient::new(cfg.llm.base_url.as_deref(), &model, None)
                .with_timeout(cfg.llm.timeouts.request),
        )
    } else {
        tracing::warn!("No API key set, using Mock LLM");
        return Arc::new(MockLlmClient);
    };
    Arc::new(RetryingLlmClient::new(client, cfg.retry.to_retry_config()))
}

/// 组装全部协作方：配图与语音只有 OpenAI 实现，没有 OPENAI_API_KEY 时退回占位图与静音
pub fn create_services_from_config(cfg: &AppConfig) -> Services {
    let llm = create_llm_from_config(cfg);
    let retry = cfg.retry.to_retry_config();
    let media = &cfg.media;

    let (images, speech): (Arc<dyn PoseImageGenerator>, Arc<dyn SpeechSynthesizer>) =
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) => {
                tracing::info!(
                    "Using OpenAI media ({} / {}, voice {})",
                    media.image_model,
                    media.speech_model,
                    media.voice
                );
                let base = cfg.llm.base_url.as_deref();
                (
                    Arc::new(
                        OpenAiImageGenerator::new(base, &key, &media.image_model, &media.image_size)
                            .with_retry(retry.clone()),
                    ),
                    Arc::new(
                        OpenAiSpeech::new(base, &key, &media.speech_model, &media.voice)
                            .with_retry(retry),
                    ),
                )
            }
            Err(_) => {
                tracing::warn!("No OPENAI_API_KEY, using placeholder images and silent narration");
                (
                    Arc::new(PlaceholderImageGenerator),
                    Arc::new(SilentSpeech::new(media.sample_rate)),
                )
            }
        };

    Services {
        sequences: Arc::new(LlmSequenceGenerator::new(llm.clone())),
        images,
        practice_audio: Arc::new(NarratedPracticeAudio::new(llm, speech)),
        player: Arc::new(DevicePlayer::new(
            media.sample_rate,
            media.audio_device.clone(),
        )),
    }
}

/// 编排器持有的完整状态；只在主控任务内被修改
struct Studio {
    sequence: Sequence,
    practice: PracticeSession,
    generation: GenerationStatus,
    error_message: Option<String>,
    completed_generations: u64,
    services: Services,
    enrichment: EnrichmentController,
    recovery: RecoveryEngine,
    events: mpsc::UnboundedSender<StudioEvent>,
}

impl Studio {
    fn project(&self) -> StudioState {
        StudioState {
            sequence: self.sequence.snapshot(),
            generation: self.generation.clone(),
            practice: self.practice.view(),
            error_message: self.error_message.clone(),
            pending_images: self.sequence.pending_images(),
            completed_generations: self.completed_generations,
        }
    }

    /// 处理一条用户命令；返回 false 表示退出
    fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::AddPose(pose_id) => self.add_pose(&pose_id),
            Command::Remove(id) => {
                if self.sequence.remove(id).is_some() {
                    tracing::info!("Removed {} ({} left)", id, self.sequence.len());
                }
            }
            Command::Reorder { from, to } => {
                if self.sequence.reorder(from, to) {
                    tracing::debug!("Moved {} to the position of {}", from, to);
                }
            }
            Command::Generate(intent) => self.generate(intent),
            Command::Clear => {
                if self.practice.stop() {
                    tracing::info!("Stopped practice because the canvas was cleared");
                }
                self.sequence.clear();
                self.error_message = None;
                tracing::info!("Canvas cleared");
            }
            Command::StartPractice => self.start_practice(),
            Command::StopPractice => {
                self.practice.stop();
            }
            Command::Quit => {
                self.practice.stop();
                return false;
            }
        }
        true
    }

    fn add_pose(&mut self, pose_id: &str) {
        let Some(pose) = catalog::find_by_id(pose_id) else {
            self.reject(StudioError::UnknownPose(pose_id.to_string()));
            return;
        };
        let id = self.sequence.append(pose.clone());
        tracing::info!("Added {} as {}", pose.name, id);
        if let Some(request) = self.sequence.get(id).and_then(EnrichmentController::request_for) {
            self.enrichment.dispatch(vec![request]);
        }
    }

    fn generate(&mut self, intent: String) {
        let intent = intent.trim().to_string();
        if intent.is_empty() {
            return;
        }
        if matches!(self.generation, GenerationStatus::Loading { .. }) {
            self.reject(StudioError::GenerationBusy);
            return;
        }
        tracing::info!("Generating sequence for {:?}", intent);
        self.generation = GenerationStatus::Loading {
            intent: intent.clone(),
        };
        self.error_message = None;

        let generator = self.services.sequences.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = generator.generate_sequence(&intent).await;
            let _ = events.send(StudioEvent::SequenceGenerated { intent, result });
        });
    }

    fn start_practice(&mut self) {
        let snapshot = self.sequence.snapshot();
        let PracticeRequest {
            ticket,
            title,
            poses,
        } = match self.practice.start(&snapshot) {
            Ok(req) => req,
            Err(e) => {
                self.reject(e);
                return;
            }
        };
        self.error_message = None;

        let generator = self.services.practice_audio.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = generator.generate_practice_audio(&title, &poses).await;
            let _ = events.send(StudioEvent::GuidanceReady { ticket, result });
        });
    }

    fn handle_event(&mut self, event: StudioEvent) {
        match event {
            StudioEvent::SequenceGenerated { intent, result } => {
                self.generation = GenerationStatus::Idle;
                match result {
                    Ok(generated) => {
                        let merged = crate::services::merge_generated(generated);
                        tracing::info!(
                            "Sequence replaced for {:?}: {} ({} poses)",
                            intent,
                            merged.title,
                            merged.items.len()
                        );
                        self.sequence
                            .replace_all(merged.items, merged.title, merged.description);
                        self.completed_generations += 1;
                        self.enrichment
                            .dispatch(EnrichmentController::requests_for(&self.sequence));
                    }
                    Err(e) => self.recover(StudioError::GenerationFailure(e.to_string())),
                }
            }
            StudioEvent::ImageResolved { id, result } => {
                let failure = result.as_ref().err().cloned();
                if !self.sequence.update_item_image(id, result) {
                    tracing::debug!("Discarded image for removed item {}", id);
                    return;
                }
                match failure {
                    Some(reason) => self.recover(StudioError::EnrichmentFailure { id, reason }),
                    None => tracing::debug!("Image resolved for {}", id),
                }
            }
            StudioEvent::GuidanceReady { ticket, result } => match result {
                Ok(PracticeGuidance { script, audio }) => {
                    let Some(token) = self.practice.begin_playback(ticket, script) else {
                        tracing::debug!("Ignoring guidance for stale session #{}", ticket);
                        return;
                    };
                    let player = self.services.player.clone();
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        let result = player.play(&audio, token).await;
                        let _ = events.send(StudioEvent::PlaybackFinished { ticket, result });
                    });
                }
                Err(e) => {
                    if self.practice.fail_request(ticket) {
                        self.recover(StudioError::SessionFailure(e.to_string()));
                    }
                }
            },
            StudioEvent::PlaybackFinished { ticket, result } => {
                if !self.practice.finish(ticket) {
                    tracing::debug!("Ignoring playback completion for stale session #{}", ticket);
                    return;
                }
                if let Err(e) = result {
                    self.recover(StudioError::SessionFailure(e.to_string()));
                }
            }
        }
    }

    /// 失败后按恢复动作回到明确的前一状态
    fn recover(&mut self, err: StudioError) {
        tracing::warn!("{}", err);
        match self.recovery.handle(&err) {
            RecoveryAction::KeepSequence { message } | RecoveryAction::ReturnToIdle { message } => {
                self.error_message = Some(message);
            }
            // 条目上的错误标记已由 update_item_image 写入
            RecoveryAction::MarkItem { .. } | RecoveryAction::Ignore => {}
        }
    }

    /// 被拒绝的命令：状态不变，只记日志
    fn reject(&self, err: StudioError) {
        tracing::info!("Command rejected: {}", err);
    }
}

/// 启动编排器：返回命令发送端与状态接收端；后台任务消费命令与内部事件并更新状态
pub fn spawn_studio(
    services: Services,
    defaults: SequenceDefaults,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<StudioState>) {
    // 三通道：UI -> Core 命令；后台任务 -> Core 事件；Core -> UI 状态快照
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<StudioEvent>();

    let mut studio = Studio {
        sequence: Sequence::new(defaults),
        practice: PracticeSession::new(),
        generation: GenerationStatus::Idle,
        error_message: None,
        completed_generations: 0,
        enrichment: EnrichmentController::new(services.images.clone(), event_tx.clone()),
        services,
        recovery: RecoveryEngine::new(),
        events: event_tx,
    };
    let (state_tx, state_rx) = watch::channel(studio.project());

    tokio::spawn(async move {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    // cmd_tx 已全部关闭，UI 退出
                    let Some(cmd) = cmd else { break };
                    if !studio.handle_command(cmd) {
                        break;
                    }
                }
                Some(event) = event_rx.recv() => studio.handle_event(event),
            }
            let _ = state_tx.send(studio.project());
        }
        tracing::info!("Studio loop exited");
    });

    (cmd_tx, state_rx)
}

/// 按配置创建工作室运行时
pub fn create_studio(
    cfg: &AppConfig,
) -> (mpsc::UnboundedSender<Command>, watch::Receiver<StudioState>) {
    let services = create_services_from_config(cfg);
    spawn_studio(services, cfg.app.sequence_defaults())
}
