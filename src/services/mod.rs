//! AI 协作方：序列生成、体式配图、练习引导音频、音频播放
//!
//! 核心只通过这里的 trait 调用外部能力；具体实现（OpenAI / DeepSeek / 离线）在子模块中，
//! 由 `core::orchestrator::create_services_from_config` 按配置与环境变量组装。

pub mod image;
pub mod narration;
pub mod playback;
pub mod sequence;
pub mod speech;

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::llm::{LlmError, Retryable};

pub use image::{OpenAiImageGenerator, PlaceholderImageGenerator};
pub use narration::NarratedPracticeAudio;
pub use playback::{decode_pcm16, DevicePlayer, PacedPlayer, PcmSource};
pub use sequence::{merge_generated, parse_generated_sequence, LlmSequenceGenerator, MergedSequence};
pub use speech::{OpenAiSpeech, SilentSpeech, SpeechSynthesizer};

/// 协作方调用失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not parse model output: {0}")]
    Parse(String),

    #[error("Empty response: {0}")]
    EmptyResponse(&'static str),

    #[error("Playback failed: {0}")]
    Playback(String),
}

impl GenerationError {
    /// 传输类错误（网络 / HTTP / LLM 调用），与解析错误区分
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GenerationError::Llm(_)
                | GenerationError::Http { .. }
                | GenerationError::Network(_)
                | GenerationError::EmptyResponse(_)
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => GenerationError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => GenerationError::Network(err.to_string()),
        }
    }
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Llm(e) => e.is_retryable(),
            GenerationError::Http { status, .. } => !(400..500).contains(status) || *status == 429,
            GenerationError::Network(_) | GenerationError::EmptyResponse(_) => true,
            GenerationError::Parse(_) | GenerationError::Playback(_) => false,
        }
    }
}

/// 模型返回的单个体式（字段名与 JSON 一致，驼峰）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPose {
    /// A unique slug for the pose
    pub id: String,
    pub name: String,
    /// One of Standing, Seated, Kneeling, Inversion, Balance, Supine, Prone
    pub category: String,
    /// One of Beginner, Intermediate, Advanced
    #[serde(default)]
    pub difficulty: Option<String>,
    /// 0 (restful) to 10 (peak effort)
    #[serde(default)]
    pub intensity: Option<u8>,
    pub duration: String,
    pub description: String,
    pub benefits: String,
    pub breathing_guidance: String,
    /// A short visual description used to illustrate the pose
    #[serde(default)]
    pub image_prompt: Option<String>,
}

/// generateSequence 的结果
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GeneratedSequence {
    pub title: String,
    pub description: String,
    pub poses: Vec<GeneratedPose>,
}

/// 引导词请求中单个体式的摘要（按练习顺序）
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoseSummary {
    pub name: String,
    pub duration: String,
    pub breathing_guidance: String,
    pub description: String,
}

/// generatePracticeAudio 的结果：引导词 + 合成音频（16-bit 单声道 PCM）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PracticeGuidance {
    pub script: String,
    pub audio: Vec<u8>,
}

/// 播放结束方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Completed,
    Stopped,
}

#[async_trait]
pub trait SequenceGenerator: Send + Sync {
    async fn generate_sequence(&self, intent: &str) -> Result<GeneratedSequence, GenerationError>;
}

#[async_trait]
pub trait PoseImageGenerator: Send + Sync {
    /// 返回图片引用（URL 或 data URI）
    async fn generate_pose_image(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
pub trait PracticeAudioGenerator: Send + Sync {
    /// 单次调用覆盖整个序列，整体成功或整体失败
    async fn generate_practice_audio(
        &self,
        title: &str,
        poses: &[PoseSummary],
    ) -> Result<PracticeGuidance, GenerationError>;
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// 播放到结束或 `cancel` 触发
    async fn play(
        &self,
        audio: &[u8],
        cancel: CancellationToken,
    ) -> Result<PlaybackOutcome, GenerationError>;
}

/// 编排器使用的全部协作方
#[derive(Clone)]
pub struct Services {
    pub sequences: Arc<dyn SequenceGenerator>,
    pub images: Arc<dyn PoseImageGenerator>,
    pub practice_audio: Arc<dyn PracticeAudioGenerator>,
    pub player: Arc<dyn AudioPlayer>,
}

impl Services {
    /// 离线组合：Mock LLM + 占位配图 + 静音语音，全流程无需网络
    pub fn offline(sample_rate: u32) -> Self {
        let llm: Arc<dyn crate::llm::LlmClient> = Arc::new(crate::llm::MockLlmClient);
        Self {
            sequences: Arc::new(LlmSequenceGenerator::new(llm.clone())),
            images: Arc::new(PlaceholderImageGenerator),
            practice_audio: Arc::new(NarratedPracticeAudio::new(
                llm,
                Arc::new(SilentSpeech::new(sample_rate)),
            )),
            player: Arc::new(PacedPlayer::new(sample_rate)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_vs_parse_errors() {
        assert!(GenerationError::Llm(LlmError::Timeout).is_transport());
        assert!(GenerationError::Network("reset".into()).is_transport());
        assert!(!GenerationError::Parse("bad json".into()).is_transport());
    }

    #[test]
    fn test_http_retry_policy() {
        let not_found = GenerationError::Http {
            status: 404,
            body: String::new(),
        };
        let overloaded = GenerationError::Http {
            status: 503,
            body: String::new(),
        };
        assert!(!not_found.is_retryable());
        assert!(overloaded.is_retryable());
        assert!(!GenerationError::Parse("x".into()).is_retryable());
    }
}
