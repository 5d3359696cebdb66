//! 语音合成：把引导词转成 16-bit 单声道 PCM

use async_trait::async_trait;
use serde::Serialize;

use crate::llm::{retry_with_backoff, RetryConfig};
use crate::services::GenerationError;

pub const DEFAULT_SPEECH_MODEL: &str = "gpt-4o-mini-tts";
pub const DEFAULT_VOICE: &str = "alloy";
/// OpenAI `pcm` 输出的采样率
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, script: &str) -> Result<Vec<u8>, GenerationError>;
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// 调用 `{base}/audio/speech`，response_format 固定为 pcm
pub struct OpenAiSpeech {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    voice: String,
    retry: RetryConfig,
}

impl OpenAiSpeech {
    pub fn new(base_url: Option<&str>, api_key: &str, model: &str, voice: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            voice: voice.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request_once(&self, script: &str) -> Result<Vec<u8>, GenerationError> {
        let response = self
            .http
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SpeechRequest {
                model: &self.model,
                input: script,
                voice: &self.voice,
                response_format: "pcm",
            })
            .send()
            .await
            .map_err(GenerationError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(GenerationError::from_reqwest)?;
        if bytes.is_empty() {
            return Err(GenerationError::EmptyResponse("speech synthesis"));
        }
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, script: &str) -> Result<Vec<u8>, GenerationError> {
        retry_with_backoff(&self.retry, "Speech synthesis", || self.request_once(script)).await
    }
}

/// 离线合成：按词数估算朗读时长（约 150 词/分钟）生成等长静音
#[derive(Debug, Clone)]
pub struct SilentSpeech {
    sample_rate: u32,
}

impl SilentSpeech {
    /// 每个词约 0.4 秒
    const MILLIS_PER_WORD: u64 = 400;

    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

impl Default for SilentSpeech {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

#[async_trait]
impl SpeechSynthesizer for SilentSpeech {
    async fn synthesize(&self, script: &str) -> Result<Vec<u8>, GenerationError> {
        let words = script.split_whitespace().count() as u64;
        if words == 0 {
            return Err(GenerationError::EmptyResponse("speech synthesis"));
        }
        let samples = self.sample_rate as u64 * words * Self::MILLIS_PER_WORD / 1000;
        Ok(vec![0u8; (samples * 2) as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_silent_speech_length_tracks_word_count() {
        let synth = SilentSpeech::new(1_000);
        let audio = synth.synthesize("one two three four five").await.unwrap();
        // 5 词 × 0.4s × 1000Hz × 2 字节
        assert_eq!(audio.len(), 4_000);
        assert!(audio.iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_silent_speech_rejects_empty_script() {
        assert!(SilentSpeech::default().synthesize("   ").await.is_err());
    }
}
