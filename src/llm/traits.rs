//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient::complete（非流式）。

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::retry::Retryable;
use crate::llm::Message;

/// LLM 调用错误；是否可重试由 `Retryable` 决定
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// status 未知（如 SDK 只给出错误体）时为 None
    #[error("API error ({status:?}): {message}")]
    ApiError { status: Option<u16>, message: String },

    #[error("Rate limited (retry after {retry_after_ms}ms)")]
    RateLimited { retry_after_ms: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Failed to build request: {0}")]
    Build(String),
}

impl Retryable for LlmError {
    /// 4xx（429 除外）视为客户端问题，不重试
    fn is_retryable(&self) -> bool {
        match self {
            LlmError::ApiError {
                status: Some(status),
                ..
            } => !(400..500).contains(status) || *status == 429,
            LlmError::ApiError { status: None, .. } => true,
            LlmError::RateLimited { .. } => true,
            LlmError::Network(_) | LlmError::Timeout | LlmError::EmptyResponse(_) => true,
            LlmError::Build(_) => false,
        }
    }
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成，返回首条回复文本
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;
}
