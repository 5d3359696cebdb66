//! 体式配图：OpenAI 兼容 images 端点 / 离线占位图

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::placeholder_image;
use crate::llm::{retry_with_backoff, RetryConfig};
use crate::services::{GenerationError, PoseImageGenerator};

pub const DEFAULT_IMAGE_MODEL: &str = "gpt-image-1";
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

#[derive(Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: String,
    n: u8,
    size: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

fn illustration_prompt(prompt: &str) -> String {
    format!(
        "Minimalist, serene illustration of the yoga pose: {}. \
         Single practitioner on a mat, clean light background, soft natural light, no text.",
        prompt.trim()
    )
}

/// 调用 `{base}/images/generations`，返回 data URI 或 URL；重试由 RetryConfig 控制
pub struct OpenAiImageGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    size: String,
    retry: RetryConfig,
}

impl OpenAiImageGenerator {
    pub fn new(base_url: Option<&str>, api_key: &str, model: &str, size: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            size: size.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request_once(&self, prompt: &str) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ImageRequest {
                model: &self.model,
                prompt: illustration_prompt(prompt),
                n: 1,
                size: &self.size,
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

        let body: ImageResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;
        let first = body
            .data
            .into_iter()
            .next()
            .ok_or(GenerationError::EmptyResponse("image generation"))?;
        match (first.b64_json, first.url) {
            (Some(b64), _) => Ok(format!("data:image/png;base64,{b64}")),
            (None, Some(url)) => Ok(url),
            (None, None) => Err(GenerationError::EmptyResponse("image generation")),
        }
    }
}

#[async_trait]
impl PoseImageGenerator for OpenAiImageGenerator {
    async fn generate_pose_image(&self, prompt: &str) -> Result<String, GenerationError> {
        retry_with_backoff(&self.retry, "Image generation", || self.request_once(prompt)).await
    }
}

/// 离线占位图：由提示词派生稳定的种子，沿用体式库的占位图地址格式
#[derive(Debug, Default)]
pub struct PlaceholderImageGenerator;

#[async_trait]
impl PoseImageGenerator for PlaceholderImageGenerator {
    async fn generate_pose_image(&self, prompt: &str) -> Result<String, GenerationError> {
        let seed: String = prompt
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(24)
            .collect::<String>()
            .to_lowercase();
        if seed.is_empty() {
            return Err(GenerationError::Parse(format!("unusable image prompt: {prompt:?}")));
        }
        Ok(placeholder_image(&seed))
    }
}
