//! 传输层重试：指数退避
//!
//! 对应「重试交给传输层」的约定：文本生成、配图、语音合成的 HTTP 调用都经过这里，
//! 上层（配图补全、练习会话）自身从不重试。

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message};

/// 错误是否值得再试一次
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// 重试策略
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// 总尝试次数（含第一次），至少为 1
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// 第 attempt 次失败后的等待时间（attempt 从 1 开始）
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        Duration::from_millis(millis as u64)
    }
}

/// 按策略重试 `op`，不可重试的错误立即返回
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = config.delay_after(attempt);
                tracing::warn!(
                    "{} failed (attempt {}/{}), retrying in {}ms: {}",
                    label,
                    attempt,
                    max_attempts,
                    delay.as_millis(),
                    e
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// 为任意 LlmClient 套上重试策略
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        retry_with_backoff(&self.config, "LLM completion", || self.inner.complete(messages)).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            backoff_multiplier: 2.0,
        }
    }

    /// 前 `failures` 次返回指定错误，之后成功
    struct Flaky {
        calls: AtomicU32,
        failures: u32,
        error: LlmError,
    }

    #[async_trait]
    impl LlmClient for Flaky {
        async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok("ok".to_string())
            }
        }
    }

    #[test]
    fn test_delay_grows_exponentially() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.delay_after(1), Duration::from_millis(1000));
        assert_eq!(cfg.delay_after(2), Duration::from_millis(2000));
        assert_eq!(cfg.delay_after(3), Duration::from_millis(4000));
    }

    #[tokio::test]
    async fn test_retries_server_errors_until_success() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: 2,
            error: LlmError::ApiError {
                status: Some(500),
                message: "internal".into(),
            },
        });
        let client = RetryingLlmClient::new(flaky.clone(), fast());
        assert_eq!(client.complete(&[]).await.unwrap(), "ok");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: 10,
            error: LlmError::Timeout,
        });
        let client = RetryingLlmClient::new(flaky.clone(), fast());
        assert_eq!(client.complete(&[]).await, Err(LlmError::Timeout));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: 10,
            error: LlmError::ApiError {
                status: Some(400),
                message: "bad request".into(),
            },
        });
        let client = RetryingLlmClient::new(flaky.clone(), fast());
        assert!(client.complete(&[]).await.is_err());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            failures: 1,
            error: LlmError::ApiError {
                status: Some(429),
                message: "slow down".into(),
            },
        });
        let client = RetryingLlmClient::new(flaky.clone(), fast());
        assert!(client.complete(&[]).await.is_ok());
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }
}
