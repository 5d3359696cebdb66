//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）+ 传输层重试

pub mod deepseek;
pub mod message;
pub mod mock;
pub mod openai;
pub mod retry;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT, DEEPSEEK_REASONER};
pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use retry::{retry_with_backoff, RetryConfig, Retryable, RetryingLlmClient};
pub use traits::{LlmClient, LlmError};
