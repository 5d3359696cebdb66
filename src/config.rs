//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ZENFLOW__*` 覆盖（双下划线表示嵌套，如 `ZENFLOW__LLM__PROVIDER=openai`）。
//! API Key 不进配置文件，只从 `OPENAI_API_KEY` / `DEEPSEEK_API_KEY` 读取。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::flow::{SequenceDefaults, DEFAULT_DESCRIPTION, DEFAULT_TITLE};
use crate::llm::RetryConfig;
use crate::services::image::{DEFAULT_IMAGE_MODEL, DEFAULT_IMAGE_SIZE};
use crate::services::speech::{DEFAULT_SAMPLE_RATE, DEFAULT_SPEECH_MODEL, DEFAULT_VOICE};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub media: MediaSection,
    pub retry: RetrySection,
}

/// [app] 段：应用名、空画布占位文案、日志文件
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    pub default_title: String,
    pub default_description: String,
    /// TUI 占用终端，日志写文件
    pub log_file: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            default_title: DEFAULT_TITLE.to_string(),
            default_description: DEFAULT_DESCRIPTION.to_string(),
            log_file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("zenflow.log")
}

impl AppSection {
    pub fn sequence_defaults(&self) -> SequenceDefaults {
        SequenceDefaults {
            title: self.default_title.clone(),
            description: self.default_description.clone(),
        }
    }
}

/// [llm] 段：文本后端选择与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / deepseek；与 API Key 共同决定实际后端
    pub provider: String,
    /// 通用模型名；未设置 openai.model / deepseek.model 时使用
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub deepseek: LlmDeepSeekSection,
    pub openai: LlmOpenAiSection,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            deepseek: LlmDeepSeekSection::default(),
            openai: LlmOpenAiSection::default(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmDeepSeekSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LlmOpenAiSection {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [media] 段：配图与语音合成
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaSection {
    pub image_model: String,
    pub image_size: String,
    pub speech_model: String,
    pub voice: String,
    /// PCM 采样率（Hz），同时决定播放时长
    pub sample_rate: u32,
    /// 输出设备名；未设置或找不到时用系统默认设备
    pub audio_device: Option<String>,
}

impl Default for MediaSection {
    fn default() -> Self {
        Self {
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            speech_model: DEFAULT_SPEECH_MODEL.to_string(),
            voice: DEFAULT_VOICE.to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            audio_device: None,
        }
    }
}

/// [retry] 段：传输层重试（仅对网络错误、429 与 5xx 生效）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let d = RetryConfig::default();
        Self {
            max_attempts: d.max_attempts,
            initial_delay_ms: d.initial_delay.as_millis() as u64,
            backoff_multiplier: d.backoff_multiplier,
        }
    }
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.max(1),
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}

/// 从 config 目录加载配置，环境变量 ZENFLOW__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ZENFLOW__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ZENFLOW")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
