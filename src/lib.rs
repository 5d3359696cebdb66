//! ZenFlow - 瑜伽序列工作室
//!
//! 模块划分：
//! - **catalog**: 内置体式库（只读）与检索、名称近似匹配
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排、状态投影、配图补全、练习会话、错误恢复
//! - **flow**: 序列画布（条目、顺序、安全检查）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）与传输层重试
//! - **observability**: tracing 日志初始化
//! - **services**: AI 协作方（序列生成、配图、引导音频、播放）
//! - **ui**: Ratatui TUI 界面

pub mod catalog;
pub mod config;
pub mod core;
pub mod flow;
pub mod llm;
pub mod observability;
pub mod services;
pub mod ui;
