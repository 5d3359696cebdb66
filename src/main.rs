//! ZenFlow - 瑜伽序列工作室
//!
//! 入口：加载配置、初始化日志、创建工作室编排器与 TUI，并运行主循环。

use anyhow::Context;
use zenflow::config::{load_config, AppConfig};
use zenflow::{core::create_studio, observability, ui::run_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let (cfg, load_error) = match load_config(config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    observability::init(&cfg.app.log_file).context("Failed to initialize logging")?;
    if let Some(e) = load_error {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }

    // 创建工作室：返回命令发送端、状态接收端
    let (cmd_tx, state_rx) = create_studio(&cfg);

    // 启动 TUI 主循环（消费 state，向 cmd_tx 发送用户指令）
    run_app(state_rx, cmd_tx).await.context("App run failed")?;

    Ok(())
}
