//! TUI 应用主循环
//!
//! 进入全屏/原始模式，轮询 state_rx 与键盘事件，将按键经 handle_key 转为 Command 发送给编排器，
//! 每帧用 draw 渲染 StudioState 与本地 ViewState。

use std::io::{self, Stdout};

use anyhow::Context;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::{mpsc, watch};

use crate::core::{Command, StudioState};
use crate::ui::event::{handle_key, settle_intent, EventHandler, KeyAction};
use crate::ui::render::{draw, ViewState};

/// 运行 TUI：启用原始模式与全屏，循环 poll 事件 + 渲染，退出时恢复终端
pub async fn run_app(
    state_rx: watch::Receiver<StudioState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, state_rx, cmd_tx).await;
    restore_terminal(&mut terminal)?;
    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    state_rx: watch::Receiver<StudioState>,
    cmd_tx: mpsc::UnboundedSender<Command>,
) -> anyhow::Result<()> {
    let event_handler = EventHandler::new(cmd_tx);
    let mut view = ViewState::default();

    loop {
        let state = state_rx.borrow().clone();
        settle_intent(&mut view, &state);

        if let Some(key) = event_handler.poll()? {
            match handle_key(&mut view, &state, key) {
                KeyAction::Send(cmd) => event_handler.send(cmd),
                KeyAction::Quit => {
                    event_handler.send(Command::Quit);
                    break;
                }
                KeyAction::None => {}
            }
        }

        terminal.draw(|f| draw(f, &state, &view))?;
        tokio::task::yield_now().await;
    }
    Ok(())
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
