//! 事件处理
//!
//! 轮询 crossterm 键盘事件；按键经 `handle_key` 结合当前焦点映射为 KeyAction，
//! 需要修改画布或会话的动作作为 Command 发给编排器，其余只改本地 ViewState。

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

use crate::core::{Command, SessionPhase, StudioState};
use crate::ui::render::{Focus, ViewState};

/// 一次按键的结果
#[derive(Debug, Clone)]
pub enum KeyAction {
    None,
    Send(Command),
    Quit,
}

/// 事件处理器：持有 cmd_tx，poll 时读键盘
pub struct EventHandler {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl EventHandler {
    pub fn new(cmd_tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { cmd_tx }
    }

    pub fn poll(&self) -> anyhow::Result<Option<KeyEvent>> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(Some(key));
                }
            }
        }
        Ok(None)
    }

    pub fn send(&self, cmd: Command) {
        let _ = self.cmd_tx.send(cmd);
    }
}

/// 练习按钮是单个开关：按当前阶段选择开始或停止，Requesting 时不响应
pub fn practice_toggle(state: &StudioState) -> Option<Command> {
    match state.practice.phase {
        SessionPhase::Idle => Some(Command::StartPractice),
        SessionPhase::Playing => Some(Command::StopPractice),
        SessionPhase::Requesting => None,
    }
}

/// 新的生成结果落地后清空意图输入；失败时 completed_generations 不变，输入保留以便重试
pub fn settle_intent(view: &mut ViewState, state: &StudioState) {
    if state.completed_generations != view.seen_generations {
        view.seen_generations = state.completed_generations;
        view.intent.clear();
    }
}

/// 按键映射；全局快捷键优先，其余按焦点分派
pub fn handle_key(view: &mut ViewState, state: &StudioState, key: KeyEvent) -> KeyAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') if ctrl => return KeyAction::Quit,
        KeyCode::Char('l') if ctrl => {
            view.canvas_index = 0;
            return KeyAction::Send(Command::Clear);
        }
        KeyCode::Tab => {
            view.focus = view.focus.next();
            return KeyAction::None;
        }
        KeyCode::BackTab => {
            view.focus = view.focus.prev();
            return KeyAction::None;
        }
        _ => {}
    }

    match view.focus {
        Focus::Library => library_key(view, key),
        Focus::Canvas => canvas_key(view, state, key),
        Focus::Intent => intent_key(view, state, key),
    }
}

fn library_key(view: &mut ViewState, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Up => view.library_index = view.library_index.saturating_sub(1),
        KeyCode::Down => {
            let len = view.library_results().len();
            view.library_index = (view.library_index + 1).min(len.saturating_sub(1));
        }
        KeyCode::Left => {
            view.cycle_category_back();
            view.library_index = 0;
        }
        KeyCode::Right => {
            view.cycle_category();
            view.library_index = 0;
        }
        KeyCode::Enter => {
            if let Some(pose) = view.library_results().get(view.library_index) {
                return KeyAction::Send(Command::AddPose(pose.id.clone()));
            }
        }
        KeyCode::Backspace => {
            view.search.pop();
            view.library_index = 0;
        }
        KeyCode::Char(c) => {
            view.search.push(c);
            view.library_index = 0;
        }
        _ => {}
    }
    KeyAction::None
}

fn canvas_key(view: &mut ViewState, state: &StudioState, key: KeyEvent) -> KeyAction {
    let items = &state.sequence.items;
    let len = items.len();
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let index = view.canvas_index.min(len.saturating_sub(1));

    let move_up = matches!(key.code, KeyCode::Char('K')) || (shift && key.code == KeyCode::Up);
    let move_down = matches!(key.code, KeyCode::Char('J')) || (shift && key.code == KeyCode::Down);

    if move_up && index > 0 && index < len {
        view.canvas_index = index - 1;
        return KeyAction::Send(Command::Reorder {
            from: items[index].item.canvas_id,
            to: items[index - 1].item.canvas_id,
        });
    }
    if move_down && index + 1 < len {
        view.canvas_index = index + 1;
        return KeyAction::Send(Command::Reorder {
            from: items[index].item.canvas_id,
            to: items[index + 1].item.canvas_id,
        });
    }
    if move_up || move_down {
        return KeyAction::None;
    }

    match key.code {
        KeyCode::Up => view.canvas_index = index.saturating_sub(1),
        KeyCode::Down => view.canvas_index = (index + 1).min(len.saturating_sub(1)),
        KeyCode::Delete | KeyCode::Char('x') => {
            if let Some(view_item) = items.get(index) {
                view.canvas_index = index.min(len.saturating_sub(2));
                return KeyAction::Send(Command::Remove(view_item.item.canvas_id));
            }
        }
        KeyCode::Char('p') => {
            if let Some(cmd) = practice_toggle(state) {
                return KeyAction::Send(cmd);
            }
        }
        _ => {}
    }
    KeyAction::None
}

fn intent_key(view: &mut ViewState, state: &StudioState, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Enter => {
            // 生成中不重复提交；输入保留，失败后可直接重试
            if state.is_generating() {
                return KeyAction::None;
            }
            let intent = view.intent.trim().to_string();
            if !intent.is_empty() {
                return KeyAction::Send(Command::Generate(intent));
            }
        }
        KeyCode::Backspace => {
            view.intent.pop();
        }
        KeyCode::Char(c) => view.intent.push(c),
        _ => {}
    }
    KeyAction::None
}
