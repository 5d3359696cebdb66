//! TUI 层：Ratatui + crossterm，主循环（app）、按键映射（event）、渲染（render）

pub mod app;
pub mod event;
pub mod render;

pub use app::run_app;
pub use event::{handle_key, settle_intent, EventHandler, KeyAction};
pub use render::{draw, Focus, ViewState};
