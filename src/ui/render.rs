//! 界面渲染
//!
//! 根据 StudioState 与本地 ViewState 绘制：标题栏显示序列标题与练习阶段，
//! 主体为体式库侧栏、序列画布（含安全提示）、体式预览或引导词，底部为意图输入框与快捷键提示。

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::catalog::{self, Pose, PoseCategory};
use crate::core::{GenerationStatus, SessionPhase, StudioState};
use crate::flow::{ItemView, SequenceItem};

/// 安全提示颜色
const AMBER: Color = Color::Rgb(255, 191, 0);

/// 当前焦点区域（Tab 循环）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Library,
    Canvas,
    Intent,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Library => Focus::Canvas,
            Focus::Canvas => Focus::Intent,
            Focus::Intent => Focus::Library,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Library => Focus::Intent,
            Focus::Canvas => Focus::Library,
            Focus::Intent => Focus::Canvas,
        }
    }
}

/// UI 本地状态：焦点、侧栏检索、选中项、意图输入；不经过编排器
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub focus: Focus,
    pub search: String,
    pub category: Option<PoseCategory>,
    pub library_index: usize,
    pub canvas_index: usize,
    pub intent: String,
    /// 上次看到的 completed_generations
    pub seen_generations: u64,
}

impl ViewState {
    pub fn library_results(&self) -> Vec<&'static Pose> {
        catalog::filter(&self.search, self.category)
    }

    /// 全部 → Standing → … → Prone → 全部
    pub fn cycle_category(&mut self) {
        let all = PoseCategory::ALL;
        self.category = match self.category {
            None => Some(all[0]),
            Some(c) => all
                .iter()
                .position(|x| *x == c)
                .and_then(|i| all.get(i + 1))
                .copied(),
        };
    }

    pub fn cycle_category_back(&mut self) {
        let all = PoseCategory::ALL;
        self.category = match self.category {
            None => all.last().copied(),
            Some(c) => match all.iter().position(|x| *x == c) {
                Some(0) | None => None,
                Some(i) => Some(all[i - 1]),
            },
        };
    }

    pub fn selected_item<'a>(&self, state: &'a StudioState) -> Option<&'a ItemView> {
        let items = &state.sequence.items;
        items.get(self.canvas_index.min(items.len().saturating_sub(1)))
    }
}

fn phase_label(state: &StudioState) -> String {
    match state.practice.phase {
        SessionPhase::Idle => "Idle".to_string(),
        SessionPhase::Requesting => "Preparing session…".to_string(),
        SessionPhase::Playing => {
            let elapsed = state
                .practice
                .started_at
                .map(|t| (Local::now() - t).num_seconds().max(0))
                .unwrap_or(0);
            format!("Practicing {:02}:{:02}", elapsed / 60, elapsed % 60)
        }
    }
}

fn image_status(item: &SequenceItem) -> Span<'static> {
    if item.image_loading {
        Span::styled("AI drawing…", Style::default().fg(Color::Magenta))
    } else if item.image_error {
        Span::styled("fallback", Style::default().fg(Color::DarkGray))
    } else if item.image_url.is_some() {
        Span::styled("image", Style::default().fg(Color::Green))
    } else {
        Span::raw("")
    }
}

fn focus_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// 绘制一帧
pub fn draw(f: &mut Frame, state: &StudioState, view: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_title(f, chunks[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(28),
            Constraint::Percentage(42),
            Constraint::Percentage(30),
        ])
        .split(chunks[1]);
    draw_library(f, body[0], view);
    draw_canvas(f, body[1], state, view);
    draw_preview(f, body[2], state, view);

    draw_intent(f, chunks[2], state, view);

    let help = " Tab focus │ Enter add/generate │ x remove │ K/J move │ p practice │ ←/→ category │ Ctrl+L clear │ Ctrl+Q quit ";
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[3],
    );
}

fn draw_title(f: &mut Frame, area: Rect, state: &StudioState) {
    let mut spans = vec![
        Span::styled(
            state.sequence.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(" │ "),
        Span::raw(state.sequence.description.clone()),
    ];
    if let Some(err) = &state.error_message {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(err.clone(), Style::default().fg(Color::Red)));
    }
    let block = Block::default()
        .title(format!(" ZenFlow │ {} ", phase_label(state)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_library(f: &mut Frame, area: Rect, view: &ViewState) {
    let results = view.library_results();
    let items: Vec<ListItem> = results
        .iter()
        .map(|p| {
            ListItem::new(Line::from(vec![
                Span::raw(p.name.clone()),
                Span::styled(
                    format!("  {}", p.difficulty),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();
    let category = view.category.map_or("All", |c| c.as_str());
    let title = if view.search.is_empty() {
        format!(" Library │ {} ", category)
    } else {
        format!(" Library │ {} │ \"{}\" ", category, view.search)
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(view.focus == Focus::Library)),
        )
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .highlight_symbol("› ");
    let mut list_state = ListState::default();
    if !results.is_empty() {
        list_state.select(Some(view.library_index.min(results.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_canvas(f: &mut Frame, area: Rect, state: &StudioState, view: &ViewState) {
    let items: Vec<ListItem> = state
        .sequence
        .items
        .iter()
        .map(|v| {
            let pose = &v.item.pose;
            let mut lines = vec![Line::from(vec![
                Span::styled(
                    format!("{:>2}. ", v.position + 1),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(pose.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "  {} · {} · {}  ",
                    pose.duration, pose.category, pose.difficulty
                )),
                image_status(&v.item),
            ])];
            if let Some(warning) = v.warning {
                lines.push(Line::from(Span::styled(
                    format!("    ⚠ {}", warning.message()),
                    Style::default().fg(AMBER),
                )));
            }
            ListItem::new(Text::from(lines))
        })
        .collect();

    let title = if state.pending_images > 0 {
        format!(
            " Sequence │ {} poses │ {} image(s) pending ",
            state.sequence.len(),
            state.pending_images
        )
    } else {
        format!(" Sequence │ {} poses ", state.sequence.len())
    };
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(focus_style(view.focus == Focus::Canvas)),
        )
        .highlight_style(Style::default().fg(Color::Cyan))
        .highlight_symbol("› ");
    let mut list_state = ListState::default();
    if !state.sequence.is_empty() {
        list_state.select(Some(view.canvas_index.min(state.sequence.len() - 1)));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_preview(f: &mut Frame, area: Rect, state: &StudioState, view: &ViewState) {
    // 播放中显示引导词
    if let Some(script) = &state.practice.script {
        let block = Block::default()
            .title(" Guidance ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));
        f.render_widget(
            Paragraph::new(script.clone())
                .block(block)
                .wrap(Wrap { trim: true }),
            area,
        );
        return;
    }

    let pose = match view.focus {
        Focus::Library => view.library_results().get(view.library_index).copied(),
        _ => view.selected_item(state).map(|v| &v.item.pose),
    };
    let block = Block::default().title(" Preview ").borders(Borders::ALL);
    let Some(pose) = pose else {
        f.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Yellow);
    let lines = vec![
        Line::from(Span::styled(
            pose.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "{} · {} · intensity {}",
            pose.category, pose.difficulty, pose.intensity
        )),
        Line::from(""),
        Line::from(pose.description.clone()),
        Line::from(""),
        Line::from(vec![Span::styled("Benefits: ", label), Span::raw(pose.benefits.clone())]),
        Line::from(vec![
            Span::styled("Breathing: ", label),
            Span::raw(pose.breathing_guidance.clone()),
        ]),
    ];
    f.render_widget(
        Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn draw_intent(f: &mut Frame, area: Rect, state: &StudioState, view: &ViewState) {
    let title = match &state.generation {
        GenerationStatus::Idle => " Describe your focus (Enter to generate) ".to_string(),
        GenerationStatus::Loading { intent } => format!(" Generating \"{}\"… ", intent),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(focus_style(view.focus == Focus::Intent));
    f.render_widget(Paragraph::new(view.intent.as_str()).block(block), area);
}
