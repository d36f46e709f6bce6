use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, ToastLevel};
use crate::ui::style;

pub fn render_title_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let title = if model.step.title().trim().is_empty() {
        "untitled step"
    } else {
        model.step.title()
    };
    let bar = Paragraph::new(format!(" chiclet  {title}")).style(style::title_bar_style());
    frame.render_widget(bar, area);
}

/// One-line preview of the canonical value the session would save, with
/// newlines folded so the token wire text stays on a single row.
pub fn render_raw_preview_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let preview: String = model
        .session
        .value()
        .chars()
        .map(|ch| if ch == '\n' { '\u{23ce}' } else { ch })
        .collect();
    let bar = Paragraph::new(format!(" raw: {preview}")).style(style::raw_preview_style());
    frame.render_widget(bar, area);
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let filename = model
        .file_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "untitled".to_string());

    let dirty_indicator = if model.is_dirty() { " [modified]" } else { "" };
    let watch_indicator = if model.watch_enabled {
        " [watching]"
    } else {
        ""
    };
    let (pos, len) = model.caret_progress();
    let status = format!(
        " {}{}  Pos {}/{}{}  @:insert  Ctrl+S:save  Esc:quit",
        filename, dirty_indicator, pos, len, watch_indicator
    );

    let status_bar = Paragraph::new(status).style(style::status_bar_style());
    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{} {}", prefix, message)).style(style);
    frame.render_widget(toast, area);
}
