use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::app::Model;
use crate::registry::kind_label;
use crate::ui::style;

pub fn picker_rect(area: Rect, items_len: usize) -> Rect {
    let popup_width = area.width.saturating_sub(16).max(44);
    // Filter line, blank, items, blank, hint, plus border and padding
    #[allow(clippy::cast_possible_truncation)]
    let needed_rows = (items_len.max(1) as u16) + 8;
    let popup_height = needed_rows.min(area.height.saturating_sub(4).max(8));
    centered_popup_rect(popup_width, popup_height, area)
}

pub const fn picker_content_top(popup: Rect) -> u16 {
    // 1 row for border + 1 row for padding
    popup.y + 2
}

/// First row of the entry list, below the filter line and its spacer.
pub const fn picker_items_top(popup: Rect) -> u16 {
    picker_content_top(popup) + 2
}

pub fn render_picker_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(picker) = model.picker.as_ref() else {
        return;
    };
    let entries = model.filtered_entries();
    let popup = picker_rect(area, entries.len());

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled(
            format!("@{}", picker.filter),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::raw(" "));

    if entries.is_empty() {
        lines.push(Line::from(vec![
            Span::raw("   "),
            Span::styled("(no matching references)", style::hint_style()),
        ]));
    }
    for (list_idx, (_, entry)) in entries.iter().enumerate() {
        let selected = list_idx == picker.selected;
        let marker = if selected { " \u{25b8} " } else { "   " };
        let icon = entry
            .icon()
            .map(|icon| format!("{icon} "))
            .unwrap_or_default();
        let title_style = if selected {
            Style::default()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::REVERSED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(format!("{}{}", icon, entry.token().title()), title_style),
            Span::styled(
                format!("  {}", kind_label(entry.token().kind())),
                Style::default().fg(Color::Cyan),
            ),
        ]));
    }

    lines.push(Line::raw(" "));
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled(
            "\u{2191}/\u{2193} select \u{b7} Enter inserts \u{b7} Esc cancels",
            style::hint_style(),
        ),
    ]));

    let block = Block::default()
        .title("Insert Reference")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
