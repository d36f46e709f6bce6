//! Colors for pills, selection, and chrome.

use ratatui::style::{Color, Modifier, Style};

use crate::template::RefKind;

/// Style for an island pill. Kind picks the base color, invalid tokens get a
/// red strike-through treatment, and selection reverses the pill.
pub fn pill_style(kind: RefKind, invalid: bool, selected: bool) -> Style {
    let mut style = if invalid {
        Style::default()
            .bg(Color::Red)
            .fg(Color::White)
            .add_modifier(Modifier::CROSSED_OUT)
    } else {
        match kind {
            RefKind::NodeOutput => Style::default().bg(Color::Blue).fg(Color::White),
            RefKind::Asset => Style::default().bg(Color::Magenta).fg(Color::White),
            RefKind::Tool => Style::default().bg(Color::Green).fg(Color::Black),
        }
    };
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

/// Block caret, drawn over the character to the caret's right.
pub fn caret_style() -> Style {
    Style::default().bg(Color::White).fg(Color::Black)
}

/// Background for text inside the active selection.
pub fn apply_selection_bg(style: Style) -> Style {
    style.bg(Color::DarkGray)
}

/// Dim hint text used by the empty-surface placeholder and overlay footers.
pub fn hint_style() -> Style {
    Style::default().fg(Color::Indexed(245))
}

pub fn title_bar_style() -> Style {
    Style::default()
        .bg(Color::Indexed(236))
        .fg(Color::White)
        .add_modifier(Modifier::BOLD)
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::DarkGray).fg(Color::White)
}

/// Bar showing the canonical value as it would be written to disk.
pub fn raw_preview_style() -> Style {
    Style::default()
        .bg(Color::Indexed(234))
        .fg(Color::Indexed(250))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pill_style_varies_by_kind() {
        let node = pill_style(RefKind::NodeOutput, false, false);
        let asset = pill_style(RefKind::Asset, false, false);
        let tool = pill_style(RefKind::Tool, false, false);
        assert_ne!(node.bg, asset.bg);
        assert_ne!(asset.bg, tool.bg);
    }

    #[test]
    fn test_invalid_pill_is_struck_through() {
        let style = pill_style(RefKind::Asset, true, false);
        assert_eq!(style.bg, Some(Color::Red));
        assert!(style.add_modifier.contains(Modifier::CROSSED_OUT));
    }

    #[test]
    fn test_selected_pill_is_reversed() {
        let style = pill_style(RefKind::Tool, false, true);
        assert!(style.add_modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn test_selection_bg_applies_over_plain_text() {
        let style = apply_selection_bg(Style::default());
        assert_eq!(style.bg, Some(Color::DarkGray));
    }
}
