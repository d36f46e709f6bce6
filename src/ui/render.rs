use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Model;
use crate::editor::{MemorySurface, Node, Surface, surface};

use super::layout::{self, LayoutCell, LayoutRow};
use super::{SURFACE_LEFT_PADDING, overlays, status, style};

/// The region the wrapped surface occupies, below the title bar and above
/// the footer bars. Mouse hit testing uses the same computation so clicks
/// land where the pixels are.
pub fn surface_area(width: u16, height: u16, toast_visible: bool) -> Rect {
    let footer = 2 + u16::from(toast_visible);
    let top = 1_u16.min(height);
    let rows = height.saturating_sub(top).saturating_sub(footer);
    Rect::new(0, top, width, rows)
}

/// Paint the full frame: title bar, wrapped surface, footer bars, and the
/// reference picker overlay when it is open.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();
    if area.height == 0 || area.width == 0 {
        return;
    }

    status::render_title_bar(model, frame, Rect::new(area.x, area.y, area.width, 1));

    let surface_rect = surface_area(area.width, area.height, model.active_toast().is_some());
    let surface_rect = Rect::new(
        area.x + surface_rect.x,
        area.y + surface_rect.y,
        surface_rect.width,
        surface_rect.height,
    );
    render_surface(model, frame, surface_rect);

    // Footer bars stack bottom-up: status, raw preview, then toast
    let mut footer_y = area.y + area.height;
    let footer_top = surface_rect.y + surface_rect.height;
    if footer_y > footer_top {
        footer_y -= 1;
        status::render_status_bar(model, frame, Rect::new(area.x, footer_y, area.width, 1));
    }
    if footer_y > footer_top {
        footer_y -= 1;
        status::render_raw_preview_bar(model, frame, Rect::new(area.x, footer_y, area.width, 1));
    }
    if model.active_toast().is_some() && footer_y > footer_top {
        footer_y -= 1;
        status::render_toast_bar(model, frame, Rect::new(area.x, footer_y, area.width, 1));
    }

    if model.picker_open() {
        overlays::render_picker_overlay(model, frame, area);
    }
}

fn render_surface(model: &Model, frame: &mut Frame, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let surface = model.session.surface();
    let layout = layout::build(surface, model.content_width());
    let caret_flat = model.caret_flat();
    let (caret_row, _) = layout.caret_position(caret_flat);
    let selection_span = model
        .session
        .selection()
        .and_then(|sel| surface::flat_span(surface, sel));

    let first = model.scroll.min(layout.row_count().saturating_sub(1));
    let mut lines: Vec<Line> = Vec::new();
    for (row_idx, row) in layout
        .rows()
        .iter()
        .enumerate()
        .skip(first)
        .take(usize::from(area.height))
    {
        let caret = (row_idx == caret_row).then_some(caret_flat);
        lines.push(render_row(row, surface, caret, selection_span));
    }

    let indent = SURFACE_LEFT_PADDING.min(area.width);
    let text_area = Rect::new(
        area.x + indent,
        area.y,
        area.width - indent,
        area.height,
    );
    frame.render_widget(Paragraph::new(lines), text_area);

    if surface.is_placeholder() && area.height > 1 {
        let hint = Paragraph::new("Type to start, @ inserts a reference").style(style::hint_style());
        frame.render_widget(hint, Rect::new(text_area.x, area.y + 1, text_area.width, 1));
    }
}

/// Render one layout row. The caret paints as a block over the first visible
/// cell at or past its flat position; at end of row it paints over a trailing
/// space. A caret resting against an island lands on the pill's leading pad
/// character rather than restyling the whole pill.
fn render_row(
    row: &LayoutRow,
    surface: &MemorySurface,
    caret: Option<usize>,
    selection: Option<(usize, usize)>,
) -> Line<'static> {
    let caret_cell = caret.and_then(|flat| {
        row.cells()
            .iter()
            .position(|cell| cell.width() > 0 && cell.flat() >= flat)
    });

    let mut spans: Vec<Span> = Vec::new();
    let mut run = String::new();
    let mut run_style = Style::default();
    for (idx, cell) in row.cells().iter().enumerate() {
        match cell {
            LayoutCell::Char { flat, ch, width } => {
                if *width == 0 {
                    continue;
                }
                let mut cell_style = Style::default();
                if selection.is_some_and(|(lo, hi)| *flat >= lo && *flat < hi) {
                    cell_style = style::apply_selection_bg(cell_style);
                }
                if caret_cell == Some(idx) {
                    cell_style = style::caret_style();
                }
                if cell_style != run_style && !run.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut run), run_style));
                }
                run_style = cell_style;
                run.push(*ch);
            }
            LayoutCell::Pill { node, label, .. } => {
                if !run.is_empty() {
                    spans.push(Span::styled(std::mem::take(&mut run), run_style));
                    run_style = Style::default();
                }
                let Some(island) = surface.node(*node).and_then(Node::as_island) else {
                    continue;
                };
                let pill = style::pill_style(
                    island.token().kind(),
                    island.token().is_invalid(),
                    island.is_selected(),
                );
                if caret_cell == Some(idx) {
                    let mut chars = label.chars();
                    if let Some(first) = chars.next() {
                        spans.push(Span::styled(first.to_string(), style::caret_style()));
                        spans.push(Span::styled(chars.collect::<String>(), pill));
                    }
                } else {
                    spans.push(Span::styled(label.clone(), pill));
                }
            }
        }
    }
    if !run.is_empty() {
        spans.push(Span::styled(run, run_style));
    }
    if caret.is_some() && caret_cell.is_none() {
        spans.push(Span::styled(" ", style::caret_style()));
    }
    Line::from(spans)
}
