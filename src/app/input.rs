use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::Rect;

use crate::app::{App, Message, Model};
use crate::ui::{self, layout, layout::Hit};

use super::event_loop::ResizeDebouncer;

impl App {
    pub(super) fn handle_event(
        &self,
        event: Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) => self.handle_key(key, model),
            Event::Mouse(mouse) => self.handle_mouse(mouse, model),
            Event::Resize(w, h) => {
                crate::perf::log_event("event.resize.queue", format!("width={} height={}", w, h));
                resize_debouncer.queue(w, h, now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(&self, key: KeyEvent, model: &Model) -> Option<Message> {
        // The open picker captures all keys
        if model.picker_open() {
            let filter = model
                .picker
                .as_ref()
                .map(|picker| picker.filter.clone())
                .unwrap_or_default();
            return match key.code {
                KeyCode::Esc => Some(Message::PickerCancel),
                KeyCode::Enter => Some(Message::PickerSelect),
                KeyCode::Up => Some(Message::PickerUp),
                KeyCode::Down => Some(Message::PickerDown),
                KeyCode::Backspace => {
                    let mut next = filter;
                    if next.pop().is_none() {
                        // Erasing past an empty filter dismisses the picker
                        return Some(Message::PickerCancel);
                    }
                    Some(Message::PickerInput(next))
                }
                KeyCode::Char(c)
                    if !key.modifiers.contains(KeyModifiers::CONTROL)
                        && !key.modifiers.contains(KeyModifiers::ALT) =>
                {
                    let mut next = filter;
                    next.push(c);
                    Some(Message::PickerInput(next))
                }
                _ => None,
            };
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            // Clipboard and history
            KeyCode::Char('c' | 'C') if ctrl => Some(Message::Copy),
            KeyCode::Char('x' | 'X') if ctrl => Some(Message::Cut),
            KeyCode::Char('v' | 'V') if ctrl => Some(Message::Paste),
            KeyCode::Char('z' | 'Z') if ctrl => Some(Message::Undo),
            KeyCode::Char('y' | 'Y') if ctrl => Some(Message::Redo),

            // File
            KeyCode::Char('s' | 'S') if ctrl => Some(Message::Save),

            // Quit
            KeyCode::Char('q' | 'Q') if ctrl => Some(Message::Quit),
            KeyCode::Esc => Some(Message::Quit),

            // Movement
            KeyCode::Left if ctrl => Some(Message::MoveWordLeft),
            KeyCode::Right if ctrl => Some(Message::MoveWordRight),
            KeyCode::Left if shift => Some(Message::ExtendLeft),
            KeyCode::Right if shift => Some(Message::ExtendRight),
            KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Up => Self::vertical_move(model, -1),
            KeyCode::Down => Self::vertical_move(model, 1),
            KeyCode::Home => Some(Message::MoveLineStart),
            KeyCode::End => Some(Message::MoveLineEnd),

            // Editing
            KeyCode::Backspace => Some(Message::DeleteBack),
            KeyCode::Delete => Some(Message::DeleteForward),
            KeyCode::Enter => Some(Message::InsertNewline),
            KeyCode::Char('@') => Some(Message::OpenPicker),
            KeyCode::Char(c) if !ctrl && !alt => Some(Message::TypeChar(c)),
            _ => None,
        }
    }

    /// Up and Down move the caret by visual row, keeping the column. A hit
    /// on a pill parks the caret at the pill's near edge.
    fn vertical_move(model: &Model, delta: isize) -> Option<Message> {
        let layout = layout::build(model.session.surface(), model.content_width());
        let (row, col) = layout.caret_position(model.caret_flat());
        let target = row.checked_add_signed(delta)?;
        if target >= layout.row_count() {
            return None;
        }
        match layout.hit_test(target, col) {
            Hit::Caret(pos) => Some(Message::PlaceCaret(pos)),
            Hit::Island { flat, .. } => Some(Message::PlaceCaret(flat)),
        }
    }

    pub(super) fn handle_mouse(&self, mouse: MouseEvent, model: &Model) -> Option<Message> {
        let frame = Rect::new(0, 0, model.viewport_width, model.viewport_height);

        if model.picker_open() {
            if !matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
                return None;
            }
            let entries = model.filtered_entries().len();
            let popup = ui::picker_rect(frame, entries);
            if point_in_rect(mouse.column, mouse.row, popup) {
                let items_top = ui::picker_items_top(popup);
                let index = usize::from(mouse.row.checked_sub(items_top)?);
                if index < entries {
                    return Some(Message::PickerClick(index));
                }
                return None;
            }
            return Some(Message::PickerCancel);
        }

        let surface_rect = ui::surface_area(
            model.viewport_width,
            model.viewport_height,
            model.active_toast().is_some(),
        );
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if !point_in_rect(mouse.column, mouse.row, surface_rect) {
                    return None;
                }
                let col = mouse
                    .column
                    .checked_sub(surface_rect.x + ui::SURFACE_LEFT_PADDING)?;
                let row = usize::from(mouse.row - surface_rect.y) + model.scroll;
                let layout = layout::build(model.session.surface(), model.content_width());
                match layout.hit_test(row, col) {
                    Hit::Caret(pos) => Some(Message::PlaceCaret(pos)),
                    Hit::Island { node, .. } => Some(Message::ClickIsland(node)),
                }
            }
            MouseEventKind::ScrollUp => Some(Message::ScrollUp(3)),
            MouseEventKind::ScrollDown => Some(Message::ScrollDown(3)),
            _ => None,
        }
    }

    pub(super) fn view(model: &mut Model, frame: &mut Frame) {
        ui::render(model, frame);
    }
}

fn point_in_rect(col: u16, row: u16, rect: Rect) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}
