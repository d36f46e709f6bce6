use crate::app::Model;
use crate::app::model::{PickerState, ToastLevel};

/// All possible events and actions in the application.
///
/// These represent user input, system events, and internal actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Text editing
    /// Insert a character at the caret
    TypeChar(char),
    /// Insert a line break
    InsertNewline,
    /// Delete backward (a whole island when one precedes the caret)
    DeleteBack,
    /// Delete forward
    DeleteForward,

    // Caret movement
    /// Move one position left, hopping islands atomically
    MoveLeft,
    /// Move one position right, hopping islands atomically
    MoveRight,
    /// Grow the selection one position left
    ExtendLeft,
    /// Grow the selection one position right
    ExtendRight,
    /// Jump to the start of the line
    MoveLineStart,
    /// Jump to the end of the line
    MoveLineEnd,
    /// Jump to the previous word boundary
    MoveWordLeft,
    /// Jump to the next word boundary
    MoveWordRight,
    /// Place the caret at a flat position (mouse click)
    PlaceCaret(usize),
    /// Select a whole island (mouse click on a pill)
    ClickIsland(usize),

    // Clipboard
    /// Copy the selection as canonical text
    Copy,
    /// Cut the selection as canonical text
    Cut,
    /// Paste canonical text, rehydrating embedded tokens
    Paste,

    // History
    Undo,
    Redo,

    // Reference picker
    /// Type the `@` trigger and open the picker
    OpenPicker,
    /// Replace the picker filter with the given string
    PickerInput(String),
    /// Move the picker selection up
    PickerUp,
    /// Move the picker selection down
    PickerDown,
    /// Insert the selected catalog entry
    PickerSelect,
    /// Select a picker row directly (mouse click) and insert it
    PickerClick(usize),
    /// Close the picker, leaving the typed trigger text in place
    PickerCancel,

    // File
    /// Save the step to disk
    Save,
    /// The watched file changed on disk
    FileChanged,

    // Viewport
    /// Terminal was resized
    Resize(u16, u16),
    /// Scroll the surface without moving the caret
    ScrollUp(usize),
    ScrollDown(usize),

    // Application control
    /// Request exit (asks for confirmation when dirty)
    Quit,
}

/// Pure update function: applies a message to the model and returns the new
/// model state.
#[must_use]
pub fn update(mut model: Model, msg: Message) -> Model {
    // Any action other than quit or save withdraws a pending quit
    // confirmation; save stays so Ctrl+S can complete the exchange.
    if !matches!(msg, Message::Quit | Message::Save) {
        model.quit_confirmed = false;
    }

    match msg {
        // --- Text editing ---
        Message::TypeChar(ch) => {
            model.session.type_char(ch);
            model.scroll_to_caret();
        }
        Message::InsertNewline => {
            model.session.insert_newline();
            model.scroll_to_caret();
        }
        Message::DeleteBack => {
            model.session.backspace();
            model.scroll_to_caret();
        }
        Message::DeleteForward => {
            model.session.delete_forward();
            model.scroll_to_caret();
        }

        // --- Caret movement ---
        Message::MoveLeft => {
            model.session.move_left();
            model.scroll_to_caret();
        }
        Message::MoveRight => {
            model.session.move_right();
            model.scroll_to_caret();
        }
        Message::ExtendLeft => {
            model.session.extend_left();
            model.scroll_to_caret();
        }
        Message::ExtendRight => {
            model.session.extend_right();
            model.scroll_to_caret();
        }
        Message::MoveLineStart => {
            model.session.move_line_start();
            model.scroll_to_caret();
        }
        Message::MoveLineEnd => {
            model.session.move_line_end();
            model.scroll_to_caret();
        }
        Message::MoveWordLeft => {
            model.session.move_word_left();
            model.scroll_to_caret();
        }
        Message::MoveWordRight => {
            model.session.move_word_right();
            model.scroll_to_caret();
        }
        Message::PlaceCaret(pos) => {
            model.session.place_caret(pos);
            model.scroll_to_caret();
        }
        Message::ClickIsland(node) => {
            model.session.click_island(node);
        }

        // --- Clipboard ---
        Message::Copy => {
            if let Some(text) = model.session.copy() {
                model.clipboard = Some(text);
            }
        }
        Message::Cut => {
            if let Some(text) = model.session.cut() {
                model.clipboard = Some(text);
                model.scroll_to_caret();
            }
        }
        Message::Paste => {
            if let Some(text) = model.clipboard.clone()
                && model.session.paste(&text, &model.registry)
            {
                model.scroll_to_caret();
            }
        }

        // --- History ---
        Message::Undo => {
            if model.session.undo(&model.registry) {
                model.scroll_to_caret();
            }
        }
        Message::Redo => {
            if model.session.redo(&model.registry) {
                model.scroll_to_caret();
            }
        }

        // --- Reference picker ---
        Message::OpenPicker => {
            model.session.type_char('@');
            model.session.begin_fast_access();
            model.picker = Some(PickerState::default());
            model.scroll_to_caret();
        }
        Message::PickerInput(filter) => {
            if let Some(picker) = &mut model.picker {
                picker.filter = filter;
                picker.selected = 0;
            }
        }
        Message::PickerUp => {
            if let Some(picker) = &mut model.picker {
                picker.selected = picker.selected.saturating_sub(1);
            }
        }
        Message::PickerDown => {
            let count = model.filtered_entries().len();
            if let Some(picker) = &mut model.picker {
                picker.selected = (picker.selected + 1).min(count.saturating_sub(1));
            }
        }
        Message::PickerSelect => {
            let token = {
                let entries = model.filtered_entries();
                model
                    .picker
                    .as_ref()
                    .and_then(|picker| entries.get(picker.selected))
                    .map(|(_, entry)| entry.token().clone())
            };
            if let Some(token) = token {
                model.session.insert_reference(token, &model.registry);
                model.picker = None;
                model.scroll_to_caret();
            }
        }
        Message::PickerClick(index) => {
            let token = {
                let entries = model.filtered_entries();
                entries.get(index).map(|(_, entry)| entry.token().clone())
            };
            if let Some(token) = token {
                model.session.insert_reference(token, &model.registry);
                model.picker = None;
                model.scroll_to_caret();
            }
        }
        Message::PickerCancel => {
            model.session.cancel_fast_access();
            model.picker = None;
            model.scroll_to_caret();
        }

        // --- File (handled in side effects) ---
        Message::Save | Message::FileChanged => {}

        // --- Viewport ---
        Message::Resize(width, height) => {
            model.viewport_width = width;
            model.viewport_height = height;
            model.scroll_to_caret();
        }
        Message::ScrollUp(lines) => {
            model.scroll_by(-isize::try_from(lines).unwrap_or(isize::MAX));
        }
        Message::ScrollDown(lines) => {
            model.scroll_by(isize::try_from(lines).unwrap_or(isize::MAX));
        }

        // --- Application control ---
        Message::Quit => {
            if model.is_dirty() && !model.quit_confirmed {
                model.quit_confirmed = true;
                model.show_toast(
                    ToastLevel::Warning,
                    "Unsaved changes. Press again to quit, or Ctrl+S to save",
                );
            } else {
                model.should_quit = true;
            }
        }
    }

    model
}
