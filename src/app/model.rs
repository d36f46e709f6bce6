use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::editor::{Session, surface};
use crate::flowfile::FlowStep;
use crate::registry::{CatalogEntry, CatalogRegistry};
use crate::ui;

/// Severity of a transient toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

/// A transient notification shown above the status bar.
#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// State of the reference picker overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickerState {
    /// Characters typed after the `@` trigger, filtering the catalog.
    pub filter: String,
    /// Index into the filtered entry list.
    pub selected: usize,
}

/// The complete application state.
pub struct Model {
    /// The editing session over the step's instruction text.
    pub session: Session,
    /// Catalog backing token resolution and picker entries.
    pub registry: CatalogRegistry,
    /// The flow step document this session edits.
    pub step: FlowStep,
    /// Path of the flow-step file on disk.
    pub file_path: PathBuf,
    /// Instruction text as last written to (or read from) disk.
    pub saved_value: String,
    /// Whether file watching is active.
    pub watch_enabled: bool,
    /// Reference picker overlay, when open.
    pub picker: Option<PickerState>,
    /// App-internal clipboard for copy, cut, and paste.
    pub clipboard: Option<String>,
    /// Terminal dimensions.
    pub viewport_width: u16,
    pub viewport_height: u16,
    /// First visible layout row of the surface.
    pub scroll: usize,
    /// Transient notification message.
    toast: Option<Toast>,
    /// Whether the app should exit.
    pub should_quit: bool,
    /// Set when quit was requested with unsaved changes; a second request
    /// quits without saving.
    pub quit_confirmed: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("file_path", &self.file_path)
            .field("value_len", &self.session.value().len())
            .field("dirty", &self.is_dirty())
            .field("picker_open", &self.picker_open())
            .field("watch_enabled", &self.watch_enabled)
            .field("should_quit", &self.should_quit)
            .finish_non_exhaustive()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(PathBuf::new(), FlowStep::new("", ""), (80, 24))
    }
}

impl Model {
    /// Create a model for a loaded flow step. Tokens that no longer resolve
    /// against the step's catalog are tagged invalid up front.
    pub fn new(file_path: PathBuf, step: FlowStep, terminal_size: (u16, u16)) -> Self {
        let registry = step.registry();
        let mut session = Session::new(step.instruction(), &registry);
        session.mark_invalid(&registry);
        Self {
            session,
            registry,
            saved_value: step.instruction().to_string(),
            step,
            file_path,
            watch_enabled: false,
            picker: None,
            clipboard: None,
            viewport_width: terminal_size.0,
            viewport_height: terminal_size.1,
            scroll: 0,
            toast: None,
            should_quit: false,
            quit_confirmed: false,
        }
    }

    /// Whether the session's value differs from what is on disk. Tagging a
    /// stale token invalid counts as a change, since saving would persist
    /// the tag.
    pub fn is_dirty(&self) -> bool {
        self.session.value() != self.saved_value
    }

    pub const fn picker_open(&self) -> bool {
        self.picker.is_some()
    }

    /// Catalog entries matching the picker filter, with their catalog index.
    pub fn filtered_entries(&self) -> Vec<(usize, &CatalogEntry)> {
        let filter = self
            .picker
            .as_ref()
            .map(|picker| picker.filter.to_lowercase())
            .unwrap_or_default();
        self.registry
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                filter.is_empty() || entry.token().title().to_lowercase().contains(&filter)
            })
            .collect()
    }

    /// Layout width available for the wrapped surface.
    pub fn content_width(&self) -> u16 {
        self.viewport_width
            .saturating_sub(ui::SURFACE_LEFT_PADDING)
            .max(1)
    }

    /// Visible surface rows between the title bar and the footer.
    pub fn surface_view_rows(&self) -> usize {
        let area = ui::surface_area(
            self.viewport_width,
            self.viewport_height,
            self.active_toast().is_some(),
        );
        usize::from(area.height)
    }

    /// Flat position the caret renders at. The empty-surface placeholder
    /// parks the caret over its spacer so an empty step shows the caret in
    /// the first column.
    pub fn caret_flat(&self) -> usize {
        if self.session.surface().is_placeholder() {
            return 0;
        }
        self.session
            .selection()
            .and_then(|sel| surface::flat_of(self.session.surface(), sel.focus))
            .unwrap_or(0)
    }

    /// Caret position and surface length for the status bar.
    pub fn caret_progress(&self) -> (usize, usize) {
        if self.session.surface().is_placeholder() {
            return (0, 0);
        }
        (self.caret_flat(), surface::flat_len(self.session.surface()))
    }

    /// Scroll the viewport so the caret's layout row is visible.
    pub fn scroll_to_caret(&mut self) {
        let layout = ui::layout::build(self.session.surface(), self.content_width());
        let (row, _) = layout.caret_position(self.caret_flat());
        let rows = self.surface_view_rows().max(1);
        if row < self.scroll {
            self.scroll = row;
        } else if row >= self.scroll + rows {
            self.scroll = row + 1 - rows;
        }
        let max_scroll = layout.row_count().saturating_sub(rows);
        self.scroll = self.scroll.min(max_scroll);
    }

    /// Move the viewport without touching the caret, clamped to the laid-out
    /// surface.
    pub fn scroll_by(&mut self, delta: isize) {
        let layout = ui::layout::build(self.session.surface(), self.content_width());
        let max_scroll = layout
            .row_count()
            .saturating_sub(self.surface_view_rows().max(1));
        self.scroll = self.scroll.saturating_add_signed(delta).min(max_scroll);
    }

    // --- Toasts ---

    pub fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    /// Drop the toast once its deadline passes. Returns true if it expired.
    pub fn expire_toast(&mut self, now: Instant) -> bool {
        if self.toast.as_ref().is_some_and(|t| now >= t.expires_at) {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast.as_ref().map(|t| (t.message.as_str(), t.level))
    }

    // --- Disk round trips ---

    /// Write the current value back into the step and save it.
    pub fn save_to_disk(&mut self) -> Result<()> {
        self.step.set_instruction(self.session.value());
        self.step.save(&self.file_path)?;
        self.saved_value = self.session.value().to_string();
        Ok(())
    }

    /// Re-read the step from disk. The session only takes the on-disk
    /// instruction when it actually differs from the current value, so a
    /// reload triggered by our own save keeps caret and history intact.
    /// The catalog is refreshed either way and stale tokens re-tagged.
    pub fn reload_from_disk(&mut self) -> Result<bool> {
        let step = FlowStep::load(&self.file_path)?;
        let registry = step.registry();
        let replaced = step.instruction() != self.session.value();
        if replaced {
            self.session.set_value(step.instruction(), &registry);
            self.picker = None;
        }
        self.session.mark_invalid(&registry);
        self.saved_value = step.instruction().to_string();
        self.registry = registry;
        self.step = step;
        self.scroll_to_caret();
        Ok(replaced)
    }
}
