//! One editing session: a surface, its canonical raw value, and the
//! capture pipeline that keeps the two in sync.
//!
//! Every mutating operation follows the same shape: adjust the surface,
//! re-enforce the guard invariant, capture the surface back into the raw
//! value, and re-seat the caret. The raw value is the product handed to
//! external collaborators; the surface is a rendering of it that only
//! this module writes through.

use super::caret::{
    EditKey, ensure_safe_position, mark_selection_intersections, toggle_island_selection,
};
use super::surface::{
    Caret, Island, MemorySurface, Node, SPACER, Selection, Surface, caret_at_flat, ensure_guards,
    flat_len, flat_of, flat_span, project,
};
use crate::registry::ReferenceRegistry;
use crate::template::{Template, TokenRef};

/// Retained undo depth.
const MAX_HISTORY: usize = 50;

/// Pre-mutation state: the raw value plus the selection as flat
/// positions. Flat positions survive re-projection because guards,
/// spacers, and token slots keep their widths across a capture.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    raw: String,
    anchor: Option<usize>,
    focus: Option<usize>,
}

/// Bounded undo/redo stacks with typing coalescing.
#[derive(Debug, Default)]
struct History {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    coalescing: bool,
}

impl History {
    /// Push the pre-mutation snapshot. Consecutive coalescing pushes
    /// collapse into the first, so a typing run undoes as one unit.
    fn record(&mut self, snapshot: Snapshot, coalesce: bool) {
        self.redo.clear();
        if coalesce && self.coalescing {
            return;
        }
        self.undo.push(snapshot);
        if self.undo.len() > MAX_HISTORY {
            self.undo.remove(0);
        }
        self.coalescing = coalesce;
    }

    /// End the current typing run.
    fn seal(&mut self) {
        self.coalescing = false;
    }

    fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let snapshot = self.undo.pop()?;
        self.redo.push(current);
        self.coalescing = false;
        Some(snapshot)
    }

    fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let snapshot = self.redo.pop()?;
        self.undo.push(current);
        if self.undo.len() > MAX_HISTORY {
            self.undo.remove(0);
        }
        self.coalescing = false;
        Some(snapshot)
    }
}

/// A live editing session over one raw value.
pub struct Session {
    surface: MemorySurface,
    raw: String,
    history: History,
    popover_open: bool,
    selection_tracking: bool,
    stored_selection: Option<Selection>,
    trigger_pending: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            surface: MemorySurface::new(),
            raw: String::new(),
            history: History::default(),
            popover_open: false,
            selection_tracking: true,
            stored_selection: None,
            trigger_pending: false,
        }
    }
}

impl Session {
    /// Session over `raw`, caret at the end.
    #[must_use]
    pub fn new<R: ReferenceRegistry + ?Sized>(raw: &str, registry: &R) -> Self {
        let mut session = Self::default();
        session.set_value(raw, registry);
        session
    }

    /// Replace the value from outside (file load, external rewrite).
    /// Clears history and picker state.
    pub fn set_value<R: ReferenceRegistry + ?Sized>(&mut self, raw: &str, registry: &R) {
        self.project_value(raw, registry);
        self.raw = raw.to_string();
        self.history = History::default();
        self.popover_open = false;
        self.selection_tracking = true;
        self.stored_selection = None;
        self.trigger_pending = false;
    }

    /// The canonical raw value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.raw
    }

    /// Read-only view of the surface, for rendering.
    #[must_use]
    pub const fn surface(&self) -> &MemorySurface {
        &self.surface
    }

    /// Current selection.
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.surface.selection()
    }

    /// Whether the reference picker is open.
    #[must_use]
    pub const fn popover_open(&self) -> bool {
        self.popover_open
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.history.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.history.redo.is_empty()
    }

    // --- Text entry ---

    /// Type one printable character at the caret, replacing any selected
    /// range first.
    pub fn type_char(&mut self, ch: char) -> bool {
        let mut buf = [0; 4];
        self.insert_plain(ch.encode_utf8(&mut buf), EditKey::Char(ch))
    }

    /// Insert a literal newline.
    pub fn insert_newline(&mut self) -> bool {
        self.insert_plain("\n", EditKey::Enter)
    }

    fn insert_plain(&mut self, text: &str, key: EditKey) -> bool {
        let pre = self.snapshot();
        self.clear_placeholder();
        let had_range = self.collapse_selection();
        ensure_safe_position(&mut self.surface, Some(key));
        let Some(selection) = self.surface.selection() else {
            return false;
        };
        let Some(caret) = self.surface.insert_text(selection.focus, text) else {
            return false;
        };
        self.surface.set_selection(Selection::caret(caret));
        self.finish_edit(pre, matches!(key, EditKey::Char(_)) && !had_range);
        true
    }

    // --- Deletion ---

    /// Backspace: delete the selection, else one unit to the left. A
    /// token adjacent to the caret is removed whole.
    pub fn backspace(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let pre = self.snapshot();
        if ensure_safe_position(&mut self.surface, Some(EditKey::Backspace)) {
            self.finish_edit(pre, false);
            return true;
        }
        let Some(pos) = self.focus_flat() else {
            return false;
        };
        let Some(start) = pos.checked_sub(1) else {
            return false;
        };
        if self.surface.delete_flat_range(start, pos).is_none() {
            return false;
        }
        self.finish_edit(pre, false);
        true
    }

    /// Forward delete: delete the selection, else one unit to the right.
    pub fn delete_forward(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let pre = self.snapshot();
        if ensure_safe_position(&mut self.surface, Some(EditKey::Delete)) {
            self.finish_edit(pre, false);
            return true;
        }
        let Some(pos) = self.focus_flat() else {
            return false;
        };
        if pos >= flat_len(&self.surface) {
            return false;
        }
        if self.surface.delete_flat_range(pos, pos + 1).is_none() {
            return false;
        }
        self.finish_edit(pre, false);
        true
    }

    fn delete_selection(&mut self) -> bool {
        let pre = self.snapshot();
        if !self.collapse_selection() {
            return false;
        }
        self.finish_edit(pre, false);
        true
    }

    // --- Caret movement ---

    /// One step left; jumps whole tokens, collapses range selections.
    pub fn move_left(&mut self) -> bool {
        if ensure_safe_position(&mut self.surface, Some(EditKey::ArrowLeft)) {
            self.after_selection_change();
            return true;
        }
        let Some(selection) = self.surface.selection() else {
            return false;
        };
        let target = if selection.is_caret() {
            self.surface.step_left(selection.focus)
        } else {
            flat_span(&self.surface, selection)
                .and_then(|(low, _)| caret_at_flat(&self.surface, low))
        };
        self.settle_at(target)
    }

    /// One step right; jumps whole tokens, collapses range selections.
    pub fn move_right(&mut self) -> bool {
        if ensure_safe_position(&mut self.surface, Some(EditKey::ArrowRight)) {
            self.after_selection_change();
            return true;
        }
        let Some(selection) = self.surface.selection() else {
            return false;
        };
        let target = if selection.is_caret() {
            self.surface.step_right(selection.focus)
        } else {
            flat_span(&self.surface, selection)
                .and_then(|(_, high)| caret_at_flat(&self.surface, high))
        };
        self.settle_at(target)
    }

    /// Grow or shrink the selection one step left.
    pub fn extend_left(&mut self) -> bool {
        let Some(selection) = self.surface.selection() else {
            return false;
        };
        let Some(focus) = self.surface.step_left(selection.focus) else {
            return false;
        };
        if !self.surface.set_selection(Selection::new(selection.anchor, focus)) {
            return false;
        }
        self.after_selection_change();
        true
    }

    /// Grow or shrink the selection one step right.
    pub fn extend_right(&mut self) -> bool {
        let Some(selection) = self.surface.selection() else {
            return false;
        };
        let Some(focus) = self.surface.step_right(selection.focus) else {
            return false;
        };
        if !self.surface.set_selection(Selection::new(selection.anchor, focus)) {
            return false;
        }
        self.after_selection_change();
        true
    }

    /// Jump to the start of the current line.
    pub fn move_line_start(&mut self) -> bool {
        let Some(pos) = self.focus_flat() else {
            return false;
        };
        let chars = self.flat_chars();
        let start = chars[..pos]
            .iter()
            .rposition(|slot| *slot == Some('\n'))
            .map_or(0, |at| at + 1);
        self.place_caret(start)
    }

    /// Jump to the end of the current line.
    pub fn move_line_end(&mut self) -> bool {
        let Some(pos) = self.focus_flat() else {
            return false;
        };
        let chars = self.flat_chars();
        let end = chars[pos..]
            .iter()
            .position(|slot| *slot == Some('\n'))
            .map_or(chars.len(), |at| pos + at);
        self.place_caret(end)
    }

    /// Jump left one word; a token counts as one word.
    pub fn move_word_left(&mut self) -> bool {
        let Some(pos) = self.focus_flat() else {
            return false;
        };
        let chars = self.flat_chars();
        let mut at = pos;
        while at > 0 && chars[at - 1].is_some_and(char::is_whitespace) {
            at -= 1;
        }
        if at > 0 && chars[at - 1].is_none() {
            at -= 1;
        } else {
            while at > 0 && chars[at - 1].is_some_and(|ch| !ch.is_whitespace()) {
                at -= 1;
            }
        }
        self.place_caret(at)
    }

    /// Jump right one word; a token counts as one word.
    pub fn move_word_right(&mut self) -> bool {
        let Some(pos) = self.focus_flat() else {
            return false;
        };
        let chars = self.flat_chars();
        let mut at = pos;
        while at < chars.len() && chars[at].is_some_and(char::is_whitespace) {
            at += 1;
        }
        if at < chars.len() && chars[at].is_none() {
            at += 1;
        } else {
            while at < chars.len() && chars[at].is_some_and(|ch| !ch.is_whitespace()) {
                at += 1;
            }
        }
        self.place_caret(at)
    }

    /// Place the caret at a flat position (pointer click on text).
    pub fn place_caret(&mut self, pos: usize) -> bool {
        let len = flat_len(&self.surface);
        let Some(caret) = caret_at_flat(&self.surface, pos.min(len)) else {
            return false;
        };
        if !self.surface.set_selection(Selection::caret(caret)) {
            return false;
        }
        ensure_safe_position(&mut self.surface, None);
        self.after_selection_change();
        true
    }

    /// Pointer-down on the island at node `index`: toggle its selected
    /// state and select the whole node.
    pub fn click_island(&mut self, index: usize) -> bool {
        let toggled = toggle_island_selection(&mut self.surface, index);
        if toggled {
            self.history.seal();
        }
        toggled
    }

    fn settle_at(&mut self, target: Option<Caret>) -> bool {
        let Some(caret) = target else {
            return false;
        };
        if !self.surface.set_selection(Selection::caret(caret)) {
            return false;
        }
        ensure_safe_position(&mut self.surface, None);
        self.after_selection_change();
        true
    }

    // --- Clipboard ---

    /// The selected range as raw text. Wholly selected tokens appear as
    /// their canonical serialization, so pasting reconstitutes them.
    #[must_use]
    pub fn copy(&self) -> Option<String> {
        let selection = self.surface.selection()?;
        let (low, high) = flat_span(&self.surface, selection)?;
        if low == high {
            return None;
        }
        Some(self.surface.raw_slice(low, high))
    }

    /// Copy, then delete the selected range.
    pub fn cut(&mut self) -> Option<String> {
        let text = self.copy()?;
        if !self.delete_selection() {
            return None;
        }
        Some(text)
    }

    /// Paste raw text at the selection, replacing any selected content.
    /// The text is re-parsed first, so embedded token JSON becomes live
    /// tokens.
    pub fn paste<R: ReferenceRegistry + ?Sized>(&mut self, text: &str, registry: &R) -> bool {
        if text.is_empty() {
            return false;
        }
        let pre = self.snapshot();
        self.clear_placeholder();
        let Some(selection) = self.surface.selection() else {
            return false;
        };
        let Some((low, high)) = flat_span(&self.surface, selection) else {
            return false;
        };
        let Some(caret) = self.surface.delete_flat_range(low, high) else {
            return false;
        };
        let template = Template::parse(text);
        let nodes = project(&template, |token| registry.icon_for(token));
        if self.surface.splice_nodes(caret, nodes).is_none() {
            return false;
        }
        self.finish_edit(pre, false);
        true
    }

    // --- Reference insertion ---

    /// Insert a token at the stored or current selection, replacing any
    /// selected content. Splices a spacer after the island always, and
    /// before it when the preceding character is not already whitespace.
    /// Consumes the fast-access trigger character when one is pending.
    pub fn insert_reference<R: ReferenceRegistry + ?Sized>(
        &mut self,
        token: TokenRef,
        registry: &R,
    ) -> bool {
        let pre = self.snapshot();
        self.clear_placeholder();
        let stored = self.stored_selection.take();
        let Some(selection) = stored.or_else(|| self.surface.selection()) else {
            return false;
        };
        let Some((mut low, high)) = flat_span(&self.surface, selection) else {
            return false;
        };
        if self.trigger_pending {
            low = low.saturating_sub(1);
        }
        let Some(caret) = self.surface.delete_flat_range(low, high) else {
            return false;
        };
        let mut spliced = Vec::with_capacity(3);
        if self.spacer_needed_before(low) {
            spliced.push(Node::text(SPACER.to_string()));
        }
        let icon = registry.icon_for(&token);
        spliced.push(Node::Island(Island::new(token, icon)));
        spliced.push(Node::text(SPACER.to_string()));
        if self.surface.splice_nodes(caret, spliced).is_none() {
            return false;
        }
        self.popover_open = false;
        self.selection_tracking = true;
        self.trigger_pending = false;
        self.finish_edit(pre, false);
        true
    }

    // --- Fast access ---

    /// The trigger character was just typed: store the selection to
    /// insert at and open the picker.
    pub fn begin_fast_access(&mut self) {
        self.stored_selection = self.surface.selection();
        self.popover_open = true;
        self.selection_tracking = false;
        self.trigger_pending = true;
    }

    /// Dismiss the picker, leaving the text (trigger included) as is.
    pub fn cancel_fast_access(&mut self) {
        self.popover_open = false;
        self.selection_tracking = true;
        self.stored_selection = None;
        self.trigger_pending = false;
    }

    // --- History ---

    /// Restore the previous value and selection.
    pub fn undo<R: ReferenceRegistry + ?Sized>(&mut self, registry: &R) -> bool {
        let current = self.snapshot();
        let Some(snapshot) = self.history.undo(current) else {
            return false;
        };
        self.restore(snapshot, registry);
        true
    }

    /// Reapply the last undone change.
    pub fn redo<R: ReferenceRegistry + ?Sized>(&mut self, registry: &R) -> bool {
        let current = self.snapshot();
        let Some(snapshot) = self.history.redo(current) else {
            return false;
        };
        self.restore(snapshot, registry);
        true
    }

    // --- Validity sweep ---

    /// Retag every token's invalid flag from registry resolvability and
    /// re-render when anything changed. Not recorded in history; a
    /// repeated sweep would reapply the same tags anyway.
    pub fn mark_invalid<R: ReferenceRegistry + ?Sized>(&mut self, registry: &R) -> bool {
        let mut template = Template::parse(&self.raw);
        let mut changed = false;
        template.transform(|token| {
            let invalid = !registry.resolves(token.kind(), token.path());
            if invalid != token.is_invalid() {
                token.set_invalid(invalid);
                changed = true;
            }
        });
        if !changed {
            return false;
        }
        let current = self.snapshot();
        self.restore(
            Snapshot {
                raw: template.raw(),
                anchor: current.anchor,
                focus: current.focus,
            },
            registry,
        );
        true
    }

    // --- Internals ---

    fn project_value<R: ReferenceRegistry + ?Sized>(&mut self, raw: &str, registry: &R) {
        let template = Template::parse(raw);
        let nodes = project(&template, |token| registry.icon_for(token));
        self.surface.load(nodes);
        ensure_guards(&mut self.surface);
        let end = flat_len(&self.surface);
        if let Some(caret) = caret_at_flat(&self.surface, end) {
            self.surface.set_selection(Selection::caret(caret));
        }
        ensure_safe_position(&mut self.surface, None);
    }

    fn snapshot(&self) -> Snapshot {
        let (anchor, focus) = self.surface.selection().map_or((None, None), |selection| {
            (
                flat_of(&self.surface, selection.anchor),
                flat_of(&self.surface, selection.focus),
            )
        });
        Snapshot {
            raw: self.raw.clone(),
            anchor,
            focus,
        }
    }

    fn restore<R: ReferenceRegistry + ?Sized>(&mut self, snapshot: Snapshot, registry: &R) {
        self.project_value(&snapshot.raw, registry);
        self.raw = snapshot.raw;
        if let (Some(anchor), Some(focus)) = (snapshot.anchor, snapshot.focus) {
            let len = flat_len(&self.surface);
            let anchor = caret_at_flat(&self.surface, anchor.min(len));
            let focus = caret_at_flat(&self.surface, focus.min(len));
            if let (Some(anchor), Some(focus)) = (anchor, focus) {
                self.surface.set_selection(Selection::new(anchor, focus));
            }
        }
        ensure_safe_position(&mut self.surface, None);
        if self.selection_tracking {
            mark_selection_intersections(&mut self.surface);
        }
    }

    /// Re-enforce guards, capture, and fold a fully emptied surface back
    /// to the placeholder.
    fn enforce_and_capture(&mut self) {
        ensure_guards(&mut self.surface);
        self.capture();
        if self.raw.is_empty() && !self.surface.is_placeholder() {
            self.surface.load(vec![Node::text(SPACER.to_string())]);
            self.surface.set_selection(Selection::caret(Caret::new(0, 1)));
        }
    }

    fn capture(&mut self) {
        self.raw = if self.surface.is_placeholder() {
            String::new()
        } else {
            self.surface.raw_slice(0, flat_len(&self.surface))
        };
    }

    fn finish_edit(&mut self, pre: Snapshot, coalesce: bool) {
        self.enforce_and_capture();
        ensure_safe_position(&mut self.surface, None);
        if self.selection_tracking {
            mark_selection_intersections(&mut self.surface);
        }
        self.history.record(pre, coalesce);
    }

    fn after_selection_change(&mut self) {
        if self.selection_tracking {
            mark_selection_intersections(&mut self.surface);
        }
        self.history.seal();
    }

    /// Replace the empty-value placeholder with a real empty run before
    /// an edit, so typed text does not land after the placeholder space.
    fn clear_placeholder(&mut self) {
        if self.surface.is_placeholder() {
            self.surface.set_text(0, String::new());
            self.surface.set_selection(Selection::caret(Caret::new(0, 0)));
        }
    }

    /// Delete the selected flat range, if any. No capture, no history.
    fn collapse_selection(&mut self) -> bool {
        let Some(selection) = self.surface.selection() else {
            return false;
        };
        let Some((low, high)) = flat_span(&self.surface, selection) else {
            return false;
        };
        if low == high {
            return false;
        }
        self.surface.delete_flat_range(low, high).is_some()
    }

    fn focus_flat(&self) -> Option<usize> {
        let selection = self.surface.selection()?;
        flat_of(&self.surface, selection.focus)
    }

    /// Flat view of the surface, islands as opaque slots.
    fn flat_chars(&self) -> Vec<Option<char>> {
        let mut out = Vec::with_capacity(flat_len(&self.surface));
        for node in self.surface.nodes() {
            match node {
                Node::Text(text) => out.extend(text.chars().map(Some)),
                Node::Island(_) => out.push(None),
            }
        }
        out
    }

    /// Whether an insertion at flat `pos` needs a spacer before it: only
    /// when a non-whitespace character (or a token) immediately precedes.
    fn spacer_needed_before(&self, pos: usize) -> bool {
        let Some(slot) = pos.checked_sub(1) else {
            return false;
        };
        let mut acc = 0;
        for node in self.surface.nodes() {
            let width = node.width();
            if slot < acc + width {
                return match node {
                    Node::Text(text) => text
                        .chars()
                        .nth(slot - acc)
                        .is_some_and(|ch| !ch.is_whitespace()),
                    Node::Island(_) => true,
                };
            }
            acc += width;
        }
        false
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("raw_len", &self.raw.len())
            .field("surface", &self.surface)
            .field("undo_depth", &self.history.undo.len())
            .field("popover_open", &self.popover_open)
            .finish()
    }
}
