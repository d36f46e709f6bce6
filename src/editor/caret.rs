//! Caret-safety rules keeping islands atomic under per-character editing.
//!
//! Every rule is a stateless, best-effort inspection run against the
//! [`Surface`] trait when an event arrives. Nothing here persists state:
//! if the selection is missing, non-collapsed, or points somewhere a rule
//! does not recognize, the rule no-ops and native behavior proceeds. These
//! are UX affordances, not data-integrity paths.

use super::surface::{Caret, Node, Selection, Surface, flat_span};

/// Platform-neutral key classes the safety rules react to. The input layer
/// translates widget-specific key events into these before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    ArrowLeft,
    ArrowRight,
    Backspace,
    Delete,
    Enter,
    /// Printable character entry.
    Char(char),
    /// Anything else the rules treat as plain text entry.
    Other,
}

/// Re-seat the caret so the pending action cannot address an island
/// interior or the slot between a guard and its island.
///
/// Returns true when the event was consumed whole (the caller must skip
/// its native action): arrow presses that jump an island, and deletions
/// that remove one. Nudges (Enter, text entry, or no key after a
/// structural change) return false so the native action still applies at
/// the corrected position.
pub fn ensure_safe_position<S: Surface + ?Sized>(surface: &mut S, key: Option<EditKey>) -> bool {
    let Some(selection) = surface.selection() else {
        return false;
    };
    if !selection.is_caret() {
        return false;
    }
    let caret = selection.focus;
    let Some(Node::Text(text)) = surface.node(caret.node) else {
        return false;
    };
    let len = text.chars().count();
    let prev_is_island = surface.prev_node(caret.node).is_some_and(Node::is_island);
    let next_is_island = surface.next_node(caret.node).is_some_and(Node::is_island);

    match key {
        // On the guard after an island, jump fully across it and land one
        // character inside the text on the far side.
        Some(EditKey::ArrowLeft) if caret.offset <= 1 && prev_is_island => {
            let Some(before) = caret.node.checked_sub(2) else {
                return false;
            };
            let Some(Node::Text(far)) = surface.node(before) else {
                return false;
            };
            let target = far.chars().count().saturating_sub(1);
            surface.set_selection(Selection::caret(Caret::new(before, target)))
        }
        // On the guard before an island, jump fully across it.
        Some(EditKey::ArrowRight) if caret.offset + 1 == len && next_is_island => {
            let after = caret.node + 2;
            if !surface.node(after).is_some_and(Node::is_text) {
                return false;
            }
            surface.set_selection(Selection::caret(Caret::new(after, 1)))
        }
        // On the trailing guard, deletion removes the whole island.
        Some(EditKey::Backspace | EditKey::Delete) if caret.offset <= 1 && prev_is_island => {
            let island = caret.node - 1;
            if surface.remove_node(island).is_none() {
                return false;
            }
            surface.set_selection(Selection::caret(Caret::new(island, 0)));
            true
        }
        // On the leading guard, forward deletion removes the island ahead
        // rather than eating the guard character under it.
        Some(EditKey::Delete) if caret.offset + 1 >= len && next_is_island => {
            surface.remove_node(caret.node + 1).is_some()
        }
        // At the very end of a run before an island, step back onto the
        // guard so the newline lands outside the token's logical slot.
        Some(EditKey::Enter) if caret.offset == len && next_is_island && len > 0 => {
            surface.set_selection(Selection::caret(Caret::new(caret.node, len - 1)));
            false
        }
        // Recognized keys whose preconditions did not hold: leave the
        // caret alone and let the native action run.
        Some(
            EditKey::ArrowLeft
            | EditKey::ArrowRight
            | EditKey::Backspace
            | EditKey::Delete
            | EditKey::Enter,
        ) => false,
        // Text entry or a post-mutation pass: keep the caret off the slot
        // between a guard character and its island.
        _ => {
            if caret.offset == len && next_is_island && len > 0 {
                surface.set_selection(Selection::caret(Caret::new(caret.node, len - 1)));
            } else if caret.offset == 0 && prev_is_island && len > 0 {
                surface.set_selection(Selection::caret(Caret::new(caret.node, 1)));
            }
            false
        }
    }
}

/// Pointer-down on an island: toggle its selected look and replace the
/// selection with a full-node selection, so copy/cut/delete act on the
/// whole unit. Returns false when `index` is not an island.
pub fn toggle_island_selection<S: Surface + ?Sized>(surface: &mut S, index: usize) -> bool {
    let Some(island) = surface.node(index).and_then(Node::as_island) else {
        return false;
    };
    let selected = !island.is_selected();
    surface.set_island_selected(index, selected);
    surface.set_selection(Selection::select_node(index));
    true
}

/// Mark each island selected iff the current selection's flat span
/// strictly overlaps its slot. Runs on every selection change; collapsed
/// carets clear all marks.
pub fn mark_selection_intersections<S: Surface + ?Sized>(surface: &mut S) {
    let Some(selection) = surface.selection() else {
        return;
    };
    let Some((low, high)) = flat_span(surface, selection) else {
        return;
    };
    let mut updates = Vec::new();
    let mut acc = 0;
    for index in 0..surface.node_count() {
        let Some(node) = surface.node(index) else {
            break;
        };
        let width = node.width();
        if node.is_island() {
            updates.push((index, low < acc + width && high > acc));
        }
        acc += width;
    }
    for (index, selected) in updates {
        surface.set_island_selected(index, selected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::surface::{Island, MemorySurface, ensure_guards};
    use crate::template::{RefKind, TokenRef};

    fn island(title: &str) -> Node {
        Node::Island(Island::new(
            TokenRef::new(RefKind::Asset, format!("id-{title}"), title),
            None,
        ))
    }

    /// `"ab" [X] "cd"` with guards enforced: `"ab‍" [X] "‍cd"`.
    fn guarded_surface() -> MemorySurface {
        let mut surface = MemorySurface::new();
        surface.load(vec![Node::text("ab"), island("X"), Node::text("cd")]);
        ensure_guards(&mut surface);
        surface
    }

    fn caret_at(surface: &mut MemorySurface, node: usize, offset: usize) {
        assert!(
            surface.set_selection(Selection::caret(Caret::new(node, offset))),
            "caret ({node},{offset}) must be valid"
        );
    }

    // --- Missing context ---

    #[test]
    fn test_no_selection_is_a_noop() {
        let mut surface = guarded_surface();
        assert!(!ensure_safe_position(&mut surface, Some(EditKey::ArrowLeft)));
    }

    #[test]
    fn test_range_selection_is_a_noop() {
        let mut surface = guarded_surface();
        assert!(surface.set_selection(Selection::new(Caret::new(0, 0), Caret::new(0, 2))));
        assert!(!ensure_safe_position(&mut surface, Some(EditKey::ArrowRight)));
    }

    // --- Arrow crossing ---

    #[test]
    fn test_arrow_right_on_guard_jumps_over_island() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 0, 2); // on the guard, one before end of "ab‍"
        assert!(ensure_safe_position(&mut surface, Some(EditKey::ArrowRight)));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(2, 1))));
    }

    #[test]
    fn test_arrow_right_in_plain_text_passes() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 0, 0);
        assert!(!ensure_safe_position(&mut surface, Some(EditKey::ArrowRight)));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(0, 0))));
    }

    #[test]
    fn test_arrow_left_on_guard_jumps_over_island() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 2, 1); // on the guard after the island
        assert!(ensure_safe_position(&mut surface, Some(EditKey::ArrowLeft)));
        // Lands one character in from the end of "ab‍".
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(0, 2))));
    }

    #[test]
    fn test_arrow_left_at_offset_zero_also_jumps() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 2, 0);
        assert!(ensure_safe_position(&mut surface, Some(EditKey::ArrowLeft)));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(0, 2))));
    }

    // --- Deletion ---

    #[test]
    fn test_backspace_on_trailing_guard_removes_island() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 2, 1);
        assert!(ensure_safe_position(&mut surface, Some(EditKey::Backspace)));
        assert!(surface.island_indices().is_empty());
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(1, 0))));
    }

    #[test]
    fn test_delete_on_trailing_guard_removes_island() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 2, 0);
        assert!(ensure_safe_position(&mut surface, Some(EditKey::Delete)));
        assert!(surface.island_indices().is_empty());
    }

    #[test]
    fn test_delete_on_leading_guard_removes_island_ahead() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 0, 2); // on the guard before the island
        assert!(ensure_safe_position(&mut surface, Some(EditKey::Delete)));
        assert!(surface.island_indices().is_empty());
        // The caret stays put in the unchanged left run.
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(0, 2))));
    }

    #[test]
    fn test_backspace_inside_text_passes() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 2, 2);
        assert!(!ensure_safe_position(&mut surface, Some(EditKey::Backspace)));
        assert_eq!(surface.island_indices().len(), 1);
    }

    // --- Boundary nudges ---

    #[test]
    fn test_enter_at_boundary_nudges_back_onto_guard() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 0, 3); // end of "ab‍"
        assert!(!ensure_safe_position(&mut surface, Some(EditKey::Enter)));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(0, 2))));
    }

    #[test]
    fn test_char_entry_before_island_nudges_back() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 0, 3);
        assert!(!ensure_safe_position(&mut surface, Some(EditKey::Char('x'))));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(0, 2))));
    }

    #[test]
    fn test_char_entry_after_island_nudges_forward() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 2, 0);
        assert!(!ensure_safe_position(&mut surface, Some(EditKey::Char('x'))));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(2, 1))));
    }

    #[test]
    fn test_post_mutation_pass_nudges_without_key() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 2, 0);
        assert!(!ensure_safe_position(&mut surface, None));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(2, 1))));
    }

    #[test]
    fn test_nudge_leaves_mid_text_caret_alone() {
        let mut surface = guarded_surface();
        caret_at(&mut surface, 2, 2);
        assert!(!ensure_safe_position(&mut surface, Some(EditKey::Char('x'))));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(2, 2))));
    }

    // --- Pointer selection ---

    #[test]
    fn test_pointer_toggle_selects_whole_island() {
        let mut surface = guarded_surface();
        assert!(toggle_island_selection(&mut surface, 1));
        let isle = surface.nodes()[1].as_island().expect("island");
        assert!(isle.is_selected());
        assert_eq!(surface.selection(), Some(Selection::select_node(1)));
        // A second press toggles the visual state back off.
        assert!(toggle_island_selection(&mut surface, 1));
        assert!(!surface.nodes()[1].as_island().expect("island").is_selected());
    }

    #[test]
    fn test_pointer_toggle_on_text_is_a_noop() {
        let mut surface = guarded_surface();
        assert!(!toggle_island_selection(&mut surface, 0));
        assert_eq!(surface.selection(), None);
    }

    // --- Intersection marking ---

    #[test]
    fn test_range_over_island_marks_it_selected() {
        let mut surface = guarded_surface();
        assert!(surface.set_selection(Selection::new(Caret::new(0, 1), Caret::new(2, 1))));
        mark_selection_intersections(&mut surface);
        assert!(surface.nodes()[1].as_island().expect("island").is_selected());
    }

    #[test]
    fn test_range_short_of_island_leaves_it_unmarked() {
        let mut surface = guarded_surface();
        assert!(surface.set_selection(Selection::new(Caret::new(0, 0), Caret::new(0, 3))));
        mark_selection_intersections(&mut surface);
        assert!(!surface.nodes()[1].as_island().expect("island").is_selected());
    }

    #[test]
    fn test_collapsed_caret_clears_marks() {
        let mut surface = guarded_surface();
        assert!(surface.set_island_selected(1, true));
        caret_at(&mut surface, 0, 1);
        mark_selection_intersections(&mut surface);
        assert!(!surface.nodes()[1].as_island().expect("island").is_selected());
    }

    #[test]
    fn test_multi_island_range_marks_each_covered_island() {
        let mut surface = MemorySurface::new();
        surface.load(vec![
            Node::text("a"),
            island("X"),
            Node::text("b"),
            island("Y"),
            Node::text("c"),
        ]);
        ensure_guards(&mut surface);
        // Select from the start through the text after the first island.
        let end = Caret::new(2, 2);
        assert!(surface.set_selection(Selection::new(Caret::new(0, 0), end)));
        mark_selection_intersections(&mut surface);
        let islands = surface.island_indices();
        assert!(surface.nodes()[islands[0]].as_island().expect("x").is_selected());
        assert!(!surface.nodes()[islands[1]].as_island().expect("y").is_selected());
    }
}
