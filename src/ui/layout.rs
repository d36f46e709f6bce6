//! Visual layout of the editing surface.
//!
//! [`build`] wraps the surface node list into terminal rows. Text characters
//! take their unicode display width, island pills occupy one flat position
//! but span the width of their label, and guard characters are zero width so
//! the caret positions on either side of a guard land on the same column.
//! The same layout drives painting, caret placement, and mouse hit testing,
//! which keeps the three views of the surface in agreement.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::editor::{GUARD, Island, MemorySurface, Node};

/// One visual cell in a layout row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutCell {
    /// A single text character at a flat position. Newlines and guards are
    /// kept as zero-width cells so flat positions stay addressable.
    Char { flat: usize, ch: char, width: u16 },
    /// An island pill occupying one flat position.
    Pill {
        flat: usize,
        node: usize,
        label: String,
        width: u16,
    },
}

impl LayoutCell {
    pub const fn flat(&self) -> usize {
        match self {
            Self::Char { flat, .. } | Self::Pill { flat, .. } => *flat,
        }
    }

    pub const fn width(&self) -> u16 {
        match self {
            Self::Char { width, .. } | Self::Pill { width, .. } => *width,
        }
    }
}

/// A single visual row of the surface.
#[derive(Debug, Clone, Default)]
pub struct LayoutRow {
    start: usize,
    cells: Vec<LayoutCell>,
}

impl LayoutRow {
    /// Flat position at the start of the row.
    pub const fn start(&self) -> usize {
        self.start
    }

    pub fn cells(&self) -> &[LayoutCell] {
        &self.cells
    }

    /// Caret position at the visual end of this row. A row that ends in a
    /// hard newline ends before the newline; the position after it belongs
    /// to the next row.
    pub fn end(&self) -> usize {
        match self.cells.last() {
            None => self.start,
            Some(LayoutCell::Char { flat, ch: '\n', .. }) => *flat,
            Some(cell) => cell.flat() + 1,
        }
    }

    /// Total display width of the row.
    pub fn width(&self) -> u16 {
        self.cells.iter().map(LayoutCell::width).sum()
    }
}

/// Result of a mouse hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// A caret position in text (or at a row end).
    Caret(usize),
    /// An island pill, by node index and flat position.
    Island { node: usize, flat: usize },
}

/// The wrapped surface, ready for painting and coordinate mapping.
#[derive(Debug, Clone, Default)]
pub struct SurfaceLayout {
    rows: Vec<LayoutRow>,
}

impl SurfaceLayout {
    pub fn rows(&self) -> &[LayoutRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Map a flat caret position to a (row, column) pair.
    ///
    /// A position exactly on a soft wrap boundary maps to the start of the
    /// following row, matching where typed input would land.
    pub fn caret_position(&self, flat: usize) -> (usize, u16) {
        if self.rows.is_empty() {
            return (0, 0);
        }
        let mut idx = self.rows.len() - 1;
        for i in 0..self.rows.len() {
            if self.rows.get(i + 1).is_none_or(|next| flat < next.start()) {
                idx = i;
                break;
            }
        }
        let col = self.rows[idx]
            .cells
            .iter()
            .take_while(|cell| cell.flat() < flat)
            .map(LayoutCell::width)
            .sum();
        (idx, col)
    }

    /// Map a (row, column) pair back to a surface position. Clicks past the
    /// end of a row land at the row end; clicks below the last row land on
    /// the last row.
    pub fn hit_test(&self, row: usize, col: u16) -> Hit {
        let Some(row) = self.rows.get(row.min(self.rows.len().saturating_sub(1))) else {
            return Hit::Caret(0);
        };
        let mut x: u16 = 0;
        for cell in &row.cells {
            let width = cell.width();
            if col < x + width {
                return match cell {
                    LayoutCell::Char { flat, .. } => Hit::Caret(*flat),
                    LayoutCell::Pill { node, flat, .. } => Hit::Island {
                        node: *node,
                        flat: *flat,
                    },
                };
            }
            x += width;
        }
        Hit::Caret(row.end())
    }
}

/// Wrap the surface into rows at most `width` columns wide.
pub fn build(surface: &MemorySurface, width: u16) -> SurfaceLayout {
    let limit = width.max(1);
    let mut rows: Vec<LayoutRow> = Vec::new();
    let mut row = LayoutRow::default();
    let mut col: u16 = 0;
    let mut flat = 0_usize;

    for (node_idx, node) in surface.nodes().iter().enumerate() {
        match node {
            Node::Text(text) => {
                for ch in text.chars() {
                    if ch == '\n' {
                        row.cells.push(LayoutCell::Char { flat, ch, width: 0 });
                        let next = LayoutRow {
                            start: flat + 1,
                            cells: Vec::new(),
                        };
                        rows.push(std::mem::replace(&mut row, next));
                        col = 0;
                    } else {
                        let width = char_width(ch);
                        if col + width > limit && col > 0 {
                            let next = LayoutRow {
                                start: flat,
                                cells: Vec::new(),
                            };
                            rows.push(std::mem::replace(&mut row, next));
                            col = 0;
                        }
                        row.cells.push(LayoutCell::Char { flat, ch, width });
                        col += width;
                    }
                    flat += 1;
                }
            }
            Node::Island(island) => {
                let label = pill_label(island, limit);
                let width = str_width(&label);
                if col + width > limit && col > 0 {
                    let next = LayoutRow {
                        start: flat,
                        cells: Vec::new(),
                    };
                    rows.push(std::mem::replace(&mut row, next));
                    col = 0;
                }
                row.cells.push(LayoutCell::Pill {
                    flat,
                    node: node_idx,
                    label,
                    width,
                });
                col += width;
                flat += 1;
            }
        }
    }
    rows.push(row);
    SurfaceLayout { rows }
}

/// Display label for an island pill, padded and clipped to the row width.
fn pill_label(island: &Island, limit: u16) -> String {
    let mut label = String::from(" ");
    if let Some(icon) = island.icon() {
        label.push_str(icon);
        label.push(' ');
    }
    for ch in island.token().title().chars() {
        label.push(if ch.is_control() { ' ' } else { ch });
    }
    label.push(' ');

    if str_width(&label) <= limit {
        return label;
    }
    let mut clipped = String::new();
    let mut used: u16 = 0;
    for ch in label.chars() {
        let width = char_width(ch);
        if used + width > limit.saturating_sub(1) {
            break;
        }
        clipped.push(ch);
        used += width;
    }
    clipped.push('\u{2026}');
    clipped
}

fn char_width(ch: char) -> u16 {
    if ch == GUARD {
        return 0;
    }
    u16::try_from(UnicodeWidthChar::width(ch).unwrap_or(0)).unwrap_or(0)
}

fn str_width(text: &str) -> u16 {
    u16::try_from(UnicodeWidthStr::width(text)).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{SPACER, Session, surface};
    use crate::registry::{CatalogEntry, CatalogRegistry};
    use crate::template::{RefKind, TokenRef};

    fn photo_registry() -> CatalogRegistry {
        CatalogRegistry::new(vec![CatalogEntry::new(
            TokenRef::new(RefKind::Asset, "photo-1", "Photo"),
            Some("P".to_string()),
        )])
    }

    fn token_raw() -> String {
        format!(
            "Check {} now",
            TokenRef::new(RefKind::Asset, "photo-1", "Photo").encode()
        )
    }

    // --- Row building ---

    #[test]
    fn test_plain_text_single_row() {
        let registry = photo_registry();
        let session = Session::new("hello", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.row_count(), 1);
        assert_eq!(layout.rows()[0].width(), 5);
    }

    #[test]
    fn test_newline_starts_new_row() {
        let registry = photo_registry();
        let session = Session::new("ab\ncd", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.row_count(), 2);
        assert_eq!(layout.rows()[0].end(), 2);
        assert_eq!(layout.rows()[1].start(), 3);
    }

    #[test]
    fn test_trailing_newline_yields_empty_row() {
        let registry = photo_registry();
        let session = Session::new("ab\n", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.row_count(), 2);
        assert!(layout.rows()[1].cells().is_empty());
        assert_eq!(layout.rows()[1].start(), 3);
        assert_eq!(layout.rows()[1].end(), 3);
    }

    #[test]
    fn test_soft_wrap_at_width() {
        let registry = photo_registry();
        let session = Session::new("abcdefghij", &registry);
        let layout = build(session.surface(), 4);
        assert_eq!(layout.row_count(), 3);
        assert_eq!(layout.rows()[0].width(), 4);
        assert_eq!(layout.rows()[1].start(), 4);
        assert_eq!(layout.rows()[2].start(), 8);
    }

    #[test]
    fn test_pill_wraps_as_a_unit() {
        let registry = photo_registry();
        let session = Session::new(&token_raw(), &registry);
        // " P Photo " is 9 columns; "Check " plus a guard leaves 3 of 12
        let layout = build(session.surface(), 12);
        let pill_row = layout
            .rows()
            .iter()
            .position(|row| {
                row.cells()
                    .iter()
                    .any(|cell| matches!(cell, LayoutCell::Pill { .. }))
            })
            .unwrap();
        assert!(pill_row > 0);
        let pill = layout.rows()[pill_row]
            .cells()
            .iter()
            .find_map(|cell| match cell {
                LayoutCell::Pill { label, .. } => Some(label.clone()),
                LayoutCell::Char { .. } => None,
            })
            .unwrap();
        assert_eq!(pill, " P Photo ");
    }

    #[test]
    fn test_pill_label_clips_to_narrow_surface() {
        let island = Island::new(
            TokenRef::new(RefKind::Tool, "tool-web-search", "A very long tool title"),
            None,
        );
        let label = pill_label(&island, 10);
        assert!(label.ends_with('\u{2026}'));
        assert!(str_width(&label) <= 10);
    }

    #[test]
    fn test_guard_cells_are_zero_width() {
        let registry = photo_registry();
        let session = Session::new(&token_raw(), &registry);
        let layout = build(session.surface(), 80);
        let guard_cells: Vec<&LayoutCell> = layout.rows()[0]
            .cells()
            .iter()
            .filter(|cell| matches!(cell, LayoutCell::Char { ch, .. } if *ch == GUARD))
            .collect();
        assert_eq!(guard_cells.len(), 2);
        assert!(guard_cells.iter().all(|cell| cell.width() == 0));
    }

    #[test]
    fn test_placeholder_is_one_spacer_cell() {
        let registry = photo_registry();
        let session = Session::new("", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.row_count(), 1);
        assert_eq!(layout.rows()[0].cells().len(), 1);
        assert!(matches!(
            layout.rows()[0].cells()[0],
            LayoutCell::Char { ch, width: 1, .. } if ch == SPACER
        ));
    }

    // --- Caret mapping ---

    #[test]
    fn test_caret_position_on_first_row() {
        let registry = photo_registry();
        let session = Session::new("hello", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.caret_position(0), (0, 0));
        assert_eq!(layout.caret_position(3), (0, 3));
        assert_eq!(layout.caret_position(5), (0, 5));
    }

    #[test]
    fn test_caret_position_across_hard_break() {
        let registry = photo_registry();
        let session = Session::new("ab\ncd", &registry);
        let layout = build(session.surface(), 80);
        // before the newline
        assert_eq!(layout.caret_position(2), (0, 2));
        // after the newline
        assert_eq!(layout.caret_position(3), (1, 0));
    }

    #[test]
    fn test_caret_position_on_soft_wrap_lands_on_next_row() {
        let registry = photo_registry();
        let session = Session::new("abcdefgh", &registry);
        let layout = build(session.surface(), 4);
        assert_eq!(layout.caret_position(4), (1, 0));
    }

    #[test]
    fn test_caret_position_same_column_either_side_of_guard() {
        let registry = photo_registry();
        let session = Session::new(&token_raw(), &registry);
        let layout = build(session.surface(), 80);
        // "Check " then the guard: flats 6 (before guard) and 7 (after) share
        // a column because the guard paints nothing
        let (row_a, col_a) = layout.caret_position(6);
        let (row_b, col_b) = layout.caret_position(7);
        assert_eq!((row_a, col_a), (row_b, col_b));
    }

    #[test]
    fn test_caret_position_clamps_past_end() {
        let registry = photo_registry();
        let session = Session::new("hi", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.caret_position(99), (0, 2));
    }

    // --- Hit testing ---

    #[test]
    fn test_hit_test_on_text() {
        let registry = photo_registry();
        let session = Session::new("hello", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.hit_test(0, 0), Hit::Caret(0));
        assert_eq!(layout.hit_test(0, 3), Hit::Caret(3));
    }

    #[test]
    fn test_hit_test_past_row_end_lands_at_end() {
        let registry = photo_registry();
        let session = Session::new("hi\nlonger", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.hit_test(0, 40), Hit::Caret(2));
    }

    #[test]
    fn test_hit_test_below_last_row_uses_last_row() {
        let registry = photo_registry();
        let session = Session::new("hi", &registry);
        let layout = build(session.surface(), 80);
        assert_eq!(layout.hit_test(9, 0), Hit::Caret(0));
        assert_eq!(layout.hit_test(9, 40), Hit::Caret(2));
    }

    #[test]
    fn test_hit_test_on_pill_reports_island() {
        let registry = photo_registry();
        let session = Session::new(&token_raw(), &registry);
        let layout = build(session.surface(), 80);
        // the pill starts after "Check " and its guard, at column 6
        let hit = layout.hit_test(0, 8);
        match hit {
            Hit::Island { node, flat } => {
                assert_eq!(node, 1);
                assert_eq!(flat, 7);
            }
            Hit::Caret(_) => panic!("expected island hit, got {hit:?}"),
        }
    }

    #[test]
    fn test_hit_test_round_trips_with_caret_position() {
        let registry = photo_registry();
        let session = Session::new("one two three four five", &registry);
        let layout = build(session.surface(), 8);
        for flat in 0..=surface::flat_len(session.surface()) {
            let (row, col) = layout.caret_position(flat);
            match layout.hit_test(row, col) {
                Hit::Caret(back) => assert_eq!(back, flat, "flat {flat} round trip"),
                Hit::Island { .. } => panic!("unexpected island at flat {flat}"),
            }
        }
    }
}
