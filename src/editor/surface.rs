//! The editable surface: text runs and atomic token islands.
//!
//! A surface is an ordered list of nodes. Text nodes hold plain characters;
//! island nodes hold one inline token each and are opaque to per-character
//! editing. Every island is flanked by text siblings carrying a zero-width
//! joiner guard character, which is what keeps the caret addressable on
//! both sides of an otherwise zero-width atom.
//!
//! Positions use a flat coordinate space in which a text node contributes
//! its character count and an island contributes exactly one slot. Island
//! interiors are unrepresentable, so a caret can never resolve strictly
//! inside a token.

use crate::template::{Segment, Template, TokenRef};

/// Guard character synthesized next to islands to keep them caret-addressable.
pub const GUARD: char = '\u{200D}';

/// Non-breaking space used as the empty-surface placeholder and as the
/// spacer spliced around a directly-inserted island.
pub const SPACER: char = '\u{00A0}';

/// An atomic island rendering one inline token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Island {
    token: TokenRef,
    icon: Option<String>,
    selected: bool,
}

impl Island {
    /// Wrap a token, optionally decorated with a registry-supplied icon.
    #[must_use]
    pub const fn new(token: TokenRef, icon: Option<String>) -> Self {
        Self {
            token,
            icon,
            selected: false,
        }
    }

    /// The token this island renders.
    #[must_use]
    pub const fn token(&self) -> &TokenRef {
        &self.token
    }

    /// Registry-supplied icon glyph, if any.
    #[must_use]
    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    /// Whether the island is visually selected.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// The machine-readable text the island contributes to capture:
    /// preamble + JSON title + postamble, i.e. the token's exact encoding.
    #[must_use]
    pub fn text_content(&self) -> String {
        self.token.encode()
    }
}

/// One node of the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An editable run of plain text.
    Text(String),
    /// A non-editable token island.
    Island(Island),
}

impl Node {
    /// A text node holding `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// True for text nodes.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    /// True for island nodes.
    #[must_use]
    pub const fn is_island(&self) -> bool {
        matches!(self, Self::Island(_))
    }

    /// The text run, if this is a text node.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Island(_) => None,
        }
    }

    /// The island, if this is an island node.
    #[must_use]
    pub const fn as_island(&self) -> Option<&Island> {
        match self {
            Self::Island(island) => Some(island),
            Self::Text(_) => None,
        }
    }

    /// Width in flat positions: character count for text, one for islands.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().count(),
            Self::Island(_) => 1,
        }
    }
}

/// A caret position: a node index and a character offset within it.
///
/// Text nodes admit offsets `0..=len`; islands admit only the boundary
/// offsets 0 (before) and 1 (after).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caret {
    pub node: usize,
    pub offset: usize,
}

impl Caret {
    /// Caret at `offset` within node `node`.
    #[must_use]
    pub const fn new(node: usize, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// An anchor/focus pair of carets. Collapsed when both coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Caret,
    pub focus: Caret,
}

impl Selection {
    /// A collapsed selection (a plain caret).
    #[must_use]
    pub const fn caret(at: Caret) -> Self {
        Self { anchor: at, focus: at }
    }

    /// A directed selection from `anchor` to `focus`.
    #[must_use]
    pub const fn new(anchor: Caret, focus: Caret) -> Self {
        Self { anchor, focus }
    }

    /// Full-node selection of the node at `index`.
    #[must_use]
    pub const fn select_node(index: usize) -> Self {
        Self {
            anchor: Caret::new(index, 0),
            focus: Caret::new(index, 1),
        }
    }

    /// True when anchor and focus coincide.
    #[must_use]
    pub const fn is_caret(&self) -> bool {
        self.anchor.node == self.focus.node && self.anchor.offset == self.focus.offset
    }
}

/// The narrow capability interface the caret-safety rules are written
/// against. A platform text widget binds these operations; everything
/// else the rules need is derived from them.
pub trait Surface {
    /// Current selection, or `None` when the surface has no focus yet.
    fn selection(&self) -> Option<Selection>;

    /// Replace the selection. Returns false (and leaves the old selection)
    /// when either caret is out of bounds.
    fn set_selection(&mut self, selection: Selection) -> bool;

    /// Number of nodes.
    fn node_count(&self) -> usize;

    /// Node at `index`.
    fn node(&self, index: usize) -> Option<&Node>;

    /// Splice a node in before `index`. Returns false when `index` is past
    /// the end.
    fn insert_node(&mut self, index: usize, node: Node) -> bool;

    /// Remove and return the node at `index`.
    fn remove_node(&mut self, index: usize) -> Option<Node>;

    /// Replace the text of the text node at `index`.
    fn set_text(&mut self, index: usize, text: String) -> bool;

    /// Set the selected flag of the island at `index`.
    fn set_island_selected(&mut self, index: usize, selected: bool) -> bool;

    /// Neighbor query: the node before `index`.
    fn prev_node(&self, index: usize) -> Option<&Node> {
        index.checked_sub(1).and_then(|prev| self.node(prev))
    }

    /// Neighbor query: the node after `index`.
    fn next_node(&self, index: usize) -> Option<&Node> {
        self.node(index + 1)
    }
}

/// Total width of a surface in flat positions.
pub fn flat_len<S: Surface + ?Sized>(surface: &S) -> usize {
    (0..surface.node_count())
        .filter_map(|index| surface.node(index))
        .map(Node::width)
        .sum()
}

/// Flat position of a caret, or `None` when the caret is out of bounds.
pub fn flat_of<S: Surface + ?Sized>(surface: &S, caret: Caret) -> Option<usize> {
    let mut acc = 0;
    for index in 0..surface.node_count() {
        let width = surface.node(index)?.width();
        if index == caret.node {
            if caret.offset > width {
                return None;
            }
            return Some(acc + caret.offset);
        }
        acc += width;
    }
    None
}

/// Resolve a flat position back to a caret.
///
/// Boundary positions prefer text nodes, leftmost first, so a caret lands
/// in editable text whenever one touches the position. Island boundaries
/// are used only when no text node does.
pub fn caret_at_flat<S: Surface + ?Sized>(surface: &S, pos: usize) -> Option<Caret> {
    let mut acc = 0;
    let count = surface.node_count();
    for index in 0..count {
        let node = surface.node(index)?;
        let width = node.width();
        if node.is_text() {
            if pos >= acc && pos <= acc + width {
                return Some(Caret::new(index, pos - acc));
            }
        } else if pos == acc {
            // Only reachable when no text node ends here.
            return Some(Caret::new(index, 0));
        }
        acc += width;
    }
    // Past the last text node: an island can close the surface.
    if pos == acc && count > 0 {
        return Some(Caret::new(count - 1, 1));
    }
    None
}

/// The selection's flat span, low to high.
pub fn flat_span<S: Surface + ?Sized>(surface: &S, selection: Selection) -> Option<(usize, usize)> {
    let a = flat_of(surface, selection.anchor)?;
    let b = flat_of(surface, selection.focus)?;
    Some((a.min(b), a.max(b)))
}

/// Project a parsed template into surface nodes.
///
/// `decorate` supplies the registry icon for each token; `None` degrades
/// to an undecorated label. Empty templates project to the single
/// non-breaking-space placeholder so the surface is never literally empty.
pub fn project<F>(template: &Template, mut decorate: F) -> Vec<Node>
where
    F: FnMut(&TokenRef) -> Option<String>,
{
    if template.is_empty() {
        return vec![Node::text(SPACER.to_string())];
    }
    template
        .segments()
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => Node::Text(text.clone()),
            Segment::Token(token) => {
                let icon = decorate(token);
                Node::Island(Island::new(token.clone(), icon))
            }
        })
        .collect()
}

/// Enforce the guard invariant over the whole surface.
///
/// After this pass every island's previous sibling is a text node ending
/// with [`GUARD`] and its next sibling is a text node starting with
/// [`GUARD`]; a lone guard text between two islands is widened to two
/// guards so each island owns one. Stray guards (interior to a text run,
/// or edge guards with no adjacent island) are removed.
pub fn ensure_guards<S: Surface + ?Sized>(surface: &mut S) {
    // Every island gets a guard-bearing text sibling on both sides.
    let mut index = 0;
    while index < surface.node_count() {
        if !surface.node(index).is_some_and(Node::is_island) {
            index += 1;
            continue;
        }

        let prev_text = if index == 0 {
            None
        } else {
            surface.node(index - 1).and_then(Node::as_text).map(str::to_string)
        };
        match prev_text {
            Some(text) if text.ends_with(GUARD) => {}
            Some(mut text) => {
                text.push(GUARD);
                surface.set_text(index - 1, text);
            }
            None => {
                surface.insert_node(index, Node::text(GUARD.to_string()));
                index += 1;
            }
        }

        let next_text = surface.node(index + 1).and_then(Node::as_text).map(str::to_string);
        match next_text {
            Some(text)
                if text.chars().eq(std::iter::once(GUARD))
                    && surface.node(index + 2).is_some_and(Node::is_island) =>
            {
                // One guard between two islands: widen so each owns one.
                let mut both = String::new();
                both.push(GUARD);
                both.push(GUARD);
                surface.set_text(index + 1, both);
            }
            Some(text) if text.starts_with(GUARD) => {}
            Some(text) => {
                let mut guarded = GUARD.to_string();
                guarded.push_str(&text);
                surface.set_text(index + 1, guarded);
            }
            None => {
                // No text follows. A neighboring island needs a guard for
                // each side; the surface edge needs just one.
                let guards = if surface.node(index + 1).is_some_and(Node::is_island) {
                    [GUARD, GUARD].iter().collect::<String>()
                } else {
                    GUARD.to_string()
                };
                surface.insert_node(index + 1, Node::text(guards));
            }
        }

        index += 1;
    }

    // Remove guards that no longer sit against an island.
    let mut index = 0;
    while index < surface.node_count() {
        let Some(text) = surface.node(index).and_then(Node::as_text) else {
            index += 1;
            continue;
        };
        if !text.contains(GUARD) {
            index += 1;
            continue;
        }
        let text = text.to_string();
        let prev_island = index > 0 && surface.node(index - 1).is_some_and(Node::is_island);
        let next_island = surface.node(index + 1).is_some_and(Node::is_island);
        let cleaned = clean_guards(&text, prev_island, next_island);
        if cleaned != text {
            surface.set_text(index, cleaned);
        }
        index += 1;
    }
}

/// Keep a guard only as the first character against a preceding island or
/// the last character against a following island; drop every other guard.
fn clean_guards(text: &str, prev_island: bool, next_island: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let last = chars.len().saturating_sub(1);
    let mut out = String::with_capacity(text.len());
    for (position, &c) in chars.iter().enumerate() {
        if c != GUARD {
            out.push(c);
            continue;
        }
        let keep = (position == 0 && prev_island) || (position == last && next_island);
        if keep {
            out.push(c);
        }
    }
    out
}

/// The in-memory surface: the canonical [`Surface`] binding, and the
/// state the terminal widget renders.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct MemorySurface {
    nodes: Vec<Node>,
    selection: Option<Selection>,
}

impl MemorySurface {
    /// An empty, unfocused surface.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            selection: None,
        }
    }

    /// Replace all nodes, dropping the selection.
    pub fn load(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
        self.selection = None;
    }

    /// All nodes in order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Indices of island nodes, in order.
    #[must_use]
    pub fn island_indices(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_island())
            .map(|(index, _)| index)
            .collect()
    }

    /// Concatenated machine-readable content: text runs verbatim, islands
    /// as their canonical token encoding.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Island(island) => out.push_str(&island.text_content()),
            }
        }
        out
    }

    /// True when the surface is exactly the empty-value placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        match self.nodes.as_slice() {
            [Node::Text(text)] => text.chars().eq(std::iter::once(SPACER)),
            _ => false,
        }
    }

    /// Native caret step right: one flat position, atomically over islands.
    #[must_use]
    pub fn step_right(&self, caret: Caret) -> Option<Caret> {
        let pos = flat_of(self, caret)?;
        if pos >= flat_len(self) {
            return None;
        }
        caret_at_flat(self, pos + 1)
    }

    /// Native caret step left: one flat position, atomically over islands.
    #[must_use]
    pub fn step_left(&self, caret: Caret) -> Option<Caret> {
        let pos = flat_of(self, caret)?;
        pos.checked_sub(1).and_then(|prev| caret_at_flat(self, prev))
    }

    /// Insert text at a caret inside (or at the edge of) a text node,
    /// returning the caret after the inserted text. Island-boundary carets
    /// fall back to the nearest text edge, creating a text node only when
    /// no neighbor can take the characters.
    pub fn insert_text(&mut self, caret: Caret, text: &str) -> Option<Caret> {
        let inserted_chars = text.chars().count();
        match self.nodes.get_mut(caret.node) {
            Some(Node::Text(run)) => {
                let at = byte_index(run, caret.offset)?;
                run.insert_str(at, text);
                Some(Caret::new(caret.node, caret.offset + inserted_chars))
            }
            Some(Node::Island(_)) => {
                if caret.offset == 0 {
                    if let Some(prev) = caret.node.checked_sub(1) {
                        if let Some(Node::Text(run)) = self.nodes.get_mut(prev) {
                            let end = run.chars().count();
                            run.push_str(text);
                            return Some(Caret::new(prev, end + inserted_chars));
                        }
                    }
                    self.nodes.insert(caret.node, Node::text(text));
                    self.shift_selection_nodes(caret.node, 1);
                    Some(Caret::new(caret.node, inserted_chars))
                } else {
                    let next = caret.node + 1;
                    if let Some(Node::Text(run)) = self.nodes.get_mut(next) {
                        run.insert_str(0, text);
                        return Some(Caret::new(next, inserted_chars));
                    }
                    self.nodes.insert(next, Node::text(text));
                    self.shift_selection_nodes(next, 1);
                    Some(Caret::new(next, inserted_chars))
                }
            }
            None => None,
        }
    }

    /// Delete everything in the flat range `low..high`. Text characters in
    /// range are removed; an island is removed when its whole slot lies in
    /// range (a selection boundary can never rest inside one). Returns the
    /// caret at the collapse point.
    pub fn delete_flat_range(&mut self, low: usize, high: usize) -> Option<Caret> {
        if high <= low {
            return caret_at_flat(self, low);
        }
        let mut survivors: Vec<Node> = Vec::with_capacity(self.nodes.len());
        let mut acc = 0;
        for node in std::mem::take(&mut self.nodes) {
            let width = node.width();
            let (start, end) = (acc, acc + width);
            acc = end;
            match node {
                Node::Island(island) => {
                    let covered = low <= start && end <= high;
                    if !covered {
                        survivors.push(Node::Island(island));
                    }
                }
                Node::Text(text) => {
                    if end <= low || start >= high {
                        survivors.push(Node::Text(text));
                        continue;
                    }
                    let keep_front = low.saturating_sub(start).min(width);
                    let keep_back = end.saturating_sub(high).min(width);
                    let kept: String = text
                        .chars()
                        .take(keep_front)
                        .chain(text.chars().skip(width - keep_back))
                        .collect();
                    survivors.push(Node::Text(kept));
                }
            }
        }
        self.nodes = survivors;
        let caret = caret_at_flat(self, low.min(flat_len(self)))?;
        self.selection = Some(Selection::caret(caret));
        Some(caret)
    }

    /// Splice `nodes` in at the caret, splitting a text node when the
    /// caret is interior. Returns the caret positioned after the last
    /// spliced node.
    pub fn splice_nodes(&mut self, caret: Caret, nodes: Vec<Node>) -> Option<Caret> {
        if nodes.is_empty() {
            return Some(caret);
        }
        let spliced_width: usize = nodes.iter().map(Node::width).sum();
        let target = flat_of(self, caret)? + spliced_width;
        match self.nodes.get(caret.node) {
            Some(Node::Text(run)) => {
                let split = byte_index(run, caret.offset)?;
                let (left, right) = (run[..split].to_string(), run[split..].to_string());
                self.nodes.splice(
                    caret.node..=caret.node,
                    std::iter::once(Node::Text(left))
                        .chain(nodes)
                        .chain(std::iter::once(Node::Text(right))),
                );
            }
            Some(Node::Island(_)) => {
                let at = caret.node + usize::from(caret.offset > 0);
                self.nodes.splice(at..at, nodes);
            }
            None if caret.node == self.nodes.len() => {
                self.nodes.extend(nodes);
            }
            None => return None,
        }
        let landed = caret_at_flat(self, target)?;
        self.selection = Some(Selection::caret(landed));
        Some(landed)
    }

    /// Read the flat range `low..high` back as raw text: literal
    /// characters with guards stripped and spacers normalized to plain
    /// spaces, plus the canonical encoding of every island wholly inside
    /// the range. The full range is exactly the capture of the surface.
    ///
    /// Guards and spacers are filtered per text run, never from token
    /// encodings, so titles containing those characters survive intact.
    #[must_use]
    pub fn raw_slice(&self, low: usize, high: usize) -> String {
        let mut out = String::new();
        let mut acc = 0;
        for node in &self.nodes {
            let width = node.width();
            let (start, end) = (acc, acc + width);
            acc = end;
            if end <= low || start >= high {
                continue;
            }
            match node {
                Node::Island(island) => {
                    if low <= start && end <= high {
                        out.push_str(&island.text_content());
                    }
                }
                Node::Text(text) => {
                    let from = low.saturating_sub(start).min(width);
                    let to = width - end.saturating_sub(high).min(width);
                    for ch in text.chars().skip(from).take(to.saturating_sub(from)) {
                        match ch {
                            GUARD => {}
                            SPACER => out.push(' '),
                            _ => out.push(ch),
                        }
                    }
                }
            }
        }
        out
    }

    /// Clamp the stored selection onto valid positions after structural
    /// changes, dropping it only when the surface is empty.
    pub fn clamp_selection(&mut self) {
        let Some(selection) = self.selection else { return };
        if self.nodes.is_empty() {
            self.selection = None;
            return;
        }
        fn clamp(nodes: &[Node], caret: Caret) -> Caret {
            let node = caret.node.min(nodes.len() - 1);
            let width = nodes[node].width();
            Caret::new(node, caret.offset.min(width))
        }
        self.selection = Some(Selection::new(
            clamp(&self.nodes, selection.anchor),
            clamp(&self.nodes, selection.focus),
        ));
    }

    fn caret_in_bounds(&self, caret: Caret) -> bool {
        self.nodes
            .get(caret.node)
            .is_some_and(|node| caret.offset <= node.width())
    }

    /// Shift node indices in the selection after a splice at `from`.
    fn shift_selection_nodes(&mut self, from: usize, by: usize) {
        if let Some(selection) = &mut self.selection {
            for caret in [&mut selection.anchor, &mut selection.focus] {
                if caret.node >= from {
                    caret.node += by;
                }
            }
        }
    }
}

impl Surface for MemorySurface {
    fn selection(&self) -> Option<Selection> {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) -> bool {
        if self.caret_in_bounds(selection.anchor) && self.caret_in_bounds(selection.focus) {
            self.selection = Some(selection);
            true
        } else {
            false
        }
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    fn insert_node(&mut self, index: usize, node: Node) -> bool {
        if index > self.nodes.len() {
            return false;
        }
        self.nodes.insert(index, node);
        self.shift_selection_nodes(index, 1);
        true
    }

    fn remove_node(&mut self, index: usize) -> Option<Node> {
        if index >= self.nodes.len() {
            return None;
        }
        let removed = self.nodes.remove(index);
        if let Some(selection) = &mut self.selection {
            for caret in [&mut selection.anchor, &mut selection.focus] {
                if caret.node == index {
                    caret.offset = 0;
                } else if caret.node > index {
                    caret.node -= 1;
                }
            }
        }
        Some(removed)
    }

    fn set_text(&mut self, index: usize, text: String) -> bool {
        match self.nodes.get_mut(index) {
            Some(Node::Text(run)) => {
                *run = text;
                self.clamp_selection();
                true
            }
            _ => false,
        }
    }

    fn set_island_selected(&mut self, index: usize, selected: bool) -> bool {
        match self.nodes.get_mut(index) {
            Some(Node::Island(island)) => {
                island.selected = selected;
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for MemorySurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySurface")
            .field("nodes", &self.nodes.len())
            .field("islands", &self.island_indices().len())
            .field("flat_len", &flat_len(self))
            .field("selection", &self.selection)
            .finish()
    }
}

/// Byte index of a character offset, or `None` past the end.
fn byte_index(text: &str, char_offset: usize) -> Option<usize> {
    if char_offset == 0 {
        return Some(0);
    }
    let mut seen = 0;
    for (at, _) in text.char_indices() {
        if seen == char_offset {
            return Some(at);
        }
        seen += 1;
    }
    if seen == char_offset {
        return Some(text.len());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::RefKind;

    fn token(title: &str) -> TokenRef {
        TokenRef::new(RefKind::Tool, format!("id-{title}"), title)
    }

    fn island(title: &str) -> Node {
        Node::Island(Island::new(token(title), None))
    }

    fn surface_of(nodes: Vec<Node>) -> MemorySurface {
        let mut surface = MemorySurface::new();
        surface.load(nodes);
        surface
    }

    fn guarded(title: &str) -> Vec<Node> {
        vec![
            Node::text(format!("a{GUARD}")),
            island(title),
            Node::text(format!("{GUARD}b")),
        ]
    }

    // --- Projection ---

    #[test]
    fn test_project_empty_is_placeholder() {
        let nodes = project(&Template::parse(""), |_| None);
        assert_eq!(nodes, vec![Node::text(SPACER.to_string())]);
        assert!(surface_of(nodes).is_placeholder());
    }

    #[test]
    fn test_project_interleaves_text_and_islands() {
        let raw = r#"go {{"type":"tool-reference","path":"t1","title":"Run"}} now"#;
        let nodes = project(&Template::parse(raw), |_| Some("⚙".to_string()));
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].as_text(), Some("go "));
        let isle = nodes[1].as_island().expect("island");
        assert_eq!(isle.token().title(), "Run");
        assert_eq!(isle.icon(), Some("⚙"));
        assert_eq!(nodes[2].as_text(), Some(" now"));
    }

    #[test]
    fn test_island_text_content_is_token_encoding() {
        let isle = Island::new(token("Run"), None);
        assert_eq!(isle.text_content(), token("Run").encode());
    }

    // --- Guard enforcement ---

    #[test]
    fn test_guards_appended_to_existing_text_siblings() {
        let mut surface = surface_of(vec![Node::text("a"), island("X"), Node::text("b")]);
        ensure_guards(&mut surface);
        assert_eq!(surface.nodes()[0].as_text(), Some(format!("a{GUARD}").as_str()));
        assert_eq!(surface.nodes()[2].as_text(), Some(format!("{GUARD}b").as_str()));
    }

    #[test]
    fn test_guard_nodes_synthesized_when_siblings_missing() {
        let mut surface = surface_of(vec![island("X")]);
        ensure_guards(&mut surface);
        let nodes = surface.nodes();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].as_text(), Some(GUARD.to_string().as_str()));
        assert!(nodes[1].is_island());
        assert_eq!(nodes[2].as_text(), Some(GUARD.to_string().as_str()));
    }

    #[test]
    fn test_guard_nodes_synthesized_between_adjacent_islands() {
        let mut surface = surface_of(vec![island("X"), island("Y")]);
        ensure_guards(&mut surface);
        let nodes = surface.nodes();
        assert_eq!(nodes.len(), 5);
        assert!(nodes[1].is_island());
        assert!(nodes[3].is_island());
        let between = nodes[2].as_text().expect("text between islands");
        assert!(between.chars().all(|c| c == GUARD));
    }

    #[test]
    fn test_lone_guard_between_islands_widened_to_two() {
        let mut surface = surface_of(vec![
            island("X"),
            Node::text(GUARD.to_string()),
            island("Y"),
        ]);
        ensure_guards(&mut surface);
        let double: String = [GUARD, GUARD].iter().collect();
        assert_eq!(surface.nodes()[2].as_text(), Some(double.as_str()));
    }

    #[test]
    fn test_enforcement_is_idempotent() {
        let mut surface = surface_of(vec![Node::text("a"), island("X"), Node::text("b")]);
        ensure_guards(&mut surface);
        let once = surface.nodes().to_vec();
        ensure_guards(&mut surface);
        assert_eq!(surface.nodes(), once.as_slice());
    }

    #[test]
    fn test_every_island_guarded_after_enforcement() {
        let mut surface = surface_of(vec![
            island("A"),
            Node::text("mid"),
            island("B"),
            island("C"),
        ]);
        ensure_guards(&mut surface);
        for index in surface.island_indices() {
            let prev = surface.nodes()[index - 1].as_text().expect("prev text");
            let next = surface.nodes()[index + 1].as_text().expect("next text");
            assert!(prev.ends_with(GUARD), "island {index} lacks leading guard");
            assert!(next.starts_with(GUARD), "island {index} lacks trailing guard");
        }
    }

    #[test]
    fn test_interior_guards_removed() {
        let mut surface = surface_of(vec![Node::text(format!("a{GUARD}b"))]);
        ensure_guards(&mut surface);
        assert_eq!(surface.nodes()[0].as_text(), Some("ab"));
    }

    #[test]
    fn test_orphan_guard_node_emptied() {
        let mut surface = surface_of(vec![Node::text("a"), Node::text(GUARD.to_string())]);
        ensure_guards(&mut surface);
        assert_eq!(surface.nodes()[1].as_text(), Some(""));
    }

    #[test]
    fn test_edge_guards_without_islands_stripped() {
        let mut surface = surface_of(vec![Node::text(format!("{GUARD}ab{GUARD}"))]);
        ensure_guards(&mut surface);
        assert_eq!(surface.nodes()[0].as_text(), Some("ab"));
    }

    #[test]
    fn test_stale_guards_cleaned_after_island_removal() {
        let mut surface = surface_of(guarded("X"));
        surface.remove_node(1);
        ensure_guards(&mut surface);
        assert_eq!(surface.nodes()[0].as_text(), Some("a"));
        assert_eq!(surface.nodes()[1].as_text(), Some("b"));
    }

    // --- Flat positions ---

    #[test]
    fn test_flat_len_counts_islands_as_one() {
        let surface = surface_of(guarded("X"));
        // "a‍" (2) + island (1) + "‍b" (2)
        assert_eq!(flat_len(&surface), 5);
    }

    #[test]
    fn test_flat_of_and_back() {
        let surface = surface_of(guarded("X"));
        for (caret, pos) in [
            (Caret::new(0, 0), 0),
            (Caret::new(0, 1), 1),
            (Caret::new(0, 2), 2),
            (Caret::new(2, 0), 3),
            (Caret::new(2, 1), 4),
            (Caret::new(2, 2), 5),
        ] {
            assert_eq!(flat_of(&surface, caret), Some(pos), "caret {caret:?}");
        }
        // Boundary positions resolve to text nodes, leftmost first.
        assert_eq!(caret_at_flat(&surface, 2), Some(Caret::new(0, 2)));
        assert_eq!(caret_at_flat(&surface, 3), Some(Caret::new(2, 0)));
    }

    #[test]
    fn test_flat_of_out_of_bounds_is_none() {
        let surface = surface_of(guarded("X"));
        assert_eq!(flat_of(&surface, Caret::new(9, 0)), None);
        assert_eq!(flat_of(&surface, Caret::new(0, 7)), None);
        assert_eq!(caret_at_flat(&surface, 99), None);
    }

    #[test]
    fn test_step_right_crosses_island_atomically() {
        let surface = surface_of(guarded("X"));
        // From the end of the left text node, one step lands after the island.
        let crossed = surface.step_right(Caret::new(0, 2)).expect("step");
        assert_eq!(crossed, Caret::new(2, 0));
    }

    #[test]
    fn test_step_left_crosses_island_atomically() {
        let surface = surface_of(guarded("X"));
        let crossed = surface.step_left(Caret::new(2, 0)).expect("step");
        assert_eq!(crossed, Caret::new(0, 2));
    }

    #[test]
    fn test_step_stops_at_surface_edges() {
        let surface = surface_of(guarded("X"));
        assert_eq!(surface.step_left(Caret::new(0, 0)), None);
        assert_eq!(surface.step_right(Caret::new(2, 2)), None);
    }

    // --- Editing primitives ---

    #[test]
    fn test_insert_text_in_run() {
        let mut surface = surface_of(vec![Node::text("ab")]);
        let caret = surface.insert_text(Caret::new(0, 1), "xy").expect("insert");
        assert_eq!(surface.nodes()[0].as_text(), Some("axyb"));
        assert_eq!(caret, Caret::new(0, 3));
    }

    #[test]
    fn test_insert_text_at_island_boundary_joins_neighbor() {
        let mut surface = surface_of(guarded("X"));
        let caret = surface.insert_text(Caret::new(1, 1), "z").expect("insert");
        assert_eq!(surface.nodes()[2].as_text(), Some(format!("z{GUARD}b").as_str()));
        assert_eq!(caret, Caret::new(2, 1));
    }

    #[test]
    fn test_delete_flat_range_removes_single_char() {
        let mut surface = surface_of(vec![Node::text("abc")]);
        let caret = surface.delete_flat_range(1, 2).expect("delete");
        assert_eq!(surface.nodes()[0].as_text(), Some("ac"));
        assert_eq!(caret, Caret::new(0, 1));
    }

    #[test]
    fn test_delete_flat_range_removes_covered_island() {
        let mut surface = surface_of(guarded("X"));
        // Range covering guard + island + guard.
        let caret = surface.delete_flat_range(1, 4).expect("delete");
        assert!(surface.island_indices().is_empty());
        assert_eq!(caret, Caret::new(0, 1));
        assert_eq!(surface.text_content(), "ab");
    }

    #[test]
    fn test_delete_flat_range_spares_uncovered_island() {
        let mut surface = surface_of(guarded("X"));
        // Range touching only the leading text.
        surface.delete_flat_range(0, 2).expect("delete");
        assert_eq!(surface.island_indices().len(), 1);
    }

    #[test]
    fn test_splice_nodes_splits_text_run() {
        let mut surface = surface_of(vec![Node::text("ab")]);
        let caret = surface
            .splice_nodes(Caret::new(0, 1), vec![island("X")])
            .expect("splice");
        assert_eq!(surface.nodes().len(), 3);
        assert!(surface.nodes()[1].is_island());
        assert_eq!(surface.nodes()[0].as_text(), Some("a"));
        assert_eq!(surface.nodes()[2].as_text(), Some("b"));
        assert_eq!(flat_of(&surface, caret), Some(2));
    }

    #[test]
    fn test_splice_nodes_at_end_appends() {
        let mut surface = surface_of(vec![Node::text("ab")]);
        let caret = surface
            .splice_nodes(Caret::new(0, 2), vec![island("X"), Node::text("c")])
            .expect("splice");
        assert_eq!(surface.nodes().len(), 4);
        assert_eq!(flat_of(&surface, caret), Some(4));
    }

    #[test]
    fn test_raw_slice_includes_covered_islands_only() {
        let surface = surface_of(guarded("X"));
        let encoded = token("X").encode();
        assert_eq!(surface.raw_slice(0, 5), format!("a{encoded}b"));
        // Island slot not fully covered: omitted. Guards never leak out.
        assert_eq!(surface.raw_slice(0, 2), "a");
        assert_eq!(surface.raw_slice(3, 5), "b");
    }

    #[test]
    fn test_raw_slice_normalizes_spacers() {
        let surface = surface_of(vec![Node::text(format!("a{SPACER}b"))]);
        assert_eq!(surface.raw_slice(0, 3), "a b");
    }

    #[test]
    fn test_text_content_round_trips_token() {
        let surface = surface_of(guarded("X"));
        assert!(surface.text_content().contains(&token("X").encode()));
    }

    // --- Selection bookkeeping ---

    #[test]
    fn test_set_selection_validates_bounds() {
        let mut surface = surface_of(vec![Node::text("ab")]);
        assert!(surface.set_selection(Selection::caret(Caret::new(0, 2))));
        assert!(!surface.set_selection(Selection::caret(Caret::new(0, 3))));
        assert!(!surface.set_selection(Selection::caret(Caret::new(4, 0))));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(0, 2))));
    }

    #[test]
    fn test_remove_node_shifts_selection() {
        let mut surface = surface_of(guarded("X"));
        surface.set_selection(Selection::caret(Caret::new(2, 1)));
        surface.remove_node(1);
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(1, 1))));
    }

    #[test]
    fn test_insert_node_shifts_selection() {
        let mut surface = surface_of(vec![Node::text("ab")]);
        surface.set_selection(Selection::caret(Caret::new(0, 1)));
        surface.insert_node(0, Node::text("x"));
        assert_eq!(surface.selection(), Some(Selection::caret(Caret::new(1, 1))));
    }

    #[test]
    fn test_selection_unavailable_on_fresh_surface() {
        let surface = surface_of(vec![Node::text("ab")]);
        assert_eq!(surface.selection(), None);
    }
}
