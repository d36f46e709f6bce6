//! The editing engine: surface model, caret-safety rules, and the
//! session that binds a surface to its canonical raw value.
//!
//! `surface` holds the node model and the guard invariant, `caret` the
//! stateless atomicity rules, and `session` the capture pipeline and
//! per-session editing state. The terminal front end renders a session's
//! surface and drives it exclusively through [`Session`] methods.

pub mod caret;
pub mod session;
pub mod surface;

pub use caret::{EditKey, ensure_safe_position, mark_selection_intersections};
pub use session::Session;
pub use surface::{
    Caret, GUARD, Island, MemorySurface, Node, SPACER, Selection, Surface, ensure_guards, project,
};
