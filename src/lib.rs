// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. layout::LayoutRow)
    clippy::module_name_repetitions
)]

//! # Chiclet
//!
//! A terminal editor for flow step instructions with inline reference tokens.
//!
//! Chiclet edits the instruction text of a flow step file, rendering each
//! embedded reference token as an atomic pill ("chiclet") that moves, deletes,
//! and copies as one unit:
//! - Wire-format tokens stay intact in the saved text
//! - A `@` picker inserts references from the step's catalog
//! - Tokens pointing at missing catalog entries render as invalid
//! - File watching reloads edits made outside the editor
//!
//! ## Architecture
//!
//! Chiclet uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`app`]: Main application loop and state
//! - [`template`]: Wire-format parsing and token model
//! - [`editor`]: Editing surface, caret, selection, and history
//! - [`registry`]: Reference catalog lookups
//! - [`flowfile`]: Flow step files on disk
//! - [`ui`]: Terminal UI components
//! - [`watcher`]: File watching

pub mod app;
pub mod config;
pub mod editor;
pub mod flowfile;
pub mod perf;
pub mod registry;
pub mod template;
pub mod ui;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::editor::Session;
    pub use crate::flowfile::FlowStep;
    pub use crate::template::{Template, TokenRef};
}
