//! Terminal UI components.
//!
//! This module contains all UI-related code including:
//! - [`layout`]: Wrapping the surface into rows and mapping coordinates
//! - [`style`]: Pill and chrome styling
//! - The frame renderer, footer bars, and the reference picker overlay

pub mod layout;
pub mod style;

mod overlays;
mod render;
mod status;

pub use overlays::{picker_items_top, picker_rect, render_picker_overlay};
pub use render::{render, surface_area};

pub const SURFACE_LEFT_PADDING: u16 = 2;
