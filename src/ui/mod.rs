//! Terminal User Interface module.
//!
//! This module provides the TUI for the catalog viewer, including:
//! - Main event loop (`run`)
//! - Input handling for the catalog, detail, favorites and search modes
//! - Rendering for the card grids and the detail panel
//! - Background task and storage event processing
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task and storage event processing
//! - `render` - View rendering dispatch
//! - `helpers` - Background task spawning shared by input and events
//! - `grid` - Card grid widget shared by catalog and favorites
//! - `catalog` - Catalog view
//! - `detail` - Detail view
//! - `favorites` - Favorites view
//! - `help` - Keybinding help overlay
//! - `status` - Status bar widget

// Submodules for UI components
mod catalog;
mod detail;
mod events;
mod favorites;
mod grid;
mod help;
mod helpers;
mod input;
mod loop_runner;
mod render;
mod status;

// Re-export the public API
pub use helpers::resolve_cards;
pub use loop_runner::{run, Action};
