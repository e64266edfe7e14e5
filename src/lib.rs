//! dexview: a terminal Pokédex.
//!
//! Browse, search and filter the PokéAPI catalog, open detail records, and
//! keep a list of favorites in a local SQLite key-value store that stays in
//! sync across every open storage context.

pub mod api;
pub mod app;
pub mod config;
pub mod favorites;
pub mod filter;
pub mod keybindings;
pub mod preferences;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod util;
