//! Read-only client for the public creature-data API.
//!
//! Three endpoints are used: the full catalog index, one detail record per
//! id, and the member list of a category. Sprite URLs are derived locally.

mod client;
mod types;

pub use client::{
    build_http_client, ApiError, Gateway, DEFAULT_BASE_URL, DEFAULT_SPRITE_BASE_URL,
    DEFAULT_TIMEOUT,
};
pub use types::{
    AbilitySlot, ArtworkSprites, CardSummary, CatalogEntry, DetailRecord, MoveEntry,
    NamedResource, OtherSprites, Sprites, StatValue, TypeSlot,
};
