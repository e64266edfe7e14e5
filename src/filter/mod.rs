//! Search, category filter, sort order and pagination over the catalog index.
//!
//! [`ListFilterController`] owns the [`FilterState`] and the visible page.
//! Category membership comes from the API on first use and is memoized in a
//! [`CategoryCache`] for the rest of the session.

mod cache;
mod controller;
mod location;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use cache::CategoryCache;
pub use controller::{
    compute_page, settle, ListFilterController, LookupOutcome, LookupTicket, Recompute,
};
pub use location::{decode_location, encode_location};

/// Entries per page when no search term is active.
pub const PAGE_SIZE: usize = 36;

/// Categories offered in the catalog view, in cycling order.
pub const OFFERED_CATEGORIES: [&str; 6] = ["fire", "water", "grass", "electric", "psychic", "rock"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A category lookup that was still current failed.
    #[error("Processing error. Try again.")]
    Processing { category: String, reason: String },
}

// ============================================================================
// Sort Order
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Az,
    Za,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Az => "az",
            SortOrder::Za => "za",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Az => SortOrder::Za,
            SortOrder::Za => SortOrder::Az,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Az => "A → Z",
            SortOrder::Za => "Z → A",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "az" => Ok(SortOrder::Az),
            "za" => Ok(SortOrder::Za),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

// ============================================================================
// Filter State
// ============================================================================

/// Everything that decides which entries are visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_term: String,
    pub category: Option<String>,
    pub sort_order: SortOrder,
    pub page_offset: usize,
}

impl FilterState {
    /// Pagination is suspended while a search term is present.
    pub fn is_searching(&self) -> bool {
        !self.search_term.is_empty()
    }
}

/// The category after `current` in [`OFFERED_CATEGORIES`], wrapping to none.
///
/// A category not in the offered list (from a restored location) cycles to
/// the first offered one.
pub fn next_category(current: Option<&str>) -> Option<String> {
    let next = match current {
        None => Some(0),
        Some(c) => match OFFERED_CATEGORIES.iter().position(|&o| o == c) {
            Some(i) if i + 1 < OFFERED_CATEGORIES.len() => Some(i + 1),
            Some(_) => None,
            None => Some(0),
        },
    };
    next.map(|i| OFFERED_CATEGORIES[i].to_string())
}
