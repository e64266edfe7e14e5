//! The list location: filter state as a query string.
//!
//! `q` and `type` are written only when non-empty; `sort` is always written.
//! The page offset is not part of the location.
use url::form_urlencoded;

use super::{FilterState, SortOrder};
use crate::storage::{StoredValueError, LOCATION_KEY};

/// Encode the location for `state`.
///
/// ```
/// use dexview::filter::{encode_location, FilterState, SortOrder};
///
/// let state = FilterState {
///     search_term: "mr mime".into(),
///     sort_order: SortOrder::Za,
///     ..FilterState::default()
/// };
/// assert_eq!(encode_location(&state), "q=mr+mime&sort=za");
/// ```
pub fn encode_location(state: &FilterState) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !state.search_term.is_empty() {
        query.append_pair("q", &state.search_term);
    }
    if let Some(category) = state.category.as_deref().filter(|c| !c.is_empty()) {
        query.append_pair("type", category);
    }
    query.append_pair("sort", state.sort_order.as_str());
    query.finish()
}

/// Decode a location. Unknown parameters are ignored; a missing or
/// unrecognized `sort` falls back to ascending.
pub fn decode_location(location: &str) -> FilterState {
    let query = location.trim().trim_start_matches('?');
    let mut state = FilterState::default();

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "q" => state.search_term = value.into_owned(),
            "type" if !value.is_empty() => state.category = Some(value.into_owned()),
            "sort" => match value.parse::<SortOrder>() {
                Ok(order) => state.sort_order = order,
                Err(reason) => {
                    let e = StoredValueError::new(LOCATION_KEY, reason);
                    tracing::warn!(error = %e, "Using default sort order");
                    state.sort_order = SortOrder::Az;
                }
            },
            _ => {}
        }
    }

    state
}
