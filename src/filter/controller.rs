use std::cmp::Reverse;
use std::collections::HashSet;

use super::cache::CategoryCache;
use super::{FilterError, FilterState, SortOrder, PAGE_SIZE};
use crate::api::{ApiError, CatalogEntry, Gateway};
use crate::util::CollationKey;

/// Marker for one category lookup. Only the most recently issued ticket is
/// current; completions for any other ticket are superseded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub generation: u64,
    pub category: String,
}

/// Result of a recomputation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recompute {
    /// The visible page is up to date.
    Ready,
    /// Category members must be fetched; pass the result to
    /// [`ListFilterController::complete_lookup`] with this ticket.
    NeedsMembers(LookupTicket),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Applied,
    Superseded,
    Failed(FilterError),
}

/// Produces the visible page from the catalog index and the filter state.
#[derive(Debug, Default)]
pub struct ListFilterController {
    index: Vec<CatalogEntry>,
    state: FilterState,
    cache: CategoryCache,
    lookup_generation: u64,
    outstanding: Option<LookupTicket>,
    visible: Vec<CatalogEntry>,
    error: Option<FilterError>,
}

impl ListFilterController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn visible_page(&self) -> &[CatalogEntry] {
        &self.visible
    }

    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// True while a category lookup is outstanding.
    pub fn is_processing(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn error(&self) -> Option<&FilterError> {
        self.error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn cache(&self) -> &CategoryCache {
        &self.cache
    }

    // ========================================================================
    // Intents
    // ========================================================================

    pub fn set_index(&mut self, index: Vec<CatalogEntry>) -> Recompute {
        self.index = index;
        self.recompute()
    }

    /// Replace the whole filter state, e.g. from a restored location.
    pub fn set_state(&mut self, state: FilterState) -> Recompute {
        self.state = state;
        self.recompute()
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) -> Recompute {
        self.state.search_term = term.into();
        self.recompute()
    }

    pub fn set_category(&mut self, category: Option<String>) -> Recompute {
        self.state.category = category.filter(|c| !c.is_empty());
        self.recompute()
    }

    pub fn set_sort_order(&mut self, sort_order: SortOrder) -> Recompute {
        self.state.sort_order = sort_order;
        self.recompute()
    }

    /// Advance one page. Ignored while searching.
    pub fn next_page(&mut self) -> Recompute {
        if self.state.is_searching() {
            return Recompute::Ready;
        }
        self.state.page_offset = self.state.page_offset.saturating_add(PAGE_SIZE);
        self.recompute()
    }

    /// Go back one page, stopping at the first. Ignored while searching.
    pub fn prev_page(&mut self) -> Recompute {
        if self.state.is_searching() || self.state.page_offset == 0 {
            return Recompute::Ready;
        }
        self.state.page_offset = self.state.page_offset.saturating_sub(PAGE_SIZE);
        self.recompute()
    }

    // ========================================================================
    // Recomputation
    // ========================================================================

    /// Re-derive the visible page. Any outstanding lookup is superseded.
    pub fn recompute(&mut self) -> Recompute {
        if let Some(stale) = self.outstanding.take() {
            tracing::debug!(
                generation = stale.generation,
                category = %stale.category,
                "Category lookup superseded"
            );
        }

        if self.index.is_empty() {
            self.visible.clear();
            return Recompute::Ready;
        }

        let members = match self.state.category.as_deref() {
            None => None,
            Some(category) => match self.cache.get(category) {
                Some(ids) => Some(ids),
                None => {
                    self.lookup_generation = self.lookup_generation.wrapping_add(1);
                    let ticket = LookupTicket {
                        generation: self.lookup_generation,
                        category: category.to_string(),
                    };
                    self.outstanding = Some(ticket.clone());
                    return Recompute::NeedsMembers(ticket);
                }
            },
        };

        self.visible = compute_page(&self.index, &self.state, members.as_deref());
        Recompute::Ready
    }

    /// Deliver the result of a category lookup.
    ///
    /// Successful results are cached even when superseded; only the current
    /// ticket updates the visible page. A failed current lookup leaves the
    /// visible page as it was.
    pub fn complete_lookup(
        &mut self,
        ticket: LookupTicket,
        result: Result<Vec<i64>, ApiError>,
    ) -> LookupOutcome {
        let is_current = self.outstanding.as_ref() == Some(&ticket);

        let members = match result {
            Ok(ids) => self.cache.put(&ticket.category, ids),
            Err(e) if is_current => {
                self.outstanding = None;
                tracing::warn!(category = %ticket.category, error = %e, "Category lookup failed");
                let error = FilterError::Processing {
                    category: ticket.category,
                    reason: e.to_string(),
                };
                self.error = Some(error.clone());
                return LookupOutcome::Failed(error);
            }
            Err(e) => {
                tracing::debug!(category = %ticket.category, error = %e, "Superseded lookup failed");
                return LookupOutcome::Superseded;
            }
        };

        if !is_current {
            tracing::debug!(
                generation = ticket.generation,
                category = %ticket.category,
                "Dropping superseded category members"
            );
            return LookupOutcome::Superseded;
        }

        self.outstanding = None;
        self.visible = compute_page(&self.index, &self.state, Some(&members[..]));
        LookupOutcome::Applied
    }
}

/// Filter, sort and slice `index` for `state`.
///
/// `members` restricts the result to those ids when a category is set.
pub fn compute_page(
    index: &[CatalogEntry],
    state: &FilterState,
    members: Option<&[i64]>,
) -> Vec<CatalogEntry> {
    let needle = state.search_term.to_lowercase();
    let members: Option<HashSet<i64>> = members.map(|ids| ids.iter().copied().collect());

    let mut filtered: Vec<CatalogEntry> = index
        .iter()
        .filter(|e| needle.is_empty() || e.name.to_lowercase().contains(&needle))
        .filter(|e| members.as_ref().map_or(true, |m| m.contains(&e.id)))
        .cloned()
        .collect();

    match state.sort_order {
        SortOrder::Az => filtered.sort_by_cached_key(|e| CollationKey::new(&e.name)),
        SortOrder::Za => filtered.sort_by_cached_key(|e| Reverse(CollationKey::new(&e.name))),
    }

    if state.is_searching() {
        return filtered;
    }

    filtered
        .into_iter()
        .skip(state.page_offset)
        .take(PAGE_SIZE)
        .collect()
}

/// Drive `step` to completion against `gateway`.
///
/// Used where there is no event loop to deliver lookup results.
pub async fn settle(
    controller: &mut ListFilterController,
    gateway: &Gateway,
    step: Recompute,
) -> Result<(), FilterError> {
    let Recompute::NeedsMembers(ticket) = step else {
        return Ok(());
    };
    let result = gateway.fetch_category_members(&ticket.category).await;
    match controller.complete_lookup(ticket, result) {
        LookupOutcome::Failed(e) => Err(e),
        LookupOutcome::Applied | LookupOutcome::Superseded => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, id: i64) -> CatalogEntry {
        CatalogEntry::new(name, format!("https://pokeapi.co/api/v2/pokemon/{}/", id))
    }

    fn starters() -> Vec<CatalogEntry> {
        vec![entry("squirtle", 7), entry("bulbasaur", 1), entry("charmander", 4)]
    }

    fn names(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    fn many(n: i64) -> Vec<CatalogEntry> {
        (1..=n).map(|i| entry(&format!("mon{:03}", i), i)).collect()
    }

    #[test]
    fn empty_index_gives_empty_page() {
        let mut c = ListFilterController::new();
        assert_eq!(c.set_category(Some("fire".into())), Recompute::Ready);
        assert!(c.visible_page().is_empty());
        assert!(!c.is_processing());
    }

    #[test]
    fn sorts_ascending_and_descending() {
        let mut c = ListFilterController::new();
        c.set_index(starters());
        assert_eq!(names(c.visible_page()), ["bulbasaur", "charmander", "squirtle"]);

        c.set_sort_order(SortOrder::Za);
        assert_eq!(names(c.visible_page()), ["squirtle", "charmander", "bulbasaur"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let mut c = ListFilterController::new();
        c.set_index(starters());
        c.set_search_term("CHAR");
        assert_eq!(names(c.visible_page()), ["charmander"]);
    }

    #[test]
    fn search_ignores_offset_and_pagination() {
        let mut c = ListFilterController::new();
        c.set_index(many(100));
        c.next_page();
        c.next_page();
        assert_eq!(c.state().page_offset, 72);

        c.set_search_term("mon");
        assert_eq!(c.visible_page().len(), 100);

        // Paging intents are ignored while searching
        c.next_page();
        assert_eq!(c.state().page_offset, 72);
    }

    #[test]
    fn pages_slice_by_page_size() {
        let mut c = ListFilterController::new();
        c.set_index(many(80));
        assert_eq!(c.visible_page().len(), PAGE_SIZE);
        assert_eq!(c.visible_page()[0].name, "mon001");

        c.next_page();
        assert_eq!(c.visible_page()[0].name, "mon037");

        c.next_page();
        assert_eq!(c.visible_page().len(), 8);

        // Next is always allowed, even past the end
        c.next_page();
        assert!(c.visible_page().is_empty());
    }

    #[test]
    fn prev_page_saturates_at_zero() {
        let mut c = ListFilterController::new();
        c.set_index(many(10));
        c.prev_page();
        assert_eq!(c.state().page_offset, 0);
        c.next_page();
        c.prev_page();
        assert_eq!(c.state().page_offset, 0);
    }

    #[test]
    fn filter_change_keeps_offset() {
        let mut c = ListFilterController::new();
        c.set_index(many(80));
        c.next_page();
        c.set_sort_order(SortOrder::Za);
        assert_eq!(c.state().page_offset, PAGE_SIZE);
    }

    #[test]
    fn category_miss_issues_ticket_then_applies() {
        let mut c = ListFilterController::new();
        c.set_index(starters());

        let Recompute::NeedsMembers(ticket) = c.set_category(Some("fire".into())) else {
            panic!("expected a lookup");
        };
        assert!(c.is_processing());
        // Page unchanged while processing
        assert_eq!(c.visible_page().len(), 3);

        assert_eq!(c.complete_lookup(ticket, Ok(vec![4, 5])), LookupOutcome::Applied);
        assert!(!c.is_processing());
        assert_eq!(names(c.visible_page()), ["charmander"]);
    }

    #[test]
    fn cached_category_is_ready_immediately() {
        let mut c = ListFilterController::new();
        c.set_index(starters());
        let Recompute::NeedsMembers(ticket) = c.set_category(Some("water".into())) else {
            panic!("expected a lookup");
        };
        c.complete_lookup(ticket, Ok(vec![7]));

        c.set_category(None);
        assert_eq!(c.set_category(Some("water".into())), Recompute::Ready);
        assert_eq!(names(c.visible_page()), ["squirtle"]);
    }

    #[test]
    fn superseded_lookup_is_cached_but_not_applied() {
        let mut c = ListFilterController::new();
        c.set_index(starters());

        let Recompute::NeedsMembers(fire) = c.set_category(Some("fire".into())) else {
            panic!("expected a lookup");
        };
        let Recompute::NeedsMembers(grass) = c.set_category(Some("grass".into())) else {
            panic!("expected a lookup");
        };
        assert_ne!(fire.generation, grass.generation);

        assert_eq!(c.complete_lookup(fire, Ok(vec![4])), LookupOutcome::Superseded);
        assert!(c.is_processing());
        assert_eq!(c.visible_page().len(), 3);
        assert!(c.cache().get("fire").is_some());

        assert_eq!(c.complete_lookup(grass, Ok(vec![1])), LookupOutcome::Applied);
        assert_eq!(names(c.visible_page()), ["bulbasaur"]);
    }

    #[test]
    fn failed_lookup_keeps_page_and_reports() {
        let mut c = ListFilterController::new();
        c.set_index(starters());
        let before: Vec<CatalogEntry> = c.visible_page().to_vec();

        let Recompute::NeedsMembers(ticket) = c.set_category(Some("rock".into())) else {
            panic!("expected a lookup");
        };
        let outcome = c.complete_lookup(ticket, Err(ApiError::HttpStatus(500)));
        assert!(matches!(outcome, LookupOutcome::Failed(FilterError::Processing { .. })));
        assert_eq!(c.visible_page(), &before[..]);
        assert!(!c.is_processing());
        assert_eq!(
            c.error().map(|e| e.to_string()).as_deref(),
            Some("Processing error. Try again.")
        );
    }

    #[test]
    fn superseded_failure_is_silent() {
        let mut c = ListFilterController::new();
        c.set_index(starters());
        let Recompute::NeedsMembers(old) = c.set_category(Some("rock".into())) else {
            panic!("expected a lookup");
        };
        c.set_category(None);
        let outcome = c.complete_lookup(old, Err(ApiError::Timeout(30)));
        assert_eq!(outcome, LookupOutcome::Superseded);
        assert!(c.error().is_none());
    }

    #[test]
    fn unparsable_id_never_matches_category() {
        let mut c = ListFilterController::new();
        c.set_index(vec![
            entry("bulbasaur", 1),
            CatalogEntry::new("glitch", "https://pokeapi.co/api/v2/pokemon/"),
        ]);
        let Recompute::NeedsMembers(ticket) = c.set_category(Some("grass".into())) else {
            panic!("expected a lookup");
        };
        c.complete_lookup(ticket, Ok(vec![1, 2]));
        assert_eq!(names(c.visible_page()), ["bulbasaur"]);
    }

    #[test]
    fn same_state_gives_same_page() {
        let searching = FilterState {
            search_term: "a".into(),
            sort_order: SortOrder::Za,
            ..FilterState::default()
        };
        let first = compute_page(&starters(), &searching, Some(&[1, 4]));
        let second = compute_page(&starters(), &searching, Some(&[1, 4]));
        assert_eq!(first, second);
        assert_eq!(names(&first), ["charmander", "bulbasaur"]);

        let paged = FilterState {
            page_offset: PAGE_SIZE,
            ..FilterState::default()
        };
        let index = many(80);
        let first = compute_page(&index, &paged, None);
        let second = compute_page(&index, &paged, None);
        assert_eq!(first, second);
        assert_eq!(first.len(), PAGE_SIZE);
        assert_eq!(first[0].name, "mon037");
    }
}
