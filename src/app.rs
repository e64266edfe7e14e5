use crate::api::{ApiError, CardSummary, CatalogEntry, DetailRecord, Gateway};
use crate::config::Config;
use crate::favorites::{FavoriteChange, FavoriteConfirmer, FavoriteError, FavoritesStore};
use crate::filter::{
    encode_location, FilterState, ListFilterController, LookupTicket, Recompute,
};
use crate::keybindings::KeybindingRegistry;
use crate::preferences::PreferenceManager;
use crate::storage::Database;
use crate::theme::{StyleMap, ThemeVariant};
use anyhow::Result;
use ratatui::style::Style;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Quiet period after the last filter change before the location is written.
pub const LOCATION_DEBOUNCE: Duration = Duration::from_millis(400);

/// Status messages disappear after this long.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// Maximum scroll offset for the detail view (ratatui u16 limit).
pub const MAX_SCROLL: u16 = u16::MAX;

pub const CATALOG_LOAD_FAILED: &str = "Failed to load Pokémon. Please try again.";
pub const FAVORITES_LOAD_FAILED: &str = "Failed to load favorites. Please try again.";

// ============================================================================
// View State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Catalog,
    Detail,
    Favorites,
}

/// Progress of a fetch whose result is shown by a view.
#[derive(Debug, Default)]
pub enum LoadState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> LoadState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Catalog grid: the filter controller plus the index fetch around it.
pub struct CatalogState {
    pub controller: ListFilterController,
    pub loading: bool,
    pub load_error: Option<String>,
    /// Incremented for every index fetch; stale results are dropped.
    pub generation: u64,
    pub load_handle: Option<JoinHandle<()>>,
    pub lookup_handle: Option<JoinHandle<()>>,
    pub selected: usize,
}

impl CatalogState {
    fn new() -> Self {
        Self {
            controller: ListFilterController::new(),
            loading: true,
            load_error: None,
            generation: 0,
            load_handle: None,
            lookup_handle: None,
            selected: 0,
        }
    }

    /// Skeleton cards are shown while the index or a category is loading.
    pub fn shows_placeholder(&self) -> bool {
        self.loading || self.controller.is_processing()
    }

    /// Error line for the grid. A fetch failure wins over a processing error.
    pub fn error_message(&self) -> Option<String> {
        self.load_error
            .clone()
            .or_else(|| self.controller.error().map(|e| e.to_string()))
    }

    pub fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.controller.visible_page().get(self.selected)
    }
}

pub struct DetailState {
    pub id: i64,
    pub content: LoadState<Box<DetailRecord>>,
    pub generation: u64,
    pub handle: Option<JoinHandle<()>>,
    pub scroll: u16,
    /// View that Back returns to.
    pub return_to: View,
}

impl DetailState {
    fn new() -> Self {
        Self {
            id: 0,
            content: LoadState::Idle,
            generation: 0,
            handle: None,
            scroll: 0,
            return_to: View::Catalog,
        }
    }

    pub fn record(&self) -> Option<&DetailRecord> {
        match &self.content {
            LoadState::Loaded(record) => Some(record),
            _ => None,
        }
    }

    /// Id of the previous entry; there is none before #1.
    pub fn prev_id(&self) -> Option<i64> {
        (self.id > 1).then(|| self.id - 1)
    }

    pub fn next_id(&self) -> i64 {
        self.id.saturating_add(1)
    }
}

pub struct FavoritesViewState {
    pub content: LoadState<Vec<CardSummary>>,
    pub generation: u64,
    pub handle: Option<JoinHandle<()>>,
    pub selected: usize,
}

impl FavoritesViewState {
    fn new() -> Self {
        Self {
            content: LoadState::Idle,
            generation: 0,
            handle: None,
            selected: 0,
        }
    }

    pub fn cards(&self) -> &[CardSummary] {
        match &self.content {
            LoadState::Loaded(cards) => cards,
            _ => &[],
        }
    }
}

/// Grid movement direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Move a selection through a row-major grid of `len` cells and `columns`
/// columns. Moves that would leave the grid are ignored.
pub fn step_grid(selected: usize, len: usize, columns: usize, direction: Direction) -> usize {
    if len == 0 {
        return 0;
    }
    let columns = columns.max(1);
    let selected = selected.min(len - 1);
    match direction {
        Direction::Left => selected.saturating_sub(1),
        Direction::Right => (selected + 1).min(len - 1),
        Direction::Up => selected.checked_sub(columns).unwrap_or(selected),
        Direction::Down => {
            let target = selected + columns;
            if target < len {
                target
            } else {
                selected
            }
        }
    }
}

// ============================================================================
// Background Events
// ============================================================================

/// Results delivered from background tasks to the event loop.
pub enum AppEvent {
    CatalogLoaded {
        generation: u64,
        result: Result<Vec<CatalogEntry>, ApiError>,
    },
    CategoryMembersLoaded {
        ticket: LookupTicket,
        result: Result<Vec<i64>, ApiError>,
    },
    DetailLoaded {
        id: i64,
        generation: u64,
        result: Result<DetailRecord, ApiError>,
    },
    /// Every favorite id resolved to a card, in stored order.
    FavoritesResolved {
        generation: u64,
        result: Result<Vec<CardSummary>, ApiError>,
    },
    FavoriteConfirmed {
        change: FavoriteChange,
    },
    FavoriteConfirmFailed {
        change: FavoriteChange,
        error: FavoriteError,
    },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked (e.g., "catalog_load")
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// Application State
// ============================================================================

pub struct App {
    pub db: Database,
    pub gateway: Gateway,
    pub config: Config,
    pub prefs: PreferenceManager,
    pub favorites: FavoritesStore,
    pub confirmer: Arc<dyn FavoriteConfirmer>,

    pub theme_variant: ThemeVariant,
    pub theme: StyleMap,
    pub keybindings: KeybindingRegistry,

    pub view: View,
    pub catalog: CatalogState,
    pub detail: DetailState,
    pub favorites_view: FavoritesViewState,

    /// Search input has focus; typed characters edit the search term.
    pub search_mode: bool,
    /// Grid columns at the current terminal width.
    pub grid_columns: usize,
    pub spinner_frame: usize,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub show_help: bool,
    pub help_scroll_offset: usize,

    /// Time of the last filter change not yet written as the location.
    pub location_changed_at: Option<Instant>,
    /// Location most recently written to storage.
    pub last_location: String,
}

impl App {
    /// Build the app state from storage. Stored preferences and favorites are
    /// read once here; later changes arrive as storage events.
    pub async fn new(
        db: Database,
        gateway: Gateway,
        config: Config,
        confirmer: Arc<dyn FavoriteConfirmer>,
    ) -> Result<Self> {
        let prefs = PreferenceManager::load(&config, &db).await?;
        let favorites = FavoritesStore::load(db.clone()).await?;

        let mut keybindings = KeybindingRegistry::new();
        for warning in keybindings.apply_overrides(&config.keybindings) {
            tracing::warn!(warning = %warning, "Ignoring keybinding override");
        }

        let theme_variant = prefs.theme_variant();
        let last_location = prefs.location().unwrap_or_default().to_string();

        Ok(Self {
            db,
            gateway,
            config,
            prefs,
            favorites,
            confirmer,
            theme_variant,
            theme: StyleMap::from_palette(&theme_variant.palette()),
            keybindings,
            view: View::Catalog,
            catalog: CatalogState::new(),
            detail: DetailState::new(),
            favorites_view: FavoritesViewState::new(),
            search_mode: false,
            grid_columns: 4,
            spinner_frame: 0,
            status_message: None,
            needs_redraw: true,
            show_help: false,
            help_scroll_offset: 0,
            location_changed_at: None,
            last_location,
        })
    }

    // ========================================================================
    // Theme
    // ========================================================================

    pub fn style(&self, role: &str) -> Style {
        self.theme.resolve(role)
    }

    /// Switch to a different theme variant at runtime.
    pub fn set_theme(&mut self, variant: ThemeVariant) {
        self.theme_variant = variant;
        self.theme = StyleMap::from_palette(&variant.palette());
        self.needs_redraw = true;
    }

    /// Switch to the next variant and persist the choice.
    pub async fn cycle_theme(&mut self) -> Result<&'static str> {
        let next = self.theme_variant.next();
        self.prefs.set_theme(&self.db, next).await?;
        self.set_theme(next);
        Ok(next.name())
    }

    // ========================================================================
    // Catalog Filter
    // ========================================================================

    /// Apply a filter intent and schedule a location write.
    ///
    /// The caller must follow a returned `NeedsMembers` with a lookup.
    pub fn update_filter(
        &mut self,
        intent: impl FnOnce(&mut ListFilterController) -> Recompute,
    ) -> Recompute {
        let before = self.catalog.controller.state().clone();
        let step = intent(&mut self.catalog.controller);
        if *self.catalog.controller.state() != before {
            self.location_changed_at = Some(Instant::now());
            self.catalog.selected = 0;
        }
        self.clamp_catalog_selection();
        step
    }

    /// Restore a filter state without scheduling a write of it.
    pub fn restore_filter(&mut self, state: FilterState) -> Recompute {
        self.last_location = encode_location(&state);
        self.catalog.controller.set_state(state)
    }

    /// The location to persist, once the debounce period has passed and it
    /// differs from the last one written.
    pub fn take_due_location(&mut self) -> Option<String> {
        let changed_at = self.location_changed_at?;
        if changed_at.elapsed() < LOCATION_DEBOUNCE {
            return None;
        }
        self.take_pending_location()
    }

    /// The changed location regardless of the debounce period. Used on exit.
    pub fn take_pending_location(&mut self) -> Option<String> {
        self.location_changed_at.take()?;

        let location = encode_location(self.catalog.controller.state());
        if location == self.last_location {
            return None;
        }
        self.last_location = location.clone();
        Some(location)
    }

    pub fn clamp_catalog_selection(&mut self) {
        let len = self.catalog.controller.visible_page().len();
        self.catalog.selected = self.catalog.selected.min(len.saturating_sub(1));
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn move_selection(&mut self, direction: Direction) {
        let columns = self.grid_columns;
        match self.view {
            View::Catalog => {
                let len = self.catalog.controller.visible_page().len();
                self.catalog.selected = step_grid(self.catalog.selected, len, columns, direction);
            }
            View::Favorites => {
                let len = self.favorites_view.cards().len();
                self.favorites_view.selected =
                    step_grid(self.favorites_view.selected, len, columns, direction);
            }
            View::Detail => {}
        }
    }

    /// Id of the card under the cursor in the current grid view.
    pub fn selected_id(&self) -> Option<i64> {
        match self.view {
            View::Catalog => self.catalog.selected_entry().map(|e| e.id),
            View::Favorites => self
                .favorites_view
                .cards()
                .get(self.favorites_view.selected)
                .map(|c| c.id),
            View::Detail => Some(self.detail.id),
        }
    }

    /// Show the detail view for `id` in the loading state.
    ///
    /// Returns the generation the fetch must be tagged with.
    pub fn begin_detail(&mut self, id: i64) -> u64 {
        if self.view != View::Detail {
            self.detail.return_to = self.view;
        }
        if let Some(handle) = self.detail.handle.take() {
            handle.abort();
        }
        self.view = View::Detail;
        self.detail.id = id;
        self.detail.scroll = 0;
        self.detail.content = LoadState::Loading;
        self.detail.generation = self.detail.generation.wrapping_add(1);
        self.detail.generation
    }

    /// Show the favorites view in the loading state.
    pub fn begin_favorites(&mut self) -> u64 {
        if let Some(handle) = self.favorites_view.handle.take() {
            handle.abort();
        }
        self.view = View::Favorites;
        self.favorites_view.content = LoadState::Loading;
        self.favorites_view.generation = self.favorites_view.generation.wrapping_add(1);
        self.favorites_view.generation
    }

    /// Start a catalog index fetch. Clears both the fetch and processing
    /// errors, as Retry does.
    pub fn begin_catalog_load(&mut self) -> u64 {
        if let Some(handle) = self.catalog.load_handle.take() {
            handle.abort();
        }
        self.catalog.loading = true;
        self.catalog.load_error = None;
        self.catalog.controller.clear_error();
        self.catalog.generation = self.catalog.generation.wrapping_add(1);
        self.catalog.generation
    }

    /// Leave the current view. Returns false when there is nowhere to go.
    pub fn go_back(&mut self) -> bool {
        match self.view {
            View::Detail => {
                if let Some(handle) = self.detail.handle.take() {
                    handle.abort();
                }
                self.view = self.detail.return_to;
                true
            }
            View::Favorites => {
                self.view = View::Catalog;
                true
            }
            View::Catalog => false,
        }
    }

    pub fn scroll_up(&mut self, amount: u16) {
        self.detail.scroll = self.detail.scroll.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: u16) {
        self.detail.scroll = self.detail.scroll.saturating_add(amount).min(MAX_SCROLL);
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired (older than 3 seconds)
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() >= STATUS_TTL {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
impl App {
    /// App on `db` with default config, pointed at the public API.
    pub(crate) async fn for_tests(db: Database) -> Self {
        let gateway = Gateway::new(
            crate::api::build_http_client(crate::api::DEFAULT_TIMEOUT).unwrap(),
            crate::api::DEFAULT_BASE_URL,
            crate::api::DEFAULT_SPRITE_BASE_URL,
        )
        .unwrap();
        let confirmer = Arc::new(crate::favorites::SimulatedConfirmer::default());
        App::new(db, gateway, Config::default(), confirmer)
            .await
            .unwrap()
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let handles = [
            ("catalog load", self.catalog.load_handle.take()),
            ("category lookup", self.catalog.lookup_handle.take()),
            ("detail load", self.detail.handle.take()),
            ("favorites resolve", self.favorites_view.handle.take()),
        ];
        for (name, handle) in handles {
            if let Some(handle) = handle {
                handle.abort();
                tracing::debug!(task = name, "Aborted task on App drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SortOrder;
    use crate::theme::ThemeVariant;
    use tokio::time;

    fn entry(name: &str, id: i64) -> CatalogEntry {
        CatalogEntry::new(name, format!("https://pokeapi.co/api/v2/pokemon/{}/", id))
    }

    async fn test_app() -> App {
        App::for_tests(Database::open(":memory:").await.unwrap()).await
    }

    #[test]
    fn test_step_grid_moves_within_bounds() {
        // 10 cells in rows of 4
        assert_eq!(step_grid(0, 10, 4, Direction::Left), 0);
        assert_eq!(step_grid(0, 10, 4, Direction::Right), 1);
        assert_eq!(step_grid(9, 10, 4, Direction::Right), 9);
        assert_eq!(step_grid(1, 10, 4, Direction::Down), 5);
        assert_eq!(step_grid(7, 10, 4, Direction::Down), 7);
        assert_eq!(step_grid(5, 10, 4, Direction::Up), 1);
        assert_eq!(step_grid(2, 10, 4, Direction::Up), 2);
        assert_eq!(step_grid(3, 0, 4, Direction::Down), 0);
    }

    #[tokio::test]
    async fn test_new_app_starts_loading_with_light_theme() {
        let app = test_app().await;
        assert_eq!(app.view, View::Catalog);
        assert!(app.catalog.shows_placeholder());
        assert_eq!(app.theme_variant, ThemeVariant::Light);
    }

    #[tokio::test]
    async fn test_cycle_theme_persists() {
        let mut app = test_app().await;
        assert_eq!(app.cycle_theme().await.unwrap(), "Dark");
        assert_eq!(app.theme_variant, ThemeVariant::Dark);
        assert_eq!(
            app.db.get_item(crate::storage::THEME_KEY).await.unwrap().as_deref(),
            Some("dark")
        );
    }

    #[tokio::test]
    async fn test_status_expires_after_3_seconds() {
        // Create app before pausing time to avoid DB connection timeout
        let mut app = test_app().await;
        time::pause();
        app.set_status("Test message");

        time::advance(Duration::from_secs(2)).await;
        assert!(!app.clear_expired_status());
        assert!(app.status_message.is_some());

        time::advance(Duration::from_secs(2)).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_location_written_after_quiet_period() {
        let mut app = test_app().await;
        app.catalog.controller.set_index(vec![entry("bulbasaur", 1)]);
        time::pause();

        app.update_filter(|c| c.set_search_term("bul"));
        time::advance(Duration::from_millis(200)).await;
        app.update_filter(|c| c.set_sort_order(SortOrder::Za));
        time::advance(Duration::from_millis(300)).await;
        // Second change restarted the debounce
        assert_eq!(app.take_due_location(), None);

        time::advance(Duration::from_millis(150)).await;
        assert_eq!(app.take_due_location().as_deref(), Some("q=bul&sort=za"));
        assert_eq!(app.take_due_location(), None);
    }

    #[tokio::test]
    async fn test_unchanged_location_not_rewritten() {
        let mut app = test_app().await;
        time::pause();
        app.restore_filter(FilterState::default());
        // Toggle there and back within one debounce window
        app.update_filter(|c| c.set_sort_order(SortOrder::Za));
        app.update_filter(|c| c.set_sort_order(SortOrder::Az));
        time::advance(LOCATION_DEBOUNCE).await;
        assert_eq!(app.take_due_location(), None);
    }

    #[tokio::test]
    async fn test_detail_back_returns_to_origin_view() {
        let mut app = test_app().await;
        app.begin_favorites();
        let first = app.begin_detail(25);
        // Prev/next inside detail keeps the original return view
        let second = app.begin_detail(26);
        assert_ne!(first, second);
        assert_eq!(app.detail.prev_id(), Some(25));

        assert!(app.go_back());
        assert_eq!(app.view, View::Favorites);
        assert!(app.go_back());
        assert_eq!(app.view, View::Catalog);
        assert!(!app.go_back());
    }

    #[tokio::test]
    async fn test_no_previous_before_first_entry() {
        let mut app = test_app().await;
        app.begin_detail(1);
        assert_eq!(app.detail.prev_id(), None);
        assert_eq!(app.detail.next_id(), 2);
    }

    #[tokio::test]
    async fn test_retry_clears_errors() {
        let mut app = test_app().await;
        app.catalog.loading = false;
        app.catalog.load_error = Some(CATALOG_LOAD_FAILED.to_string());
        let before = app.catalog.generation;

        let generation = app.begin_catalog_load();
        assert_ne!(generation, before);
        assert!(app.catalog.error_message().is_none());
        assert!(app.catalog.loading);
    }

    #[tokio::test]
    async fn test_scroll_saturates() {
        let mut app = test_app().await;
        app.scroll_up(3);
        assert_eq!(app.detail.scroll, 0);
        app.detail.scroll = MAX_SCROLL - 1;
        app.scroll_down(5);
        assert_eq!(app.detail.scroll, MAX_SCROLL);
    }
}
