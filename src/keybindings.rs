//! Keybinding registry: maps actions to key events with config overrides.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// All user-facing actions that can be triggered by keybindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavUp,
    NavDown,
    NavLeft,
    NavRight,
    Select,
    Back,
    ToggleFavorite,
    EnterSearch,
    ExitSearch,
    CommitSearch,
    CycleCategory,
    ClearCategory,
    ToggleSort,
    NextPage,
    PrevPage,
    ShowFavorites,
    Retry,
    CycleTheme,
    ShowHelp,
    OpenArtwork,
    PrevEntry,
    NextEntry,
    ScrollUp,
    ScrollDown,
}

impl Action {
    /// Human-readable description for the help screen.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit application",
            Self::NavUp => "Move up",
            Self::NavDown => "Move down",
            Self::NavLeft => "Move left",
            Self::NavRight => "Move right",
            Self::Select => "Open details",
            Self::Back => "Go back / dismiss",
            Self::ToggleFavorite => "Toggle favorite",
            Self::EnterSearch => "Search by name",
            Self::ExitSearch => "Clear search",
            Self::CommitSearch => "Keep search and return to grid",
            Self::CycleCategory => "Cycle type filter",
            Self::ClearCategory => "Show all types",
            Self::ToggleSort => "Toggle A→Z / Z→A",
            Self::NextPage => "Next page",
            Self::PrevPage => "Previous page",
            Self::ShowFavorites => "Show favorites",
            Self::Retry => "Retry after an error",
            Self::CycleTheme => "Toggle light/dark theme",
            Self::ShowHelp => "Show help",
            Self::OpenArtwork => "Open artwork in browser",
            Self::PrevEntry => "Previous entry",
            Self::NextEntry => "Next entry",
            Self::ScrollUp => "Scroll up one line",
            Self::ScrollDown => "Scroll down one line",
        }
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Dispatch context: determines which bindings are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Catalog,
    Detail,
    Favorites,
    Search,
}

// ============================================================================
// Key Specification
// ============================================================================

/// A key event: code + modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    const fn ch(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }
}

/// Parse a key string from config into a KeySpec.
///
/// Supported formats:
/// - Single char: "q", "j", "/"
/// - Named keys: "Enter", "Esc", "Tab", "Up", "Down", "Left", "Right",
///   "Backspace", "PageUp", "PageDown", "Space"
/// - Ctrl combos: "Ctrl+d"
/// - Function keys: "F1" through "F12"
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s.strip_prefix("Ctrl+") {
        let mut chars = rest.trim().chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Some(KeySpec::ctrl(c)),
            _ => None,
        };
    }

    let named = match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "backspace" => Some(KeyCode::Backspace),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = s
        .strip_prefix(['F', 'f'])
        .and_then(|rest| rest.parse::<u8>().ok())
    {
        return (1..=12)
            .contains(&n)
            .then_some(KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeySpec::ch(c)),
        _ => None,
    }
}

/// Format a KeySpec as a human-readable string for the help screen.
fn format_key(key: &KeySpec) -> String {
    let modifier = if key.modifiers.contains(KeyModifiers::CONTROL) {
        "Ctrl+"
    } else {
        ""
    };

    let key_name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        _ => "?".to_string(),
    };

    format!("{}{}", modifier, key_name)
}

// ============================================================================
// Default Bindings
// ============================================================================

const DEFAULT_BINDINGS: &[(Context, KeySpec, Action)] = &[
    // Global
    (Context::Global, KeySpec::ch('q'), Action::Quit),
    (Context::Global, KeySpec::ch('k'), Action::NavUp),
    (Context::Global, KeySpec::plain(KeyCode::Up), Action::NavUp),
    (Context::Global, KeySpec::ch('j'), Action::NavDown),
    (Context::Global, KeySpec::plain(KeyCode::Down), Action::NavDown),
    (Context::Global, KeySpec::ch('h'), Action::NavLeft),
    (Context::Global, KeySpec::plain(KeyCode::Left), Action::NavLeft),
    (Context::Global, KeySpec::ch('l'), Action::NavRight),
    (Context::Global, KeySpec::plain(KeyCode::Right), Action::NavRight),
    (Context::Global, KeySpec::plain(KeyCode::Enter), Action::Select),
    (Context::Global, KeySpec::plain(KeyCode::Esc), Action::Back),
    (Context::Global, KeySpec::ch('s'), Action::ToggleFavorite),
    (Context::Global, KeySpec::ch('f'), Action::ShowFavorites),
    (Context::Global, KeySpec::ch('r'), Action::Retry),
    (Context::Global, KeySpec::ch('T'), Action::CycleTheme),
    (Context::Global, KeySpec::ch('?'), Action::ShowHelp),
    // Catalog grid
    (Context::Catalog, KeySpec::ch('/'), Action::EnterSearch),
    (Context::Catalog, KeySpec::ch('t'), Action::CycleCategory),
    (Context::Catalog, KeySpec::ch('c'), Action::ClearCategory),
    (Context::Catalog, KeySpec::ch('z'), Action::ToggleSort),
    (Context::Catalog, KeySpec::ch('n'), Action::NextPage),
    (Context::Catalog, KeySpec::plain(KeyCode::PageDown), Action::NextPage),
    (Context::Catalog, KeySpec::ch('p'), Action::PrevPage),
    (Context::Catalog, KeySpec::plain(KeyCode::PageUp), Action::PrevPage),
    // Detail panel
    (Context::Detail, KeySpec::ch('b'), Action::Back),
    (Context::Detail, KeySpec::ch('j'), Action::ScrollDown),
    (Context::Detail, KeySpec::plain(KeyCode::Down), Action::ScrollDown),
    (Context::Detail, KeySpec::ch('k'), Action::ScrollUp),
    (Context::Detail, KeySpec::plain(KeyCode::Up), Action::ScrollUp),
    (Context::Detail, KeySpec::ch('h'), Action::PrevEntry),
    (Context::Detail, KeySpec::plain(KeyCode::Left), Action::PrevEntry),
    (Context::Detail, KeySpec::ch('l'), Action::NextEntry),
    (Context::Detail, KeySpec::plain(KeyCode::Right), Action::NextEntry),
    (Context::Detail, KeySpec::ch('o'), Action::OpenArtwork),
    // Favorites grid
    (Context::Favorites, KeySpec::ch('b'), Action::Back),
    // Search input
    (Context::Search, KeySpec::plain(KeyCode::Esc), Action::ExitSearch),
    (Context::Search, KeySpec::plain(KeyCode::Enter), Action::CommitSearch),
];

// ============================================================================
// Keybinding Registry
// ============================================================================

/// Registry of keybindings, supporting default bindings and config overrides.
///
/// The same key can map to different actions in different contexts; lookups
/// fall back to `Global`.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// All bindings, in registration order, for the help screen
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        for &(context, key, action) in DEFAULT_BINDINGS {
            registry.bind(context, key, action);
        }
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    /// Apply user overrides from the config `[keybindings]` table.
    ///
    /// Keys are action names (e.g. "quit", "toggle_favorite"), values are key
    /// strings (e.g. "q", "Ctrl+d", "F5"). An override replaces every default
    /// key of that action, in every context the action was bound in.
    ///
    /// Returns warnings for unknown action names or unparseable keys.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        for (action_name, key_str) in overrides {
            let Some(action) = parse_action_name(action_name) else {
                warnings.push(format!("Unknown action '{}', ignoring", action_name));
                continue;
            };

            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{}' for action '{}', ignoring",
                    key_str, action_name
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);

            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    /// Look up the action for a key, trying `context` first, then `Global`.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::new(code, modifiers);

        if let Some(&action) = self.lookup.get(&(context, key)) {
            return Some(action);
        }

        if context != Context::Global {
            return self.lookup.get(&(Context::Global, key)).copied();
        }

        None
    }

    /// First key bound to `action` in `context` (or Global), for hints.
    pub fn key_for(&self, action: Action, context: Context) -> Option<String> {
        self.bindings
            .iter()
            .find(|(c, _, a)| *a == action && (*c == context || *c == Context::Global))
            .map(|(_, key, _)| format_key(key))
    }

    /// All bindings as (context, key display, action, description) tuples.
    pub fn all_bindings(&self) -> Vec<(Context, String, Action, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), *action, action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an action name from config.
fn parse_action_name(name: &str) -> Option<Action> {
    match name.to_lowercase().as_str() {
        "quit" => Some(Action::Quit),
        "nav_up" | "up" => Some(Action::NavUp),
        "nav_down" | "down" => Some(Action::NavDown),
        "nav_left" | "left" => Some(Action::NavLeft),
        "nav_right" | "right" => Some(Action::NavRight),
        "select" | "open" => Some(Action::Select),
        "back" => Some(Action::Back),
        "toggle_favorite" | "favorite" => Some(Action::ToggleFavorite),
        "enter_search" | "search" => Some(Action::EnterSearch),
        "exit_search" => Some(Action::ExitSearch),
        "commit_search" => Some(Action::CommitSearch),
        "cycle_category" | "cycle_type" | "type" => Some(Action::CycleCategory),
        "clear_category" | "clear_type" => Some(Action::ClearCategory),
        "toggle_sort" | "sort" => Some(Action::ToggleSort),
        "next_page" => Some(Action::NextPage),
        "prev_page" | "previous_page" => Some(Action::PrevPage),
        "show_favorites" | "favorites" => Some(Action::ShowFavorites),
        "retry" => Some(Action::Retry),
        "cycle_theme" | "theme" => Some(Action::CycleTheme),
        "show_help" | "help" => Some(Action::ShowHelp),
        "open_artwork" | "artwork" => Some(Action::OpenArtwork),
        "prev_entry" => Some(Action::PrevEntry),
        "next_entry" => Some(Action::NextEntry),
        "scroll_up" => Some(Action::ScrollUp),
        "scroll_down" => Some(Action::ScrollDown),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(reg: &KeybindingRegistry, code: KeyCode, ctx: Context) -> Option<Action> {
        reg.action_for_key(code, KeyModifiers::NONE, ctx)
    }

    #[test]
    fn test_default_global_keys() {
        let reg = KeybindingRegistry::new();
        assert_eq!(key(&reg, KeyCode::Char('q'), Context::Global), Some(Action::Quit));
        assert_eq!(key(&reg, KeyCode::Char('s'), Context::Global), Some(Action::ToggleFavorite));
        assert_eq!(key(&reg, KeyCode::Char('T'), Context::Global), Some(Action::CycleTheme));
    }

    #[test]
    fn test_catalog_keys_fall_back_to_global() {
        let reg = KeybindingRegistry::new();
        assert_eq!(key(&reg, KeyCode::Char('t'), Context::Catalog), Some(Action::CycleCategory));
        assert_eq!(key(&reg, KeyCode::Char('j'), Context::Catalog), Some(Action::NavDown));
        assert_eq!(key(&reg, KeyCode::Char('l'), Context::Catalog), Some(Action::NavRight));
    }

    #[test]
    fn test_detail_context_overrides_global() {
        let reg = KeybindingRegistry::new();
        assert_eq!(key(&reg, KeyCode::Char('j'), Context::Detail), Some(Action::ScrollDown));
        assert_eq!(key(&reg, KeyCode::Right, Context::Detail), Some(Action::NextEntry));
        assert_eq!(key(&reg, KeyCode::Char('o'), Context::Detail), Some(Action::OpenArtwork));
    }

    #[test]
    fn test_paging_only_in_catalog() {
        let reg = KeybindingRegistry::new();
        assert_eq!(key(&reg, KeyCode::Char('n'), Context::Catalog), Some(Action::NextPage));
        assert_eq!(key(&reg, KeyCode::Char('n'), Context::Favorites), None);
    }

    #[test]
    fn test_search_context() {
        let reg = KeybindingRegistry::new();
        assert_eq!(key(&reg, KeyCode::Esc, Context::Search), Some(Action::ExitSearch));
        assert_eq!(key(&reg, KeyCode::Enter, Context::Search), Some(Action::CommitSearch));
    }

    #[test]
    fn test_apply_overrides_valid() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([("quit".to_string(), "Ctrl+q".to_string())]);

        assert!(reg.apply_overrides(&overrides).is_empty());
        assert_eq!(key(&reg, KeyCode::Char('q'), Context::Global), None);
        assert_eq!(
            reg.action_for_key(KeyCode::Char('q'), KeyModifiers::CONTROL, Context::Global),
            Some(Action::Quit)
        );
    }

    #[test]
    fn test_override_preserves_contexts() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([("back".to_string(), "Backspace".to_string())]);
        assert!(reg.apply_overrides(&overrides).is_empty());

        assert_eq!(key(&reg, KeyCode::Backspace, Context::Global), Some(Action::Back));
        assert_eq!(key(&reg, KeyCode::Backspace, Context::Detail), Some(Action::Back));
        assert_eq!(key(&reg, KeyCode::Char('b'), Context::Detail), None);
    }

    #[test]
    fn test_apply_overrides_warnings() {
        let mut reg = KeybindingRegistry::new();
        let overrides = HashMap::from([
            ("nonexistent_action".to_string(), "q".to_string()),
            ("quit".to_string(), "Ctrl+Alt+Q".to_string()),
        ]);

        let warnings = reg.apply_overrides(&overrides);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.contains("Unknown action")));
        assert!(warnings.iter().any(|w| w.contains("Cannot parse key")));
    }

    #[test]
    fn test_parse_key_string() {
        assert_eq!(parse_key_string("Enter"), Some(KeySpec::plain(KeyCode::Enter)));
        assert_eq!(parse_key_string("pagedown"), Some(KeySpec::plain(KeyCode::PageDown)));
        assert_eq!(parse_key_string("space"), Some(KeySpec::ch(' ')));
        assert_eq!(parse_key_string("F12"), Some(KeySpec::plain(KeyCode::F(12))));
        assert_eq!(parse_key_string("F13"), None);
        assert_eq!(parse_key_string("f"), Some(KeySpec::ch('f')));
        assert_eq!(parse_key_string("Ctrl+d"), Some(KeySpec::ctrl('d')));
        assert_eq!(parse_key_string("é"), Some(KeySpec::ch('é')));
        assert_eq!(parse_key_string("qq"), None);
    }

    #[test]
    fn test_format_key_display() {
        assert_eq!(format_key(&KeySpec::ch('q')), "q");
        assert_eq!(format_key(&KeySpec::ctrl('d')), "Ctrl+d");
        assert_eq!(format_key(&KeySpec::ch(' ')), "Space");
        assert_eq!(format_key(&KeySpec::plain(KeyCode::F(5))), "F5");
    }

    #[test]
    fn test_key_for_hint() {
        let reg = KeybindingRegistry::new();
        assert_eq!(reg.key_for(Action::NextPage, Context::Catalog).as_deref(), Some("n"));
        assert_eq!(reg.key_for(Action::Quit, Context::Detail).as_deref(), Some("q"));
        assert_eq!(reg.key_for(Action::NextPage, Context::Detail), None);
    }

    #[test]
    fn test_all_bindings_cover_every_context() {
        let reg = KeybindingRegistry::new();
        let bindings = reg.all_bindings();
        for ctx in [
            Context::Global,
            Context::Catalog,
            Context::Detail,
            Context::Favorites,
            Context::Search,
        ] {
            assert!(bindings.iter().any(|(c, _, _, _)| *c == ctx));
        }
    }
}
