//! Input handling for the TUI.
//!
//! Keys are resolved through the keybinding registry for the current view,
//! then dispatched to a per-view handler.

use crate::app::{App, AppEvent, Direction, LoadState, View};
use crate::filter::next_category;
use crate::keybindings::{Action as KbAction, Context as KbContext};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use tokio::sync::mpsc;

use super::helpers::{
    follow_recompute, open_artwork, spawn_catalog_load, spawn_detail_load,
    spawn_favorites_resolve, toggle_favorite,
};
use super::Action;

/// Maximum search term length accepted from the keyboard.
const MAX_SEARCH_LENGTH: usize = 64;

/// Lines scrolled per key press in the detail view.
const SCROLL_STEP: u16 = 1;

fn view_to_context(view: View) -> KbContext {
    match view {
        View::Catalog => KbContext::Catalog,
        View::Detail => KbContext::Detail,
        View::Favorites => KbContext::Favorites,
    }
}

/// Main input dispatch function.
///
/// Routes input to the appropriate handler based on current mode and view.
pub(super) async fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Result<Action> {
    // Shift is already reflected in the character itself
    let modifiers = if matches!(code, KeyCode::Char(_)) {
        modifiers.difference(KeyModifiers::SHIFT)
    } else {
        modifiers
    };

    // Help overlay captures all keys while visible
    if app.show_help {
        return Ok(handle_help_input(app, code));
    }

    if app.search_mode {
        handle_search_input(app, code, modifiers, event_tx);
        return Ok(Action::Continue);
    }

    let action = app
        .keybindings
        .action_for_key(code, modifiers, view_to_context(app.view));
    let Some(action) = action else {
        return Ok(Action::Continue);
    };

    // Actions that behave the same in every view
    match action {
        KbAction::Quit => return Ok(Action::Quit),
        KbAction::ShowHelp => {
            app.show_help = true;
            app.help_scroll_offset = 0;
            return Ok(Action::Continue);
        }
        KbAction::CycleTheme => {
            let name = app.cycle_theme().await?;
            app.set_status(format!("Theme: {}", name));
            return Ok(Action::Continue);
        }
        KbAction::ShowFavorites => {
            if app.view != View::Favorites {
                spawn_favorites_resolve(app, event_tx);
            }
            return Ok(Action::Continue);
        }
        _ => {}
    }

    match app.view {
        View::Catalog => handle_catalog_input(app, action, event_tx).await,
        View::Detail => handle_detail_input(app, action, event_tx).await,
        View::Favorites => handle_favorites_input(app, action, event_tx).await,
    }
    Ok(Action::Continue)
}

/// Handle input while the help overlay is visible.
///
/// Captures all keys: j/k/Up/Down scroll, Esc/q/? dismiss.
fn handle_help_input(app: &mut App, code: KeyCode) -> Action {
    match code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => {
            app.show_help = false;
            app.help_scroll_offset = 0;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.help_scroll_offset = app.help_scroll_offset.saturating_sub(1);
        }
        _ => {}
    }
    Action::Continue
}

fn nav_direction(action: KbAction) -> Option<Direction> {
    match action {
        KbAction::NavUp => Some(Direction::Up),
        KbAction::NavDown => Some(Direction::Down),
        KbAction::NavLeft => Some(Direction::Left),
        KbAction::NavRight => Some(Direction::Right),
        _ => None,
    }
}

/// Handle input in the catalog grid.
async fn handle_catalog_input(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    if let Some(direction) = nav_direction(action) {
        app.move_selection(direction);
        return;
    }

    match action {
        KbAction::Select => open_selected(app, event_tx),
        KbAction::ToggleFavorite => {
            if let Some(id) = app.selected_id().filter(|&id| id > 0) {
                toggle_favorite(app, id, event_tx).await;
            }
        }
        KbAction::EnterSearch => {
            app.search_mode = true;
        }
        KbAction::CycleCategory => {
            let next = next_category(app.catalog.controller.state().category.as_deref());
            let step = app.update_filter(|c| c.set_category(next));
            follow_recompute(app, step, event_tx);
        }
        KbAction::ClearCategory => {
            let step = app.update_filter(|c| c.set_category(None));
            follow_recompute(app, step, event_tx);
        }
        KbAction::ToggleSort => {
            let sort = app.catalog.controller.state().sort_order.toggled();
            let step = app.update_filter(|c| c.set_sort_order(sort));
            follow_recompute(app, step, event_tx);
        }
        KbAction::NextPage | KbAction::PrevPage => {
            if app.catalog.controller.state().is_searching() {
                app.set_status("Paging is off while searching");
                return;
            }
            let step = if action == KbAction::NextPage {
                app.update_filter(|c| c.next_page())
            } else {
                app.update_filter(|c| c.prev_page())
            };
            follow_recompute(app, step, event_tx);
        }
        KbAction::Retry => {
            if app.catalog.error_message().is_some() {
                spawn_catalog_load(app, event_tx);
            }
        }
        _ => {}
    }
}

fn open_selected(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    match app.selected_id() {
        Some(id) if id > 0 => spawn_detail_load(app, id, event_tx),
        Some(_) => app.set_status("This entry has no id"),
        None => {}
    }
}

/// Handle input while the search line has focus.
///
/// Every edit recomputes the page. Esc clears the term, Enter keeps it.
fn handle_search_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    let mut term = app.catalog.controller.state().search_term.clone();
    match app
        .keybindings
        .action_for_key(code, modifiers, KbContext::Search)
    {
        Some(KbAction::ExitSearch) => {
            app.search_mode = false;
            term.clear();
        }
        Some(KbAction::CommitSearch) => {
            app.search_mode = false;
            return;
        }
        _ => match code {
            KeyCode::Backspace => {
                term.pop();
            }
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => {
                if term.chars().count() >= MAX_SEARCH_LENGTH {
                    app.set_status(format!(
                        "Search term at max length ({} chars)",
                        MAX_SEARCH_LENGTH
                    ));
                    return;
                }
                term.push(c);
            }
            _ => return,
        },
    }

    let step = app.update_filter(|c| c.set_search_term(term));
    follow_recompute(app, step, event_tx);
}

/// Handle input in the detail view.
async fn handle_detail_input(app: &mut App, action: KbAction, event_tx: &mpsc::Sender<AppEvent>) {
    match action {
        KbAction::Back => {
            app.go_back();
            if app.view == View::Favorites {
                // Favorites may have changed while the detail was open
                spawn_favorites_resolve(app, event_tx);
            }
        }
        KbAction::ScrollDown => app.scroll_down(SCROLL_STEP),
        KbAction::ScrollUp => app.scroll_up(SCROLL_STEP),
        KbAction::PrevEntry => {
            if let Some(id) = app.detail.prev_id() {
                spawn_detail_load(app, id, event_tx);
            }
        }
        KbAction::NextEntry => {
            let id = app.detail.next_id();
            spawn_detail_load(app, id, event_tx);
        }
        KbAction::ToggleFavorite => {
            if let Some(id) = app.detail.record().map(|r| r.id) {
                toggle_favorite(app, id, event_tx).await;
            }
        }
        KbAction::Retry => {
            if matches!(app.detail.content, LoadState::Failed(_)) {
                let id = app.detail.id;
                spawn_detail_load(app, id, event_tx);
            }
        }
        KbAction::OpenArtwork => open_artwork(app),
        _ => {}
    }
}

/// Handle input in the favorites grid.
async fn handle_favorites_input(
    app: &mut App,
    action: KbAction,
    event_tx: &mpsc::Sender<AppEvent>,
) {
    if let Some(direction) = nav_direction(action) {
        app.move_selection(direction);
        return;
    }

    match action {
        KbAction::Back => {
            app.go_back();
        }
        KbAction::Select => open_selected(app, event_tx),
        KbAction::ToggleFavorite => {
            if let Some(id) = app.selected_id() {
                toggle_favorite(app, id, event_tx).await;
            }
        }
        KbAction::Retry => {
            if matches!(app.favorites_view.content, LoadState::Failed(_)) {
                spawn_favorites_resolve(app, event_tx);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CatalogEntry;
    use crate::filter::SortOrder;
    use crate::storage::Database;
    use crate::theme::ThemeVariant;

    fn entry(name: &str, id: i64) -> CatalogEntry {
        CatalogEntry::new(name, format!("https://pokeapi.co/api/v2/pokemon/{}/", id))
    }

    async fn loaded_app() -> (App, mpsc::Sender<AppEvent>, mpsc::Receiver<AppEvent>) {
        let mut app = App::for_tests(Database::open(":memory:").await.unwrap()).await;
        app.catalog.loading = false;
        app.catalog.controller.set_index(vec![
            entry("bulbasaur", 1),
            entry("charmander", 4),
            entry("squirtle", 7),
        ]);
        let (tx, rx) = mpsc::channel(16);
        (app, tx, rx)
    }

    async fn press(app: &mut App, tx: &mpsc::Sender<AppEvent>, code: KeyCode) -> Action {
        handle_input(app, code, KeyModifiers::NONE, tx).await.unwrap()
    }

    async fn type_str(app: &mut App, tx: &mpsc::Sender<AppEvent>, s: &str) {
        for c in s.chars() {
            press(app, tx, KeyCode::Char(c)).await;
        }
    }

    fn visible_names(app: &App) -> Vec<String> {
        app.catalog
            .controller
            .visible_page()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_quit_key() {
        let (mut app, tx, _rx) = loaded_app().await;
        assert!(matches!(press(&mut app, &tx, KeyCode::Char('q')).await, Action::Quit));
    }

    #[tokio::test]
    async fn test_search_typing_filters_live_and_q_does_not_quit() {
        let (mut app, tx, _rx) = loaded_app().await;
        press(&mut app, &tx, KeyCode::Char('/')).await;
        assert!(app.search_mode);

        type_str(&mut app, &tx, "squ").await;
        assert_eq!(visible_names(&app), ["squirtle"]);

        // 'q' is text while searching
        assert!(matches!(press(&mut app, &tx, KeyCode::Char('q')).await, Action::Continue));
        assert_eq!(app.catalog.controller.state().search_term, "squq");

        press(&mut app, &tx, KeyCode::Backspace).await;
        assert_eq!(app.catalog.controller.state().search_term, "squ");
    }

    #[tokio::test]
    async fn test_search_enter_keeps_and_esc_clears() {
        let (mut app, tx, _rx) = loaded_app().await;
        press(&mut app, &tx, KeyCode::Char('/')).await;
        type_str(&mut app, &tx, "char").await;
        press(&mut app, &tx, KeyCode::Enter).await;
        assert!(!app.search_mode);
        assert_eq!(visible_names(&app), ["charmander"]);

        press(&mut app, &tx, KeyCode::Char('/')).await;
        press(&mut app, &tx, KeyCode::Esc).await;
        assert!(!app.search_mode);
        assert_eq!(visible_names(&app).len(), 3);
    }

    #[tokio::test]
    async fn test_sort_toggle() {
        let (mut app, tx, _rx) = loaded_app().await;
        press(&mut app, &tx, KeyCode::Char('z')).await;
        assert_eq!(app.catalog.controller.state().sort_order, SortOrder::Za);
        assert_eq!(visible_names(&app)[0], "squirtle");
    }

    #[tokio::test]
    async fn test_paging_blocked_while_searching() {
        let (mut app, tx, _rx) = loaded_app().await;
        press(&mut app, &tx, KeyCode::Char('/')).await;
        type_str(&mut app, &tx, "a").await;
        press(&mut app, &tx, KeyCode::Enter).await;

        press(&mut app, &tx, KeyCode::Char('n')).await;
        assert_eq!(app.catalog.controller.state().page_offset, 0);
        assert!(app.status_message.is_some());
    }

    #[tokio::test]
    async fn test_shifted_theme_key_cycles_theme() {
        let (mut app, tx, _rx) = loaded_app().await;
        handle_input(&mut app, KeyCode::Char('T'), KeyModifiers::SHIFT, &tx)
            .await
            .unwrap();
        assert_eq!(app.theme_variant, ThemeVariant::Dark);
    }

    #[tokio::test]
    async fn test_toggle_favorite_on_selected_card() {
        let (mut app, tx, _rx) = loaded_app().await;
        press(&mut app, &tx, KeyCode::Char('l')).await;
        press(&mut app, &tx, KeyCode::Char('s')).await;
        assert_eq!(app.favorites.ids(), &[4]);

        press(&mut app, &tx, KeyCode::Char('s')).await;
        assert!(app.favorites.ids().is_empty());
    }

    #[tokio::test]
    async fn test_help_overlay_captures_keys() {
        let (mut app, tx, _rx) = loaded_app().await;
        press(&mut app, &tx, KeyCode::Char('?')).await;
        assert!(app.show_help);
        // 'q' closes help instead of quitting
        assert!(matches!(press(&mut app, &tx, KeyCode::Char('q')).await, Action::Continue));
        assert!(!app.show_help);
    }
}
