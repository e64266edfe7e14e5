use crate::app::{App, View};
use crate::keybindings::{Action, Context};
use ratatui::{layout::Rect, widgets::Paragraph, Frame};
use std::borrow::Cow;

/// Render the status bar
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    if area.width < 1 || area.height < 1 {
        return;
    }

    let text: Cow<'_, str> = if let Some((msg, _)) = &app.status_message {
        Cow::Borrowed(msg.as_ref())
    } else {
        Cow::Owned(key_hints(app))
    };

    f.render_widget(Paragraph::new(text).style(app.style("status_bar")), area);
}

const SEARCH_HINTS: &[(Action, &str)] = &[(Action::CommitSearch, "keep"), (Action::ExitSearch, "clear")];

const CATALOG_HINTS: &[(Action, &str)] = &[
    (Action::Select, "open"),
    (Action::ToggleFavorite, "fav"),
    (Action::EnterSearch, "search"),
    (Action::CycleCategory, "type"),
    (Action::ToggleSort, "sort"),
    (Action::NextPage, "next"),
    (Action::PrevPage, "prev"),
    (Action::ShowFavorites, "favorites"),
    (Action::ShowHelp, "help"),
    (Action::Quit, "quit"),
];

const DETAIL_HINTS: &[(Action, &str)] = &[
    (Action::Back, "back"),
    (Action::PrevEntry, "prev"),
    (Action::NextEntry, "next"),
    (Action::ToggleFavorite, "fav"),
    (Action::OpenArtwork, "artwork"),
    (Action::ShowHelp, "help"),
    (Action::Quit, "quit"),
];

const FAVORITES_HINTS: &[(Action, &str)] = &[
    (Action::Back, "back"),
    (Action::Select, "open"),
    (Action::ToggleFavorite, "fav"),
    (Action::ShowHelp, "help"),
    (Action::Quit, "quit"),
];

/// Hints for the current view, built from the live bindings so overrides
/// show up.
fn key_hints(app: &App) -> String {
    let (context, actions) = if app.search_mode {
        (Context::Search, SEARCH_HINTS)
    } else {
        match app.view {
            View::Catalog => (Context::Catalog, CATALOG_HINTS),
            View::Detail => (Context::Detail, DETAIL_HINTS),
            View::Favorites => (Context::Favorites, FAVORITES_HINTS),
        }
    };

    actions
        .iter()
        .filter_map(|(action, label)| {
            app.keybindings
                .key_for(*action, context)
                .map(|key| format!("[{}]{}", key, label))
        })
        .collect::<Vec<_>>()
        .join(" ")
}
