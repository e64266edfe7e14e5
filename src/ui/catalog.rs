//! Catalog view: search line, filter indicators, card grid and pager.

use crate::app::App;
use crate::filter::PAGE_SIZE;
use crate::keybindings::{Action, Context};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::grid::{render_cards, render_skeleton, Card};

pub(super) const EMPTY_MESSAGE: &str = "No Pokémon found.";

pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // search + filters
            Constraint::Length(1), // error line
            Constraint::Min(1),    // grid
            Constraint::Length(1), // pager
        ])
        .split(area);

    render_controls(f, app, chunks[0]);

    if let Some(message) = app.catalog.error_message() {
        let retry = app
            .keybindings
            .key_for(Action::Retry, Context::Catalog)
            .unwrap_or_else(|| "r".to_string());
        let line = Line::from(vec![
            Span::styled(message, app.style("error")),
            Span::styled(format!("  [{}] Retry", retry), app.style("metadata")),
        ]);
        f.render_widget(Paragraph::new(line), chunks[1]);
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(app.style("panel_border"));
    let grid_area = block.inner(chunks[2]);
    f.render_widget(block, chunks[2]);

    if app.catalog.shows_placeholder() {
        render_skeleton(f, app, grid_area, PAGE_SIZE, app.grid_columns);
    } else if app.catalog.controller.visible_page().is_empty() {
        // A failed index fetch has nothing to show but the error
        if app.catalog.load_error.is_none() {
            f.render_widget(
                Paragraph::new(Span::styled(EMPTY_MESSAGE, app.style("notice"))),
                grid_area,
            );
        }
    } else {
        let cards: Vec<Card> = app
            .catalog
            .controller
            .visible_page()
            .iter()
            .map(|entry| Card {
                id: entry.id,
                name: &entry.name,
                favorite: app.favorites.contains(entry.id),
            })
            .collect();
        render_cards(
            f,
            app,
            grid_area,
            &cards,
            app.catalog.selected,
            app.grid_columns,
        );
    }

    render_pager(f, app, chunks[3]);
}

fn render_controls(f: &mut Frame, app: &App, area: Rect) {
    let state = app.catalog.controller.state();

    let search_style = if app.search_mode {
        app.style("search_input")
    } else {
        app.style("body")
    };
    let cursor = if app.search_mode { "▏" } else { "" };
    let search = if state.search_term.is_empty() && !app.search_mode {
        Span::styled("Search by name…", app.style("placeholder"))
    } else {
        Span::styled(format!("{}{}", state.search_term, cursor), search_style)
    };

    let category = state.category.as_deref().unwrap_or("All types");
    let line = Line::from(vec![
        Span::styled("/ ", app.style("metadata")),
        search,
        Span::raw("   "),
        Span::styled(format!("Type: {}", category), app.style("filter_indicator")),
        Span::raw("   "),
        Span::styled(
            format!("Sort: {}", state.sort_order.label()),
            app.style("filter_indicator"),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

/// Page position and paging hints; a match count while searching.
fn render_pager(f: &mut Frame, app: &App, area: Rect) {
    let state = app.catalog.controller.state();
    let shown = app.catalog.controller.visible_page().len();

    let text = if state.is_searching() {
        format!("{} matching", shown)
    } else {
        let page = state.page_offset / PAGE_SIZE + 1;
        let prev = if state.page_offset > 0 { "◀ prev  " } else { "" };
        format!("{}Page {}  next ▶", prev, page)
    };
    f.render_widget(
        Paragraph::new(Span::styled(text, app.style("metadata"))),
        area,
    );
}
