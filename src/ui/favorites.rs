//! Favorites view: every stored favorite as a card, in stored order.

use crate::app::{App, LoadState};
use crate::keybindings::{Action, Context};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::grid::{render_cards, render_skeleton, Card};

pub(super) const EMPTY_MESSAGE: &str = "No favorites yet.";

pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);

    let title = Line::from(vec![
        Span::styled("Favorites", app.style("heading")),
        Span::styled(
            format!("  ({} stored)", app.favorites.ids().len()),
            app.style("metadata"),
        ),
    ]);
    f.render_widget(Paragraph::new(title), chunks[0]);

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(app.style("panel_border"));
    let grid_area = block.inner(chunks[1]);
    f.render_widget(block, chunks[1]);

    match &app.favorites_view.content {
        LoadState::Idle | LoadState::Loading => {
            let count = app.favorites.ids().len().max(1);
            render_skeleton(f, app, grid_area, count, app.grid_columns);
        }
        LoadState::Failed(message) => {
            let retry = app
                .keybindings
                .key_for(Action::Retry, Context::Favorites)
                .unwrap_or_else(|| "r".to_string());
            let line = Line::from(vec![
                Span::styled(message.clone(), app.style("error")),
                Span::styled(format!("  [{}] Retry", retry), app.style("metadata")),
            ]);
            f.render_widget(Paragraph::new(line), grid_area);
        }
        LoadState::Loaded(cards) if cards.is_empty() => {
            f.render_widget(
                Paragraph::new(Span::styled(EMPTY_MESSAGE, app.style("notice"))),
                grid_area,
            );
        }
        LoadState::Loaded(cards) => {
            // Unfavorited cards stay until the view is reopened, shown unstarred
            let cards: Vec<Card> = cards
                .iter()
                .map(|c| Card {
                    id: c.id,
                    name: &c.name,
                    favorite: app.favorites.contains(c.id),
                })
                .collect();
            render_cards(
                f,
                app,
                grid_area,
                &cards,
                app.favorites_view.selected,
                app.grid_columns,
            );
        }
    }
}
