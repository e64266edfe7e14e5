//! Render functions for the TUI.
//!
//! This module handles all rendering logic, dispatching to the appropriate
//! view based on application state.

use crate::app::{App, View};
use crate::theme::ThemeVariant;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::grid::columns_for_width;
use super::{catalog, detail, favorites, help, status};

/// Minimum terminal dimensions required for normal operation.
pub(super) const MIN_WIDTH: u16 = 60;
pub(super) const MIN_HEIGHT: u16 = 10;

/// Main render dispatch function.
///
/// Routes to the appropriate view renderer based on current application state.
/// Handles terminal size validation before rendering.
pub(super) fn render(f: &mut Frame, app: &mut App) {
    let area = f.area();

    // Guard against zero-width/height to prevent panics
    if area.width < 1 || area.height < 1 {
        return;
    }

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = if area.height < 3 || area.width < 20 {
            Paragraph::new("Too small")
        } else {
            Paragraph::new(format!(
                "Terminal too small\n\nMinimum: {}x{}\nCurrent: {}x{}",
                MIN_WIDTH, MIN_HEIGHT, area.width, area.height
            ))
            .alignment(Alignment::Center)
        };
        f.render_widget(msg, area);
        return;
    }

    // Grid navigation moves by the column count last drawn
    app.grid_columns = columns_for_width(area.width);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    match app.view {
        View::Catalog => catalog::render(f, app, chunks[1]),
        View::Detail => detail::render(f, app, chunks[1]),
        View::Favorites => favorites::render(f, app, chunks[1]),
    }
    status::render(f, app, chunks[2]);

    if app.show_help {
        help::render(f, app);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let theme = match app.theme_variant {
        ThemeVariant::Light => "☀ light",
        ThemeVariant::Dark => "☾ dark",
    };
    let view = match app.view {
        View::Catalog => "Catalog",
        View::Detail => "Detail",
        View::Favorites => "Favorites",
    };
    let line = Line::from(vec![
        Span::styled("dexview", app.style("heading")),
        Span::styled(format!("  {}", view), app.style("body")),
        Span::styled(
            format!("  ★ {}  {}", app.favorites.ids().len(), theme),
            app.style("metadata"),
        ),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
