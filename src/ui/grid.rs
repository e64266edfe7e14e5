//! Card grid shared by the catalog and favorites views.
//!
//! Cards are laid out row-major, one line each. Skeleton cards stand in for
//! a page that is still loading.

use crate::app::App;
use crate::util::{display_name, display_width, strip_control_chars, truncate_to_width};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Columns taken by one card, including the gap after it.
const CARD_WIDTH: u16 = 24;
const MAX_COLUMNS: usize = 6;

pub(super) const FAVORITE_MARK: &str = "★";
pub(super) const NOT_FAVORITE_MARK: &str = "☆";

/// What one cell shows.
pub(super) struct Card<'a> {
    pub id: i64,
    pub name: &'a str,
    pub favorite: bool,
}

/// Number of grid columns that fit in `width`.
pub(super) fn columns_for_width(width: u16) -> usize {
    usize::from(width / CARD_WIDTH).clamp(1, MAX_COLUMNS)
}

/// First row to draw so that `selected_row` stays on screen.
fn first_visible_row(selected_row: usize, visible_rows: usize) -> usize {
    selected_row.saturating_sub(visible_rows.saturating_sub(1))
}

fn card_line<'a>(app: &App, card: &Card<'_>, selected: bool) -> Line<'a> {
    let cell = usize::from(CARD_WIDTH - 1);
    let (mark, mark_style) = if card.favorite {
        (FAVORITE_MARK, app.style("favorite_star"))
    } else {
        (NOT_FAVORITE_MARK, app.style("card_id"))
    };
    let id = if card.id > 0 {
        format!("#{:03}", card.id)
    } else {
        "#???".to_string()
    };
    let name = display_name(&strip_control_chars(card.name));

    // mark, space, id, space
    let used = display_width(mark) + 1 + display_width(&id) + 1;
    let name = truncate_to_width(&name, cell.saturating_sub(used)).into_owned();
    let pad = cell.saturating_sub(used + display_width(&name)) + 1;

    let base = if selected {
        app.style("card_selected")
    } else {
        app.style("card_normal")
    };
    Line::from(vec![
        Span::styled(mark, if selected { base } else { mark_style }),
        Span::styled(" ", base),
        Span::styled(id, if selected { base } else { app.style("card_id") }),
        Span::styled(" ", base),
        Span::styled(name, base),
        Span::styled(" ".repeat(pad), Style::default()),
    ])
}

/// Draw `cards` into `area` with `selected` highlighted.
pub(super) fn render_cards(
    f: &mut Frame,
    app: &App,
    area: Rect,
    cards: &[Card<'_>],
    selected: usize,
    columns: usize,
) {
    let columns = columns.max(1);
    let visible_rows = usize::from(area.height);
    if visible_rows == 0 {
        return;
    }
    let first_row = first_visible_row(selected / columns, visible_rows);

    let lines: Vec<Line> = cards
        .chunks(columns)
        .skip(first_row)
        .take(visible_rows)
        .enumerate()
        .map(|(row_offset, row)| {
            let row_index = first_row + row_offset;
            let spans: Vec<Span> = row
                .iter()
                .enumerate()
                .flat_map(|(col, card)| {
                    let index = row_index * columns + col;
                    card_line(app, card, index == selected).spans
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    f.render_widget(Paragraph::new(lines), area);
}

/// Draw `count` placeholder cards.
pub(super) fn render_skeleton(f: &mut Frame, app: &App, area: Rect, count: usize, columns: usize) {
    let columns = columns.max(1);
    let bar = "░".repeat(usize::from(CARD_WIDTH - 2));
    let cell = format!("{} ", bar);
    let rows = count.div_ceil(columns).min(usize::from(area.height));

    let lines: Vec<Line> = (0..rows)
        .map(|row| {
            let in_row = (count - row * columns).min(columns);
            Line::from(Span::styled(cell.repeat(in_row), app.style("placeholder")))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_clamped() {
        assert_eq!(columns_for_width(10), 1);
        assert_eq!(columns_for_width(60), 2);
        assert_eq!(columns_for_width(100), 4);
        assert_eq!(columns_for_width(400), MAX_COLUMNS);
    }

    #[test]
    fn selected_row_stays_visible() {
        assert_eq!(first_visible_row(0, 5), 0);
        assert_eq!(first_visible_row(4, 5), 0);
        assert_eq!(first_visible_row(7, 5), 3);
        assert_eq!(first_visible_row(3, 0), 3);
    }
}
