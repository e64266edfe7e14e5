//! Detail view for one entry.

use crate::api::DetailRecord;
use crate::app::{App, LoadState};
use crate::keybindings::{Action, Context};
use crate::util::{display_name, strip_control_chars};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::grid::{FAVORITE_MARK, NOT_FAVORITE_MARK};

/// Highest base stat drawn at full bar width.
const STAT_SCALE: u32 = 255;
const STAT_BAR_WIDTH: u32 = 20;

pub(super) fn render(f: &mut Frame, app: &App, area: Rect) {
    let title = match app.detail.prev_id() {
        Some(prev) => format!(" #{} ◀ {} │ {} ▶ ", app.detail.id, prev, app.detail.next_id()),
        None => format!(" #{} │ {} ▶ ", app.detail.id, app.detail.next_id()),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("panel_border_focused"))
        .title(title);

    let lines = match &app.detail.content {
        LoadState::Idle | LoadState::Loading => skeleton_lines(app),
        LoadState::Failed(message) => {
            let retry = app
                .keybindings
                .key_for(Action::Retry, Context::Detail)
                .unwrap_or_else(|| "r".to_string());
            vec![
                Line::from(Span::styled(message.clone(), app.style("error"))),
                Line::from(""),
                Line::from(Span::styled(format!("[{}] Retry", retry), app.style("metadata"))),
            ]
        }
        LoadState::Loaded(record) => record_lines(app, record),
    };

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.detail.scroll, 0));
    f.render_widget(paragraph, area);
}

fn skeleton_lines(app: &App) -> Vec<Line<'static>> {
    let style = app.style("placeholder");
    [14, 0, 30, 24, 20, 18]
        .into_iter()
        .map(|width| Line::from(Span::styled("░".repeat(width), style)))
        .collect()
}

fn heading(app: &App, text: &'static str) -> Line<'static> {
    Line::from(Span::styled(text, app.style("heading")))
}

fn field(app: &App, label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(label, app.style("label")),
        Span::styled(value, app.style("body")),
    ])
}

/// Bulleted list of API names, or a dash when empty.
fn name_list<'a>(app: &App, names: impl Iterator<Item = &'a str>, style: Style) -> Vec<Line<'static>> {
    let lines: Vec<Line<'static>> = names
        .map(|n| Line::from(Span::styled(format!("  • {}", display_name(&strip_control_chars(n))), style)))
        .collect();
    if lines.is_empty() {
        vec![Line::from(Span::styled("  -", app.style("metadata")))]
    } else {
        lines
    }
}

fn stat_bar(value: u32) -> String {
    let filled = value.min(STAT_SCALE) * STAT_BAR_WIDTH / STAT_SCALE;
    let filled = filled as usize;
    format!("{}{}", "█".repeat(filled), "·".repeat(STAT_BAR_WIDTH as usize - filled))
}

fn record_lines(app: &App, record: &DetailRecord) -> Vec<Line<'static>> {
    let favorite = app.favorites.contains(record.id);
    let (mark, mark_style) = if favorite {
        (FAVORITE_MARK, app.style("favorite_star"))
    } else {
        (NOT_FAVORITE_MARK, app.style("metadata"))
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                display_name(&strip_control_chars(&record.name)),
                app.style("heading"),
            ),
            Span::raw("  "),
            Span::styled(mark, mark_style),
        ]),
        field(
            app,
            "Artwork: ",
            record
                .artwork_url()
                .map(|u| strip_control_chars(u).into_owned())
                .unwrap_or_else(|| "-".to_string()),
        ),
        field(app, "Sprite: ", app.gateway.sprite_url(record.id)),
        Line::from(""),
        field(
            app,
            "Base Experience: ",
            record
                .base_experience
                .map(|xp| xp.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        field(app, "Height: ", format!("{} m", record.height_m())),
        field(app, "Weight: ", format!("{} kg", record.weight_kg())),
        Line::from(""),
        heading(app, "Types"),
    ];

    let mut types: Vec<_> = record.types.iter().collect();
    types.sort_by_key(|t| t.slot);
    lines.extend(name_list(
        app,
        types.iter().map(|t| t.kind.name.as_str()),
        app.style("type_tag"),
    ));

    lines.push(Line::from(""));
    lines.push(heading(app, "Abilities"));
    lines.extend(name_list(
        app,
        record.abilities.iter().map(|a| a.ability.name.as_str()),
        app.style("body"),
    ));

    lines.push(Line::from(""));
    lines.push(heading(app, "Stats"));
    if record.stats.is_empty() {
        lines.push(Line::from(Span::styled("  -", app.style("metadata"))));
    }
    for stat in &record.stats {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<16}", display_name(&strip_control_chars(&stat.stat.name))),
                app.style("label"),
            ),
            Span::styled(format!("{:>4} ", stat.base_stat), app.style("body")),
            Span::styled(stat_bar(stat.base_stat), app.style("stat_bar")),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(heading(app, "Forms"));
    lines.extend(name_list(
        app,
        record.forms.iter().map(|f| f.name.as_str()),
        app.style("body"),
    ));

    lines.push(Line::from(""));
    lines.push(heading(app, "Moves"));
    lines.extend(name_list(
        app,
        record.moves.iter().map(|m| m.move_ref.name.as_str()),
        app.style("body"),
    ));

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_bar_scales_and_caps() {
        assert_eq!(stat_bar(0), "·".repeat(20));
        assert_eq!(stat_bar(255), "█".repeat(20));
        assert_eq!(stat_bar(999), "█".repeat(20));
        assert_eq!(stat_bar(51).chars().filter(|&c| c == '█').count(), 4);
    }
}
