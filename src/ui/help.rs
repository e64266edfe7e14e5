//! Help overlay: scrollable keybinding table.
//!
//! Bindings are grouped by context and include any overrides from config.

use crate::app::App;
use crate::keybindings::{Context, KeybindingRegistry};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table},
    Frame,
};

/// Context display order and labels for the help screen.
const CONTEXT_ORDER: [(Context, &str); 5] = [
    (Context::Global, "Everywhere"),
    (Context::Catalog, "Catalog grid"),
    (Context::Detail, "Detail"),
    (Context::Favorites, "Favorites"),
    (Context::Search, "Search line"),
];

/// One line of the help table.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HelpLine {
    Section(&'static str),
    Binding { key: String, description: &'static str },
    Blank,
}

/// Lay out every binding under its context heading.
fn help_lines(registry: &KeybindingRegistry) -> Vec<HelpLine> {
    let bindings = registry.all_bindings();
    let mut lines = Vec::new();

    for (ctx, label) in CONTEXT_ORDER {
        let mut section = bindings
            .iter()
            .filter(|(c, _, _, _)| *c == ctx)
            .peekable();
        if section.peek().is_none() {
            continue;
        }

        if !lines.is_empty() {
            lines.push(HelpLine::Blank);
        }
        lines.push(HelpLine::Section(label));
        lines.extend(section.map(|(_, key, _, description)| HelpLine::Binding {
            key: key.clone(),
            description,
        }));
    }
    lines
}

/// Render the help overlay on top of the current view.
pub fn render(f: &mut Frame, app: &App) {
    let overlay = centered_rect(70, 80, f.area());
    if overlay.width < 20 || overlay.height < 6 {
        return;
    }
    f.render_widget(Clear, overlay);

    let rows: Vec<Row> = help_lines(&app.keybindings)
        .into_iter()
        .map(|line| match line {
            HelpLine::Section(label) => Row::new(vec![
                Line::from(Span::styled(
                    label,
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ])
            .style(app.style("heading")),
            HelpLine::Binding { key, description } => {
                Row::new(vec![format!("  {}", key), description.to_string()])
            }
            HelpLine::Blank => Row::new(vec![String::new(), String::new()]),
        })
        .collect();

    // -2 border, -2 header with its margin
    let visible_height = overlay.height.saturating_sub(4) as usize;
    let max_scroll = rows.len().saturating_sub(visible_height);
    let scroll = app.help_scroll_offset.min(max_scroll);
    let visible_rows: Vec<Row> = rows.into_iter().skip(scroll).take(visible_height).collect();

    let title = if max_scroll > 0 {
        format!(" Keys ({}/{}) ", scroll + 1, max_scroll + 1)
    } else {
        " Keys (? to close) ".to_string()
    };

    let table = Table::new(visible_rows, [Constraint::Length(14), Constraint::Min(20)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("panel_border_focused"))
                .title(title),
        )
        .header(
            Row::new(vec!["Key", "Does"])
                .style(Style::default().add_modifier(Modifier::UNDERLINED))
                .bottom_margin(1),
        )
        .style(app.style("body"));
    f.render_widget(table, overlay);

    if scroll < max_scroll {
        let hint_area = Rect {
            x: overlay.x + 1,
            y: overlay.y + overlay.height.saturating_sub(1),
            width: overlay.width.saturating_sub(2),
            height: 1,
        };
        f.render_widget(
            Paragraph::new(Span::styled(" j/k scroll, Esc closes ", app.style("metadata"))),
            hint_area,
        );
    }
}

/// Create a centered rectangle with the given percentage of the parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    let height = area.height * percent_y / 100;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn centered_rect_is_inside_parent() {
        let r = centered_rect(80, 80, Rect::new(0, 0, 100, 40));
        assert_eq!((r.x, r.y, r.width, r.height), (10, 4, 80, 32));
    }

    #[test]
    fn sections_follow_context_order() {
        let lines = help_lines(&KeybindingRegistry::new());
        let sections: Vec<&str> = lines
            .iter()
            .filter_map(|l| match l {
                HelpLine::Section(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(
            sections,
            ["Everywhere", "Catalog grid", "Detail", "Favorites", "Search line"]
        );
        assert_ne!(lines.last(), Some(&HelpLine::Blank));
    }

    #[test]
    fn overrides_show_in_help() {
        let mut registry = KeybindingRegistry::new();
        let overrides = HashMap::from([("toggle_favorite".to_string(), "x".to_string())]);
        assert!(registry.apply_overrides(&overrides).is_empty());

        let lines = help_lines(&registry);
        assert!(lines.contains(&HelpLine::Binding {
            key: "x".to_string(),
            description: "Toggle favorite",
        }));
    }
}
