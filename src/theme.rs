//! Theme system for the TUI.
//!
//! Provides semantic color roles that map to ratatui `Style` values.
//! The `ThemeVariant` enum selects between Light and Dark palettes,
//! and `StyleMap` resolves role names to concrete styles.

use ratatui::style::{Color, Modifier, Style};
use std::collections::HashMap;

// ============================================================================
// Theme Variant
// ============================================================================

/// Available theme variants. Light is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemeVariant {
    #[default]
    Light,
    Dark,
}

impl ThemeVariant {
    /// Parse a variant name (case-insensitive).
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }

    /// Value written under the `theme` storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn palette(self) -> ColorPalette {
        match self {
            Self::Dark => ColorPalette::dark(),
            Self::Light => ColorPalette::light(),
        }
    }

    /// Light → Dark → Light.
    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Human-readable name for status display.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dark => "Dark",
            Self::Light => "Light",
        }
    }
}

// ============================================================================
// Color Palette
// ============================================================================

/// A complete color palette mapping every semantic UI role to a `Style`.
#[derive(Debug, Clone)]
pub struct ColorPalette {
    // -- Grid cards --
    pub card_normal: Style,
    pub card_selected: Style,
    pub card_id: Style,
    pub favorite_star: Style,
    pub placeholder: Style,

    // -- Detail --
    pub heading: Style,
    pub body: Style,
    pub metadata: Style,
    pub label: Style,
    pub stat_bar: Style,
    pub type_tag: Style,

    // -- Messages --
    pub error: Style,
    pub notice: Style,

    // -- Controls --
    pub search_input: Style,
    pub filter_indicator: Style,

    // -- Chrome --
    pub status_bar: Style,
    pub panel_border: Style,
    pub panel_border_focused: Style,
}

impl ColorPalette {
    fn dark() -> Self {
        Self {
            card_normal: Style::default(),
            card_selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            card_id: Style::default().fg(Color::DarkGray),
            favorite_star: Style::default().fg(Color::Yellow),
            placeholder: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),

            heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            body: Style::default(),
            metadata: Style::default().fg(Color::DarkGray),
            label: Style::default().add_modifier(Modifier::BOLD),
            stat_bar: Style::default().fg(Color::Green),
            type_tag: Style::default().fg(Color::Magenta),

            error: Style::default().fg(Color::Red),
            notice: Style::default().fg(Color::Gray),

            search_input: Style::default().fg(Color::Yellow),
            filter_indicator: Style::default().fg(Color::Cyan),

            status_bar: Style::default().bg(Color::DarkGray).fg(Color::White),
            panel_border: Style::default(),
            panel_border_focused: Style::default().fg(Color::Cyan),
        }
    }

    /// Adapted for light terminal backgrounds.
    fn light() -> Self {
        Self {
            card_normal: Style::default().fg(Color::Black),
            card_selected: Style::default().bg(Color::Blue).fg(Color::White),
            card_id: Style::default().fg(Color::DarkGray),
            favorite_star: Style::default().fg(Color::Magenta),
            placeholder: Style::default().fg(Color::Gray),

            heading: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            body: Style::default().fg(Color::Black),
            metadata: Style::default().fg(Color::DarkGray),
            label: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            stat_bar: Style::default().fg(Color::Blue),
            type_tag: Style::default().fg(Color::Magenta),

            error: Style::default().fg(Color::Red),
            notice: Style::default().fg(Color::DarkGray),

            search_input: Style::default().fg(Color::Blue),
            filter_indicator: Style::default().fg(Color::Blue),

            status_bar: Style::default().bg(Color::White).fg(Color::Black),
            panel_border: Style::default().fg(Color::DarkGray),
            panel_border_focused: Style::default().fg(Color::Blue),
        }
    }
}

// ============================================================================
// Style Map
// ============================================================================

/// String-keyed style lookup, built from a `ColorPalette`.
#[derive(Debug, Clone)]
pub struct StyleMap {
    map: HashMap<&'static str, Style>,
}

/// All semantic role names, in declaration order.
const ROLE_NAMES: [&str; 18] = [
    "card_normal",
    "card_selected",
    "card_id",
    "favorite_star",
    "placeholder",
    "heading",
    "body",
    "metadata",
    "label",
    "stat_bar",
    "type_tag",
    "error",
    "notice",
    "search_input",
    "filter_indicator",
    "status_bar",
    "panel_border",
    "panel_border_focused",
];

impl StyleMap {
    pub fn from_palette(p: &ColorPalette) -> Self {
        let styles: [Style; 18] = [
            p.card_normal,
            p.card_selected,
            p.card_id,
            p.favorite_star,
            p.placeholder,
            p.heading,
            p.body,
            p.metadata,
            p.label,
            p.stat_bar,
            p.type_tag,
            p.error,
            p.notice,
            p.search_input,
            p.filter_indicator,
            p.status_bar,
            p.panel_border,
            p.panel_border_focused,
        ];

        let map = ROLE_NAMES.iter().copied().zip(styles).collect();
        Self { map }
    }

    /// Resolve a role name to its `Style`. Unknown roles get `Style::default()`.
    pub fn resolve(&self, role: &str) -> Style {
        self.map.get(role).copied().unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
