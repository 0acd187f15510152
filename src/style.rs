use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Built-in palette, cycled when there are more questions than colours.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#FF6B6B", "#4ECDC4", "#45B7D1", "#96CEB4", "#FECA57", "#FF9FF3", "#54A0FF", "#5F27CD",
    "#FF9F43", "#1DD1A1",
];

/// Hand-picked colours for the default question set.
pub const DEFAULT_CUSTOM_COLORS: [&str; 8] = [
    "#66BB6A", "#FFA000", "#F06292", "#BA68C8", "#26C6DA", "#1DE9B6", "#4DD0E1", "#29B6F6",
];

/// Colour used for a question that has no palette entry.
pub const FALLBACK_COLOR: &str = "#4FC3F7";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("invalid colour '{0}' (expected #RRGGBB)")]
    InvalidColor(String),
    #[error("column count {0} outside 1..=4")]
    ColumnCount(u32),
    #[error("row count {0} outside 1..=6")]
    RowCount(u32),
    #[error("unknown palette '{0}' (expected default or custom)")]
    UnknownPalette(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaletteKind {
    #[default]
    Default,
    Custom,
}

impl fmt::Display for PaletteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteKind::Default => f.write_str("default"),
            PaletteKind::Custom => f.write_str("custom"),
        }
    }
}

impl FromStr for PaletteKind {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "默认配色" => Ok(PaletteKind::Default),
            "custom" | "自定义配色" => Ok(PaletteKind::Custom),
            other => Err(StyleError::UnknownPalette(other.to_string())),
        }
    }
}

/// Presentation state for the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub ncol: u32,
    pub nrow: u32,
    pub color_palette: PaletteKind,
    pub custom_colors: Vec<String>,
    pub font_family: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    pub background_color: String,
    pub margin: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            ncol: 2,
            nrow: 6,
            color_palette: PaletteKind::Default,
            custom_colors: DEFAULT_CUSTOM_COLORS.iter().map(|c| c.to_string()).collect(),
            font_family: "STKaiti".to_string(),
            font_path: None,
            background_color: "#FFFFFF".to_string(),
            margin: 10,
        }
    }
}

impl StyleConfig {
    pub fn validate(&self) -> Result<(), StyleError> {
        if !(1..=4).contains(&self.ncol) {
            return Err(StyleError::ColumnCount(self.ncol));
        }
        if !(1..=6).contains(&self.nrow) {
            return Err(StyleError::RowCount(self.nrow));
        }
        parse_hex_color(&self.background_color)?;
        for color in &self.custom_colors {
            parse_hex_color(color)?;
        }
        Ok(())
    }

    /// One colour per question, in question order.
    pub fn colors_for(&self, n_items: usize) -> Vec<String> {
        generate_color_palette(n_items, self.color_palette, &self.custom_colors)
    }
}

/// Picks `n_items` colours from the built-in palette or the custom list.
///
/// A custom list that is too short is padded with built-in colours taken
/// at the same index.
pub fn generate_color_palette(n_items: usize, kind: PaletteKind, custom: &[String]) -> Vec<String> {
    let builtin = |i: usize| DEFAULT_PALETTE[i % DEFAULT_PALETTE.len()].to_string();
    match kind {
        PaletteKind::Default => (0..n_items).map(builtin).collect(),
        PaletteKind::Custom if custom.len() >= n_items => custom[..n_items].to_vec(),
        PaletteKind::Custom => custom
            .iter()
            .cloned()
            .chain((custom.len()..n_items).map(builtin))
            .collect(),
    }
}

pub fn parse_hex_color(input: &str) -> Result<RGBColor, StyleError> {
    let invalid = || StyleError::InvalidColor(input.to_string());
    let hex = input.trim().strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16);
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Ok(r), Ok(g), Ok(b)) => Ok(RGBColor(r, g, b)),
        _ => Err(invalid()),
    }
}
