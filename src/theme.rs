//! Colour context: btop-style `theme[key]="value"` files and hex → ratatui Color.

use crate::piece::Tetromino;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Colours for the seven families and the surrounding UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Family colours indexed by grid id - 1: I, J, L, O, S, T, Z.
    pub pieces: [Color; 7],
    /// Background behind the board and panel.
    pub bg: Color,
    /// Empty playfield cell.
    pub empty: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, level).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (controls help).
    pub inactive_fg: Color,
    /// Rows about to be cleared.
    pub flash: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const CLASSIC_PIECES: [Color; 7] = [
    Color::Rgb(0, 240, 240),
    Color::Rgb(0, 100, 255),
    Color::Rgb(255, 165, 0),
    Color::Rgb(240, 240, 0),
    Color::Rgb(50, 205, 50),
    Color::Rgb(138, 43, 226),
    Color::Rgb(220, 20, 60),
];

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            pieces: CLASSIC_PIECES,
            bg: Color::Rgb(25, 25, 35),
            empty: Color::Rgb(40, 40, 50),
            div_line: Color::Rgb(60, 60, 70),
            main_fg: Color::Rgb(230, 230, 230),
            title: Color::Rgb(240, 240, 0),
            inactive_fg: Color::Rgb(130, 130, 150),
            flash: Color::White,
        }
    }

    /// Load a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Missing keys keep the classic colours; no path means the classic theme.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))?
            }
            None => Self::classic(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override family colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.pieces = [
                    Color::Rgb(0x00, 0xFF, 0xFF),
                    Color::Rgb(0x00, 0x55, 0xFF),
                    Color::Rgb(0xFF, 0x88, 0x00),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0x00, 0xFF, 0x00),
                    Color::Rgb(0xFF, 0x00, 0xFF),
                    Color::Rgb(0xFF, 0x00, 0x00),
                ];
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito
                self.pieces = [
                    Color::Rgb(0x56, 0xB4, 0xE9),
                    Color::Rgb(0x00, 0x72, 0xB2),
                    Color::Rgb(0xE6, 0x9F, 0x00),
                    Color::Rgb(0xF0, 0xE4, 0x42),
                    Color::Rgb(0x00, 0x9E, 0x73),
                    Color::Rgb(0xCC, 0x79, 0xA7),
                    Color::Rgb(0xD5, 0x5E, 0x00),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Result<Self, ThemeError> {
        let get = |key: &str, fallback: Color| -> Result<Color, ThemeError> {
            map.get(key).map_or(Ok(fallback), |v| parse_hex(v))
        };
        let base = Self::classic();
        // Keys follow btop's names; family colours pick the closest hue.
        Ok(Self {
            pieces: [
                get("hi_fg", base.pieces[0])?,
                get("cpu_box", base.pieces[1])?,
                get("temp_mid", base.pieces[2])?,
                get("title", base.pieces[3])?,
                get("mem_box", base.pieces[4])?,
                get("net_box", base.pieces[5])?,
                get("cpu_end", base.pieces[6])?,
            ],
            bg: get("main_bg", base.bg)?,
            empty: get("meter_bg", base.empty)?,
            div_line: get("div_line", base.div_line)?,
            main_fg: get("main_fg", base.main_fg)?,
            title: get("title", base.title)?,
            inactive_fg: get("inactive_fg", base.inactive_fg)?,
            flash: get("selected_fg", base.flash)?,
        })
    }

    /// Colour for a grid id 1..=7; 0 is the empty cell.
    #[inline]
    pub fn cell_color(&self, id: u8) -> Color {
        match id {
            0 => self.empty,
            id => self.pieces[(id as usize - 1) % 7],
        }
    }

    #[inline]
    pub fn piece_color(&self, kind: Tetromino) -> Color {
        self.cell_color(kind.id())
    }

    /// Logo letters cycle through the family colours.
    pub fn logo_color(&self, i: usize) -> Color {
        self.pieces[i % self.pieces.len()]
    }
}

/// Collect `theme[key]=value` pairs; comments, blank lines and empty values are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, rest) = line.strip_prefix("theme[")?.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches(|c: char| c == '"' || c == '\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&s[range], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 if s.is_ascii() => (channel(0..2)?, channel(2..4)?, channel(4..6)?),
        3 if s.is_ascii() => (channel(0..1)? * 17, channel(1..2)? * 17, channel(2..3)? * 17),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_long_form() {
        assert_eq!(parse_hex(" #00F0f0 ").unwrap(), Color::Rgb(0, 240, 240));
    }

    #[test]
    fn test_parse_hex_short_form() {
        assert_eq!(parse_hex("#f80").unwrap(), Color::Rgb(255, 136, 0));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#GG0000"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_theme_lines() {
        let map = parse_theme_file("theme[ meter_bg ] = \"#282832\"\ntheme[title]=\"\"\nnot a theme line");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("meter_bg").map(String::as_str), Some("#282832"));
    }

    #[test]
    fn test_from_map_overrides_and_falls_back() {
        let map = parse_theme_file(
            "# comment\ntheme[hi_fg]=\"#56B6C2\"\ntheme[main_fg]='#ABB2BF'\n",
        );
        let theme = Theme::from_map(&map).unwrap();
        assert_eq!(theme.piece_color(Tetromino::I), Color::Rgb(0x56, 0xB6, 0xC2));
        assert_eq!(theme.main_fg, Color::Rgb(0xAB, 0xB2, 0xBF));
        assert_eq!(theme.piece_color(Tetromino::Z), Theme::classic().pieces[6]);
    }

    #[test]
    fn test_bad_hex_in_theme_is_an_error() {
        let map = parse_theme_file("theme[cpu_box]=\"#nothex\"");
        assert!(Theme::from_map(&map).is_err());
    }

    #[test]
    fn test_cell_color_by_id() {
        let theme = Theme::classic();
        assert_eq!(theme.cell_color(0), theme.empty);
        assert_eq!(theme.cell_color(4), theme.pieces[3]);
    }

    #[test]
    fn test_missing_path_gives_classic() {
        let theme = Theme::load(None, crate::Palette::Normal).unwrap();
        assert_eq!(theme, Theme::classic());
    }
}
