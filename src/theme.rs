//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.
//! Tile colours are a pure function of the tile value and the selected palette.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Number of distinct tile styles: 2, 4, ..., 2048.
pub const TILE_STYLES: usize = 11;

/// Colours for one tile value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileStyle {
    pub bg: Color,
    pub fg: Color,
}

const fn style(bg: (u8, u8, u8), fg: (u8, u8, u8)) -> TileStyle {
    TileStyle {
        bg: Color::Rgb(bg.0, bg.1, bg.2),
        fg: Color::Rgb(fg.0, fg.1, fg.2),
    }
}

/// Blush-to-wine ramp, lightest for 2.
const ROSE_TILES: [TileStyle; TILE_STYLES] = [
    style((244, 217, 208), (146, 26, 64)),
    style((247, 200, 192), (146, 26, 64)),
    style((199, 91, 122), (110, 20, 40)),
    style((146, 26, 64), (244, 217, 208)),
    style((110, 20, 50), (244, 217, 208)),
    style((90, 15, 40), (217, 171, 171)),
    style((70, 10, 30), (199, 91, 122)),
    style((50, 5, 20), (217, 171, 171)),
    style((30, 0, 10), (244, 217, 208)),
    style((20, 0, 0), (255, 255, 255)),
    style((10, 0, 0), (255, 255, 255)),
];

const HIGH_CONTRAST_TILES: [TileStyle; TILE_STYLES] = [
    style((255, 255, 255), (0, 0, 0)),
    style((255, 255, 0), (0, 0, 0)),
    style((255, 136, 0), (0, 0, 0)),
    style((255, 0, 0), (255, 255, 255)),
    style((255, 0, 255), (0, 0, 0)),
    style((0, 136, 255), (255, 255, 255)),
    style((0, 255, 255), (0, 0, 0)),
    style((0, 255, 0), (0, 0, 0)),
    style((128, 0, 255), (255, 255, 255)),
    style((0, 0, 160), (255, 255, 255)),
    style((0, 0, 0), (255, 255, 0)),
];

/// Paul Tol's bright/vibrant sets, safe for common colour-vision deficiencies.
const COLORBLIND_TILES: [TileStyle; TILE_STYLES] = [
    style((187, 187, 187), (0, 0, 0)),
    style((204, 187, 68), (0, 0, 0)),
    style((238, 119, 51), (0, 0, 0)),
    style((204, 51, 17), (255, 255, 255)),
    style((238, 51, 119), (255, 255, 255)),
    style((102, 204, 238), (0, 0, 0)),
    style((0, 153, 136), (255, 255, 255)),
    style((0, 119, 187), (255, 255, 255)),
    style((170, 51, 119), (255, 255, 255)),
    style((68, 119, 170), (255, 255, 255)),
    style((34, 136, 51), (255, 255, 255)),
];

/// UI colours plus the tile palette.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Tile styles indexed by `exponent - 1` (2 → 0, 2048 → 10).
    pub tiles: [TileStyle; TILE_STYLES],
    /// Playfield background / empty cells.
    pub bg: Color,
    /// Grid / border.
    pub div_line: Color,
    /// Text (score, counters).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text (key hints).
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::rose_default()
    }
}

impl Theme {
    /// Soft pink board with the rose tile ramp.
    pub fn rose_default() -> Self {
        Self {
            tiles: ROSE_TILES,
            bg: Color::Rgb(255, 240, 245),
            div_line: Color::Rgb(220, 120, 150),
            main_fg: Color::Rgb(146, 26, 64),
            title: Color::Rgb(231, 84, 128),
            inactive_fg: Color::Rgb(199, 140, 160),
        }
    }

    /// Load UI colours from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to defaults if path is None or the file is missing.
    /// `palette` selects the tile colours; `tile_<value>` keys override single tiles.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::default_for_palette(palette);
        theme.apply_map(&map);
        Ok(theme)
    }

    pub fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::rose_default();
        t.apply_palette(palette);
        t
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        self.tiles = match palette {
            crate::Palette::Normal => ROSE_TILES,
            crate::Palette::HighContrast => HIGH_CONTRAST_TILES,
            crate::Palette::Colorblind => COLORBLIND_TILES,
        };
    }

    fn apply_map(&mut self, map: &HashMap<String, String>) {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        if let Some(c) = get("meter_bg").or_else(|| get("main_bg")) {
            self.bg = c;
        }
        if let Some(c) = get("div_line") {
            self.div_line = c;
        }
        if let Some(c) = get("main_fg") {
            self.main_fg = c;
        }
        if let Some(c) = get("title") {
            self.title = c;
        }
        if let Some(c) = get("inactive_fg") {
            self.inactive_fg = c;
        }
        for (i, tile) in self.tiles.iter_mut().enumerate() {
            let value = 2u32 << i;
            if let Some(c) = get(&format!("tile_{value}")) {
                tile.bg = c;
            }
            if let Some(c) = get(&format!("tile_{value}_fg")) {
                tile.fg = c;
            }
        }
    }

    /// Colours for a tile value. Values past 2048 reuse the 2048 style.
    pub fn style_for(&self, value: u32) -> TileStyle {
        let index = (value.max(2).trailing_zeros() as usize - 1).min(TILE_STYLES - 1);
        self.tiles[index]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>, scale: u8| {
        s.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(|v| v * scale)
            .ok_or_else(|| ThemeError::InvalidHex(s.to_string()))
    };
    let (r, g, b) = match s.len() {
        6 => (channel(0..2, 1)?, channel(2..4, 1)?, channel(4..6, 1)?),
        3 => (channel(0..1, 17)?, channel(1..2, 17)?, channel(2..3, 17)?),
        _ => return Err(ThemeError::InvalidHex(s.to_string())),
    };
    Ok(Color::Rgb(r, g, b))
}
