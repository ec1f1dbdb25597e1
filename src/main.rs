//! tetris2048: falling tetrominoes of numbered tiles that merge 2048-style in the terminal.

mod app;
mod connectivity;
mod game;
mod grid;
mod input;
mod merge;
mod piece;
mod placement;
mod theme;
mod tile;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    pub drop_interval_ms: u64,
    pub seed: Option<u64>,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path, &args.log)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "theme not loaded, using defaults");
        theme::Theme::default_for_palette(args.palette)
    });
    let config = GameConfig {
        width: args.width,
        height: args.height,
        drop_interval_ms: args.drop_interval_ms.max(1),
        seed: args.seed,
        no_animation: args.no_animation,
    };
    tracing::info!(?config, "starting");
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// The terminal belongs to the UI, so logs only go to a file.
fn init_logging(path: &std::path::Path, filter: &str) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(filter).context("invalid --log filter")?)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

/// Tetris with 2048 tiles in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "tetris2048",
    version,
    about = "Tetris meets 2048: falling tetrominoes of numbered tiles that merge when equal tiles stack.",
    long_about = "tetris2048 is a terminal puzzle game mixing Tetris and 2048.\n\n\
        Every tetromino carries a 2 or 4 in each cell. When a piece locks, equal tiles \
        stacked in a column merge upward into their sum, tiles with no path to the floor \
        are removed, and full rows clear for the sum of their values. Reach 2048 to win; \
        a piece locking above the top ends the game.\n\n\
        CONTROLS:\n  Left/Right h/l  Move    Up/k  Rotate CW   Down/j  Soft drop\n  Enter/Space     Hard drop   P  Pause   R  Restart   Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme; tile_<value> keys recolour single tiles."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\").
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette for tiles: normal, high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Grid width in columns.
    #[arg(long, default_value = "12", value_name = "COLS")]
    pub width: u16,

    /// Grid height in rows.
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: u16,

    /// Milliseconds between automatic downward moves.
    #[arg(long, default_value = "300", value_name = "MS")]
    pub drop_interval_ms: u64,

    /// Seed for piece order and tile values (random when unset).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Disable the cleared-row flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Log filter directive (e.g. "debug" or "tetris2048=trace").
    #[arg(long, default_value = "info", value_name = "FILTER")]
    pub log: String,

    /// Write logs to FILE. Logging is off when unset.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
