//! Layout and drawing: playfield of numbered tiles, sidebar, pause and end overlays,
//! and the cleared-row flash.

use crate::game::GameState;
use crate::grid::{GameStatus, Resolution};
use crate::piece::Tetromino;
use crate::tile::Tile;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Terminal columns per grid cell; wide enough for "2048" plus padding.
const CELL_WIDTH: u16 = 5;
const CELL_HEIGHT: u16 = 1;
const SIDEBAR_WIDTH: u16 = 26;
/// Next (7) + stats (8) + last lock (6) + keys (6).
const SIDEBAR_HEIGHT: u16 = 27;

const FLASH_MS: u32 = 350;

/// Outer size of the bordered playfield for the grid dimensions.
fn playfield_size(width: usize, height: usize) -> (u16, u16) {
    (
        (width as u16).saturating_mul(CELL_WIDTH).saturating_add(2),
        (height as u16).saturating_mul(CELL_HEIGHT).saturating_add(2),
    )
}

/// Split the screen into centred playfield and sidebar rects.
fn game_layout(area: Rect, state: &GameState) -> (Rect, Rect) {
    let (pw, ph) = playfield_size(state.grid.width(), state.grid.height());
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(pw + SIDEBAR_WIDTH),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph.max(SIDEBAR_HEIGHT)),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let playfield = Rect {
        height: ph.min(inner[0].height),
        ..inner[0]
    };
    (playfield, inner[1])
}

/// Board rect inside the playfield border.
fn board_rect(area: Rect, state: &GameState) -> Rect {
    let (playfield, _) = game_layout(area, state);
    Rect {
        x: playfield.x + 1,
        y: playfield.y + 1,
        width: (state.grid.width() as u16 * CELL_WIDTH).min(playfield.width.saturating_sub(2)),
        height: (state.grid.height() as u16 * CELL_HEIGHT).min(playfield.height.saturating_sub(2)),
    }
}

/// Screen position of grid cell (row 0 at the bottom), if it lies inside `board`.
fn cell_origin(board: Rect, grid_height: usize, row: usize, col: usize) -> Option<(u16, u16)> {
    if row >= grid_height {
        return None;
    }
    let x = board.x + col as u16 * CELL_WIDTH;
    let y = board.y + (grid_height - 1 - row) as u16 * CELL_HEIGHT;
    (x + CELL_WIDTH <= board.x + board.width && y < board.y + board.height).then_some((x, y))
}

/// Centred tile label, padded to the cell width.
fn cell_label(tile: Tile) -> String {
    format!("{tile:^width$}", width = CELL_WIDTH as usize)
}

/// Draw the game with optional pause overlay and win/loss overlay. `flash_rows` are the rows
/// cleared by the latest lock; while non-empty (and animation is on) a fade runs over them.
#[allow(clippy::too_many_arguments)]
pub fn draw(
    frame: &mut Frame,
    state: &GameState,
    paused: bool,
    area: Rect,
    flash_rows: &[usize],
    flash_effect: &mut Option<Effect>,
    flash_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let (playfield, sidebar) = game_layout(area, state);
    draw_playfield(frame, state, playfield);
    draw_sidebar(frame, state, sidebar);
    if !flash_rows.is_empty() {
        apply_flash_effect(frame, state, area, flash_rows, flash_effect, flash_process_time, now);
    }
    match state.status() {
        GameStatus::InProgress if paused => draw_pause_overlay(frame, state, area),
        GameStatus::InProgress => {}
        status => draw_end_overlay(frame, state, status, area),
    }
}

/// Create the fade over the cleared rows on first use, then advance it by the frame delta.
fn apply_flash_effect(
    frame: &mut Frame,
    state: &GameState,
    area: Rect,
    rows: &[usize],
    flash_effect: &mut Option<Effect>,
    flash_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, state);
    let delta = flash_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *flash_process_time = Some(now);

    if flash_effect.is_none() {
        let height = state.grid.height();
        let screen_rows: HashSet<u16> = rows
            .iter()
            .filter_map(|&r| cell_origin(board, height, r, 0).map(|(_, y)| y))
            .collect();
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            screen_rows.contains(&pos.y)
        }));
        let flash = state.theme.title;
        let effect = fx::fade_from(flash, flash, (FLASH_MS, Interpolation::QuadOut))
            .with_filter(filter)
            .with_area(board);
        *flash_effect = Some(effect);
    }

    if let Some(effect) = flash_effect {
        frame.render_effect(effect, board, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_playfield(frame: &mut Frame, state: &GameState, area: Rect) {
    let theme = &state.theme;
    let title = format!(" tetris2048  | Score: {} ", state.grid.score());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let board = Rect {
        width: (state.grid.width() as u16 * CELL_WIDTH).min(inner.width),
        height: (state.grid.height() as u16 * CELL_HEIGHT).min(inner.height),
        ..inner
    };
    let height = state.grid.height();
    let empty_style = Style::default().fg(theme.inactive_fg).bg(theme.bg);
    let buf = frame.buffer_mut();

    for row in 0..height {
        for col in 0..state.grid.width() {
            let Some((x, y)) = cell_origin(board, height, row, col) else {
                continue;
            };
            match state.grid.board().tile(row, col) {
                Some(tile) => {
                    let style = theme.style_for(tile.value());
                    buf.set_string(
                        x,
                        y,
                        cell_label(tile),
                        Style::default().fg(style.fg).bg(style.bg),
                    );
                }
                None => {
                    buf.set_string(x, y, "  ·  ", empty_style);
                }
            }
        }
    }

    if let Some(piece) = &state.piece {
        for (pos, tile) in piece.occupied() {
            let (Ok(row), Ok(col)) = (usize::try_from(pos.y), usize::try_from(pos.x)) else {
                continue;
            };
            if let Some((x, y)) = cell_origin(board, height, row, col) {
                let style = theme.style_for(tile.value());
                buf.set_string(
                    x,
                    y,
                    cell_label(tile),
                    Style::default().fg(style.fg).bg(style.bg).bold(),
                );
            }
        }
    }
}

fn sidebar_block(state: &GameState) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(state.theme.div_line).bg(state.theme.bg))
}

fn stat_line<'a>(label: &'a str, value: String, state: &GameState) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(state.theme.title)),
        Span::styled(value, Style::default().fg(state.theme.main_fg)),
    ])
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Next (border + title + 4 rows)
            Constraint::Length(8), // Stats
            Constraint::Length(6), // Last lock
            Constraint::Length(6), // Keys
        ])
        .split(area);
    let title_style = Style::default().fg(state.theme.title);

    // --- Next ---
    let next_block = sidebar_block(state);
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    let next_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(next_inner);
    Paragraph::new(Line::from(Span::styled("Next", title_style)))
        .render(next_layout[0], frame.buffer_mut());
    draw_next_preview(frame, state, &state.next, next_layout[1]);

    // --- Stats ---
    let stats_block = sidebar_block(state);
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], frame.buffer_mut());
    let stats = &state.stats;
    let highest = state
        .grid
        .board()
        .highest_value()
        .map_or_else(|| "-".to_string(), |v| v.to_string());
    let stats_lines = vec![
        stat_line("Score: ", state.grid.score().to_string(), state),
        stat_line("Highest: ", highest, state),
        stat_line("Pieces: ", stats.pieces.to_string(), state),
        stat_line("Merges: ", stats.merges.to_string(), state),
        stat_line("Floating: ", stats.floating_removed.to_string(), state),
        stat_line("Rows: ", stats.rows_cleared.to_string(), state),
    ];
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    // --- Last lock ---
    let last_block = sidebar_block(state).title(Span::styled(" Last lock ", title_style));
    let last_inner = last_block.inner(chunks[2]);
    last_block.render(chunks[2], frame.buffer_mut());
    Paragraph::new(Text::from(resolution_lines(state.grid.last_resolution(), state)))
        .render(last_inner, frame.buffer_mut());

    // --- Keys ---
    let keys_block = sidebar_block(state);
    let keys_inner = keys_block.inner(chunks[3]);
    keys_block.render(chunks[3], frame.buffer_mut());
    let hint = Style::default().fg(state.theme.inactive_fg);
    let keys = vec![
        Line::from(Span::styled("←/→ h/l  move", hint)),
        Line::from(Span::styled("↑ k  rotate  ↓ j  drop", hint)),
        Line::from(Span::styled("Space  hard drop", hint)),
        Line::from(Span::styled("P pause R restart Q quit", hint)),
    ];
    Paragraph::new(Text::from(keys)).render(keys_inner, frame.buffer_mut());
}

fn resolution_lines<'a>(resolution: &Resolution, state: &GameState) -> Vec<Line<'a>> {
    let merged: u64 = resolution.merges.iter().map(|m| u64::from(m.value)).sum();
    let floating: u64 = resolution.floating.iter().map(|f| u64::from(f.value)).sum();
    vec![
        stat_line(
            "Merges: ",
            format!("{} (+{merged})", resolution.merges.len()),
            state,
        ),
        stat_line(
            "Floating: ",
            format!("{} (+{floating})", resolution.floating.len()),
            state,
        ),
        stat_line("Rows: ", resolution.cleared_rows.len().to_string(), state),
        stat_line("Points: ", format!("+{}", resolution.points), state),
    ]
}

/// Next piece in its spawn orientation, tiles drawn with their values.
fn draw_next_preview(frame: &mut Frame, state: &GameState, piece: &Tetromino, area: Rect) {
    let n = piece.size();
    let used_rows: Vec<usize> = (0..n)
        .filter(|&r| (0..n).any(|c| piece.tile(r, c).is_some()))
        .collect();
    let cols_used = (0..n)
        .filter(|&c| (0..n).any(|r| piece.tile(r, c).is_some()))
        .count() as u16;
    let off_x = area.width.saturating_sub(cols_used * CELL_WIDTH) / 2;
    let off_y = area.height.saturating_sub(used_rows.len() as u16) / 2;
    let first_col = (0..n)
        .find(|&c| (0..n).any(|r| piece.tile(r, c).is_some()))
        .unwrap_or(0);

    let buf = frame.buffer_mut();
    for (dy, &r) in used_rows.iter().enumerate() {
        for c in first_col..n {
            let Some(tile) = piece.tile(r, c) else {
                continue;
            };
            let x = area.x + off_x + (c - first_col) as u16 * CELL_WIDTH;
            let y = area.y + off_y + dy as u16;
            if x + CELL_WIDTH <= area.x + area.width && y < area.y + area.height {
                let style = state.theme.style_for(tile.value());
                buf.set_string(
                    x,
                    y,
                    cell_label(tile),
                    Style::default().fg(style.fg).bg(style.bg),
                );
            }
        }
    }
}

fn centred_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, state: &GameState, area: Rect) {
    let popup = centred_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: Resume    Q: Quit ",
            Style::default().fg(state.theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(state.theme.div_line).bg(state.theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_end_overlay(frame: &mut Frame, state: &GameState, status: GameStatus, area: Rect) {
    let popup = centred_popup(area, 30, 9);
    let (title, colour) = match status {
        GameStatus::Won => (" YOU WIN! ", Color::Green),
        _ => (" GAME OVER! ", Color::Red),
    };
    let fg = Style::default().fg(state.theme.main_fg);
    let highest = state.grid.board().highest_value().unwrap_or(0);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default().fg(Color::White).bg(colour).bold(),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {} ", state.grid.score()), fg)),
        Line::from(Span::styled(format!(" Highest tile: {highest} "), fg)),
        Line::from(""),
        Line::from(Span::styled(" R: Restart    Q: Quit ", fg)),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(state.theme.div_line).bg(state.theme.bg))
            .title(Span::styled(" tetris2048 ", state.theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}
