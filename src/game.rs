//! Game session: the grid, the falling piece, the next piece, and lock handling.

use crate::grid::{GameStatus, Grid, GridError};
use crate::piece::{Direction, TetrominoKind, Tetromino};
use crate::placement::PatternError;
use crate::theme::Theme;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::VecDeque;
use tracing::debug;

/// Bag of 7 tetrominoes (random order, then refill).
#[derive(Debug, Clone, Default)]
pub struct Bag {
    queue: VecDeque<TetrominoKind>,
}

impl Bag {
    pub fn next(&mut self, rng: &mut StdRng) -> TetrominoKind {
        if self.queue.is_empty() {
            let mut all = TetrominoKind::ALL;
            all.shuffle(rng);
            self.queue.extend(all);
        }
        // Refilled above when empty.
        self.queue.pop_front().unwrap_or(TetrominoKind::T)
    }
}

/// Running totals for the sidebar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub pieces: u32,
    pub merges: u32,
    pub floating_removed: u32,
    pub rows_cleared: u32,
}

/// Game state: grid, current piece, next piece, totals.
#[derive(Debug)]
pub struct GameState {
    pub theme: Theme,
    pub grid: Grid,
    pub piece: Option<Tetromino>,
    pub next: Tetromino,
    pub stats: SessionStats,
    bag: Bag,
    rng: StdRng,
    /// Rows cleared by the latest lock, waiting for the renderer to pick them up.
    flash_rows: Vec<usize>,
}

impl GameState {
    pub fn new(theme: Theme, config: &crate::GameConfig) -> Result<Self, GridError> {
        let grid = Grid::new(config.width as usize, config.height as usize)?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut bag = Bag::default();
        let first = bag.next(&mut rng);
        let second = bag.next(&mut rng);
        let mut piece = Tetromino::new(first, &mut rng);
        piece.spawn(&grid, &mut rng);
        let next = Tetromino::new(second, &mut rng);
        Ok(Self {
            theme,
            grid,
            piece: Some(piece),
            next,
            stats: SessionStats::default(),
            bag,
            rng,
            flash_rows: Vec::new(),
        })
    }

    #[inline]
    pub fn status(&self) -> GameStatus {
        self.grid.status()
    }

    #[inline]
    fn accepts_input(&self) -> bool {
        !self.status().is_terminal() && self.piece.is_some()
    }

    /// Automatic fall: move down one row, locking if blocked.
    pub fn tick_gravity(&mut self) -> Result<(), PatternError> {
        self.soft_drop()
    }

    pub fn move_left(&mut self) {
        self.shift(Direction::Left);
    }

    pub fn move_right(&mut self) {
        self.shift(Direction::Right);
    }

    fn shift(&mut self, direction: Direction) {
        if !self.accepts_input() {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            piece.try_move(direction, &self.grid);
        }
    }

    pub fn rotate(&mut self) {
        if !self.accepts_input() {
            return;
        }
        if let Some(piece) = self.piece.as_mut() {
            piece.rotate_cw(&self.grid);
        }
    }

    pub fn soft_drop(&mut self) -> Result<(), PatternError> {
        if !self.accepts_input() {
            return Ok(());
        }
        let moved = match self.piece.as_mut() {
            Some(piece) => piece.try_move(Direction::Down, &self.grid),
            None => return Ok(()),
        };
        if !moved {
            self.lock_piece()?;
        }
        Ok(())
    }

    pub fn hard_drop(&mut self) -> Result<(), PatternError> {
        if !self.accepts_input() {
            return Ok(());
        }
        if let Some(piece) = self.piece.as_mut() {
            piece.hard_drop(&self.grid);
        }
        self.lock_piece()
    }

    /// Hand the landed piece to the grid; spawn the next one unless the game ended.
    fn lock_piece(&mut self) -> Result<(), PatternError> {
        let Some(piece) = self.piece.take() else {
            return Ok(());
        };
        let (pattern, anchor) = piece.locking_pattern()?;
        let status = self.grid.lock(&pattern, anchor);

        let resolution = self.grid.last_resolution();
        self.stats.pieces += 1;
        self.stats.merges += resolution.merges.len() as u32;
        self.stats.floating_removed += resolution.floating.len() as u32;
        self.stats.rows_cleared += resolution.cleared_rows.len() as u32;
        self.flash_rows = resolution.cleared_rows.iter().map(|c| c.row).collect();
        debug!(kind = ?piece.kind, ?status, "piece locked");

        if !status.is_terminal() {
            self.spawn_next();
        }
        Ok(())
    }

    fn spawn_next(&mut self) {
        let kind = self.bag.next(&mut self.rng);
        let upcoming = Tetromino::new(kind, &mut self.rng);
        let mut piece = std::mem::replace(&mut self.next, upcoming);
        piece.spawn(&self.grid, &mut self.rng);
        self.piece = Some(piece);
    }

    /// Rows cleared since the last call (bottom-relative indices at removal time).
    pub fn take_flash_rows(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.flash_rows)
    }

    /// Fresh grid and pieces; keeps the RNG stream going.
    pub fn restart(&mut self) {
        self.grid.reset();
        self.stats = SessionStats::default();
        self.flash_rows.clear();
        self.bag = Bag::default();
        let kind = self.bag.next(&mut self.rng);
        self.next = Tetromino::new(kind, &mut self.rng);
        self.spawn_next();
    }
}
