//! Grid state machine: tile board, lock pipeline, row clearing, score and status.
//!
//! A lock event runs placement, then merging (with gravity between passes),
//! then floating-tile removal, then full-row clearing, all synchronously.

use crate::connectivity::{self, FloatingTile};
use crate::merge::{self, MergeEvent};
use crate::placement::{self, Pattern, Position};
use crate::tile::Tile;
use std::collections::VecDeque;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Single cell: either empty or holding one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Tile(Tile),
}

impl Cell {
    #[inline]
    pub fn tile(self) -> Option<Tile> {
        match self {
            Self::Empty => None,
            Self::Tile(t) => Some(t),
        }
    }

    #[inline]
    pub fn is_occupied(self) -> bool {
        matches!(self, Self::Tile(_))
    }
}

impl From<Option<Tile>> for Cell {
    fn from(tile: Option<Tile>) -> Self {
        tile.map_or(Self::Empty, Self::Tile)
    }
}

/// Fixed-size tile matrix. `rows[0]` is the floor; `rows[height - 1]` the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    rows: VecDeque<Vec<Cell>>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        let rows = (0..height).map(|_| vec![Cell::Empty; width]).collect();
        Self {
            width,
            height,
            rows,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn is_inside(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    #[inline]
    pub fn tile(&self, row: usize, col: usize) -> Option<Tile> {
        self.get(row, col).and_then(Cell::tile)
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize) -> Option<u32> {
        self.tile(row, col).map(|t| t.value())
    }

    #[inline]
    pub fn is_occupied(&self, row: usize, col: usize) -> bool {
        self.get(row, col).is_some_and(Cell::is_occupied)
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *slot = cell;
        }
    }

    /// Empty the cell and return what it held.
    pub fn take(&mut self, row: usize, col: usize) -> Option<Tile> {
        self.rows
            .get_mut(row)
            .and_then(|r| r.get_mut(col))
            .and_then(|slot| std::mem::take(slot).tile())
    }

    pub(crate) fn tile_mut(&mut self, row: usize, col: usize) -> Option<&mut Tile> {
        match self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(Cell::Tile(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.width > 0
            && self
                .rows
                .get(row)
                .is_some_and(|r| r.iter().all(|c| c.is_occupied()))
    }

    /// Remove a row, shift everything above it down one, and open an empty row at the top.
    pub fn remove_row(&mut self, row: usize) -> Vec<Cell> {
        let Some(removed) = self.rows.remove(row) else {
            return Vec::new();
        };
        self.rows.push_back(vec![Cell::Empty; self.width]);
        removed
    }

    pub fn occupied_count(&self) -> usize {
        self.rows
            .iter()
            .flatten()
            .filter(|c| c.is_occupied())
            .count()
    }

    pub fn highest_value(&self) -> Option<u32> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|c| c.tile())
            .map(|t| t.value())
            .max()
    }

    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.fill(Cell::Empty);
        }
    }
}

/// Terminal states are sticky until [`Grid::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
    #[default]
    InProgress,
    Lost,
    Won,
}

impl GameStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != Self::InProgress
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
}

/// A full row removed by the row clearer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearedRow {
    /// Row index at the moment of removal.
    pub row: usize,
    /// Tile values left to right.
    pub values: Vec<u32>,
}

impl ClearedRow {
    pub fn points(&self) -> u64 {
        self.values.iter().map(|&v| u64::from(v)).sum()
    }
}

/// Everything that happened while resolving one lock event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub merges: Vec<MergeEvent>,
    pub merge_passes: u32,
    pub floating: Vec<FloatingTile>,
    pub cleared_rows: Vec<ClearedRow>,
    /// Tiles of the locked pattern that fell outside the grid.
    pub overflow: usize,
    pub points: u64,
}

impl Resolution {
    /// True if resolving changed nothing.
    pub fn is_empty(&self) -> bool {
        self.merges.is_empty()
            && self.floating.is_empty()
            && self.cleared_rows.is_empty()
            && self.overflow == 0
    }
}

/// Scan from the top down; a removal re-examines the same index since the row
/// above has just shifted into it.
pub fn clear_full_rows(board: &mut Board) -> Vec<ClearedRow> {
    let mut cleared = Vec::new();
    let mut row = board.height();
    while row > 0 {
        let r = row - 1;
        if board.is_row_full(r) {
            let values = board
                .remove_row(r)
                .into_iter()
                .filter_map(Cell::tile)
                .map(|t| t.value())
                .collect();
            cleared.push(ClearedRow { row: r, values });
        } else {
            row -= 1;
        }
    }
    cleared
}

/// Owns the board, the score and the game status.
#[derive(Debug, Clone)]
pub struct Grid {
    board: Board,
    score: u64,
    status: GameStatus,
    last: Resolution,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }
        Ok(Self {
            board: Board::new(width, height),
            score: 0,
            status: GameStatus::InProgress,
            last: Resolution::default(),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_board(board: Board) -> Self {
        Self {
            board,
            score: 0,
            status: GameStatus::InProgress,
            last: Resolution::default(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.board.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.board.height()
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Tile value at (row, col), row 0 at the bottom.
    #[inline]
    pub fn get_cell(&self, row: usize, col: usize) -> Option<u32> {
        self.board.value(row, col)
    }

    #[inline]
    pub fn score(&self) -> u64 {
        self.score
    }

    #[inline]
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Resolution of the most recent lock event.
    #[inline]
    pub fn last_resolution(&self) -> &Resolution {
        &self.last
    }

    /// True if a piece cell at (x, y) would collide. Cells above the top never collide.
    pub fn is_blocked(&self, pos: Position) -> bool {
        if pos.x < 0 || pos.x >= self.width() as i32 || pos.y < 0 {
            return true;
        }
        if pos.y >= self.height() as i32 {
            return false;
        }
        self.board.is_occupied(pos.y as usize, pos.x as usize)
    }

    /// Commit a landed piece and resolve the grid. Does nothing once the game has ended.
    pub fn lock(&mut self, pattern: &Pattern, anchor: Position) -> GameStatus {
        if self.status.is_terminal() {
            warn!(status = ?self.status, "lock ignored after game end");
            return self.status;
        }

        let placement = placement::place(&mut self.board, pattern, anchor);
        debug!(
            x = anchor.x,
            y = anchor.y,
            written = placement.written.len(),
            out_of_bounds = placement.out_of_bounds,
            "placed pattern"
        );
        if placement.overflowed() {
            self.end(GameStatus::Lost);
        }

        let mut resolution = self.settle();
        resolution.overflow = placement.out_of_bounds;
        info!(
            merges = resolution.merges.len(),
            floating = resolution.floating.len(),
            rows = resolution.cleared_rows.len(),
            points = resolution.points,
            occupied = self.board.occupied_count(),
            score = self.score,
            status = ?self.status,
            "lock resolved"
        );
        self.last = resolution.clone();
        self.status
    }

    /// Merge, drop floating tiles, then clear full rows. Scores everything removed or merged.
    pub fn settle(&mut self) -> Resolution {
        let merged = merge::merge_until_settled(&mut self.board);
        let merge_points = merged.points();
        self.score += merge_points;
        if merged.reached_win() {
            self.end(GameStatus::Won);
        }
        debug!(merges = merged.events.len(), passes = merged.passes, "merge settled");

        let floating = connectivity::remove_floating(&mut self.board);
        let floating_points: u64 = floating.iter().map(|f| u64::from(f.value)).sum();
        self.score += floating_points;
        if !floating.is_empty() {
            debug!(count = floating.len(), points = floating_points, "removed floating tiles");
        }

        let cleared_rows = clear_full_rows(&mut self.board);
        let row_points: u64 = cleared_rows.iter().map(ClearedRow::points).sum();
        self.score += row_points;
        if !cleared_rows.is_empty() {
            debug!(rows = cleared_rows.len(), points = row_points, "cleared rows");
        }

        Resolution {
            merges: merged.events,
            merge_passes: merged.passes,
            floating,
            cleared_rows,
            overflow: 0,
            points: merge_points + floating_points + row_points,
        }
    }

    /// Back to an empty board, zero score, in progress.
    pub fn reset(&mut self) {
        self.board.clear();
        self.score = 0;
        self.status = GameStatus::InProgress;
        self.last = Resolution::default();
        info!(width = self.width(), height = self.height(), "grid reset");
    }

    fn end(&mut self, status: GameStatus) {
        if self.status.is_terminal() {
            return;
        }
        info!(?status, score = self.score, "game ended");
        self.status = status;
    }
}

/// Build a board from rows listed bottom-up; 0 is an empty cell.
#[cfg(test)]
pub(crate) fn board_from_rows(width: usize, height: usize, rows: &[&[u32]]) -> Board {
    let mut board = Board::new(width, height);
    for (r, values) in rows.iter().enumerate() {
        for (c, &v) in values.iter().enumerate() {
            if v != 0 {
                board.set(r, c, Cell::Tile(Tile::new(v).unwrap()));
            }
        }
    }
    board
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pattern(rows: &[&[u32]]) -> Pattern {
        Pattern::new(
            rows.iter()
                .map(|r| {
                    r.iter()
                        .map(|&v| (v != 0).then(|| Tile::new(v).unwrap()))
                        .collect()
                })
                .collect(),
        )
        .unwrap()
    }

    fn column(board: &Board, col: usize) -> Vec<u32> {
        (0..board.height())
            .map(|r| board.value(r, col).unwrap_or(0))
            .collect()
    }

    #[test]
    fn test_new_rejects_zero_dimensions() {
        assert_eq!(
            Grid::new(0, 20).unwrap_err(),
            GridError::InvalidDimensions {
                width: 0,
                height: 20
            }
        );
        assert!(Grid::new(12, 0).is_err());
        assert!(Grid::new(12, 20).is_ok());
    }

    #[test]
    fn test_row_clear_scores_sum_and_shifts_rows_down() {
        let full = [2, 4, 2, 4, 2, 4, 2, 4, 2, 4, 2, 4];
        let above = [8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut grid = Grid::from_board(board_from_rows(12, 20, &[&full, &above]));
        let res = grid.settle();
        assert_eq!(res.cleared_rows.len(), 1);
        assert_eq!(res.cleared_rows[0].row, 0);
        assert_eq!(res.cleared_rows[0].points(), 36);
        assert_eq!(grid.score(), 36);
        assert_eq!(grid.get_cell(0, 0), Some(8));
        assert_eq!(grid.board().occupied_count(), 1);
    }

    #[test]
    fn test_clear_full_rows_handles_contiguous_and_split_rows() {
        let mut board = board_from_rows(
            2,
            6,
            &[&[2, 4], &[8, 16], &[2, 0], &[32, 64], &[128, 0]],
        );
        let cleared = clear_full_rows(&mut board);
        let rows: Vec<usize> = cleared.iter().map(|c| c.row).collect();
        assert_eq!(rows, vec![3, 1, 0]);
        assert_eq!(column(&board, 0), vec![2, 128, 0, 0, 0, 0]);
        assert_eq!(column(&board, 1), vec![0; 6]);
    }

    #[test]
    fn test_lock_out_of_bounds_loses_but_writes_in_bounds_cells() {
        let mut grid = Grid::from_board(board_from_rows(3, 4, &[&[2], &[4], &[2]]));
        let status = grid.lock(&pattern(&[&[8], &[16]]), Position::new(0, 3));
        assert_eq!(status, GameStatus::Lost);
        assert_eq!(grid.status(), GameStatus::Lost);
        assert_eq!(column(grid.board(), 0), vec![2, 4, 2, 16]);
        assert_eq!(grid.last_resolution().overflow, 1);
    }

    #[test]
    fn test_merge_to_2048_wins() {
        let mut grid = Grid::from_board(board_from_rows(2, 6, &[&[1024]]));
        let status = grid.lock(&pattern(&[&[1024]]), Position::new(0, 1));
        assert_eq!(status, GameStatus::Won);
        assert_eq!(grid.get_cell(0, 0), Some(2048));
        assert_eq!(grid.score(), 2048);
        assert_eq!(grid.last_resolution().merges.len(), 1);
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let mut grid = Grid::from_board(board_from_rows(2, 6, &[&[1024]]));
        grid.lock(&pattern(&[&[1024]]), Position::new(0, 1));
        let before = grid.board().clone();
        let score = grid.score();

        let status = grid.lock(&pattern(&[&[2]]), Position::new(1, 0));
        assert_eq!(status, GameStatus::Won);
        assert_eq!(grid.board(), &before);
        assert_eq!(grid.score(), score);

        // Overflowing after a win does not turn it into a loss.
        let status = grid.lock(&pattern(&[&[2]]), Position::new(0, 10));
        assert_eq!(status, GameStatus::Won);
    }

    #[test]
    fn test_lost_is_not_overridden_by_a_win_in_the_same_lock() {
        let mut grid = Grid::from_board(board_from_rows(2, 2, &[&[1024]]));
        // Bottom tile merges into 2048, the top one overflows.
        let status = grid.lock(&pattern(&[&[2], &[1024]]), Position::new(0, 1));
        assert_eq!(status, GameStatus::Lost);
        assert_eq!(grid.get_cell(0, 0), Some(2048));
    }

    #[test]
    fn test_lock_scores_merges_and_rows() {
        // A 2 merges onto the left column, then a vertical 16/8 domino fills
        // the middle gap and completes row 0.
        let mut grid = Grid::from_board(board_from_rows(3, 6, &[&[2, 0, 4]]));
        grid.lock(&pattern(&[&[2]]), Position::new(0, 1));
        assert_eq!(grid.get_cell(0, 0), Some(4));
        assert_eq!(grid.score(), 4);

        let status = grid.lock(&pattern(&[&[16], &[8]]), Position::new(1, 0));
        assert_eq!(status, GameStatus::InProgress);
        let res = grid.last_resolution();
        assert_eq!(res.cleared_rows.len(), 1);
        assert_eq!(res.cleared_rows[0].values, vec![4, 8, 4]);
        // 16 shifted down onto the floor.
        assert_eq!(grid.get_cell(0, 1), Some(16));
        assert_eq!(grid.score(), 4 + 16);
    }

    #[test]
    fn test_island_left_by_row_clear_is_removed_on_next_lock() {
        let mut grid = Grid::from_board(board_from_rows(
            3,
            6,
            &[&[2, 0, 0], &[4, 8, 16], &[0, 0, 32]],
        ));
        let res = grid.settle();
        assert_eq!(res.cleared_rows.len(), 1);
        assert_eq!(grid.score(), 28);
        assert_eq!(grid.get_cell(1, 2), Some(32));

        grid.lock(&pattern(&[&[64]]), Position::new(0, 1));
        let res = grid.last_resolution();
        assert_eq!(res.floating.len(), 1);
        assert_eq!(res.floating[0].value, 32);
        assert_eq!(grid.get_cell(1, 2), None);
        assert_eq!(grid.get_cell(1, 0), Some(64));
        assert_eq!(grid.score(), 28 + 32);
    }

    #[test]
    fn test_reset_restores_fresh_grid() {
        let mut grid = Grid::from_board(board_from_rows(2, 4, &[&[1024, 2]]));
        grid.lock(&pattern(&[&[1024]]), Position::new(0, 1));
        assert!(grid.status().is_terminal());

        grid.reset();
        assert_eq!(grid.status(), GameStatus::InProgress);
        assert_eq!(grid.score(), 0);
        assert_eq!(grid.board().occupied_count(), 0);
        assert!(grid.last_resolution().is_empty());
        for r in 0..grid.height() {
            for c in 0..grid.width() {
                assert_eq!(grid.get_cell(r, c), None);
            }
        }
    }

    #[test]
    fn test_settle_is_idempotent_on_settled_grid() {
        let mut grid = Grid::from_board(board_from_rows(
            4,
            8,
            &[&[2, 4, 8, 0], &[4, 8, 0, 0], &[16, 0, 0, 0]],
        ));
        let before = grid.board().clone();
        for _ in 0..2 {
            let res = grid.settle();
            assert!(res.is_empty());
            assert_eq!(grid.board(), &before);
            assert_eq!(grid.score(), 0);
        }
    }

    #[test]
    fn test_is_blocked() {
        let grid = Grid::from_board(board_from_rows(3, 4, &[&[2]]));
        assert!(grid.is_blocked(Position::new(0, 0)));
        assert!(!grid.is_blocked(Position::new(1, 0)));
        assert!(grid.is_blocked(Position::new(-1, 2)));
        assert!(grid.is_blocked(Position::new(3, 2)));
        assert!(grid.is_blocked(Position::new(1, -1)));
        assert!(!grid.is_blocked(Position::new(1, 4)));
    }

    fn arb_board() -> impl Strategy<Value = Board> {
        (1usize..6, 1usize..9).prop_flat_map(|(w, h)| {
            proptest::collection::vec(0u32..5, w * h).prop_map(move |exps| {
                let mut board = Board::new(w, h);
                for (i, e) in exps.into_iter().enumerate() {
                    if e > 0 {
                        board.set(i / w, i % w, Cell::Tile(Tile::new(1 << e).unwrap()));
                    }
                }
                board
            })
        })
    }

    proptest! {
        #[test]
        fn settle_reaches_fixed_point_and_stays_there(board in arb_board()) {
            let limit = board.width() * board.height() + 1;
            let mut grid = Grid::from_board(board);
            let mut rounds = 0;
            while !grid.settle().is_empty() {
                rounds += 1;
                prop_assert!(rounds <= limit);
            }
            let settled = grid.board().clone();
            let score = grid.score();
            let again = grid.settle();
            prop_assert!(again.is_empty());
            prop_assert_eq!(grid.board(), &settled);
            prop_assert_eq!(grid.score(), score);
        }

        #[test]
        fn score_never_decreases_and_matches_resolution(board in arb_board()) {
            let mut grid = Grid::from_board(board);
            let before = grid.score();
            let res = grid.settle();
            prop_assert_eq!(grid.score(), before + res.points);
            prop_assert!(grid.board().occupied_count() <= grid.width() * grid.height());
        }
    }
}
