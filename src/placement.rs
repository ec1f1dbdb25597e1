//! Placement: mapping a landed piece's tile pattern onto absolute grid cells.

use crate::grid::{Board, Cell};
use crate::tile::Tile;
use thiserror::Error;

/// Integer grid coordinate. `y` grows upwards; row 0 is the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern has no rows")]
    NoRows,
    #[error("pattern row {0} has no columns")]
    EmptyRow(usize),
    #[error("pattern row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Rectangular tile pattern of a landed piece. Row 0 is the visually topmost row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    rows: Vec<Vec<Option<Tile>>>,
}

impl Pattern {
    pub fn new(rows: Vec<Vec<Option<Tile>>>) -> Result<Self, PatternError> {
        let expected = rows.first().ok_or(PatternError::NoRows)?.len();
        for (row, cells) in rows.iter().enumerate() {
            if cells.is_empty() {
                return Err(PatternError::EmptyRow(row));
            }
            if cells.len() != expected {
                return Err(PatternError::Ragged {
                    row,
                    expected,
                    found: cells.len(),
                });
            }
        }
        Ok(Self { rows })
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.rows[0].len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<Tile> {
        self.rows.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Absolute grid position of a local pattern cell given the bottom-left anchor.
    pub fn absolute(&self, anchor: Position, row: usize, col: usize) -> Position {
        Position {
            x: anchor.x + col as i32,
            y: anchor.y + (self.n_rows() - 1 - row) as i32,
        }
    }
}

/// What a placement wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placement {
    /// (row, col) of every tile written into the board.
    pub written: Vec<(usize, usize)>,
    /// Tiles that mapped outside the board and were dropped.
    pub out_of_bounds: usize,
}

impl Placement {
    #[inline]
    pub fn overflowed(&self) -> bool {
        self.out_of_bounds > 0
    }
}

/// Write every occupied pattern cell into the board at its absolute position.
/// Cells that land outside the board are counted, not written.
pub fn place(board: &mut Board, pattern: &Pattern, anchor: Position) -> Placement {
    let mut placement = Placement::default();
    for col in 0..pattern.n_cols() {
        for row in 0..pattern.n_rows() {
            let Some(tile) = pattern.get(row, col) else {
                continue;
            };
            let pos = pattern.absolute(anchor, row, col);
            if board.is_inside(pos.y, pos.x) {
                let (r, c) = (pos.y as usize, pos.x as usize);
                board.set(r, c, Cell::Tile(tile));
                placement.written.push((r, c));
            } else {
                placement.out_of_bounds += 1;
            }
        }
    }
    placement
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(v: u32) -> Option<Tile> {
        Some(Tile::new(v).unwrap())
    }

    #[test]
    fn test_pattern_rejects_malformed_shapes() {
        assert_eq!(Pattern::new(vec![]), Err(PatternError::NoRows));
        assert_eq!(Pattern::new(vec![vec![]]), Err(PatternError::EmptyRow(0)));
        assert_eq!(
            Pattern::new(vec![vec![t(2), t(2)], vec![t(2)]]),
            Err(PatternError::Ragged {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_local_row_zero_maps_to_highest_row() {
        // T piece: top row has three tiles, bottom row one in the middle.
        let pattern = Pattern::new(vec![vec![t(2), t(4), t(8)], vec![None, t(16), None]]).unwrap();
        let mut board = Board::new(5, 6);
        let placement = place(&mut board, &pattern, Position::new(1, 2));
        assert!(!placement.overflowed());
        assert_eq!(placement.written.len(), 4);
        assert_eq!(board.value(3, 1), Some(2));
        assert_eq!(board.value(3, 2), Some(4));
        assert_eq!(board.value(3, 3), Some(8));
        assert_eq!(board.value(2, 2), Some(16));
        assert_eq!(board.value(2, 1), None);
        assert_eq!(board.occupied_count(), 4);
    }

    #[test]
    fn test_out_of_bounds_cells_are_counted_not_written() {
        let pattern = Pattern::new(vec![vec![t(2)], vec![t(4)], vec![t(8)]]).unwrap();
        let mut board = Board::new(3, 4);
        // Bottom tile at row 2, then rows 3 and 4; row 4 is above the board.
        let placement = place(&mut board, &pattern, Position::new(0, 2));
        assert_eq!(placement.out_of_bounds, 1);
        assert_eq!(board.value(2, 0), Some(8));
        assert_eq!(board.value(3, 0), Some(4));
    }

    #[test]
    fn test_horizontal_out_of_bounds() {
        let pattern = Pattern::new(vec![vec![t(2), t(4)]]).unwrap();
        let mut board = Board::new(3, 4);
        let placement = place(&mut board, &pattern, Position::new(2, 0));
        assert_eq!(placement.out_of_bounds, 1);
        assert_eq!(board.value(0, 2), Some(2));
    }
}
