//! Floating-tile removal: tiles with no 4-neighbour path to the floor are dropped and scored.

use crate::grid::Board;
use std::collections::HashSet;

const NEIGHBOURS_4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// A tile removed because nothing connected it to row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatingTile {
    pub row: usize,
    pub col: usize,
    pub value: u32,
}

/// Every occupied cell reachable from an occupied floor cell through occupied
/// 4-neighbours. Flood fill with an explicit stack.
pub fn supported_cells(board: &Board) -> HashSet<(usize, usize)> {
    let (w, h) = (board.width(), board.height());
    let mut visited = HashSet::new();
    let mut stack: Vec<(usize, usize)> = (0..w)
        .filter(|&col| board.is_occupied(0, col))
        .map(|col| (0, col))
        .collect();
    visited.extend(stack.iter().copied());

    while let Some((row, col)) = stack.pop() {
        for (dr, dc) in NEIGHBOURS_4 {
            let (Some(nr), Some(nc)) = (row.checked_add_signed(dr), col.checked_add_signed(dc))
            else {
                continue;
            };
            if nr >= h || nc >= w {
                continue;
            }
            if board.is_occupied(nr, nc) && visited.insert((nr, nc)) {
                stack.push((nr, nc));
            }
        }
    }
    visited
}

/// Remove every unsupported tile. Returned bottom-up, left to right.
pub fn remove_floating(board: &mut Board) -> Vec<FloatingTile> {
    let supported = supported_cells(board);
    let mut removed = Vec::new();
    for row in 0..board.height() {
        for col in 0..board.width() {
            if supported.contains(&(row, col)) {
                continue;
            }
            if let Some(tile) = board.take(row, col) {
                removed.push(FloatingTile {
                    row,
                    col,
                    value: tile.value(),
                });
            }
        }
    }
    removed
}
