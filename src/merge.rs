//! Merge engine: vertical 2048-style merging with column gravity between passes.

use crate::grid::{Board, Cell};
use crate::tile::WIN_VALUE;

/// One merge: the lower tile at (row, col) doubled to `value`; the cell above emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeEvent {
    pub row: usize,
    pub col: usize,
    pub value: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub events: Vec<MergeEvent>,
    /// Passes that produced at least one merge.
    pub passes: u32,
}

impl MergeOutcome {
    /// Score earned: the sum of every merged (doubled) value.
    pub fn points(&self) -> u64 {
        self.events.iter().map(|e| u64::from(e.value)).sum()
    }

    pub fn reached_win(&self) -> bool {
        self.events.iter().any(|e| e.value >= WIN_VALUE)
    }
}

/// Run merge passes until one produces no merge, applying gravity after every
/// pass that merged. Each merge removes a tile, so this terminates.
pub fn merge_until_settled(board: &mut Board) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();
    loop {
        let merged = merge_pass(board, &mut outcome.events);
        if merged == 0 {
            break;
        }
        outcome.passes += 1;
        apply_gravity(board);
    }
    outcome
}

/// One pass over every column, bottom to top. After a merge at `row` the scan
/// resumes at `row + 2`, so a freshly doubled tile waits for the next pass.
pub fn merge_pass(board: &mut Board, events: &mut Vec<MergeEvent>) -> usize {
    let mut merged = 0;
    for col in 0..board.width() {
        let mut row = 0;
        while row + 1 < board.height() {
            let pair = (board.tile(row, col), board.tile(row + 1, col));
            match pair {
                (Some(lower), Some(upper)) if lower.value() == upper.value() => {
                    board.take(row + 1, col);
                    if let Some(tile) = board.tile_mut(row, col) {
                        let value = tile.double();
                        events.push(MergeEvent { row, col, value });
                        merged += 1;
                    }
                    row += 2;
                }
                _ => row += 1,
            }
        }
    }
    merged
}

/// Compact every column toward row 0.
pub fn apply_gravity(board: &mut Board) {
    for col in 0..board.width() {
        settle_column(board, col);
    }
}

/// Compact one column toward row 0, keeping the tiles' vertical order.
/// Returns true if anything moved.
pub fn settle_column(board: &mut Board, col: usize) -> bool {
    let mut moved = false;
    let mut write = 0;
    for read in 0..board.height() {
        if !board.is_occupied(read, col) {
            continue;
        }
        if read != write {
            let tile = board.take(read, col);
            board.set(write, col, Cell::from(tile));
            moved = true;
        }
        write += 1;
    }
    moved
}
