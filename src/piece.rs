//! Falling tetromino of numbered tiles: movement, rotation, collision and the
//! trimmed pattern handed to the grid when it locks.

use crate::grid::Grid;
use crate::placement::{Pattern, PatternError, Position};
use crate::tile::Tile;
use rand::Rng;

/// Tetromino kinds (I, O, Z, L, J, S, T).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TetrominoKind {
    I,
    O,
    Z,
    L,
    J,
    S,
    T,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::Z, Self::L, Self::J, Self::S, Self::T];

    /// Side of the square matrix the piece rotates in.
    pub fn size(self) -> usize {
        match self {
            Self::I => 4,
            Self::O => 2,
            _ => 3,
        }
    }

    /// Occupied (row, col) cells in the spawn orientation; row 0 is the top.
    pub fn cells(self) -> &'static [(usize, usize); 4] {
        match self {
            Self::I => &[(1, 0), (1, 1), (1, 2), (1, 3)],
            Self::O => &[(0, 0), (0, 1), (1, 0), (1, 1)],
            Self::Z => &[(0, 0), (0, 1), (1, 1), (1, 2)],
            Self::S => &[(0, 1), (0, 2), (1, 0), (1, 1)],
            Self::T => &[(0, 0), (0, 1), (0, 2), (1, 1)],
            Self::L => &[(0, 2), (1, 0), (1, 1), (1, 2)],
            Self::J => &[(0, 0), (1, 0), (1, 1), (1, 2)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Down,
}

impl Direction {
    fn delta(self) -> (i32, i32) {
        match self {
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::Down => (0, -1),
        }
    }
}

/// Current piece: an n x n tile matrix plus the grid position of its bottom-left cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tetromino {
    pub kind: TetrominoKind,
    tiles: Vec<Vec<Option<Tile>>>,
    pub bottom_left: Position,
}

impl Tetromino {
    /// New piece with a random 2/4 tile in every occupied cell, anchored at the origin.
    pub fn new<R: Rng + ?Sized>(kind: TetrominoKind, rng: &mut R) -> Self {
        let n = kind.size();
        let mut tiles = vec![vec![None; n]; n];
        for &(r, c) in kind.cells() {
            tiles[r][c] = Some(Tile::random(rng));
        }
        Self {
            kind,
            tiles,
            bottom_left: Position::default(),
        }
    }

    /// Place at the top of the grid at a random column. The matrix's bottom row
    /// starts on the top grid row; if that collides the piece is raised until it
    /// fits, which is always possible above the grid.
    pub fn spawn<R: Rng + ?Sized>(&mut self, grid: &Grid, rng: &mut R) {
        let n = self.size() as i32;
        let max_x = (grid.width() as i32 - n).max(0);
        self.bottom_left = Position::new(rng.random_range(0..=max_x), grid.height() as i32 - 1);
        while !self.fits(grid) && self.bottom_left.y <= grid.height() as i32 {
            self.bottom_left.y += 1;
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.tiles.len()
    }

    pub fn tile(&self, row: usize, col: usize) -> Option<Tile> {
        self.tiles.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Grid position of a matrix cell.
    pub fn cell_position(&self, row: usize, col: usize) -> Position {
        Position {
            x: self.bottom_left.x + col as i32,
            y: self.bottom_left.y + (self.size() - 1 - row) as i32,
        }
    }

    /// Every occupied cell with its tile and grid position.
    pub fn occupied(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.tiles.iter().enumerate().flat_map(move |(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, t)| t.map(|t| (self.cell_position(r, c), t)))
        })
    }

    pub fn fits(&self, grid: &Grid) -> bool {
        self.occupied().all(|(pos, _)| !grid.is_blocked(pos))
    }

    /// Move one cell; a blocked move leaves the piece where it was.
    pub fn try_move(&mut self, direction: Direction, grid: &Grid) -> bool {
        let (dx, dy) = direction.delta();
        let old = self.bottom_left;
        self.bottom_left = Position::new(old.x + dx, old.y + dy);
        if self.fits(grid) {
            true
        } else {
            self.bottom_left = old;
            false
        }
    }

    /// Rotate the matrix clockwise; reverted if the result collides.
    pub fn rotate_cw(&mut self, grid: &Grid) -> bool {
        let n = self.size();
        let rotated: Vec<Vec<Option<Tile>>> = (0..n)
            .map(|r| (0..n).map(|c| self.tiles[n - 1 - c][r]).collect())
            .collect();
        let old = std::mem::replace(&mut self.tiles, rotated);
        if self.fits(grid) {
            true
        } else {
            self.tiles = old;
            false
        }
    }

    /// Drop straight down until blocked. Returns rows fallen.
    pub fn hard_drop(&mut self, grid: &Grid) -> u32 {
        let mut rows = 0;
        while self.try_move(Direction::Down, grid) {
            rows += 1;
        }
        rows
    }

    /// Tile pattern trimmed to its bounding box (row 0 topmost) and the grid
    /// position of that box's bottom-left cell.
    pub fn locking_pattern(&self) -> Result<(Pattern, Position), PatternError> {
        let n = self.size();
        let occupied = |r: usize, c: usize| self.tiles[r][c].is_some();
        let rows: Vec<usize> = (0..n).filter(|&r| (0..n).any(|c| occupied(r, c))).collect();
        let cols: Vec<usize> = (0..n).filter(|&c| (0..n).any(|r| occupied(r, c))).collect();
        let (Some(&top), Some(&bottom), Some(&left), Some(&right)) =
            (rows.first(), rows.last(), cols.first(), cols.last())
        else {
            return Err(PatternError::NoRows);
        };
        let trimmed = (top..=bottom)
            .map(|r| (left..=right).map(|c| self.tiles[r][c]).collect())
            .collect();
        Ok((Pattern::new(trimmed)?, self.cell_position(bottom, left)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn grid(w: usize, h: usize) -> Grid {
        Grid::new(w, h).unwrap()
    }

    fn piece(kind: TetrominoKind) -> Tetromino {
        Tetromino::new(kind, &mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn test_every_kind_has_four_tiles() {
        for kind in TetrominoKind::ALL {
            let p = piece(kind);
            assert_eq!(p.occupied().count(), 4, "{kind:?}");
            assert!(p.occupied().all(|(_, t)| matches!(t.value(), 2 | 4)));
        }
    }

    #[test]
    fn test_locking_pattern_trims_to_bounding_box() {
        let mut p = piece(TetrominoKind::T);
        p.bottom_left = Position::new(3, 5);
        let (pattern, anchor) = p.locking_pattern().unwrap();
        assert_eq!((pattern.n_rows(), pattern.n_cols()), (2, 3));
        // Matrix row 1 is the lowest occupied row: y = 5 + (3 - 1 - 1).
        assert_eq!(anchor, Position::new(3, 6));
        assert!(pattern.get(1, 0).is_none());
        assert!(pattern.get(1, 1).is_some());

        let mut i = piece(TetrominoKind::I);
        i.bottom_left = Position::new(0, 0);
        let (pattern, anchor) = i.locking_pattern().unwrap();
        assert_eq!((pattern.n_rows(), pattern.n_cols()), (1, 4));
        assert_eq!(anchor, Position::new(0, 2));
    }

    #[test]
    fn test_pattern_cells_map_back_to_piece_cells() {
        let mut p = piece(TetrominoKind::L);
        p.bottom_left = Position::new(2, 4);
        let (pattern, anchor) = p.locking_pattern().unwrap();
        let mut from_pattern = Vec::new();
        for r in 0..pattern.n_rows() {
            for c in 0..pattern.n_cols() {
                if let Some(t) = pattern.get(r, c) {
                    from_pattern.push((pattern.absolute(anchor, r, c), t));
                }
            }
        }
        let mut from_piece: Vec<_> = p.occupied().collect();
        let key = |e: &(Position, Tile)| (e.0.x, e.0.y);
        from_pattern.sort_by_key(key);
        from_piece.sort_by_key(key);
        assert_eq!(from_pattern, from_piece);
    }

    #[test]
    fn test_moves_are_blocked_by_walls_and_floor() {
        let g = grid(4, 6);
        let mut p = piece(TetrominoKind::O);
        p.bottom_left = Position::new(0, 0);
        assert!(!p.try_move(Direction::Left, &g));
        assert!(!p.try_move(Direction::Down, &g));
        assert!(p.try_move(Direction::Right, &g));
        assert!(p.try_move(Direction::Right, &g));
        assert!(!p.try_move(Direction::Right, &g));
        assert_eq!(p.bottom_left, Position::new(2, 0));
    }

    #[test]
    fn test_rotation_four_times_is_identity() {
        let g = grid(10, 20);
        let mut p = piece(TetrominoKind::J);
        p.bottom_left = Position::new(4, 8);
        let before = p.clone();
        for _ in 0..4 {
            assert!(p.rotate_cw(&g));
        }
        assert_eq!(p, before);
    }

    #[test]
    fn test_rotation_reverted_when_blocked() {
        let g = grid(4, 8);
        let mut p = piece(TetrominoKind::I);
        // Horizontal I on the floor; rotating would stick the vertical bar below row 0.
        p.bottom_left = Position::new(0, -2);
        assert!(p.fits(&g));
        let before = p.clone();
        assert!(!p.rotate_cw(&g));
        assert_eq!(p, before);
    }

    #[test]
    fn test_spawn_starts_at_top_and_hard_drop_lands_on_floor() {
        let g = grid(6, 10);
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = Tetromino::new(TetrominoKind::O, &mut rng);
        p.spawn(&g, &mut rng);
        assert_eq!(p.bottom_left.y, 9);
        assert!(p.bottom_left.x >= 0 && p.bottom_left.x <= 4);
        assert_eq!(p.hard_drop(&g), 9);
        assert_eq!(p.bottom_left.y, 0);
    }

    #[test]
    fn test_cells_above_grid_do_not_collide() {
        let g = grid(4, 4);
        let mut p = piece(TetrominoKind::O);
        p.bottom_left = Position::new(0, 10);
        assert!(p.fits(&g));
    }
}
