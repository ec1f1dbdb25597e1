//! Numbered tiles: a power-of-two value that only ever changes by doubling.

use rand::Rng;
use std::fmt;
use thiserror::Error;

/// Reaching this value on a merge wins the game.
pub const WIN_VALUE: u32 = 2048;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TileError {
    #[error("tile value {0} is not a power of two >= 2")]
    NotPowerOfTwo(u32),
}

/// A single numbered tile. Equality for merging is by value only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    value: u32,
}

impl Tile {
    pub fn new(value: u32) -> Result<Self, TileError> {
        if value < 2 || !value.is_power_of_two() {
            return Err(TileError::NotPowerOfTwo(value));
        }
        Ok(Self { value })
    }

    /// Fresh spawn tile: 2 or 4 with equal odds.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let value = if rng.random_bool(0.5) { 2 } else { 4 };
        Self { value }
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Double in place and return the new value.
    pub fn double(&mut self) -> u32 {
        self.value = self.value.saturating_mul(2);
        self.value
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_new_accepts_powers_of_two() {
        for v in [2, 4, 8, 16, 1024, 2048] {
            assert_eq!(Tile::new(v).unwrap().value(), v);
        }
    }

    #[test]
    fn test_new_rejects_other_values() {
        for v in [0, 1, 3, 6, 12, 2047] {
            assert_eq!(Tile::new(v), Err(TileError::NotPowerOfTwo(v)));
        }
    }

    #[test]
    fn test_double() {
        let mut t = Tile::new(1024).unwrap();
        assert_eq!(t.double(), WIN_VALUE);
        assert_eq!(t.value(), 2048);
    }

    #[test]
    fn test_display_honours_padding() {
        let t = Tile::new(16).unwrap();
        assert_eq!(format!("{t}"), "16");
        assert_eq!(format!("{t:^6}"), "  16  ");
    }

    #[test]
    fn test_random_spawns_two_or_four() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; 2];
        for _ in 0..64 {
            match Tile::random(&mut rng).value() {
                2 => seen[0] = true,
                4 => seen[1] = true,
                v => panic!("unexpected spawn value {v}"),
            }
        }
        assert_eq!(seen, [true, true]);
    }
}
