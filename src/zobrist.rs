//! Zobrist hashing of board positions.
//!
//! Each (point, colour) pair owns a random 64-bit key, and a further key
//! stands for "White to move". A position hash is the xor of the keys of its
//! stones, plus the side-to-move key under situational superko rules. All
//! updates are incremental xors.
//!
//! Keys come from a fixed seed, so hashes agree between runs and between
//! threads.

use std::collections::HashSet;
use std::hash::{BuildHasherDefault, Hasher};
use std::sync::OnceLock;

use crate::constants::MAX_POINTS;
use crate::coord::{Color, Point};

const ZOBRIST_SEED: u64 = 0x5EED_600D_CAFE_F00D;

struct Keys {
    stones: [[u64; 2]; MAX_POINTS],
    white_to_move: u64,
}

static KEYS: OnceLock<Keys> = OnceLock::new();

fn keys() -> &'static Keys {
    KEYS.get_or_init(|| {
        let mut rng = fastrand::Rng::with_seed(ZOBRIST_SEED);
        let mut stones = [[0u64; 2]; MAX_POINTS];
        for pair in stones.iter_mut() {
            pair[0] = rng.u64(..);
            pair[1] = rng.u64(..);
        }
        Keys {
            stones,
            white_to_move: rng.u64(..),
        }
    })
}

/// Key of a `color` stone standing on `p`.
#[inline]
pub fn stone_key(p: Point, color: Color) -> u64 {
    keys().stones[p][color.index()]
}

/// Key xored in whenever the side to move changes.
#[inline]
pub fn turn_key() -> u64 {
    keys().white_to_move
}

/// Pass-through hasher for sets keyed by Zobrist hashes, which are already
/// uniformly distributed.
#[derive(Default, Clone, Copy)]
pub struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | b as u64;
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

/// Set of previously seen position hashes.
pub type HashHistory = HashSet<u64, BuildHasherDefault<IdentityHasher>>;
