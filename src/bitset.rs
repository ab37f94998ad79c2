//! Fixed-width sets of board points.
//!
//! A [`PointSet`] holds one bit per intersection of the largest supported
//! board, packed into `u64` words. It is `Copy` and all set algebra works
//! word by word, so unions and intersections of liberty sets cost a handful
//! of instructions regardless of the board size in use.

use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

use crate::constants::MAX_POINTS;
use crate::coord::Point;

const WORDS: usize = MAX_POINTS.div_ceil(64);

/// Mask of the bits that correspond to real points in the last word.
const LAST_WORD_MASK: u64 = if MAX_POINTS % 64 == 0 {
    u64::MAX
} else {
    (1u64 << (MAX_POINTS % 64)) - 1
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PointSet {
    words: [u64; WORDS],
}

impl PointSet {
    pub const fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Set containing every point of a `size` x `size` board.
    pub fn full(size: usize) -> Self {
        let mut set = Self::new();
        for p in 0..size * size {
            set.insert(p);
        }
        set
    }

    pub fn singleton(p: Point) -> Self {
        let mut set = Self::new();
        set.insert(p);
        set
    }

    #[inline]
    pub fn insert(&mut self, p: Point) {
        debug_assert!(p < MAX_POINTS);
        self.words[p / 64] |= 1 << (p % 64);
    }

    #[inline]
    pub fn remove(&mut self, p: Point) {
        debug_assert!(p < MAX_POINTS);
        self.words[p / 64] &= !(1 << (p % 64));
    }

    #[inline]
    pub fn contains(&self, p: Point) -> bool {
        p < MAX_POINTS && self.words[p / 64] & (1 << (p % 64)) != 0
    }

    /// Population count.
    #[inline]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Lowest point in the set.
    pub fn first(&self) -> Option<Point> {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != 0)
            .map(|(i, w)| i * 64 + w.trailing_zeros() as usize)
    }

    /// True if exactly `p` is in the set.
    pub fn is_only(&self, p: Point) -> bool {
        self.count() == 1 && self.contains(p)
    }

    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    pub fn iter(&self) -> Iter {
        Iter {
            words: self.words,
            index: 0,
        }
    }
}

/// Iterator over the points of a [`PointSet`] in increasing order.
pub struct Iter {
    words: [u64; WORDS],
    index: usize,
}

impl Iterator for Iter {
    type Item = Point;

    fn next(&mut self) -> Option<Point> {
        while self.index < WORDS {
            let word = &mut self.words[self.index];
            if *word != 0 {
                let bit = word.trailing_zeros() as usize;
                *word &= *word - 1;
                return Some(self.index * 64 + bit);
            }
            self.index += 1;
        }
        None
    }
}

impl IntoIterator for PointSet {
    type Item = Point;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

impl IntoIterator for &PointSet {
    type Item = Point;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

impl FromIterator<Point> for PointSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let mut set = Self::new();
        for p in iter {
            set.insert(p);
        }
        set
    }
}

impl std::fmt::Debug for PointSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

macro_rules! impl_set_op {
    ($op:ident, $method:ident, $assign_op:ident, $assign_method:ident, $tok:tt) => {
        impl $op for PointSet {
            type Output = PointSet;

            #[inline]
            fn $method(mut self, rhs: PointSet) -> PointSet {
                for (a, b) in self.words.iter_mut().zip(rhs.words) {
                    *a = *a $tok b;
                }
                self
            }
        }

        impl $assign_op for PointSet {
            #[inline]
            fn $assign_method(&mut self, rhs: PointSet) {
                for (a, b) in self.words.iter_mut().zip(rhs.words) {
                    *a = *a $tok b;
                }
            }
        }
    };
}

impl_set_op!(BitOr, bitor, BitOrAssign, bitor_assign, |);
impl_set_op!(BitAnd, bitand, BitAndAssign, bitand_assign, &);
impl_set_op!(BitXor, bitxor, BitXorAssign, bitxor_assign, ^);

impl Not for PointSet {
    type Output = PointSet;

    /// Complement within the largest board.
    fn not(mut self) -> PointSet {
        for w in self.words.iter_mut() {
            *w = !*w;
        }
        self.words[WORDS - 1] &= LAST_WORD_MASK;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_remove_contains() {
        let mut set = PointSet::new();
        assert!(set.is_empty());
        set.insert(0);
        set.insert(63);
        set.insert(64);
        set.insert(MAX_POINTS - 1);
        assert_eq!(set.count(), 4);
        assert!(set.contains(63) && set.contains(64));
        set.remove(63);
        assert!(!set.contains(63));
        assert_eq!(set.count(), 3);
        assert!(!set.contains(MAX_POINTS));
    }

    #[test]
    fn test_iteration_is_ordered() {
        let set: PointSet = [200, 3, 65, 127, 128, 360].into_iter().collect();
        let points: Vec<_> = set.iter().collect();
        assert_eq!(points, vec![3, 65, 127, 128, 200, 360]);
        assert_eq!(set.first(), Some(3));
        assert_eq!(PointSet::new().first(), None);
    }

    #[test]
    fn test_set_algebra() {
        let a: PointSet = [1, 2, 3, 100].into_iter().collect();
        let b: PointSet = [3, 4, 100, 300].into_iter().collect();
        assert_eq!((a | b).count(), 6);
        assert_eq!((a & b).iter().collect::<Vec<_>>(), vec![3, 100]);
        assert_eq!((a ^ b).iter().collect::<Vec<_>>(), vec![1, 2, 4, 300]);

        let mut c = a;
        c &= b;
        c |= PointSet::singleton(7);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![3, 7, 100]);
    }

    #[test]
    fn test_complement_stays_in_range() {
        let none = !PointSet::full(19);
        assert!(none.is_empty());
        let all = !PointSet::new();
        assert_eq!(all.count(), MAX_POINTS);
    }

    #[test]
    fn test_is_only() {
        let set = PointSet::singleton(42);
        assert!(set.is_only(42));
        assert!(!set.is_only(41));
        let mut two = set;
        two.insert(41);
        assert!(!two.is_only(42));
    }
}
