//! 3x3 pattern matching for rollout move generation.
//!
//! A small set of hand-written shapes (hane, cuts, edge moves) is expanded
//! into every rotation, reflection and colour swap, and every realisation of
//! its wildcards. Each resulting neighbourhood is encoded as an 18-bit
//! integer and looked up in a table of 4^9 entries holding one bit per
//! pattern id, so matching a point costs one encode and one array load.
//!
//! ## Pattern notation
//!
//! Each pattern is a 9-character string, three rows of three cells, the
//! centre cell being the candidate move:
//! - `X`: a stone of one colour
//! - `O`: a stone of the other colour
//! - `.`: empty
//! - `?`: any on-board point
//! - `x`: on-board, not `X`
//! - `o`: on-board, not `O`
//! - `#`: off the board
//!
//! Colour swaps are part of the symmetry set, so `X` stands for either
//! colour. The centre cell of a looked-up neighbourhood always holds the
//! colour of the side to move; patterns with an `X` or `O` centre therefore
//! only fire for one side.

use std::sync::OnceLock;

use crate::coord::{Color, Point};
use crate::position::Position;

/// Number of pattern ids.
pub const NUM_PATTERNS: usize = 12;

pub const PATTERN_NAMES: [&str; NUM_PATTERNS] = [
    "hane_a", "hane_b", "hane_c", "hane_d", "cut1_a", "cut1_b", "cut2", "edge_a", "edge_b",
    "edge_c", "edge_d", "edge_e",
];

const HANE_A: &str = "XOX.?.???";
const HANE_B: &str = "XO..?.?.?";
const HANE_C: &str = "XO?X?.?.?";
const HANE_D: &str = "XOO.X.?.?";
const CUT1_A: &str = "XO?O?????";
/// Protected cuts; subtracted from `CUT1_A`.
const CUT1_B: &str = "XO?O?O?.?";
const CUT2: &str = "?X?O?Oooo";
const EDGE_A: &str = "X.?O??###";
const EDGE_B: &str = "?X?X?O###";
const EDGE_C: &str = "?XO?X?###";
const EDGE_D: &str = "?XO?OX###";
const EDGE_E: &str = "?XOOOX###";

const CUT1_ID: usize = 4;
/// Reserved for the protected-cut shape, which only ever subtracts.
const CUT1_B_ID: usize = 5;

/// Patterns added directly, with their ids. `CUT1_A` is handled separately.
const SIMPLE_PATTERNS: [(usize, &str); 10] = [
    (0, HANE_A),
    (1, HANE_B),
    (2, HANE_C),
    (3, HANE_D),
    (6, CUT2),
    (7, EDGE_A),
    (8, EDGE_B),
    (9, EDGE_C),
    (10, EDGE_D),
    (11, EDGE_E),
];

const TABLE_SIZE: usize = 1 << 18;

const CELL_EMPTY: u32 = 0;
const CELL_BLACK: u32 = 1;
const CELL_WHITE: u32 = 2;
const CELL_OFF_BOARD: u32 = 3;

static SHARED: OnceLock<PatternMatcher> = OnceLock::new();

/// Lookup table from encoded 3x3 neighbourhoods to matching pattern ids.
pub struct PatternMatcher {
    table: Vec<u16>,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternMatcher {
    /// Build the table from the pattern definitions.
    pub fn new() -> Self {
        let mut table = vec![0u16; TABLE_SIZE];

        for (id, src) in SIMPLE_PATTERNS {
            for code in all_codes_for(src) {
                table[code as usize] |= 1 << id;
            }
        }

        // cut1 fires only for unprotected cuts.
        let mut protected = vec![false; TABLE_SIZE];
        for code in all_codes_for(CUT1_B) {
            protected[code as usize] = true;
        }
        for code in all_codes_for(CUT1_A) {
            if !protected[code as usize] {
                table[code as usize] |= 1 << CUT1_ID;
            }
        }

        Self { table }
    }

    /// Process-wide instance, built on first use.
    pub fn shared() -> &'static PatternMatcher {
        SHARED.get_or_init(PatternMatcher::new)
    }

    /// Bitmask of pattern ids matching an encoded neighbourhood.
    #[inline]
    pub fn matching_code(&self, code: u32) -> u16 {
        self.table[code as usize]
    }

    /// Bitmask of pattern ids matching the neighbourhood of empty point `p`.
    #[inline]
    pub fn matching(&self, pos: &Position, p: Point) -> u16 {
        self.matching_code(encode(pos, p))
    }

    #[inline]
    pub fn matches_any(&self, pos: &Position, p: Point) -> bool {
        self.matching(pos, p) != 0
    }

    /// Names of the patterns matching at `p`.
    pub fn matching_names(&self, pos: &Position, p: Point) -> Vec<&'static str> {
        let mask = self.matching(pos, p);
        PATTERN_NAMES
            .iter()
            .enumerate()
            .filter(|(id, _)| mask & (1 << id) != 0)
            .map(|(_, name)| *name)
            .collect()
    }
}

/// Encode the 3x3 neighbourhood of `p`, rows from top (`y + 1`) to bottom,
/// with the centre holding the colour of the side to move.
pub fn encode(pos: &Position, p: Point) -> u32 {
    let size = pos.size() as isize;
    let (x, y) = pos.coords(p);
    let (x, y) = (x as isize, y as isize);
    let mut code = 0;
    for row in 0..3isize {
        for col in 0..3isize {
            let (cx, cy) = (x + col - 1, y + 1 - row);
            let cell = if row == 1 && col == 1 {
                color_cell(pos.to_play())
            } else if cx < 0 || cy < 0 || cx >= size || cy >= size {
                CELL_OFF_BOARD
            } else {
                match pos.get(pos.point(cx as usize, cy as usize)) {
                    Some(c) => color_cell(c),
                    None => CELL_EMPTY,
                }
            };
            code = (code << 2) | cell;
        }
    }
    code
}

fn color_cell(color: Color) -> u32 {
    match color {
        Color::Black => CELL_BLACK,
        Color::White => CELL_WHITE,
    }
}

/// Codes of every symmetry and wildcard realisation of `src`.
fn all_codes_for(src: &str) -> Vec<u32> {
    let src: [u8; 9] = src.as_bytes().try_into().expect("patterns have 9 cells");
    let mut codes = Vec::new();
    pat_enumerate(&src, &mut codes);
    codes.sort_unstable();
    codes.dedup();
    codes
}

/// Enumerate the 16 symmetries: rotations, reflections and colour swaps.
fn pat_enumerate(src: &[u8; 9], codes: &mut Vec<u32>) {
    let mut src = *src;
    pat_enumerate1(&src, codes);
    rot90(&mut src);
    pat_enumerate1(&src, codes);
}

fn pat_enumerate1(src: &[u8; 9], codes: &mut Vec<u32>) {
    let mut src = *src;
    pat_enumerate2(&src, codes);
    vertflip(&mut src);
    pat_enumerate2(&src, codes);
}

fn pat_enumerate2(src: &[u8; 9], codes: &mut Vec<u32>) {
    let mut src = *src;
    pat_enumerate3(&src, codes);
    horizflip(&mut src);
    pat_enumerate3(&src, codes);
}

fn pat_enumerate3(src: &[u8; 9], codes: &mut Vec<u32>) {
    let mut src = *src;
    pat_wildexp(&src, 0, codes);
    swapcolor(&mut src);
    pat_wildexp(&src, 0, codes);
}

/// Expand wildcards from cell `i` on and record the code of each result.
fn pat_wildexp(src: &[u8; 9], i: usize, codes: &mut Vec<u32>) {
    if i == 9 {
        codes.push(compute_code(src));
        return;
    }

    let choices: &[u8] = match src[i] {
        b'?' => b"XO.",
        b'x' => b"O.",
        b'o' => b"X.",
        _ => {
            pat_wildexp(src, i + 1, codes);
            return;
        }
    };
    for &c in choices {
        let mut new_src = *src;
        new_src[i] = c;
        pat_wildexp(&new_src, i + 1, codes);
    }
}

/// Pack a concrete pattern (no wildcards) in the layout used by [`encode`].
/// `X` is stored as black and `O` as white.
fn compute_code(src: &[u8; 9]) -> u32 {
    src.iter().fold(0, |code, &c| {
        let cell = match c {
            b'.' => CELL_EMPTY,
            b'X' => CELL_BLACK,
            b'O' => CELL_WHITE,
            b'#' => CELL_OFF_BOARD,
            other => unreachable!("wildcard {} left in pattern", other as char),
        };
        (code << 2) | cell
    })
}

/// Swap X and O colors in a pattern.
fn swapcolor(src: &mut [u8; 9]) {
    for c in src.iter_mut() {
        *c = match *c {
            b'X' => b'O',
            b'O' => b'X',
            b'x' => b'o',
            b'o' => b'x',
            other => other,
        };
    }
}

/// Swap the top and bottom rows.
fn horizflip(src: &mut [u8; 9]) {
    src.swap(0, 6);
    src.swap(1, 7);
    src.swap(2, 8);
}

/// Swap the left and right columns.
fn vertflip(src: &mut [u8; 9]) {
    src.swap(0, 2);
    src.swap(3, 5);
    src.swap(6, 8);
}

/// 90-degree rotation of a pattern.
fn rot90(src: &mut [u8; 9]) {
    let t = src[0];
    src[0] = src[2];
    src[2] = src[8];
    src[8] = src[6];
    src[6] = t;

    let t = src[1];
    src[1] = src[5];
    src[5] = src[7];
    src[7] = src[3];
    src[3] = t;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::parse_move;
    use crate::position::Superko;

    fn setup(moves: &[&str]) -> Position {
        let mut pos = Position::new_game(9, Superko::Positional);
        for text in moves {
            pos.play(parse_move(text, 9).unwrap()).unwrap();
        }
        pos
    }

    fn pt(text: &str) -> Point {
        parse_move(text, 9).unwrap().point().unwrap()
    }

    #[test]
    fn test_table_is_populated() {
        let matcher = PatternMatcher::new();
        let matched = matcher.table.iter().filter(|&&m| m != 0).count();
        assert!(matched > 1000, "expected many matching codes, got {matched}");
        assert!(matcher.table.iter().all(|m| m & (1 << CUT1_B_ID) == 0));
        for id in (0..NUM_PATTERNS).filter(|&id| id != CUT1_B_ID) {
            assert!(
                matcher.table.iter().any(|m| m & (1 << id) != 0),
                "{} never matches",
                PATTERN_NAMES[id]
            );
        }
    }

    #[test]
    fn test_symmetries_are_closed() {
        let base: [u8; 9] = HANE_C.as_bytes().try_into().unwrap();
        let codes = all_codes_for(HANE_C);
        let mut rotated = base;
        rot90(&mut rotated);
        horizflip(&mut rotated);
        swapcolor(&mut rotated);
        let mut realised = Vec::new();
        pat_wildexp(&rotated, 0, &mut realised);
        for code in realised {
            assert!(codes.binary_search(&code).is_ok());
        }
    }

    #[test]
    fn test_cut1_excludes_protected_cuts() {
        let matcher = PatternMatcher::new();
        let protected: [u8; 9] = *b"XO.O.O...";
        let code = compute_code(&protected);
        assert_eq!(matcher.matching_code(code) & (1 << CUT1_ID), 0);
        let open: [u8; 9] = *b"XO.O.....";
        assert_ne!(matcher.matching_code(compute_code(&open)) & (1 << CUT1_ID), 0);
    }

    #[test]
    fn test_hane_matches_for_both_colors_and_mirrors() {
        let matcher = PatternMatcher::shared();
        // Black C6 and E6 around white D6; D5 is an enclosing hane.
        let pos = setup(&["C6", "D6", "E6"]);
        assert!(matcher.matching_names(&pos, pt("D5")).contains(&"hane_a"));

        // Same shape with colours swapped, black to play.
        let pos = setup(&["D6", "C6", "pass", "E6"]);
        assert!(matcher.matching_names(&pos, pt("D5")).contains(&"hane_a"));

        // Rotated onto the D column from the side.
        let pos = setup(&["F4", "F5", "F6"]);
        assert!(matcher.matching_names(&pos, pt("E5")).contains(&"hane_a"));
    }

    #[test]
    fn test_edge_pattern() {
        let matcher = PatternMatcher::shared();
        // Black D2 and C1, white E1: D1 blocks along the edge.
        let pos = setup(&["D2", "E1", "C1", "pass"]);
        assert!(matcher.matching_names(&pos, pt("D1")).contains(&"edge_b"));
    }

    #[test]
    fn test_empty_neighbourhood_matches_nothing() {
        let matcher = PatternMatcher::shared();
        let pos = setup(&[]);
        assert!(!matcher.matches_any(&pos, pt("E5")));
        assert!(!matcher.matches_any(&pos, pt("A1")));
    }
}
