//! Points, colours, moves, and their GTP text form.
//!
//! A point is a row-major index `x + y * size` with `(0, 0)` at the lower
//! left (`A1` in GTP notation). Neighbour lists are computed from the board
//! size on demand and only ever contain on-board points.

use std::fmt;

use crate::constants::COLUMN_LETTERS;

/// A point on the board, as an index into row-major board storage.
pub type Point = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Black,
    White,
}

impl Color {
    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parses `b`, `black`, `w` or `white` in any case.
    pub fn parse(text: &str) -> Option<Color> {
        match text.to_ascii_lowercase().as_str() {
            "b" | "black" => Some(Color::Black),
            "w" | "white" => Some(Color::White),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "BLACK"),
            Color::White => write!(f, "WHITE"),
        }
    }
}

/// A move in the game.
///
/// The derived order puts every board point before `Pass`, so a list of
/// moves sorted by `Ord` visits points in index order and ends with pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Move {
    Play(Point),
    Pass,
    Resign,
}

impl Move {
    #[inline]
    pub fn point(self) -> Option<Point> {
        match self {
            Move::Play(p) => Some(p),
            _ => None,
        }
    }

    #[inline]
    pub fn is_pass(self) -> bool {
        self == Move::Pass
    }

    /// Dense index over pass and the board points, used by RAVE tables.
    /// Pass is 0 and `Play(p)` is `p + 1`.
    #[inline]
    pub fn rave_index(self) -> usize {
        match self {
            Move::Pass => 0,
            Move::Play(p) => p + 1,
            Move::Resign => panic!("resign has no RAVE slot"),
        }
    }
}

/// Up to eight neighbouring points stored inline.
#[derive(Clone, Copy)]
pub struct Neighbors {
    points: [Point; 8],
    len: u8,
}

impl Neighbors {
    fn new() -> Self {
        Self {
            points: [0; 8],
            len: 0,
        }
    }

    #[inline]
    fn push(&mut self, p: Point) {
        self.points[self.len as usize] = p;
        self.len += 1;
    }
}

impl std::ops::Deref for Neighbors {
    type Target = [Point];

    fn deref(&self) -> &[Point] {
        &self.points[..self.len as usize]
    }
}

/// The orthogonal on-board neighbours of `p`.
#[inline]
pub fn neighbors(p: Point, size: usize) -> Neighbors {
    let (x, y) = (p % size, p / size);
    let mut out = Neighbors::new();
    if y + 1 < size {
        out.push(p + size);
    }
    if x + 1 < size {
        out.push(p + 1);
    }
    if y > 0 {
        out.push(p - size);
    }
    if x > 0 {
        out.push(p - 1);
    }
    out
}

/// The on-board points of the 3x3 square around `p`, excluding `p`.
pub fn neighbors8(p: Point, size: usize) -> Neighbors {
    let (x, y) = ((p % size) as isize, (p / size) as isize);
    let mut out = Neighbors::new();
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (nx, ny) = (x + dx, y + dy);
            if nx >= 0 && ny >= 0 && (nx as usize) < size && (ny as usize) < size {
                out.push(nx as usize + ny as usize * size);
            }
        }
    }
    out
}

/// Parse a GTP vertex (`D4`, `pass`, `resign`) for a board of `size`.
///
/// Returns `None` for malformed text or a point outside the board.
pub fn parse_move(text: &str, size: usize) -> Option<Move> {
    let text = text.trim().to_ascii_uppercase();
    match text.as_str() {
        "PASS" => return Some(Move::Pass),
        "RESIGN" => return Some(Move::Resign),
        _ => {}
    }

    let mut chars = text.chars();
    let letter = u8::try_from(chars.next()?).ok()?;
    let x = COLUMN_LETTERS.iter().position(|&c| c == letter)?;
    let row: usize = chars.as_str().parse().ok()?;
    if x >= size || row == 0 || row > size {
        return None;
    }
    Some(Move::Play(x + (row - 1) * size))
}

/// Format a move as a GTP vertex for a board of `size`.
pub fn move_to_string(mv: Move, size: usize) -> String {
    match mv {
        Move::Pass => "pass".to_string(),
        Move::Resign => "resign".to_string(),
        Move::Play(p) => {
            let (x, y) = (p % size, p / size);
            format!("{}{}", COLUMN_LETTERS[x] as char, y + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        assert_eq!(parse_move("A1", 9), Some(Move::Play(0)));
        assert_eq!(parse_move("j9", 9), Some(Move::Play(80)));
        assert_eq!(parse_move("H1", 9), Some(Move::Play(7)));
        assert_eq!(parse_move("pass", 9), Some(Move::Pass));
        assert_eq!(parse_move("RESIGN", 9), Some(Move::Resign));
        assert_eq!(parse_move("I5", 9), None);
        assert_eq!(parse_move("K1", 9), None);
        assert_eq!(parse_move("A10", 9), None);
        assert_eq!(parse_move("A0", 9), None);
        assert_eq!(parse_move("", 9), None);

        for p in [0, 8, 40, 72, 80] {
            let text = move_to_string(Move::Play(p), 9);
            assert_eq!(parse_move(&text, 9), Some(Move::Play(p)));
        }
        assert_eq!(move_to_string(Move::Play(360), 19), "T19");
    }

    #[test]
    fn test_non_ascii_columns_are_rejected() {
        // U+0141 and U+0142 end in the bytes of 'A' and 'B'.
        assert_eq!(parse_move("Ł1", 9), None);
        assert_eq!(parse_move("ł2", 9), None);
        assert_eq!(parse_move("Á1", 9), None);
        assert_eq!(parse_move("１1", 9), None);
    }

    #[test]
    fn test_move_order_puts_pass_last() {
        let mut moves = vec![Move::Pass, Move::Play(10), Move::Play(2)];
        moves.sort();
        assert_eq!(moves, vec![Move::Play(2), Move::Play(10), Move::Pass]);
    }

    #[test]
    fn test_neighbors() {
        let corner: Vec<_> = neighbors(0, 9).to_vec();
        assert_eq!(corner.len(), 2);
        assert!(corner.contains(&1) && corner.contains(&9));

        assert_eq!(neighbors(40, 9).len(), 4);
        assert_eq!(neighbors(4, 9).len(), 3);
        assert_eq!(neighbors8(40, 9).len(), 8);
        assert_eq!(neighbors8(0, 9).len(), 3);
        assert_eq!(neighbors8(4, 9).len(), 5);
    }

    #[test]
    fn test_color() {
        assert_eq!(Color::Black.opponent(), Color::White);
        assert_eq!(Color::parse("W"), Some(Color::White));
        assert_eq!(Color::parse("black"), Some(Color::Black));
        assert_eq!(Color::parse("red"), None);
    }

    #[test]
    fn test_rave_index() {
        assert_eq!(Move::Pass.rave_index(), 0);
        assert_eq!(Move::Play(0).rave_index(), 1);
        assert_eq!(Move::Play(80).rave_index(), 81);
    }
}
