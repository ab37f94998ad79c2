//! Go position representation and move execution.
//!
//! This module provides the core game logic for Go, including:
//! - Board state with an incremental group forest (one set per chain)
//! - Legality checking with positional or situational superko
//! - Stone placement and capture
//! - Area scoring (Tromp-Taylor)
//!
//! Every chain carries a [`GroupInfo`] token holding the chain's Zobrist
//! hash and its *expanded* set: its stones plus every point adjacent to them.
//! The liberties of a chain are then always `expanded & empty`, and that
//! identity survives merges and captures without ever being recomputed.
//!
//! ## Legality and play
//!
//! [`Position::simulate`] works out everything a move would do (which chains
//! it captures, which it joins, the resulting hash) without touching the
//! position, or reports why the move is illegal. [`Position::play`] runs the
//! same analysis and commits the resulting [`Placement`]. Check-only queries
//! therefore cannot diverge from real play.

use std::fmt;

use thiserror::Error;

use crate::bitset::PointSet;
use crate::constants::{COLUMN_LETTERS, DEFAULT_KOMI, MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::coord::{Color, Move, Point, neighbors};
use crate::disjoint_set::{DisjointSets, Token};
use crate::zobrist::{self, HashHistory};

/// Why a move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("illegal move: point is occupied")]
    Occupied,
    #[error("illegal move: suicide")]
    Suicide,
    #[error("illegal move: repeats an earlier position")]
    Superko,
    #[error("illegal move: {0} is to play")]
    WrongTurn(Color),
    #[error("move cannot be placed on the board")]
    NotPlayable,
}

/// Which repetitions are forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Superko {
    /// Board arrangement alone may not repeat.
    #[default]
    Positional,
    /// Board arrangement plus side to move may not repeat.
    Situational,
    /// Like `Situational`, but positions reached by passing are not recorded.
    NaturalSituational,
}

/// Token attached to every chain.
#[derive(Debug, Clone, Default)]
pub struct GroupInfo {
    /// Xor of the stone keys of the chain.
    pub hash: u64,
    /// Stones of the chain plus all points adjacent to them.
    pub expanded: PointSet,
}

impl Token for GroupInfo {
    fn merge(&mut self, other: &Self) {
        self.hash ^= other.hash;
        self.expanded |= other.expanded;
    }
}

/// Up to four distinct chain roots next to a point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Roots {
    roots: [usize; 4],
    len: u8,
}

impl Roots {
    fn push_unique(&mut self, root: usize) -> bool {
        if self.contains(root) {
            return false;
        }
        self.roots[self.len as usize] = root;
        self.len += 1;
        true
    }

    pub fn contains(&self, root: usize) -> bool {
        self.roots[..self.len as usize].contains(&root)
    }
}

impl std::ops::Deref for Roots {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.roots[..self.len as usize]
    }
}

/// The outcome of a legal move, worked out but not yet committed.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    mv: Move,
    color: Color,
    hash_before: u64,
    hash_after: u64,
    captured: Roots,
    joined: Roots,
}

impl Placement {
    pub fn mv(&self) -> Move {
        self.mv
    }

    /// True if the move removes at least one opponent chain.
    pub fn captures(&self) -> bool {
        !self.captured.is_empty()
    }

    /// Zobrist hash of the position after the move.
    pub fn hash_after(&self) -> u64 {
        self.hash_after
    }
}

/// Area score of a finished (or abandoned) game, komi included.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub black: f32,
    pub white: f32,
}

impl Score {
    pub fn winner(&self) -> Option<Color> {
        if self.black > self.white {
            Some(Color::Black)
        } else if self.white > self.black {
            Some(Color::White)
        } else {
            None
        }
    }

    /// Black's score minus White's.
    pub fn margin(&self) -> f32 {
        self.black - self.white
    }
}

impl fmt::Display for Score {
    /// GTP `final_score` notation (`B+3.5`, `W+0.5`, `0`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let margin = self.margin();
        if margin > 0.0 {
            write!(f, "B+{margin}")
        } else if margin < 0.0 {
            write!(f, "W+{}", -margin)
        } else {
            write!(f, "0")
        }
    }
}

/// Empty-region token used while scoring.
#[derive(Clone, Default)]
struct SpaceInfo {
    touches: [bool; 2],
}

impl Token for SpaceInfo {
    fn merge(&mut self, other: &Self) {
        self.touches[0] |= other.touches[0];
        self.touches[1] |= other.touches[1];
    }
}

/// A Go position (board state plus the history needed for superko).
#[derive(Clone)]
pub struct Position {
    size: usize,
    contents: Vec<Option<Color>>,
    empty: PointSet,
    groups: DisjointSets<GroupInfo>,
    history: HashHistory,
    hash: u64,
    /// Key xored into the hash when the side to move changes (zero under
    /// positional superko).
    turn_key: u64,
    to_play: Color,
    last_move: Option<Move>,
    consecutive_passes: u32,
    move_number: usize,
    komi: f32,
    superko: Superko,
}

impl Position {
    /// An empty `size` x `size` board with Black to move.
    ///
    /// # Panics
    ///
    /// Panics if `size` is outside the supported range.
    pub fn new_game(size: usize, superko: Superko) -> Self {
        assert!(
            (MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&size),
            "unsupported board size {size}"
        );
        let points = size * size;
        let turn_key = match superko {
            Superko::Positional => 0,
            Superko::Situational | Superko::NaturalSituational => zobrist::turn_key(),
        };
        let mut history = HashHistory::default();
        history.insert(0);
        Self {
            size,
            contents: vec![None; points],
            empty: PointSet::full(size),
            groups: DisjointSets::new(points),
            history,
            hash: 0,
            turn_key,
            to_play: Color::Black,
            last_move: None,
            consecutive_passes: 0,
            move_number: 0,
            komi: DEFAULT_KOMI,
            superko,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn num_points(&self) -> usize {
        self.size * self.size
    }

    #[inline]
    pub fn point(&self, x: usize, y: usize) -> Point {
        debug_assert!(x < self.size && y < self.size);
        x + y * self.size
    }

    #[inline]
    pub fn coords(&self, p: Point) -> (usize, usize) {
        (p % self.size, p / self.size)
    }

    #[inline]
    pub fn get(&self, p: Point) -> Option<Color> {
        self.contents[p]
    }

    #[inline]
    pub fn empty_points(&self) -> &PointSet {
        &self.empty
    }

    #[inline]
    pub fn to_play(&self) -> Color {
        self.to_play
    }

    /// Hand the move to `color` without playing anything. The resulting
    /// position is not added to the superko history.
    pub fn set_to_play(&mut self, color: Color) {
        if color != self.to_play {
            self.hash ^= self.turn_key;
            self.to_play = color;
        }
    }

    #[inline]
    pub fn last_move(&self) -> Option<Move> {
        self.last_move
    }

    #[inline]
    pub fn previous_move_was_pass(&self) -> bool {
        self.last_move == Some(Move::Pass)
    }

    /// Two consecutive passes end the game.
    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.consecutive_passes >= 2
    }

    #[inline]
    pub fn move_number(&self) -> usize {
        self.move_number
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn komi(&self) -> f32 {
        self.komi
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.komi = komi;
    }

    pub fn superko(&self) -> Superko {
        self.superko
    }

    /// Chain forest; roots are the representatives of chains.
    pub fn groups(&self) -> &DisjointSets<GroupInfo> {
        &self.groups
    }

    /// Root of the chain through `p`, if `p` holds a stone.
    #[inline]
    pub fn group_of(&self, p: Point) -> Option<usize> {
        self.groups.find(p)
    }

    /// Liberties of the chain rooted at `root`.
    #[inline]
    pub fn liberties(&self, root: usize) -> PointSet {
        self.groups.token(root).expanded & self.empty
    }

    /// Stones of the chain rooted at `root`.
    #[inline]
    pub fn stones(&self, root: usize) -> &PointSet {
        self.groups.members(root)
    }

    /// Colour of the chain rooted at `root`.
    #[inline]
    pub fn group_color(&self, root: usize) -> Color {
        self.contents[root].expect("chain root without a stone")
    }

    // -------------------------------------------------------------------------
    // Legality
    // -------------------------------------------------------------------------

    /// Analyse `mv` for the side to move without changing the position.
    pub fn simulate(&self, mv: Move) -> Result<Placement, MoveError> {
        let color = self.to_play;
        let p = match mv {
            Move::Play(p) => p,
            Move::Pass => {
                return Ok(Placement {
                    mv,
                    color,
                    hash_before: self.hash,
                    hash_after: self.hash ^ self.turn_key,
                    captured: Roots::default(),
                    joined: Roots::default(),
                });
            }
            Move::Resign => return Err(MoveError::NotPlayable),
        };
        assert!(p < self.num_points(), "point {p} is off the board");

        if !self.empty.contains(p) {
            return Err(MoveError::Occupied);
        }

        let mut has_liberty = false;
        let mut captured = Roots::default();
        let mut joined = Roots::default();
        let mut hash = self.hash ^ zobrist::stone_key(p, color) ^ self.turn_key;

        for &n in neighbors(p, self.size).iter() {
            let Some(stone) = self.contents[n] else {
                has_liberty = true;
                continue;
            };
            let root = self.groups.find(n).expect("stone without a chain");
            if stone == color {
                if joined.push_unique(root) && !self.liberties(root).is_only(p) {
                    has_liberty = true;
                }
            } else if !captured.contains(root) && self.liberties(root).is_only(p) {
                captured.push_unique(root);
                hash ^= self.groups.token(root).hash;
            }
        }

        if !has_liberty && captured.is_empty() {
            return Err(MoveError::Suicide);
        }
        if self.history.contains(&hash) {
            return Err(MoveError::Superko);
        }

        Ok(Placement {
            mv,
            color,
            hash_before: self.hash,
            hash_after: hash,
            captured,
            joined,
        })
    }

    #[inline]
    pub fn is_legal(&self, mv: Move) -> bool {
        self.simulate(mv).is_ok()
    }

    /// Legality plus whether the move would capture.
    pub fn query(&self, mv: Move) -> Result<bool, MoveError> {
        self.simulate(mv).map(|placement| placement.captures())
    }

    /// All legal moves for the side to move: board points in index order,
    /// then pass.
    pub fn legal_moves(&self) -> Vec<Move> {
        let mut moves: Vec<Move> = self
            .empty
            .iter()
            .map(Move::Play)
            .filter(|&mv| self.is_legal(mv))
            .collect();
        moves.push(Move::Pass);
        moves
    }

    // -------------------------------------------------------------------------
    // Move application
    // -------------------------------------------------------------------------

    /// Play `mv` for the side to move. Returns the number of stones captured.
    pub fn play(&mut self, mv: Move) -> Result<usize, MoveError> {
        let placement = self.simulate(mv)?;
        Ok(self.commit(placement))
    }

    /// Play `mv` for `color`, rejecting it if `color` is not to move.
    pub fn apply(&mut self, color: Color, mv: Move) -> Result<usize, MoveError> {
        if color != self.to_play {
            return Err(MoveError::WrongTurn(self.to_play));
        }
        self.play(mv)
    }

    /// Commit a placement produced by [`Position::simulate`] on this exact
    /// position. Returns the number of stones captured.
    pub fn commit(&mut self, placement: Placement) -> usize {
        assert_eq!(
            placement.hash_before, self.hash,
            "placement was computed for a different position"
        );
        let color = placement.color;
        let mut captured_stones = 0;

        match placement.mv {
            Move::Play(p) => {
                self.contents[p] = Some(color);
                self.empty.remove(p);

                let mut expanded = PointSet::singleton(p);
                for &n in neighbors(p, self.size).iter() {
                    expanded.insert(n);
                }
                self.groups.create_singleton_with(
                    p,
                    GroupInfo {
                        hash: zobrist::stone_key(p, color),
                        expanded,
                    },
                );

                for &root in placement.captured.iter() {
                    let stones = *self.groups.members(root);
                    captured_stones += stones.count();
                    self.groups.disperse(root);
                    for s in &stones {
                        self.contents[s] = None;
                    }
                    self.empty |= stones;
                }

                for &root in placement.joined.iter() {
                    self.groups.join(p, root);
                }
                self.consecutive_passes = 0;
            }
            Move::Pass => self.consecutive_passes += 1,
            Move::Resign => unreachable!("resign never yields a placement"),
        }

        self.hash = placement.hash_after;
        if !(placement.mv == Move::Pass && self.superko == Superko::NaturalSituational) {
            self.history.insert(self.hash);
        }
        self.to_play = color.opponent();
        self.last_move = Some(placement.mv);
        self.move_number += 1;
        captured_stones
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// True if every neighbour of `p` is a friendly stone whose chain has
    /// another liberty besides `p`.
    pub fn is_self_eye_filling(&self, p: Point) -> bool {
        for &n in neighbors(p, self.size).iter() {
            if self.contents[n] != Some(self.to_play) {
                return false;
            }
            let root = self.groups.find(n).expect("stone without a chain");
            if self.liberties(root).is_only(p) {
                return false;
            }
        }
        true
    }

    /// Area score: stones plus empty regions bordered by a single colour.
    /// Komi goes to White.
    pub fn score(&self) -> Score {
        let mut regions = DisjointSets::<SpaceInfo>::new(self.num_points());
        for p in &self.empty {
            let mut info = SpaceInfo::default();
            for &n in neighbors(p, self.size).iter() {
                if let Some(c) = self.contents[n] {
                    info.touches[c.index()] = true;
                }
            }
            regions.create_singleton_with(p, info);
        }
        for p in &self.empty {
            for &n in neighbors(p, self.size).iter() {
                if n < p && self.empty.contains(n) {
                    regions.join(p, n);
                }
            }
        }

        let mut points = [0usize; 2];
        for stone in self.contents.iter().flatten() {
            points[stone.index()] += 1;
        }
        for &root in regions.roots() {
            let touches = regions.token(root).touches;
            let area = regions.members(root).count();
            match touches {
                [true, false] => points[Color::Black.index()] += area,
                [false, true] => points[Color::White.index()] += area,
                _ => {}
            }
        }

        Score {
            black: points[Color::Black.index()] as f32,
            white: points[Color::White.index()] as f32 + self.komi,
        }
    }

    /// Winner by area score, or `None` for a draw.
    pub fn winner(&self) -> Option<Color> {
        self.score().winner()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header: String = COLUMN_LETTERS[..self.size]
            .iter()
            .map(|&c| format!(" {}", c as char))
            .collect();
        writeln!(f, "   {header}")?;
        for y in (0..self.size).rev() {
            write!(f, "{:>2} ", y + 1)?;
            for x in 0..self.size {
                let c = match self.contents[self.point(x, y)] {
                    Some(Color::Black) => 'X',
                    Some(Color::White) => 'O',
                    None => '.',
                };
                write!(f, " {c}")?;
            }
            writeln!(f, " {:<2}", y + 1)?;
        }
        writeln!(f, "   {header}")?;
        write!(f, "{} to play", self.to_play)
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
