//! Read-only tactical queries used by the rollout policy.
//!
//! All functions here look at a [`Position`] from the point of view of the
//! side to move ("player") and never change it.

use crate::bitset::PointSet;
use crate::coord::{Move, Point, neighbors};
use crate::position::Position;

/// True if playing `p` would leave the new chain with a single liberty.
///
/// Moves that capture are never counted as self-atari, since the captured
/// stones hand back liberties.
pub fn is_self_atari(pos: &Position, p: Point) -> bool {
    let me = pos.to_play();
    let mut new_liberties = PointSet::new();

    for &n in neighbors(p, pos.size()).iter() {
        match pos.get(n) {
            None => new_liberties.insert(n),
            Some(c) => {
                let root = pos.group_of(n).expect("stone without a chain");
                if c == me {
                    new_liberties |= pos.groups().token(root).expanded;
                } else if pos.liberties(root).is_only(p) {
                    return false;
                }
            }
        }
    }

    new_liberties &= *pos.empty_points();
    new_liberties.remove(p);
    new_liberties.count() == 1
}

/// Roots of the player's chains next to the last move that are now in
/// atari, without duplicates.
pub fn player_groups_ataried_by_last_move(pos: &Position) -> Vec<usize> {
    let mut ataried = Vec::new();
    let Some(Move::Play(last)) = pos.last_move() else {
        return ataried;
    };
    for &n in neighbors(last, pos.size()).iter() {
        if pos.get(n) != Some(pos.to_play()) {
            continue;
        }
        let root = pos.group_of(n).expect("stone without a chain");
        if pos.liberties(root).count() == 1 && !ataried.contains(&root) {
            ataried.push(root);
        }
    }
    ataried
}

/// Legal moves that rescue the player's chain at `root`, which must be in
/// atari: captures of adjacent opponent chains that are themselves in atari,
/// and extending at the last liberty when that is not self-atari.
pub fn moves_that_save_group(pos: &Position, root: usize) -> Vec<Move> {
    let expanded = pos.groups().token(root).expanded;
    let liberties = expanded & *pos.empty_points();
    debug_assert_eq!(liberties.count(), 1);

    let mut moves = Vec::new();
    for &other in pos.groups().roots() {
        if pos.group_color(other) == pos.to_play() {
            continue;
        }
        if (*pos.stones(other) & expanded).is_empty() {
            continue;
        }
        let their_liberties = pos.liberties(other);
        if their_liberties.count() == 1 {
            let capture = Move::Play(their_liberties.first().expect("one liberty"));
            if pos.is_legal(capture) && !moves.contains(&capture) {
                moves.push(capture);
            }
        }
    }

    if let Some(escape) = liberties.first() {
        let extension = Move::Play(escape);
        if pos.is_legal(extension) && !is_self_atari(pos, escape) && !moves.contains(&extension)
        {
            moves.push(extension);
        }
    }
    moves
}

/// The legal capture that removes the most opponent stones.
pub fn largest_available_capture(pos: &Position) -> Option<Move> {
    let mut best: Option<(usize, Move)> = None;
    for &root in pos.groups().roots() {
        if pos.group_color(root) == pos.to_play() {
            continue;
        }
        let liberties = pos.liberties(root);
        if liberties.count() != 1 {
            continue;
        }
        let size = pos.stones(root).count();
        if best.is_some_and(|(best_size, _)| best_size >= size) {
            continue;
        }
        let capture = Move::Play(liberties.first().expect("one liberty"));
        if pos.is_legal(capture) {
            best = Some((size, capture));
        }
    }
    best.map(|(_, mv)| mv)
}

/// True if the opponent just passed and passing now would end the game
/// with the player winning.
pub fn pass_wins_the_game(pos: &Position) -> bool {
    pos.previous_move_was_pass() && pos.winner() == Some(pos.to_play())
}
