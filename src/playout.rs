//! Rollout (default) policies.
//!
//! A rollout plays a game from a search leaf to the end so that the leaf can
//! be scored. Two policies are available:
//!
//! - [`RolloutPolicy::Random`]: uniformly random legal move that does not
//!   fill one of the player's own eyes; pass when there is none.
//! - [`RolloutPolicy::Heuristic`]: MoGo-style priorities. In order: pass if
//!   that wins, save chains the last move put in atari, play a local 3x3
//!   pattern move next to the last move, take the largest capture, and
//!   finally fall back to the random policy.
//!
//! Games are capped at a few times the number of intersections; past the
//! cap only passes are played so the game is guaranteed to end.

use fastrand::Rng;

use crate::analysis::{
    is_self_atari, largest_available_capture, moves_that_save_group, pass_wins_the_game,
    player_groups_ataried_by_last_move,
};
use crate::constants::MAX_GAME_LEN_FACTOR;
use crate::coord::{Move, neighbors8};
use crate::patterns::PatternMatcher;
use crate::position::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RolloutPolicy {
    Random,
    #[default]
    Heuristic,
}

impl RolloutPolicy {
    /// Pick the next rollout move for the side to move. Always legal.
    pub fn select_move(self, pos: &Position, rng: &mut Rng) -> Move {
        match self {
            RolloutPolicy::Random => random_move(pos, rng),
            RolloutPolicy::Heuristic => heuristic_move(pos, PatternMatcher::shared(), rng),
        }
    }
}

/// Play `pos` out to the end (two consecutive passes), appending every move
/// to `moves`.
pub fn complete_game(pos: &mut Position, policy: RolloutPolicy, rng: &mut Rng, moves: &mut Vec<Move>) {
    let max_moves = MAX_GAME_LEN_FACTOR * pos.num_points();
    let mut played = 0;

    while !pos.is_game_over() {
        let mv = if played < max_moves {
            policy.select_move(pos, rng)
        } else {
            Move::Pass
        };
        pos.play(mv).expect("rollout policy chose an illegal move");
        moves.push(mv);
        played += 1;
    }
}

/// Random legal move that does not fill one of the player's own eyes,
/// scanning the empty points in a random permutation.
pub fn random_move(pos: &Position, rng: &mut Rng) -> Move {
    let mut candidates: Vec<usize> = pos.empty_points().iter().collect();
    let n = candidates.len();
    for i in 0..n {
        let j = rng.usize(i..n);
        candidates.swap(i, j);
        let p = candidates[i];
        if !pos.is_self_eye_filling(p) && pos.is_legal(Move::Play(p)) {
            return Move::Play(p);
        }
    }
    Move::Pass
}

/// MoGo-style rollout move.
pub fn heuristic_move(pos: &Position, matcher: &PatternMatcher, rng: &mut Rng) -> Move {
    if pass_wins_the_game(pos) {
        return Move::Pass;
    }

    if let Some(Move::Play(last)) = pos.last_move() {
        let mut saving: Vec<Move> = Vec::new();
        for root in player_groups_ataried_by_last_move(pos) {
            for mv in moves_that_save_group(pos, root) {
                if !saving.contains(&mv) {
                    saving.push(mv);
                }
            }
        }
        if !saving.is_empty() {
            return saving[rng.usize(..saving.len())];
        }

        let local: Vec<Move> = neighbors8(last, pos.size())
            .iter()
            .copied()
            .filter(|&p| {
                pos.get(p).is_none()
                    && matcher.matches_any(pos, p)
                    && pos.is_legal(Move::Play(p))
                    && !is_self_atari(pos, p)
            })
            .map(Move::Play)
            .collect();
        if !local.is_empty() {
            return local[rng.usize(..local.len())];
        }
    }

    if let Some(capture) = largest_available_capture(pos) {
        return capture;
    }

    random_move(pos, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::parse_move;
    use crate::position::Superko;

    fn setup(size: usize, moves: &[&str]) -> Position {
        let mut pos = Position::new_game(size, Superko::Positional);
        for text in moves {
            pos.play(parse_move(text, size).unwrap()).unwrap();
        }
        pos
    }

    #[test]
    fn test_rollouts_terminate() {
        for policy in [RolloutPolicy::Random, RolloutPolicy::Heuristic] {
            let mut rng = Rng::with_seed(3);
            for size in [5, 9] {
                let mut pos = Position::new_game(size, Superko::Positional);
                let mut moves = Vec::new();
                complete_game(&mut pos, policy, &mut rng, &mut moves);
                assert!(pos.is_game_over());
                assert!(moves.len() >= 2);
                assert!(moves.len() <= MAX_GAME_LEN_FACTOR * size * size + 2);
                assert_eq!(&moves[moves.len() - 2..], &[Move::Pass, Move::Pass]);
            }
        }
    }

    #[test]
    fn test_random_move_never_fills_own_eye() {
        // The black chain A2-B1-B2 has an eye at A1.
        let pos = setup(3, &["A2", "pass", "B1", "pass", "B2", "pass"]);
        let mut rng = Rng::with_seed(1);
        for _ in 0..50 {
            let mv = random_move(&pos, &mut rng);
            assert_ne!(mv, parse_move("A1", 3).unwrap());
        }
    }

    #[test]
    fn test_heuristic_saves_ataried_group() {
        // White D5 is in atari after black D4; the rescue is D6.
        let pos = setup(9, &["C5", "D5", "E5", "pass", "D4"]);
        let mut rng = Rng::with_seed(5);
        for _ in 0..10 {
            let mv = heuristic_move(&pos, PatternMatcher::shared(), &mut rng);
            assert_eq!(mv, parse_move("D6", 9).unwrap());
        }
    }

    #[test]
    fn test_heuristic_passes_when_passing_wins() {
        let pos = setup(9, &["E5", "pass"]);
        let mut rng = Rng::with_seed(5);
        assert_eq!(heuristic_move(&pos, PatternMatcher::shared(), &mut rng), Move::Pass);
    }

    #[test]
    fn test_heuristic_takes_largest_capture() {
        let pos = setup(9, &["B1", "A1", "D1", "E1", "E2", "F1", "F2", "pass"]);
        let mut rng = Rng::with_seed(5);
        let mv = heuristic_move(&pos, PatternMatcher::shared(), &mut rng);
        assert_eq!(mv, parse_move("G1", 9).unwrap());
    }
}
