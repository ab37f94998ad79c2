//! The engine facade: the game position plus a search team kept in step
//! with it.
//!
//! Front ends talk only to [`Engine`]. It validates the configuration once,
//! checks every move before handing it to the workers, and turns a
//! [`SearchBudget`] into a concrete search limit.

use std::time::Duration;

use log::{Level, log};

use crate::config::{ConfigError, SearchConfig};
use crate::coord::{Color, Move, move_to_string};
use crate::position::{MoveError, Position, Score, Superko};
use crate::team::{SearchLimit, SearchTeam};
use crate::time::move_budget;

/// How long to think about one move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBudget {
    /// Exactly this long.
    Time(Duration),
    /// A share of what is left on the clock.
    ClockRemaining(Duration),
    /// This many simulations per worker.
    Playouts(u32),
}

/// What happened when a move was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveInfo {
    pub color: Color,
    pub mv: Move,
    pub captured: usize,
}

pub struct Engine {
    state: Position,
    config: SearchConfig,
    team: SearchTeam,
}

impl Engine {
    pub fn new(state: Position, config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate(state.size())?;
        let team = SearchTeam::new(&state, config.clone());
        Ok(Self { state, config, team })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn state(&self) -> &Position {
        &self.state
    }

    /// Start a new game on a `size` x `size` board, keeping the komi.
    pub fn new_game(&mut self, size: usize, superko: Superko) -> Result<(), ConfigError> {
        self.config.validate(size)?;
        let mut state = Position::new_game(size, superko);
        state.set_komi(self.state.komi());
        self.reset_to_state(state)
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.state.set_komi(komi);
        self.team.reset_to_new_state(&self.state);
    }

    /// Replace the game position; search trees start over.
    pub fn reset_to_state(&mut self, state: Position) -> Result<(), ConfigError> {
        self.config.validate(state.size())?;
        self.team.reset_to_new_state(&state);
        self.state = state;
        Ok(())
    }

    /// Give the move to `color`, as if the other side had made a move
    /// that left the board unchanged. Search trees start over.
    pub fn set_to_play(&mut self, color: Color) {
        if color != self.state.to_play() {
            self.state.set_to_play(color);
            self.team.reset_to_new_state(&self.state);
        }
    }

    /// Play `mv` for `color`, which must be the side to move.
    pub fn apply(&mut self, color: Color, mv: Move) -> Result<MoveInfo, MoveError> {
        let captured = self.state.apply(color, mv)?;
        self.team.update_after_play(mv)?;
        Ok(MoveInfo { color, mv, captured })
    }

    /// Play `mv` for the side to move. Resignations are ignored.
    pub fn notify_move_played(&mut self, mv: Move) -> Result<(), MoveError> {
        if mv == Move::Resign {
            return Ok(());
        }
        self.state.play(mv)?;
        self.team.update_after_play(mv)
    }

    pub fn is_legal(&self, mv: Move) -> bool {
        self.state.is_legal(mv)
    }

    pub fn to_play(&self) -> Color {
        self.state.to_play()
    }

    pub fn previous_move(&self) -> Option<Move> {
        self.state.last_move()
    }

    pub fn render(&self) -> String {
        self.state.to_string()
    }

    pub fn score(&self) -> Score {
        self.state.score()
    }

    pub fn winner(&self) -> Option<Color> {
        self.state.winner()
    }

    /// Search and return the move to play for the side to move. The move is
    /// not played; report it back with [`Engine::notify_move_played`].
    pub fn request_move(&mut self, budget: SearchBudget, verbose: bool) -> Move {
        let level = if verbose { Level::Info } else { Level::Debug };
        let empties = self.state.empty_points().count();

        let limit = match budget {
            SearchBudget::Playouts(n) => SearchLimit::Simulations(n),
            _ if self.config.fixed_playouts > 0 => SearchLimit::Simulations(self.config.fixed_playouts),
            SearchBudget::Time(d) => SearchLimit::Time(d),
            SearchBudget::ClockRemaining(left) => {
                let d = move_budget(left, empties);
                log!(
                    level,
                    "thinking for {} ms of {} ms left, {empties} empty points",
                    d.as_millis(),
                    left.as_millis()
                );
                SearchLimit::Time(d)
            }
        };

        let simulations = self.team.ponder(limit);
        log!(level, "{simulations} simulations this move");

        let mv = self.team.select_move(verbose);
        log!(
            level,
            "{} plays {}",
            self.state.to_play(),
            move_to_string(mv, self.state.size())
        );
        mv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::parse_move;

    fn engine(size: usize) -> Engine {
        let config = SearchConfig {
            max_mem_mb: 16,
            seed: 7,
            ..SearchConfig::default()
        };
        Engine::new(Position::new_game(size, Superko::Positional), config).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SearchConfig {
            num_threads: 0,
            ..SearchConfig::default()
        };
        let result = Engine::new(Position::new_game(9, Superko::Positional), config);
        assert!(matches!(result, Err(ConfigError::NoThreads)));
    }

    #[test]
    fn test_apply_checks_turn_and_legality() {
        let mut engine = engine(9);
        let e5 = parse_move("E5", 9).unwrap();
        assert_eq!(
            engine.apply(Color::White, e5),
            Err(MoveError::WrongTurn(Color::Black))
        );
        let info = engine.apply(Color::Black, e5).unwrap();
        assert_eq!(info.captured, 0);
        assert_eq!(engine.to_play(), Color::White);
        assert_eq!(engine.previous_move(), Some(e5));
        assert_eq!(engine.apply(Color::White, e5), Err(MoveError::Occupied));
        assert!(!engine.is_legal(e5));
    }

    #[test]
    fn test_resign_is_ignored() {
        let mut engine = engine(9);
        engine.notify_move_played(Move::Resign).unwrap();
        assert_eq!(engine.to_play(), Color::Black);
        assert_eq!(engine.previous_move(), None);
    }

    #[test]
    fn test_request_move_is_legal() {
        let mut engine = engine(5);
        let mv = engine.request_move(SearchBudget::Playouts(300), false);
        assert!(engine.is_legal(mv));
        engine.notify_move_played(mv).unwrap();
        assert_eq!(engine.to_play(), Color::White);
    }

    #[test]
    fn test_new_game_keeps_komi() {
        let mut engine = engine(9);
        engine.set_komi(0.5);
        engine.apply(Color::Black, Move::Pass).unwrap();
        engine.new_game(7, Superko::Situational).unwrap();
        assert_eq!(engine.state().size(), 7);
        assert_eq!(engine.state().superko(), Superko::Situational);
        assert_eq!(engine.state().komi(), 0.5);
        assert_eq!(engine.to_play(), Color::Black);
        assert!(engine.new_game(25, Superko::Positional).is_err());
    }

    #[test]
    fn test_set_to_play_lets_either_side_search() {
        let mut engine = engine(5);
        engine.set_to_play(Color::White);
        assert_eq!(engine.to_play(), Color::White);
        for worker in engine.team.workers() {
            assert_eq!(worker.state().to_play(), Color::White);
        }

        let mv = engine.request_move(SearchBudget::Playouts(200), false);
        if mv != Move::Resign {
            engine.apply(Color::White, mv).unwrap();
            assert_eq!(engine.to_play(), Color::Black);
        }
    }

    #[test]
    fn test_double_pass_scores_komi() {
        let mut engine = engine(9);
        engine.apply(Color::Black, Move::Pass).unwrap();
        engine.apply(Color::White, Move::Pass).unwrap();
        assert!(engine.state().is_game_over());
        assert_eq!(engine.winner(), Some(Color::White));
        assert_eq!(engine.score().to_string(), "W+6.5");
    }
}
