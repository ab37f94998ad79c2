//! A team of independent UCT workers searching the same position.
//!
//! Every worker owns its tree, its copy of the position and its random
//! generator (seeded `seed + index`), so the workers share nothing but a
//! stop flag. With more than one worker each runs on its own scoped thread;
//! a single worker searches on the calling thread. Results are combined only
//! when a move is chosen, by summing the root statistics of every worker
//! move by move.

use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};

use log::{Level, log};
use parking_lot::Mutex;

use crate::config::{MoveSelect, SearchConfig};
use crate::constants::{RESIGN_THRESHOLD, SIMULATIONS_PER_PONDER};
use crate::coord::{Move, move_to_string};
use crate::mcts::{Outcome, UctNode, UctWorker, Urgency, value_upper_bound};
use crate::position::{MoveError, Position};

/// When a search stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchLimit {
    Time(Duration),
    /// Simulations per worker.
    Simulations(u32),
}

/// Root statistics of one move summed over all workers.
#[derive(Debug, Clone, Copy, Default)]
struct MoveTotals {
    times_played: u64,
    wins: u64,
    rave_times_played: f32,
    rave_wins: f32,
    proven_loss: bool,
    proven_win: bool,
}

impl MoveTotals {
    fn add(&mut self, node: &UctNode, mover_wins: Outcome) {
        self.times_played += node.times_played as u64;
        self.wins += node.wins as u64;
        self.rave_times_played += node.rave_times_played;
        self.rave_wins += node.rave_wins;
        match node.outcome {
            Outcome::Unknown => {}
            outcome if outcome == mover_wins => self.proven_win = true,
            Outcome::WinFor(_) => self.proven_loss = true,
        }
    }

    fn mean(&self) -> f32 {
        self.wins as f32 / (self.times_played as f32 + 0.0001)
    }

    fn value_estimate(&self, config: &SearchConfig, mv: Move) -> f32 {
        let node = UctNode {
            mv,
            outcome: Outcome::Unknown,
            times_played: self.times_played.min(u32::MAX as u64) as u32,
            wins: self.wins.min(u32::MAX as u64) as u32,
            rave_times_played: self.rave_times_played,
            rave_wins: self.rave_wins,
        };
        value_upper_bound(config, &node, 0.0, 0.0, 0.0, false)
    }

    fn urgency(&self, config: &SearchConfig, mv: Move) -> Urgency {
        if self.proven_loss {
            Urgency::Loss
        } else if self.proven_win {
            Urgency::Win
        } else {
            Urgency::Value(match config.move_select {
                MoveSelect::MaxTimesPlayed => self.times_played as f32,
                MoveSelect::MaxValueEstimate => self.value_estimate(config, mv),
                MoveSelect::MaxMeanWins => self.mean(),
            })
        }
    }
}

pub struct SearchTeam {
    workers: Vec<UctWorker>,
    config: SearchConfig,
}

impl SearchTeam {
    pub fn new(state: &Position, config: SearchConfig) -> Self {
        let workers = (0..config.num_threads)
            .map(|i| UctWorker::new(state.clone(), config.clone(), config.seed.wrapping_add(i as u64)))
            .collect();
        Self { workers, config }
    }

    pub fn workers(&self) -> &[UctWorker] {
        &self.workers
    }

    /// Simulations behind the current root statistics, over all workers.
    pub fn total_playouts(&self) -> u64 {
        self.workers.iter().map(|w| w.root().times_played as u64).sum()
    }

    /// Search until `limit` is reached. Returns the number of simulations
    /// run by all workers together.
    pub fn ponder(&mut self, limit: SearchLimit) -> u64 {
        // Time-limited searches check the stop signal after every simulation.
        let (max_sims, batch) = match limit {
            SearchLimit::Simulations(n) => (Some(n), SIMULATIONS_PER_PONDER),
            SearchLimit::Time(_) => (None, 1),
        };

        if let [worker] = self.workers.as_mut_slice() {
            let deadline = match limit {
                SearchLimit::Time(budget) => Some(Instant::now() + budget),
                SearchLimit::Simulations(_) => None,
            };
            return search(worker, max_sims, batch, || deadline.is_some_and(|d| Instant::now() >= d)) as u64;
        }

        let stop = Mutex::new(false);
        thread::scope(|s| {
            let handles: Vec<_> = self
                .workers
                .iter_mut()
                .map(|worker| {
                    let stop = &stop;
                    s.spawn(move || search(worker, max_sims, batch, || *stop.lock()))
                })
                .collect();

            if let SearchLimit::Time(budget) = limit {
                thread::sleep(budget);
                *stop.lock() = true;
            }

            handles
                .into_iter()
                .map(|h| h.join().expect("search worker panicked") as u64)
                .sum()
        })
    }

    /// Choose a move from the combined root statistics. Logs the per-move
    /// figures at `info` when `verbose`, otherwise at `debug`.
    pub fn select_move(&self, verbose: bool) -> Move {
        let level = if verbose { Level::Info } else { Level::Debug };
        let state = self.workers[0].state();
        let size = state.size();
        let mover_wins = Outcome::WinFor(state.to_play());

        log!(level, "komi: {}", state.komi());
        for (i, worker) in self.workers.iter().enumerate() {
            let summary = worker.summarise_tree();
            log!(
                level,
                "worker {i}: {} playouts, {} nodes, depth mean {:.2} weighted {:.2} max {}",
                worker.root().times_played,
                summary.nodes,
                summary.mean_depth,
                summary.weighted_depth,
                summary.max_depth
            );
        }
        log!(level, "{} total playouts", self.total_playouts());

        let mut totals: BTreeMap<Move, MoveTotals> = BTreeMap::new();
        for worker in &self.workers {
            for child in worker.root_children() {
                totals.entry(child.mv).or_default().add(child, mover_wins);
            }
        }

        let mut best: Option<(Urgency, Move, MoveTotals)> = None;
        for (&mv, t) in &totals {
            log!(
                level,
                "{} = {}, {:.4}, {:.4}",
                move_to_string(mv, size),
                t.times_played,
                t.value_estimate(&self.config, mv),
                t.mean()
            );
            let urgency = t.urgency(&self.config, mv);
            if best.is_none_or(|(b, _, _)| urgency >= b) {
                best = Some((urgency, mv, *t));
            }
        }

        let Some((urgency, best_move, best_totals)) = best else {
            log!(level, "no moves examined, passing");
            return Move::Pass;
        };

        let pv: Vec<String> = self.workers[0]
            .principal_variation(6)
            .into_iter()
            .map(|mv| move_to_string(mv, size))
            .collect();
        log!(level, "principal variation: {}", pv.join(" "));

        let win_chance = match urgency {
            Urgency::Loss => 0.0,
            Urgency::Win => 1.0,
            Urgency::Value(_) => best_totals.mean(),
        };
        log!(
            level,
            "best move {} ({} playouts, win chance {:.1}%)",
            move_to_string(best_move, size),
            best_totals.times_played,
            100.0 * win_chance
        );

        let examined = best_totals.times_played > 0 || urgency == Urgency::Loss;
        if self.config.resign_if_appropriate && examined && win_chance <= RESIGN_THRESHOLD {
            log!(level, "win chance at or below {RESIGN_THRESHOLD}, resigning");
            return Move::Resign;
        }
        best_move
    }

    /// Advance every worker by `mv`.
    pub fn update_after_play(&mut self, mv: Move) -> Result<(), MoveError> {
        for worker in &mut self.workers {
            worker.update_after_play(mv)?;
        }
        Ok(())
    }

    pub fn reset_to_new_state(&mut self, state: &Position) {
        for worker in &mut self.workers {
            worker.reset_to_new_state(state.clone());
        }
    }
}

/// Run batches of up to `batch_size` simulations on `worker` until
/// `max_sims` is reached (if set), perfect play is found, or `stop` says so.
fn search(worker: &mut UctWorker, max_sims: Option<u32>, batch_size: u32, stop: impl Fn() -> bool) -> u32 {
    let mut done = 0;
    loop {
        let batch = match max_sims {
            Some(max) => batch_size.min(max - done),
            None => batch_size,
        };
        if batch == 0 {
            break;
        }
        let ran = worker.ponder(batch);
        done += ran;
        if ran < batch || stop() {
            break;
        }
    }
    done
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{Color, parse_move};
    use crate::position::Superko;

    fn config(threads: usize) -> SearchConfig {
        SearchConfig {
            max_mem_mb: 16,
            num_threads: threads,
            seed: 11,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_fixed_playouts_are_exact() {
        let state = Position::new_game(5, Superko::Positional);
        let mut team = SearchTeam::new(&state, config(1));
        assert_eq!(team.ponder(SearchLimit::Simulations(1234)), 1234);
        assert_eq!(team.total_playouts(), 1234);
    }

    #[test]
    fn test_threads_search_independently() {
        let state = Position::new_game(5, Superko::Positional);
        let mut team = SearchTeam::new(&state, config(3));
        assert_eq!(team.ponder(SearchLimit::Simulations(600)), 1800);
        for worker in team.workers() {
            assert_eq!(worker.root().times_played, 600);
        }
        // Different seeds explore differently.
        let a: Vec<u32> = team.workers()[0].root_children().map(|c| c.times_played).collect();
        let b: Vec<u32> = team.workers()[1].root_children().map(|c| c.times_played).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_time_limit_stops_the_search() {
        let state = Position::new_game(5, Superko::Positional);
        for threads in [1, 2] {
            let mut team = SearchTeam::new(&state, config(threads));
            let start = Instant::now();
            let sims = team.ponder(SearchLimit::Time(Duration::from_millis(100)));
            assert!(sims > 0);
            assert!(start.elapsed() < Duration::from_secs(10));
        }
    }

    #[test]
    fn test_expired_deadline_stops_after_one_simulation() {
        let state = Position::new_game(19, Superko::Positional);
        let mut team = SearchTeam::new(&state, config(1));
        assert_eq!(team.ponder(SearchLimit::Time(Duration::ZERO)), 1);
        assert_eq!(team.total_playouts(), 1);
    }

    #[test]
    fn test_select_without_search_passes() {
        let state = Position::new_game(5, Superko::Positional);
        let team = SearchTeam::new(&state, config(2));
        assert_eq!(team.select_move(false), Move::Pass);
    }

    #[test]
    fn test_selects_a_legal_move() {
        let state = Position::new_game(5, Superko::Positional);
        let mut team = SearchTeam::new(&state, config(2));
        team.ponder(SearchLimit::Simulations(500));
        let mv = team.select_move(false);
        assert!(mv == Move::Resign || state.is_legal(mv));
    }

    #[test]
    fn test_takes_the_proven_win() {
        let mut state = Position::new_game(5, Superko::Positional);
        state.play(parse_move("C3", 5).unwrap()).unwrap();
        state.play(Move::Pass).unwrap();
        let mut team = SearchTeam::new(&state, config(2));
        team.ponder(SearchLimit::Simulations(200));
        assert_eq!(team.select_move(true), Move::Pass);
    }

    #[test]
    fn test_resigns_hopeless_position() {
        // Black fills the centre of a 3x3 board and white is to move with
        // no komi to save it: nothing white does can win.
        let mut state = Position::new_game(3, Superko::Positional);
        state.set_komi(0.5);
        for text in ["B2", "pass", "A2", "pass", "C2", "pass", "B1", "pass", "B3"] {
            state.play(parse_move(text, 3).unwrap()).unwrap();
        }
        assert_eq!(state.to_play(), Color::White);
        let mut team = SearchTeam::new(&state, config(1));
        team.ponder(SearchLimit::Simulations(2000));
        assert_eq!(team.select_move(false), Move::Resign);

        let no_resign = SearchConfig {
            resign_if_appropriate: false,
            ..config(1)
        };
        let mut team = SearchTeam::new(&state, no_resign);
        team.ponder(SearchLimit::Simulations(2000));
        assert_ne!(team.select_move(false), Move::Resign);
    }

    #[test]
    fn test_update_after_play_reaches_every_worker() {
        let state = Position::new_game(5, Superko::Positional);
        let mut team = SearchTeam::new(&state, config(2));
        let c3 = parse_move("C3", 5).unwrap();
        team.update_after_play(c3).unwrap();
        for worker in team.workers() {
            assert_eq!(worker.state().last_move(), Some(c3));
        }
        assert_eq!(team.update_after_play(c3), Err(MoveError::Occupied));
    }
}
