//! Search configuration.
//!
//! [`SearchConfig`] gathers every tunable of the UCT search. The defaults are
//! the values the engine plays with; front ends override individual fields
//! (see `main.rs`) and [`crate::engine::Engine::new`] validates the result
//! once.

use thiserror::Error;

use crate::constants::{MAX_BOARD_SIZE, MIN_BOARD_SIZE};
use crate::mcts::UctNode;
use crate::position::Superko;
use crate::tree::Tree;

/// How the final move is picked from the root statistics of all workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveSelect {
    /// Most visited move.
    #[default]
    MaxTimesPlayed,
    /// Highest value estimate (wins, RAVE) without the exploration term.
    MaxValueEstimate,
    /// Highest raw win rate.
    MaxMeanWins,
}

impl MoveSelect {
    pub fn parse(text: &str) -> Option<MoveSelect> {
        match text {
            "times_played" => Some(MoveSelect::MaxTimesPlayed),
            "value_estimate" => Some(MoveSelect::MaxValueEstimate),
            "mean_wins" => Some(MoveSelect::MaxMeanWins),
            _ => None,
        }
    }
}

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("at least one search thread is required")]
    NoThreads,
    #[error("expansion threshold must be at least 1")]
    ZeroExpansionThreshold,
    #[error("RAVE weights must be positive (got {initial} / {final_})")]
    BadRaveWeights { initial: f32, final_: f32 },
    #[error("exploration constant must be finite and non-negative (got {0})")]
    BadExploration(f32),
    #[error("grandfather weight must be finite and non-negative (got {0})")]
    BadGrandfatherWeight(f32),
    #[error("{mem_mb} MB holds {nodes} nodes, need at least {needed} for a {size}x{size} board")]
    NotEnoughMemory {
        mem_mb: usize,
        nodes: usize,
        needed: usize,
        size: usize,
    },
    #[error("unsupported board size {0}")]
    BoardSize(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Tree memory per worker, in megabytes.
    pub max_mem_mb: usize,
    pub exploration_constant: f32,
    pub use_ucb1_tuned: bool,
    pub use_rave: bool,
    pub rave_weight_initial: f32,
    pub rave_weight_final: f32,
    /// Credit moves played soon after a node more than moves played late.
    pub weighted_rave: bool,
    pub rave_update_passes: bool,
    /// Only credit a move if the opponent did not play the same point first.
    pub rave_check_same: bool,
    pub include_rave_count_for_exploration: bool,
    /// Heuristic (pattern) rollouts instead of uniformly random ones.
    pub use_patterns: bool,
    /// Visits a leaf needs before it is expanded.
    pub expansion_threshold: u32,
    pub grandfather_weight: f32,
    pub move_select: MoveSelect,
    pub reuse_tree: bool,
    pub resign_if_appropriate: bool,
    pub num_threads: usize,
    /// Simulations per worker per move; 0 means search on the clock.
    pub fixed_playouts: u32,
    pub seed: u64,
    pub superko: Superko,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_mem_mb: 350,
            exploration_constant: 0.1,
            use_ucb1_tuned: false,
            use_rave: true,
            rave_weight_initial: 1.0,
            rave_weight_final: 5000.0,
            weighted_rave: true,
            rave_update_passes: false,
            rave_check_same: false,
            include_rave_count_for_exploration: false,
            use_patterns: true,
            expansion_threshold: 2,
            grandfather_weight: 4.0,
            move_select: MoveSelect::MaxTimesPlayed,
            reuse_tree: false,
            resign_if_appropriate: true,
            num_threads: 1,
            fixed_playouts: 0,
            seed: 0,
            superko: Superko::Positional,
        }
    }
}

impl SearchConfig {
    /// `k1` of the RAVE weight `n / (k1 + k2 n)`.
    #[inline]
    pub fn rave_param1(&self) -> f32 {
        1.0 / self.rave_weight_initial
    }

    #[inline]
    pub fn rave_param2(&self) -> f32 {
        1.0 / self.rave_weight_final
    }

    /// Node capacity of one worker's tree.
    pub fn max_nodes(&self) -> usize {
        (self.max_mem_mb * 1024 * 1024 / Tree::<UctNode>::node_size()).min(u32::MAX as usize)
    }

    /// Check the configuration for searching on a `board_size` board.
    pub fn validate(&self, board_size: usize) -> Result<(), ConfigError> {
        if !(MIN_BOARD_SIZE..=MAX_BOARD_SIZE).contains(&board_size) {
            return Err(ConfigError::BoardSize(board_size));
        }
        if self.num_threads == 0 {
            return Err(ConfigError::NoThreads);
        }
        if self.expansion_threshold == 0 {
            return Err(ConfigError::ZeroExpansionThreshold);
        }
        let weights_ok = |w: f32| w.is_finite() && w > 0.0;
        if !weights_ok(self.rave_weight_initial) || !weights_ok(self.rave_weight_final) {
            return Err(ConfigError::BadRaveWeights {
                initial: self.rave_weight_initial,
                final_: self.rave_weight_final,
            });
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(ConfigError::BadExploration(self.exploration_constant));
        }
        if !self.grandfather_weight.is_finite() || self.grandfather_weight < 0.0 {
            return Err(ConfigError::BadGrandfatherWeight(self.grandfather_weight));
        }
        let needed = min_nodes_for(board_size);
        let nodes = self.max_nodes();
        if nodes < needed {
            return Err(ConfigError::NotEnoughMemory {
                mem_mb: self.max_mem_mb,
                nodes,
                needed,
                size: board_size,
            });
        }
        Ok(())
    }
}

/// Smallest tree that still has room for two full expansions after a cull.
pub fn min_nodes_for(board_size: usize) -> usize {
    2 * (board_size * board_size + 1) + 1
}
