//! uct-go: a Monte Carlo tree search Go engine.
//!
//! The engine combines an incremental board representation (chains kept in
//! an augmented union-find, Zobrist hashing for superko) with a UCT search
//! enhanced by RAVE and pattern-guided rollouts. Several independent search
//! trees can run in parallel and are merged when a move is chosen.
//!
//! ## Modules
//!
//! - [`constants`] - Board limits and engine parameters
//! - [`bitset`] - Fixed-size point sets
//! - [`coord`] - Colors, points, moves and GTP vertices
//! - [`disjoint_set`] - Union-find over points with per-set tokens
//! - [`zobrist`] - Position hashing
//! - [`position`] - Core game logic (legality, captures, superko, scoring)
//! - [`analysis`] - Tactical queries used by the rollouts
//! - [`patterns`] - 3x3 pattern matcher
//! - [`playout`] - Rollout policies
//! - [`tree`] - Arena search tree with compaction
//! - [`mcts`] - UCT/RAVE search worker
//! - [`config`] - Search configuration
//! - [`time`] - Thinking-time allocation
//! - [`team`] - Parallel search team
//! - [`engine`] - The facade used by front ends
//! - [`gtp`] - Go Text Protocol front end
//!
//! ## Example
//!
//! ```
//! use uct_go::config::SearchConfig;
//! use uct_go::coord::{Color, parse_move};
//! use uct_go::engine::{Engine, SearchBudget};
//! use uct_go::position::{Position, Superko};
//!
//! let config = SearchConfig { max_mem_mb: 16, ..SearchConfig::default() };
//! let mut engine = Engine::new(Position::new_game(9, Superko::Positional), config).unwrap();
//!
//! // Play a move
//! engine.apply(Color::Black, parse_move("E5", 9).unwrap()).unwrap();
//!
//! // Search for White's reply
//! let reply = engine.request_move(SearchBudget::Playouts(200), false);
//! assert!(engine.is_legal(reply) || reply == uct_go::coord::Move::Resign);
//! ```

pub mod analysis;
pub mod bitset;
pub mod config;
pub mod constants;
pub mod coord;
pub mod disjoint_set;
pub mod engine;
pub mod gtp;
pub mod mcts;
pub mod patterns;
pub mod playout;
pub mod position;
pub mod team;
pub mod time;
pub mod tree;
pub mod zobrist;
