//! Constants for board geometry, search defaults, and rollout limits.
//!
//! The board size is chosen at runtime (any size from [`MIN_BOARD_SIZE`] to
//! [`MAX_BOARD_SIZE`]); every fixed-width structure is dimensioned for the
//! largest supported board so that positions of any size share one layout.
//! Points are row-major indices `x + y * size` into that layout.

// =============================================================================
// Board Geometry
// =============================================================================

/// Largest supported board edge.
pub const MAX_BOARD_SIZE: usize = 19;

/// Smallest supported board edge.
pub const MIN_BOARD_SIZE: usize = 2;

/// Number of intersections on the largest board.
pub const MAX_POINTS: usize = MAX_BOARD_SIZE * MAX_BOARD_SIZE;

/// Default board edge for new engines.
pub const DEFAULT_BOARD_SIZE: usize = 9;

/// Default compensation for White.
pub const DEFAULT_KOMI: f32 = 6.5;

/// Column letters used by GTP vertices (no `I`).
pub const COLUMN_LETTERS: &[u8; 19] = b"ABCDEFGHJKLMNOPQRST";

// =============================================================================
// Rollouts
// =============================================================================

/// Rollout length cap, as a multiple of the number of intersections.
/// Past it, the rollout only passes so the game ends.
pub const MAX_GAME_LEN_FACTOR: usize = 4;

// =============================================================================
// Search Parameters
// =============================================================================

/// Simulations a worker runs between two looks at the stop flag.
pub const SIMULATIONS_PER_PONDER: u32 = 500;

/// Culling starts by pruning below this many visits and doubles from there.
pub const INITIAL_CULL_THRESHOLD: u32 = 5;

/// Mean win rate at or below which the engine resigns.
pub const RESIGN_THRESHOLD: f32 = 0.01;

/// Magnitude of the random tie-breaking noise added to selection values.
pub const SELECTION_EPSILON: f32 = 1e-6;

/// Selection value of a child with no visits and no RAVE information.
pub const FIRST_PLAY_URGENCY: f32 = 1.0;

/// Upper bound on the variance term of UCB1-Tuned.
pub const UCB1_TUNED_MAX_VARIANCE: f32 = 0.25;

// =============================================================================
// Time Management
// =============================================================================

/// Seconds kept in reserve from the main clock.
pub const TIME_RESERVE_SECS: f64 = 5.0;

/// Offset added to the empty point count when sharing out the clock.
pub const TIME_EMPTY_OFFSET: f64 = 15.0;

/// A single move never gets more than this fraction of the usable clock.
pub const TIME_MAX_FRACTION: f64 = 1.0 / 3.0;

/// Smallest time budget ever handed to a search, in seconds.
pub const TIME_MIN_BUDGET_SECS: f64 = 0.1;
