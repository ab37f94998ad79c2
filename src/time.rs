//! Thinking-time allocation.

use std::time::Duration;

use log::warn;

use crate::constants::{TIME_EMPTY_OFFSET, TIME_MAX_FRACTION, TIME_MIN_BUDGET_SECS, TIME_RESERVE_SECS};

/// Time to spend on one move with `remaining` on the clock and `empties`
/// empty points on the board.
///
/// A reserve of a few seconds is never touched. The rest is divided by
/// `sqrt(empties + 15)`, so the budget grows as the board fills up, but never more
/// than a third of it and never less than [`TIME_MIN_BUDGET_SECS`].
pub fn move_budget(remaining: Duration, empties: usize) -> Duration {
    let usable = remaining.as_secs_f64() - TIME_RESERVE_SECS;
    let budget = (usable / (empties as f64 + TIME_EMPTY_OFFSET).sqrt()).min(usable * TIME_MAX_FRACTION);
    if budget < TIME_MIN_BUDGET_SECS {
        warn!(
            "only {:.1} s left on the clock, thinking for the minimum {TIME_MIN_BUDGET_SECS} s",
            remaining.as_secs_f64()
        );
        return Duration::from_secs_f64(TIME_MIN_BUDGET_SECS);
    }
    Duration::from_secs_f64(budget)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_formula() {
        // 65 s left, 49 empties: 60 / sqrt(64) = 7.5 s.
        let budget = move_budget(Duration::from_secs(65), 49);
        assert!((budget.as_secs_f64() - 7.5).abs() < 1e-3);
    }

    #[test]
    fn test_budget_never_exceeds_a_third() {
        for empties in [0, 1, 25, 361] {
            let budget = move_budget(Duration::from_secs(65), empties);
            assert!(budget.as_secs_f64() <= 20.0 + 1e-3);
        }
        // 60 / sqrt(15)
        let budget = move_budget(Duration::from_secs(65), 0);
        assert!((budget.as_secs_f64() - 15.49).abs() < 1e-2);
    }

    #[test]
    fn test_budget_floor() {
        assert_eq!(move_budget(Duration::from_secs(3), 81), Duration::from_secs_f64(0.1));
        assert_eq!(move_budget(Duration::ZERO, 0), Duration::from_secs_f64(0.1));
    }

    #[test]
    fn test_more_empties_less_time() {
        let early = move_budget(Duration::from_secs(600), 361);
        let late = move_budget(Duration::from_secs(600), 50);
        assert!(early < late);
    }
}
