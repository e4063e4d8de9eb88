//! Per-move time allocation.
//!
//! `TimeControl` mirrors the handful of fields a UCI `go` command can carry
//! for one side; `compute_millis_for_move` turns that into a single budget
//! for the move about to be searched. The search loop itself does not poll
//! a clock: callers are expected to check elapsed time against the budget
//! between iterative-deepening depths.

/// Time control for one side, as handed over by a `go` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeControl {
    /// Remaining time for this side, in milliseconds.
    pub base_ms: u64,
    /// Increment added after each move, in milliseconds.
    pub increment_ms: u64,
    /// Moves remaining until the next time control, if the protocol sent one.
    pub moves_to_go: Option<u32>,
    /// Fixed per-move time, overriding the base/increment calculation entirely.
    pub fixed_move_time_ms: Option<u64>,
}

impl TimeControl {
    #[must_use]
    pub fn fixed(move_time_ms: u64) -> Self {
        TimeControl { fixed_move_time_ms: Some(move_time_ms), ..TimeControl::default() }
    }

    #[must_use]
    pub fn incremental(base_ms: u64, increment_ms: u64, moves_to_go: Option<u32>) -> Self {
        TimeControl { base_ms, increment_ms, moves_to_go, fixed_move_time_ms: None }
    }

    /// Milliseconds to spend searching the current move, given the fullmove
    /// number the position is on.
    ///
    /// A fixed move time always wins. Otherwise moves-to-go defaults to
    /// whichever is larger: the protocol's own count, or an estimate that
    /// assumes ten more moves than usual in the opening/middlegame and
    /// tapers down as the fullmove counter climbs past move 10.
    #[must_use]
    pub fn compute_millis_for_move(&self, fullmove: u32) -> u64 {
        if let Some(fixed) = self.fixed_move_time_ms {
            return fixed.max(1);
        }

        let estimate = 10 + (20i64 - 10 - i64::from(fullmove)).max(0);
        let moves_to_go_effective = self.moves_to_go.map_or(estimate as u64, |given| {
            u64::from(given).max(estimate as u64)
        });

        let share = self.base_ms / moves_to_go_effective.max(1);
        let with_increment = share + (self.increment_ms as f64 * 0.8) as u64;
        with_increment.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_ignores_base_and_increment() {
        let tc = TimeControl::fixed(2500);
        assert_eq!(tc.compute_millis_for_move(1), 2500);
        assert_eq!(tc.compute_millis_for_move(40), 2500);
    }

    #[test]
    fn fixed_zero_is_floored_to_one_millisecond() {
        let tc = TimeControl::fixed(0);
        assert_eq!(tc.compute_millis_for_move(1), 1);
    }

    #[test]
    fn incremental_uses_moves_to_go_when_provided() {
        let tc = TimeControl::incremental(60_000, 0, Some(20));
        assert_eq!(tc.compute_millis_for_move(1), 3_000);
    }

    #[test]
    fn incremental_falls_back_to_estimate_without_moves_to_go() {
        // fullmove 1: estimate = 10 + max(0, 20-10-1) = 19
        let tc = TimeControl::incremental(190_000, 0, None);
        assert_eq!(tc.compute_millis_for_move(1), 10_000);
    }

    #[test]
    fn estimate_floors_at_ten_moves_late_in_the_game() {
        // fullmove 30: estimate = 10 + max(0, 20-10-30) = 10
        let tc = TimeControl::incremental(100_000, 0, None);
        assert_eq!(tc.compute_millis_for_move(30), 10_000);
    }

    #[test]
    fn explicit_moves_to_go_smaller_than_estimate_is_overridden() {
        // estimate at fullmove 1 is 19, so an explicit 5 should not be honored
        let tc = TimeControl::incremental(190_000, 0, Some(5));
        assert_eq!(tc.compute_millis_for_move(1), 10_000);
    }

    #[test]
    fn increment_contributes_eighty_percent() {
        let tc = TimeControl::incremental(0, 1000, Some(1));
        assert_eq!(tc.compute_millis_for_move(1), 800);
    }

    #[test]
    fn zero_time_left_still_returns_at_least_one_millisecond() {
        let tc = TimeControl::incremental(0, 0, Some(1));
        assert_eq!(tc.compute_millis_for_move(1), 1);
    }
}
