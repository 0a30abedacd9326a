// Interval-aligned tick boundaries. Boundaries are wall-clock multiples of the
// interval; waiting is done on the monotonic clock, anchored once at start, so
// wall-clock adjustments after start do not shift the cadence.

use std::time::Duration;
use tokio::time::Instant;

/// First boundary strictly after `now_ms`: `now - (now mod interval) + interval`.
pub fn next_aligned(now_ms: i64, interval_ms: i64) -> i64 {
    now_ms - now_ms.rem_euclid(interval_ms) + interval_ms
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextTick {
    /// Boundary the next tick is stamped with.
    pub at: i64,
    /// The previous tick ran past `scheduled + interval`.
    pub overran: bool,
    /// Whole boundaries passed over to catch up.
    pub skipped: u64,
}

/// Next tick after the one scheduled at `scheduled`, computed from the schedule
/// (not from when the work finished) so drift cannot accumulate. After an
/// overrun the next tick fires immediately at the latest boundary <= now.
pub fn plan_next(scheduled: i64, now_ms: i64, interval_ms: i64) -> NextTick {
    let next = scheduled + interval_ms;
    if now_ms <= next {
        return NextTick {
            at: next,
            overran: false,
            skipped: 0,
        };
    }
    let behind = (now_ms - next) / interval_ms;
    NextTick {
        at: next + behind * interval_ms,
        overran: true,
        skipped: behind as u64,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    interval_ms: i64,
    origin_wall_ms: i64,
    origin: Instant,
}

impl TickClock {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, crate::models::now_ms(), Instant::now())
    }

    /// Anchor wall time `wall_ms` to the monotonic instant `origin`.
    pub fn starting_at(interval: Duration, wall_ms: i64, origin: Instant) -> Self {
        Self {
            interval_ms: (interval.as_millis() as i64).max(1),
            origin_wall_ms: wall_ms,
            origin,
        }
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Wall time derived from the monotonic clock.
    pub fn now_ms(&self) -> i64 {
        self.origin_wall_ms + Instant::now().saturating_duration_since(self.origin).as_millis() as i64
    }

    pub fn first_tick(&self) -> i64 {
        next_aligned(self.now_ms(), self.interval_ms)
    }

    pub fn advance(&self, scheduled: i64) -> NextTick {
        plan_next(scheduled, self.now_ms(), self.interval_ms)
    }

    /// Monotonic instant at which the boundary `wall_ms` is reached.
    pub fn deadline(&self, wall_ms: i64) -> Instant {
        let offset = (wall_ms - self.origin_wall_ms).max(0) as u64;
        self.origin + Duration::from_millis(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_aligned_rounds_up_to_boundary() {
        assert_eq!(next_aligned(12_300, 5_000), 15_000);
        assert_eq!(next_aligned(14_999, 5_000), 15_000);
    }

    #[test]
    fn next_aligned_on_boundary_moves_a_full_interval() {
        assert_eq!(next_aligned(15_000, 5_000), 20_000);
    }

    #[test]
    fn plan_next_without_overrun_is_exactly_one_interval() {
        let n = plan_next(15_000, 16_200, 5_000);
        assert_eq!(
            n,
            NextTick {
                at: 20_000,
                overran: false,
                skipped: 0
            }
        );
    }

    #[test]
    fn plan_next_small_overrun_fires_immediately() {
        let n = plan_next(15_000, 21_000, 5_000);
        assert_eq!(n.at, 20_000);
        assert!(n.overran);
        assert_eq!(n.skipped, 0);
    }

    #[test]
    fn plan_next_large_overrun_reports_skipped_boundaries() {
        let n = plan_next(15_000, 33_000, 5_000);
        assert_eq!(n.at, 30_000);
        assert!(n.overran);
        assert_eq!(n.skipped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_align_then_stay_five_seconds_apart() {
        let start = Instant::now();
        let clock = TickClock::starting_at(Duration::from_secs(5), 1_700_000_002_300, start);

        let first = clock.first_tick();
        assert_eq!(first, 1_700_000_005_000);
        tokio::time::sleep_until(clock.deadline(first)).await;
        assert_eq!(Instant::now() - start, Duration::from_millis(2_700));

        let mut scheduled = first;
        for _ in 0..3 {
            // simulated work well inside the interval
            tokio::time::sleep(Duration::from_millis(800)).await;
            let next = clock.advance(scheduled);
            assert!(!next.overran);
            assert_eq!(next.at - scheduled, 5_000);
            let before = Instant::now();
            tokio::time::sleep_until(clock.deadline(next.at)).await;
            assert_eq!(Instant::now() - before, Duration::from_millis(4_200));
            scheduled = next.at;
        }
    }
}
