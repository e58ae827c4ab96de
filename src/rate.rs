//! Deadline-based pacing for the dispatch loop.
//!
//! The [`RateController`] converts a time-varying target rate into
//! inter-submission delays. It keeps an *absolute* next-submission deadline
//! and advances it by `1/tps` on each call: absolute deadlines self-correct
//! for timer overshoot, where relative sleeps accumulate truncation drift.
//!
//! When the caller falls far enough behind (more than
//! [`MAX_CATCHUP_INTERVALS`] inter-arrival periods), the controller
//! fast-forwards the deadline to "now" instead of firing a catch-up burst,
//! and counts the skipped schedule slots as missed deadlines.

use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};
use tracing::debug;

/// How far behind schedule the caller may fall, in inter-arrival periods,
/// before the deadline is fast-forwarded instead of replayed.
pub const MAX_CATCHUP_INTERVALS: u32 = 3;

/// Sleep applied when the target rate is zero or negative, so the loop can
/// re-poll the pattern without spinning.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Paces a dispatch loop against a target transactions-per-second rate.
#[derive(Debug)]
pub struct RateController {
    start: Option<Instant>,
    next_deadline: Option<Instant>,
    missed_deadlines: u64,
}

impl RateController {
    /// Creates a controller. Call [`start`](Self::start) before pacing.
    pub fn new() -> Self {
        Self {
            start: None,
            next_deadline: None,
            missed_deadlines: 0,
        }
    }

    /// Records the monotonic start instant of the run.
    pub fn start(&mut self) {
        let now = Instant::now();
        self.start = Some(now);
        self.next_deadline = None;
        self.missed_deadlines = 0;
    }

    /// Milliseconds elapsed since [`start`](Self::start).
    pub fn elapsed_ms(&self) -> u64 {
        match self.start {
            Some(start) => start.elapsed().as_millis() as u64,
            None => 0,
        }
    }

    /// Number of schedule slots skipped because the caller was too far
    /// behind to catch up without a burst.
    pub fn missed_deadlines(&self) -> u64 {
        self.missed_deadlines
    }

    /// Suspends until the next scheduled submission instant and returns the
    /// elapsed milliseconds since start.
    ///
    /// A non-positive `target_tps` idles for a short fixed interval without
    /// advancing the schedule. Never fails; if the surrounding future is
    /// cancelled mid-sleep the schedule simply resumes on the next call.
    pub async fn wait_for_next(&mut self, target_tps: f64) -> u64 {
        if self.start.is_none() {
            self.start();
        }

        if target_tps <= 0.0 || !target_tps.is_finite() {
            sleep(IDLE_POLL).await;
            return self.elapsed_ms();
        }

        let interval = Duration::from_secs_f64(1.0 / target_tps);
        let now = Instant::now();

        let deadline = match self.next_deadline {
            None => now,
            Some(d) => {
                let next = d + interval;
                let late_bound = interval * MAX_CATCHUP_INTERVALS;
                if now > next + late_bound {
                    // Too far behind: firing every missed slot would produce a
                    // catch-up storm. Skip ahead and account for the slots.
                    let behind = now.duration_since(next);
                    let skipped = (behind.as_secs_f64() / interval.as_secs_f64()) as u64;
                    self.missed_deadlines += skipped.max(1);
                    debug!(
                        skipped,
                        total_missed = self.missed_deadlines,
                        "dispatch loop behind schedule, fast-forwarding deadline"
                    );
                    now
                } else {
                    next
                }
            }
        };

        self.next_deadline = Some(deadline);
        sleep_until(deadline).await;
        self.elapsed_ms()
    }
}

impl Default for RateController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_constant_rate_dispatch_count() {
        let mut controller = RateController::new();
        controller.start();

        // 100 TPS over one second should fire ~100 times. With the paused
        // clock there is no scheduler jitter, so the count is exact apart
        // from the free first fire.
        let mut fires = 0u64;
        loop {
            let elapsed = controller.wait_for_next(100.0).await;
            if elapsed >= 1_000 {
                break;
            }
            fires += 1;
        }
        assert!(
            (99..=101).contains(&fires),
            "expected ~100 fires, got {}",
            fires
        );
        assert_eq!(controller.missed_deadlines(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_tps_idles_without_advancing_schedule() {
        let mut controller = RateController::new();
        controller.start();

        let before = controller.elapsed_ms();
        controller.wait_for_next(0.0).await;
        let after = controller.elapsed_ms();

        assert!(after >= before + 50);
        assert_eq!(controller.missed_deadlines(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_caller_fast_forwards() {
        let mut controller = RateController::new();
        controller.start();

        // Establish the schedule at 10 TPS (100ms interval).
        controller.wait_for_next(10.0).await;

        // Simulate a caller stalled well past the catch-up bound.
        tokio::time::advance(Duration::from_secs(2)).await;

        controller.wait_for_next(10.0).await;
        assert!(
            controller.missed_deadlines() > 0,
            "stall should register missed deadlines"
        );

        // The schedule must have been fast-forwarded: the next wait fires one
        // interval out, not a burst of back-to-back catch-up fires.
        let t0 = controller.elapsed_ms();
        let t1 = controller.wait_for_next(10.0).await;
        assert!(t1 >= t0 + 90, "expected a full interval, got {}ms", t1 - t0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_tracks_wall_clock() {
        let mut controller = RateController::new();
        controller.start();
        tokio::time::advance(Duration::from_millis(750)).await;
        assert!(controller.elapsed_ms() >= 750);
    }
}
