//! Sliding per-second window for recent failure rates.

use std::sync::atomic::{AtomicU64, Ordering};

/// Ring capacity in seconds. Queries for windows longer than this see at
/// most `SLOTS` seconds of history.
const SLOTS: usize = 64;

/// A slot holds one second of outcome counts, tagged with the second it
/// belongs to so stale slots are recycled lazily on write.
#[derive(Debug)]
struct Slot {
    /// Second index + 1; 0 means the slot has never been written.
    stamp: AtomicU64,
    total: AtomicU64,
    failures: AtomicU64,
}

impl Slot {
    fn new() -> Self {
        Self {
            stamp: AtomicU64::new(0),
            total: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }
}

/// Lock-free ring of per-second outcome counters.
#[derive(Debug)]
pub(crate) struct RecentWindow {
    slots: Vec<Slot>,
}

impl RecentWindow {
    pub(crate) fn new() -> Self {
        Self {
            slots: (0..SLOTS).map(|_| Slot::new()).collect(),
        }
    }

    /// Records one completed execution at `now_sec` seconds into the run.
    pub(crate) fn record(&self, now_sec: u64, failed: bool) {
        let slot = &self.slots[(now_sec as usize) % SLOTS];
        let stamp = now_sec + 1;

        let current = slot.stamp.load(Ordering::Acquire);
        if current != stamp {
            // The slot belongs to a lapped second. Whichever writer wins the
            // CAS resets the counts; losers fall through and just increment.
            if slot
                .stamp
                .compare_exchange(current, stamp, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                slot.total.store(0, Ordering::Release);
                slot.failures.store(0, Ordering::Release);
            }
        }

        slot.total.fetch_add(1, Ordering::Relaxed);
        if failed {
            slot.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Failure rate over the trailing `window_secs` seconds as a percentage,
    /// or `None` when the window holds no samples.
    pub(crate) fn failure_rate_percent(&self, now_sec: u64, window_secs: u64) -> Option<f64> {
        if window_secs == 0 {
            return None;
        }
        let oldest = now_sec.saturating_sub(window_secs.saturating_sub(1));

        let mut total = 0u64;
        let mut failures = 0u64;
        for slot in &self.slots {
            let stamp = slot.stamp.load(Ordering::Acquire);
            if stamp == 0 {
                continue;
            }
            let sec = stamp - 1;
            if sec >= oldest && sec <= now_sec {
                total += slot.total.load(Ordering::Relaxed);
                failures += slot.failures.load(Ordering::Relaxed);
            }
        }

        if total == 0 {
            None
        } else {
            Some(failures as f64 / total as f64 * 100.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_has_no_rate() {
        let window = RecentWindow::new();
        assert_eq!(window.failure_rate_percent(10, 10), None);
    }

    #[test]
    fn test_rate_within_window() {
        let window = RecentWindow::new();
        for _ in 0..8 {
            window.record(5, false);
        }
        for _ in 0..2 {
            window.record(5, true);
        }
        let rate = window.failure_rate_percent(5, 10).unwrap();
        assert!((rate - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_old_samples_age_out_of_query() {
        let window = RecentWindow::new();
        window.record(0, true);
        window.record(30, false);

        // A 10s window at t=30 only sees the second sample.
        let rate = window.failure_rate_percent(30, 10).unwrap();
        assert_eq!(rate, 0.0);

        // A wide window still sees both.
        let rate = window.failure_rate_percent(30, 60).unwrap();
        assert!((rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_lapped_slot_is_recycled() {
        let window = RecentWindow::new();
        window.record(1, true);
        // Second 1 + SLOTS lands on the same slot and must reset it.
        window.record(1 + SLOTS as u64, false);

        let rate = window
            .failure_rate_percent(1 + SLOTS as u64, 5)
            .unwrap();
        assert_eq!(rate, 0.0);
    }
}
