//! Minimum-interval request pacing.
//!
//! The backend budgets requests per minute; the throttle spreads calls
//! evenly instead of bursting into 429s. State is a single `Cell`, no
//! locking -- each client owns its throttle and the toolkit is
//! single-threaded.

use std::cell::Cell;
use std::time::{Duration, Instant};

use tracing::debug;

/// Paces calls so that consecutive requests are at least one interval
/// apart. The interval derives from a calls-per-minute budget.
pub struct Throttle {
    min_interval: Duration,
    last_call: Cell<Option<Instant>>,
}

impl Throttle {
    /// Throttle for a calls-per-minute budget. A zero budget disables
    /// pacing rather than dividing by it.
    pub fn from_rate(max_requests_per_minute: u32) -> Self {
        let min_interval = if max_requests_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / f64::from(max_requests_per_minute))
        };
        Throttle {
            min_interval,
            last_call: Cell::new(None),
        }
    }

    /// Block until one interval has passed since the previous call, then
    /// record this call. First call never waits.
    pub fn pause(&self) {
        if let Some(last) = self.last_call.get() {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "throttling request");
                std::thread::sleep(wait);
            }
        }
        self.last_call.set(Some(Instant::now()));
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
