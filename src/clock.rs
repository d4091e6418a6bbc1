//! # Monotonic uptime clock.
//!
//! The sequencer stamps every status line with an expected uptime in
//! milliseconds. [`MonotonicClock`] is the seam that supplies those readings;
//! [`SystemClock`] is the production implementation, anchored at construction
//! so readings behave like firmware uptime (starts near zero, never goes
//! backwards).
//!
//! Tests substitute their own clock to make anchor arithmetic deterministic.

use tokio::time::Instant;

/// Source of monotonic milliseconds since node start.
pub trait MonotonicClock: Send + Sync + 'static {
    /// Returns milliseconds elapsed since the clock's anchor.
    fn now_ms(&self) -> u64;
}

/// Production clock anchored at construction time.
///
/// Built on [`tokio::time::Instant`] so paused-time test runtimes observe it
/// consistently with `tokio::time::sleep`.
#[derive(Debug)]
pub struct SystemClock {
    anchor: Instant,
}

impl SystemClock {
    /// Creates a clock anchored at "now".
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.anchor.elapsed().as_millis() as u64
    }
}
