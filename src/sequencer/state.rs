//! # Sequencer state machine.
//!
//! The reference firmware ran the measurement countdown as recursion; here it
//! is an explicit state object advanced tick by tick, so the call stack stays
//! flat and a running sequence can be cancelled at suspension points.
//!
//! ```text
//! Start(count, interval) ──► Running { remaining, interval, anchor } ──► Done
//!                                   ▲            │ advance()
//!                                   └────────────┘ while remaining > 0
//! ```
//!
//! The anchor is captured exactly once, at sequence start; every expected
//! uptime derives from it by pure arithmetic.

use std::time::Duration;

use crate::command::MeasurementRequest;

/// Result of advancing the countdown by one cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// More samples remain.
    Running,
    /// The countdown reached zero; the sequence is terminal.
    Done,
}

/// Live state of one measurement sequence.
///
/// Owned exclusively by the sequencer for the lifetime of one command's
/// execution; dropped when the countdown completes.
#[derive(Clone, Copy, Debug)]
pub struct SequencerState {
    total: u32,
    remaining: u32,
    interval_ms: u64,
    anchor_ms: u64,
}

impl SequencerState {
    /// Starts a sequence: captures the anchor and arms the countdown.
    ///
    /// The parser guarantees `count >= 1`.
    pub fn new(req: &MeasurementRequest, anchor_ms: u64) -> Self {
        Self {
            total: req.count,
            remaining: req.count,
            interval_ms: req.interval_ms,
            anchor_ms,
        }
    }

    /// Zero-based countdown index published with each status line.
    ///
    /// `remaining − 1`, counting down to 0 — unusual, but intentional in the
    /// observed protocol and preserved exactly.
    #[inline]
    pub fn index(&self) -> u32 {
        self.remaining - 1
    }

    /// Samples left, including the one currently being taken.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Expected uptime for the current sample:
    /// `anchor + (total − remaining) × interval`.
    ///
    /// Saturates at `u64::MAX` — the parser places no upper bound on the
    /// interval, so extreme values must not wrap or panic here.
    #[inline]
    pub fn expected_uptime_ms(&self) -> u64 {
        u64::from(self.total - self.remaining)
            .saturating_mul(self.interval_ms)
            .saturating_add(self.anchor_ms)
    }

    /// Inter-sample interval.
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Consumes the current cycle and moves the countdown forward.
    pub fn advance(&mut self) -> Tick {
        self.remaining -= 1;
        if self.remaining == 0 {
            Tick::Done
        } else {
            Tick::Running
        }
    }
}
