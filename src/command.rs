//! # Inbound command parsing.
//!
//! The node accepts exactly one command shape on its command topic:
//!
//! ```text
//! measure:<count>,<interval_ms>
//! ```
//!
//! A successful parse yields a [`MeasurementRequest`]; anything else is a
//! [`CommandError`], which the session manager logs and discards without
//! publishing a response.
//!
//! Unlike the reference firmware, `count = 0` is rejected here instead of
//! producing a nonsensical countdown (see `ZeroCount`).

use std::time::Duration;

use crate::error::CommandError;

/// A validated request for one measurement sequence.
///
/// Created by [`parse_command`], immediately consumed by the sequencer, and
/// never retained afterward — there is no request queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeasurementRequest {
    /// Number of samples to take (>= 1).
    pub count: u32,
    /// Inter-sample interval in milliseconds.
    pub interval_ms: u64,
}

impl MeasurementRequest {
    /// Returns the inter-sample interval as a [`Duration`].
    #[inline]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Parses an inbound payload into a [`MeasurementRequest`].
///
/// The payload must match `measure:<count>,<interval_ms>` exactly: no
/// surrounding whitespace, decimal integers only, `count >= 1`. The interval
/// may be zero (back-to-back samples).
///
/// # Example
/// ```
/// use thermonode::{parse_command, MeasurementRequest};
///
/// let req = parse_command(b"measure:3,1000").unwrap();
/// assert_eq!(req, MeasurementRequest { count: 3, interval_ms: 1000 });
///
/// assert!(parse_command(b"measure:0,1000").is_err());
/// assert!(parse_command(b"calibrate:now").is_err());
/// ```
pub fn parse_command(payload: &[u8]) -> Result<MeasurementRequest, CommandError> {
    let text = std::str::from_utf8(payload).map_err(|_| CommandError::Syntax)?;
    let args = text.strip_prefix("measure:").ok_or(CommandError::Syntax)?;
    let (count_str, interval_str) = args.split_once(',').ok_or(CommandError::Syntax)?;

    let count: u64 = count_str.parse().map_err(|_| CommandError::Syntax)?;
    let interval_ms: u64 = interval_str.parse().map_err(|_| CommandError::Syntax)?;

    if count == 0 {
        return Err(CommandError::ZeroCount { count });
    }
    let count = u32::try_from(count).map_err(|_| CommandError::Syntax)?;

    Ok(MeasurementRequest { count, interval_ms })
}
