//! Error types used by the node runtime and its collaborators.
//!
//! The enums mirror the node's failure taxonomy:
//!
//! - [`NodeError`] — errors raised by the node runtime itself (fatal).
//! - [`SensorError`] — hardware acquisition/calibration failures (fatal for
//!   the running node; the sequencer propagates them unmodified).
//! - [`LinkError`] — network-join failures (recoverable; bounded retry).
//! - [`SessionError`] — broker channel failures (logged, never surfaced back
//!   over the message channel).
//! - [`CommandError`] — inbound payload validation failures (logged and
//!   discarded, no response is published).
//!
//! All types provide `as_label()` returning a short stable snake_case tag for
//! logs and events.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the node runtime.
///
/// These are terminal: once returned from [`Node::run`](crate::Node::run) the
/// node is no longer operating.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum NodeError {
    /// Sensor acquisition or calibration failed. The node is non-functional
    /// without its sensor, so this aborts the runtime (fail-fast).
    #[error("sensor failure: {0}")]
    Sensor(#[from] SensorError),

    /// Shutdown grace period was exceeded; some drive loops were still
    /// running and had to be abandoned.
    #[error("shutdown grace {grace:?} exceeded; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
    },

    /// OS signal listener registration failed.
    #[error("signal registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl NodeError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            NodeError::Sensor(_) => "node_sensor_fatal",
            NodeError::GraceExceeded { .. } => "node_grace_exceeded",
            NodeError::Signal(_) => "node_signal",
        }
    }
}

/// # Errors produced by the analog sensor collaborator.
///
/// Both variants are unrecoverable for the running node: there is no retry
/// path for a sensor that cannot be read.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SensorError {
    /// Raw sample acquisition failed.
    #[error("sample acquisition failed: {reason}")]
    Acquisition {
        /// Driver-provided failure description.
        reason: String,
    },

    /// Raw-to-millivolt calibration lookup failed.
    #[error("calibration failed: {reason}")]
    Calibration {
        /// Driver-provided failure description.
        reason: String,
    },
}

impl SensorError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            SensorError::Acquisition { .. } => "sensor_acquisition",
            SensorError::Calibration { .. } => "sensor_calibration",
        }
    }
}

/// # Errors produced by the connectivity layer.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LinkError {
    /// The bounded connection wait gave up without reaching `Connected`.
    ///
    /// Not fatal: the node keeps running and an asynchronous reconnect can
    /// still bring the link up later.
    #[error("link wait abandoned after {attempts} retry attempts")]
    WaitExhausted {
        /// Number of join re-issues performed before giving up.
        attempts: u32,
    },

    /// The join request could not be issued to the network driver.
    #[error("join request failed: {reason}")]
    JoinFailed {
        /// Driver-provided failure description.
        reason: String,
    },
}

impl LinkError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use thermonode::LinkError;
    ///
    /// let err = LinkError::WaitExhausted { attempts: 5 };
    /// assert_eq!(err.as_label(), "link_wait_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LinkError::WaitExhausted { .. } => "link_wait_exhausted",
            LinkError::JoinFailed { .. } => "link_join_failed",
        }
    }
}

/// # Errors produced by the broker message channel.
///
/// Returned by [`MessageChannel`](crate::MessageChannel) implementations.
/// The session manager logs these; they are never sent back over the wire.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SessionError {
    /// Subscribing to a topic failed.
    #[error("subscribe to '{topic}' failed: {reason}")]
    Subscribe {
        /// Topic the subscription targeted.
        topic: String,
        /// Channel-provided failure description.
        reason: String,
    },

    /// Publishing a payload failed.
    #[error("publish to '{topic}' failed: {reason}")]
    Publish {
        /// Topic the publish targeted.
        topic: String,
        /// Channel-provided failure description.
        reason: String,
    },
}

impl SessionError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            SessionError::Subscribe { .. } => "session_subscribe",
            SessionError::Publish { .. } => "session_publish",
        }
    }
}

/// # Errors produced by inbound command validation.
///
/// A rejected payload is logged and discarded; the node never publishes a
/// response for malformed input.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    /// Payload did not match `measure:<count>,<interval_ms>`.
    #[error("malformed command payload")]
    Syntax,

    /// Payload parsed but requested zero samples.
    ///
    /// The reference firmware let `count = 0` through and produced a
    /// nonsensical sequence; rejecting it here is a documented improvement.
    #[error("sample count must be >= 1, got {count}")]
    ZeroCount {
        /// The rejected count value.
        count: u64,
    },
}

impl CommandError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use thermonode::CommandError;
    ///
    /// assert_eq!(CommandError::Syntax.as_label(), "command_syntax");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CommandError::Syntax => "command_syntax",
            CommandError::ZeroCount { .. } => "command_zero_count",
        }
    }
}
