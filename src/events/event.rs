//! # Runtime events emitted by the node's managers.
//!
//! [`EventKind`] classifies event types across the node's lifecycle:
//! - **Link events**: join/retry/address flow of the connectivity manager
//! - **Session events**: broker session establishment and loss
//! - **Command events**: inbound payload accept/reject/ignore decisions
//! - **Sequence events**: measurement sequencer progress
//! - **Shutdown events**: signal handling and grace-period outcome
//!
//! The [`Event`] struct carries optional metadata: attempt counters,
//! addresses, topics, status-line payloads, and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Link events ===
    /// The network driver reported that a join attempt started.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    JoinStarted,

    /// The link dropped; a re-join was issued automatically.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    LinkLost,

    /// An address was acquired; the node is connected.
    ///
    /// Sets:
    /// - `address`: the assigned address
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AddressAcquired,

    /// One bounded wait-for-connection attempt timed out; a join was
    /// re-issued.
    ///
    /// Sets:
    /// - `attempt`: retry attempt number (1-based)
    /// - `delay_ms`: the attempt timeout that elapsed (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    LinkWaitTimeout,

    /// The wait-for-connection loop gave up after exhausting its retries.
    ///
    /// Sets:
    /// - `attempt`: total retry attempts performed
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    LinkWaitExhausted,

    // === Session events ===
    /// Broker session established; the command topic was subscribed.
    ///
    /// Sets:
    /// - `topic`: the command topic
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SessionEstablished,

    /// Broker session lost. Reconnection is the transport's concern.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SessionLost,

    // === Command events ===
    /// An inbound payload parsed into a measurement request and was handed
    /// to the sequencer.
    ///
    /// Sets:
    /// - `remaining`: requested sample count
    /// - `delay_ms`: requested inter-sample interval (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CommandAccepted,

    /// An inbound payload failed validation and was discarded.
    ///
    /// Sets:
    /// - `reason`: validation error label
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CommandRejected,

    /// A valid command arrived while a sequence was active and was ignored.
    ///
    /// Sets:
    /// - `remaining`: requested sample count
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    CommandIgnored,

    // === Sequence events ===
    /// A measurement sequence started and captured its anchor timestamp.
    ///
    /// Sets:
    /// - `remaining`: total samples to take
    /// - `delay_ms`: inter-sample interval (ms)
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SequenceStarted,

    /// One status line was published to the response topic.
    ///
    /// Sets:
    /// - `remaining`: samples left after this one
    /// - `payload`: the published status line
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SamplePublished,

    /// The sequence finished its countdown and entered the completion hold.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    SequenceCompleted,

    // === Shutdown events ===
    /// Shutdown requested (OS signal or programmatic trigger).
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    ShutdownRequested,

    /// All drive loops stopped within the configured grace period.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    AllStoppedWithinGrace,

    /// Grace period exceeded; some loops did not stop in time.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Retry attempt number (link wait events).
    pub attempt: Option<u32>,
    /// Sample count: requested total or samples left, depending on the kind.
    pub remaining: Option<u32>,
    /// Delay or interval in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Assigned network address.
    pub address: Option<Arc<str>>,
    /// Topic involved, if applicable.
    pub topic: Option<Arc<str>>,
    /// Published status line, if applicable.
    pub payload: Option<Arc<str>>,
    /// Human-readable reason (validation errors, loss causes, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            attempt: None,
            remaining: None,
            delay_ms: None,
            address: None,
            topic: None,
            payload: None,
            reason: None,
        }
    }

    /// Attaches a retry attempt number.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a sample count.
    #[inline]
    pub fn with_remaining(mut self, n: u32) -> Self {
        self.remaining = Some(n);
        self
    }

    /// Attaches a delay/interval (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an assigned address.
    #[inline]
    pub fn with_address(mut self, address: impl Into<Arc<str>>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Attaches a topic name.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches a published status line.
    #[inline]
    pub fn with_payload(mut self, payload: impl Into<Arc<str>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
