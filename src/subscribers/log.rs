//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] renders events through the `log` facade in a compact
//! human-readable format.
//!
//! ## Output format
//! ```text
//! [join-started]
//! [address-acquired] addr=192.168.4.23
//! [link-wait-timeout] attempt=2/5
//! [session-established] subscribed=node/command
//! [command-accepted] count=3 interval=1000ms
//! [sample-published] line="2,24.81,12045"
//! [sequence-completed]
//! ```

use async_trait::async_trait;
use log::{info, warn};

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Reference logging subscriber.
///
/// Useful for development and the demo binary. Production deployments would
/// implement a custom [`Subscribe`] for structured output.
#[derive(Default)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::JoinStarted => info!("[join-started]"),
            EventKind::LinkLost => info!("[link-lost] rejoining"),
            EventKind::AddressAcquired => {
                info!("[address-acquired] addr={:?}", e.address.as_deref());
            }
            EventKind::LinkWaitTimeout => {
                info!("[link-wait-timeout] attempt={:?}", e.attempt);
            }
            EventKind::LinkWaitExhausted => {
                warn!("[link-wait-exhausted] attempts={:?}", e.attempt);
            }
            EventKind::SessionEstablished => {
                info!("[session-established] subscribed={:?}", e.topic.as_deref());
            }
            EventKind::SessionLost => info!("[session-lost]"),
            EventKind::CommandAccepted => {
                info!(
                    "[command-accepted] count={:?} interval={:?}ms",
                    e.remaining, e.delay_ms
                );
            }
            EventKind::CommandRejected => {
                warn!("[command-rejected] reason={:?}", e.reason.as_deref());
            }
            EventKind::CommandIgnored => {
                warn!("[command-ignored] sequence active, count={:?}", e.remaining);
            }
            EventKind::SequenceStarted => {
                info!(
                    "[sequence-started] count={:?} interval={:?}ms",
                    e.remaining, e.delay_ms
                );
            }
            EventKind::SamplePublished => {
                info!("[sample-published] line={:?}", e.payload.as_deref());
            }
            EventKind::SequenceCompleted => info!("[sequence-completed]"),
            EventKind::ShutdownRequested => info!("[shutdown-requested]"),
            EventKind::AllStoppedWithinGrace => info!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => warn!("[grace-exceeded]"),
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
