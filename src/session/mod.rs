//! # Broker session: channel seam, events, and manager.
//!
//! This module groups the message-channel abstraction the node publishes
//! through and the manager that owns the session lifecycle:
//! - [`MessageChannel`], [`QoS`], [`Topics`] — the wire seam
//! - [`SessionEvent`] — events the broker transport emits
//! - [`SessionManager`] — subscribe-on-connect, inbound dispatch, publish

mod manager;

pub use manager::{MessageChannel, QoS, SessionEvent, SessionManager, Topics};
