//! # Event subscribers for the node runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`]
//! fan-out, and a built-in [`LogWriter`] for handling runtime events
//! broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   managers ── publish(Event) ──► Bus ──► Node listener ──► SubscriberSet
//!                                                      ┌─────────┼────────┐
//!                                                      ▼         ▼        ▼
//!                                                  LogWriter  Metrics  Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use thermonode::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::CommandRejected {
//!             // increment a counter...
//!         }
//!     }
//! }
//! ```

mod log;
mod set;
mod subscribe;

pub use self::log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
