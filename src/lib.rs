//! # thermonode
//!
//! Async runtime for a networked temperature-sensor node: it joins a
//! network, holds a broker session, accepts `measure:<count>,<interval_ms>`
//! commands, and publishes one `"<index>,<temperature>,<expected_uptime>"`
//! status line per sample.
//!
//! ## Architecture
//! ```text
//!                  ┌────────────────────── Node ──────────────────────┐
//!                  │                                                  │
//! LinkEvent ──────►│ ConnectivityManager ──► watch<ConnectionState>   │
//!                  │        │ join()                                  │
//!                  │        ▼                                         │
//!                  │   LinkDriver (transport seam)                    │
//!                  │                                                  │
//! SessionEvent ───►│ SessionManager ──parse──► mpsc<MeasurementRequest>
//!                  │        │ subscribe/publish          │            │
//!                  │        ▼                            ▼            │
//!                  │   MessageChannel              Sequencer ◄── AdcDriver
//!                  │   (broker seam)                   │              │
//!                  │                                   └─ status lines┘
//!                  │                                                  │
//!                  │ everything ── publish(Event) ──► Bus ──► SubscriberSet
//!                  └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Core concepts
//! - **Seams, not sockets** — the crate never opens a socket. Transports
//!   implement [`LinkDriver`] and [`MessageChannel`] and feed
//!   [`LinkEvent`]s / [`SessionEvent`]s through [`NodeHandles`].
//! - **Bounded everything** — driver queues, the request queue, and every
//!   subscriber queue have fixed capacities; overflow is logged, never
//!   buffered without limit.
//! - **Cancellable loops** — each manager runs a `tokio::select!` loop on a
//!   child [`CancellationToken`](tokio_util::sync::CancellationToken);
//!   shutdown is a signal, a bus event, and a bounded grace wait.
//!
//! ## Quick start
//! ```no_run
//! use std::sync::Arc;
//! use thermonode::{LogWriter, Node, NodeConfig};
//! # use thermonode::{AdcDriver, LinkDriver, MessageChannel};
//! # fn transports() -> (Arc<dyn LinkDriver>, Arc<dyn MessageChannel>, Arc<dyn AdcDriver>) { unimplemented!() }
//!
//! # async fn demo() -> Result<(), thermonode::NodeError> {
//! let (link, channel, adc) = transports();
//! let (node, handles) = Node::new(
//!     NodeConfig::default(),
//!     link,
//!     channel,
//!     adc,
//!     vec![Arc::new(LogWriter) as _],
//! );
//! // hand `handles` to the transport glue, then:
//! node.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod link;
pub mod node;
pub mod sensor;
pub mod sequencer;
pub mod session;
pub mod subscribers;

pub use clock::{MonotonicClock, SystemClock};
pub use command::{parse_command, MeasurementRequest};
pub use config::{AuthMode, LinkPolicy, NodeConfig};
pub use error::{CommandError, LinkError, NodeError, SensorError, SessionError};
pub use events::{Bus, Event, EventKind};
pub use link::{ConnectionState, ConnectivityManager, LinkDriver, LinkEvent};
pub use node::{Node, NodeHandles};
pub use sensor::{
    celsius_from_millivolts, AdcDriver, TemperatureReader, LMT86_REF_TEMP_C, LMT86_TC_MV_PER_C,
    LMT86_V0_MV,
};
pub use sequencer::{Sequencer, SequencerState, Tick};
pub use session::{MessageChannel, QoS, SessionEvent, SessionManager, Topics};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
