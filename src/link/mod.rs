//! # Connectivity: join state machine and bounded wait.
//!
//! This module groups the network-join data model and the manager that owns
//! it:
//! - [`ConnectionState`], [`LinkEvent`], [`LinkDriver`] — the transport seam
//! - [`ConnectivityManager`] — event loop plus
//!   [`wait_for_connection`](ConnectivityManager::wait_for_connection)

mod manager;
mod state;

pub use manager::ConnectivityManager;
pub use state::{ConnectionState, LinkDriver, LinkEvent};
