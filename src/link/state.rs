//! # Connectivity data model.
//!
//! [`ConnectionState`] is owned by the
//! [`ConnectivityManager`](crate::ConnectivityManager) and published on a
//! watch channel; transitions are driven exclusively by [`LinkEvent`]s from
//! the network driver. [`LinkDriver`] is the seam through which join
//! requests reach the transport.

use async_trait::async_trait;

use crate::error::LinkError;

/// Link lifecycle state.
///
/// Written only by the connectivity manager's event loop; read by the
/// blocking wait primitive and anyone else holding a watch receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No join has been issued yet.
    #[default]
    Disconnected,
    /// A join request is outstanding.
    Connecting,
    /// An address has been acquired; publishing may proceed.
    Connected,
}

/// Events emitted by the network-join collaborator.
///
/// Delivered to the connectivity manager over a bounded channel, preserving
/// the single-writer invariant on [`ConnectionState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkEvent {
    /// The driver started (or restarted) a join attempt.
    JoinStarted,
    /// The link dropped; the manager will re-issue a join.
    LinkLost,
    /// The network assigned an address; the node is connected.
    AddressAcquired {
        /// The assigned address, as rendered by the driver.
        address: String,
    },
}

/// Network-join collaborator.
///
/// Implementations own encryption negotiation, DHCP, and the rest of the
/// transport; the manager only issues join requests and consumes
/// [`LinkEvent`]s.
#[async_trait]
pub trait LinkDriver: Send + Sync + 'static {
    /// Issues one join request. Idempotent: re-issuing while a join is in
    /// flight is allowed and treated as a retry.
    async fn join(&self) -> Result<(), LinkError>;
}
