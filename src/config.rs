//! # Node configuration.
//!
//! [`NodeConfig`] centralizes the settings consumed at bootstrap: network
//! credentials, broker endpoint, topic names, event bus sizing, and shutdown
//! behavior. [`LinkPolicy`] bundles the bounded-retry contract of the
//! connectivity wait.
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by the bus (see
//!   [`NodeConfig::bus_capacity_clamped`]).
//! - `grace = 0s` → shutdown does not wait, loops are abandoned immediately.

use std::time::Duration;

/// Authentication mode used when joining the wireless network.
///
/// The node speaks exactly one mode; the variant exists so drivers can match
/// on it rather than on magic strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// WPA2 pre-shared-key (the only mode the node uses).
    #[default]
    Wpa2Psk,
}

/// Bounded-retry contract for [`wait_for_connection`].
///
/// Each wait attempt blocks for [`LinkPolicy::attempt_timeout`]; on timeout a
/// join request is re-issued, up to [`LinkPolicy::max_retries`] times, after
/// which the wait is abandoned (the node keeps running).
///
/// [`wait_for_connection`]: crate::ConnectivityManager::wait_for_connection
#[derive(Clone, Copy, Debug)]
pub struct LinkPolicy {
    /// Timeout for a single wait-for-connection attempt.
    pub attempt_timeout: Duration,
    /// Maximum number of join re-issues before the wait gives up.
    pub max_retries: u32,
}

impl Default for LinkPolicy {
    /// Returns the reference contract: 10 s per attempt, 5 retries.
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(10),
            max_retries: 5,
        }
    }
}

/// Global configuration for the node runtime.
///
/// Defines:
/// - **Network join**: `ssid`, `password`, `auth` (consumed by the
///   [`LinkDriver`](crate::LinkDriver) implementation).
/// - **Broker session**: `broker_uri` plus the fixed command/response topics.
/// - **Connectivity wait**: [`LinkPolicy`] (10 s × 5 by default).
/// - **Sequencer**: `completion_hold`, the fixed pause after the final sample.
/// - **Event system**: `bus_capacity` for the broadcast ring buffer.
/// - **Shutdown**: `grace`, the graceful-termination window.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// Wireless network name.
    pub ssid: String,
    /// Wireless network pre-shared key.
    pub password: String,
    /// Authentication mode (fixed to WPA2-PSK).
    pub auth: AuthMode,

    /// Broker endpoint, e.g. `mqtt://192.168.1.10:1883`.
    pub broker_uri: String,
    /// Topic the node subscribes to for `measure:<count>,<interval>` commands.
    pub command_topic: String,
    /// Topic the node publishes status lines to.
    pub response_topic: String,

    /// Bounded-retry contract for the connectivity wait.
    pub link: LinkPolicy,

    /// Fixed pause after the final sample of a sequence, before the node goes
    /// idle again. The reference firmware holds for 5 s.
    pub completion_hold: Duration,

    /// Capacity of the event bus broadcast ring buffer.
    ///
    /// Slow subscribers lagging behind more than `bus_capacity` events will
    /// observe `Lagged` and skip older items. Minimum 1 (clamped).
    pub bus_capacity: usize,

    /// Maximum time to wait for drive loops to stop during shutdown.
    pub grace: Duration,
}

impl NodeConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for NodeConfig {
    /// Default configuration:
    ///
    /// - empty credentials and a localhost broker (placeholders; real
    ///   deployments set all three)
    /// - `command_topic = "node/command"`, `response_topic = "node/response"`
    /// - `link = LinkPolicy::default()` (10 s × 5)
    /// - `completion_hold = 5s`
    /// - `bus_capacity = 256`
    /// - `grace = 10s`
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            auth: AuthMode::Wpa2Psk,
            broker_uri: "mqtt://127.0.0.1:1883".to_string(),
            command_topic: "node/command".to_string(),
            response_topic: "node/response".to_string(),
            link: LinkPolicy::default(),
            completion_hold: Duration::from_secs(5),
            bus_capacity: 256,
            grace: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_link_policy_matches_reference_contract() {
        let policy = LinkPolicy::default();
        assert_eq!(policy.attempt_timeout, Duration::from_secs(10));
        assert_eq!(policy.max_retries, 5);
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let mut cfg = NodeConfig::default();
        cfg.bus_capacity = 0;
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
