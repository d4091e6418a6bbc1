//! # ConnectivityManager: join lifecycle and bounded connection wait.
//!
//! Owns [`ConnectionState`] and the retry counter, and exposes the two
//! primitives the rest of the node consumes:
//!
//! - [`drive`](ConnectivityManager::drive) — the event loop that applies
//!   [`LinkEvent`]s to the state (single writer);
//! - [`wait_for_connection`](ConnectivityManager::wait_for_connection) — a
//!   condition wait in bounded increments with join re-issue on timeout.
//!
//! ## Transition rules
//! ```text
//! drive() start        → issue join, enter Connecting
//! JoinStarted          → issue join (idempotent retry)
//! LinkLost             → clear Connected, issue join, stay Connecting
//! AddressAcquired(a)   → record a, enter Connected, reset retry counter
//! ```
//!
//! ## Wait contract
//! Each wait attempt blocks up to `LinkPolicy::attempt_timeout` (10 s by
//! default) on the state watch channel. On timeout the retry counter is
//! incremented and a join re-issued; after `LinkPolicy::max_retries` (5)
//! re-issues the wait is abandoned with [`LinkError::WaitExhausted`]. The
//! node is expected to keep running — an asynchronous reconnect can still
//! arrive later.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use log::warn;
use tokio::sync::{mpsc, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::LinkPolicy;
use crate::error::LinkError;
use crate::events::{Bus, Event, EventKind};

use super::state::{ConnectionState, LinkDriver, LinkEvent};

/// Owns the network-join state machine and the bounded-retry wait.
pub struct ConnectivityManager {
    driver: Arc<dyn LinkDriver>,
    policy: LinkPolicy,
    bus: Bus,
    state_tx: watch::Sender<ConnectionState>,
    retries: AtomicU32,
    address: Mutex<Option<Arc<str>>>,
}

impl ConnectivityManager {
    /// Creates a manager in the `Disconnected` state.
    pub fn new(driver: Arc<dyn LinkDriver>, policy: LinkPolicy, bus: Bus) -> Self {
        let (state_tx, _rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            driver,
            policy,
            bus,
            state_tx,
            retries: AtomicU32::new(0),
            address: Mutex::new(None),
        }
    }

    /// Returns a watch receiver observing [`ConnectionState`] transitions.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Current retry counter value. Resets to 0 only on transition into
    /// `Connected`.
    pub fn retry_count(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    /// The most recently assigned address, if any.
    pub fn address(&self) -> Option<Arc<str>> {
        self.address.lock().expect("address lock poisoned").clone()
    }

    /// Runs the event loop until cancellation or channel closure.
    ///
    /// Issues the initial join request on entry (process-start rule), then
    /// applies each [`LinkEvent`] in arrival order. This is the only writer
    /// of [`ConnectionState`] and the only resetter of the retry counter.
    pub async fn drive(&self, mut events: mpsc::Receiver<LinkEvent>, token: CancellationToken) {
        self.state_tx.send_replace(ConnectionState::Connecting);
        self.issue_join().await;

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                ev = events.recv() => match ev {
                    Some(ev) => self.handle(ev).await,
                    None => break,
                },
            }
        }
    }

    async fn handle(&self, ev: LinkEvent) {
        match ev {
            LinkEvent::JoinStarted => {
                self.bus.publish(Event::new(EventKind::JoinStarted));
                self.issue_join().await;
            }
            LinkEvent::LinkLost => {
                self.state_tx.send_replace(ConnectionState::Connecting);
                self.bus.publish(Event::new(EventKind::LinkLost));
                self.issue_join().await;
            }
            LinkEvent::AddressAcquired { address } => {
                let address: Arc<str> = address.into();
                *self.address.lock().expect("address lock poisoned") =
                    Some(Arc::clone(&address));
                self.retries.store(0, Ordering::SeqCst);
                self.bus
                    .publish(Event::new(EventKind::AddressAcquired).with_address(address));
                self.state_tx.send_replace(ConnectionState::Connected);
            }
        }
    }

    /// Issues one join request; a driver refusal is recoverable and only
    /// logged (the next wait timeout re-issues).
    async fn issue_join(&self) {
        if let Err(e) = self.driver.join().await {
            warn!("join request not accepted: {e}");
        }
    }

    /// Blocks the caller until the link reaches `Connected`, in bounded
    /// increments of `LinkPolicy::attempt_timeout`.
    ///
    /// On each timeout the retry counter is incremented, a
    /// [`EventKind::LinkWaitTimeout`] event is published, and a join is
    /// re-issued. Once the counter passes `LinkPolicy::max_retries`, the
    /// wait is abandoned with [`LinkError::WaitExhausted`] — exactly
    /// `max_retries` re-issues happen before giving up.
    pub async fn wait_for_connection(&self) -> Result<(), LinkError> {
        let mut rx = self.state_tx.subscribe();

        loop {
            if *rx.borrow_and_update() == ConnectionState::Connected {
                return Ok(());
            }

            match time::timeout(self.policy.attempt_timeout, rx.changed()).await {
                // State changed; loop around and re-check. `changed` cannot
                // observe a dropped sender here: `self.state_tx` outlives
                // this borrow of `self`.
                Ok(_) => {}
                Err(_elapsed) => {
                    let attempt = self.retries.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt > self.policy.max_retries {
                        self.bus.publish(
                            Event::new(EventKind::LinkWaitExhausted)
                                .with_attempt(self.policy.max_retries),
                        );
                        return Err(LinkError::WaitExhausted {
                            attempts: self.policy.max_retries,
                        });
                    }
                    warn!(
                        "still waiting for address (attempt {attempt}/{})",
                        self.policy.max_retries
                    );
                    self.bus.publish(
                        Event::new(EventKind::LinkWaitTimeout)
                            .with_attempt(attempt)
                            .with_delay(self.policy.attempt_timeout),
                    );
                    self.issue_join().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    struct CountingDriver {
        joins: AtomicU32,
    }

    impl CountingDriver {
        fn arc() -> Arc<Self> {
            Arc::new(Self {
                joins: AtomicU32::new(0),
            })
        }

        fn joins(&self) -> u32 {
            self.joins.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LinkDriver for CountingDriver {
        async fn join(&self) -> Result<(), LinkError> {
            self.joins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn manager(driver: Arc<CountingDriver>) -> ConnectivityManager {
        ConnectivityManager::new(driver, LinkPolicy::default(), Bus::new(64))
    }

    #[tokio::test(start_paused = true)]
    async fn wait_gives_up_after_exactly_five_retries() {
        let driver = CountingDriver::arc();
        let mgr = manager(Arc::clone(&driver));

        let err = mgr.wait_for_connection().await.unwrap_err();
        match err {
            LinkError::WaitExhausted { attempts } => assert_eq!(attempts, 5),
            other => panic!("unexpected error: {other}"),
        }
        // One join re-issue per counted retry, not fewer, not more.
        assert_eq!(driver.joins(), 5);
        assert_eq!(mgr.retry_count(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn address_acquired_connects_and_resets_retries() {
        let driver = CountingDriver::arc();
        let mgr = Arc::new(manager(Arc::clone(&driver)));
        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();

        let drive = {
            let mgr = Arc::clone(&mgr);
            let token = token.clone();
            tokio::spawn(async move { mgr.drive(rx, token).await })
        };

        tx.send(LinkEvent::AddressAcquired {
            address: "192.168.4.23".to_string(),
        })
        .await
        .unwrap();

        mgr.wait_for_connection().await.unwrap();
        assert_eq!(*mgr.state().borrow(), ConnectionState::Connected);
        assert_eq!(mgr.retry_count(), 0);
        assert_eq!(mgr.address().as_deref(), Some("192.168.4.23"));
        // Initial join on drive() entry.
        assert_eq!(driver.joins(), 1);

        token.cancel();
        drive.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn link_lost_clears_connected_and_rejoins() {
        let driver = CountingDriver::arc();
        let mgr = Arc::new(manager(Arc::clone(&driver)));
        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();

        let drive = {
            let mgr = Arc::clone(&mgr);
            let token = token.clone();
            tokio::spawn(async move { mgr.drive(rx, token).await })
        };

        tx.send(LinkEvent::AddressAcquired {
            address: "10.0.0.9".to_string(),
        })
        .await
        .unwrap();
        mgr.wait_for_connection().await.unwrap();

        let mut state = mgr.state();
        tx.send(LinkEvent::LinkLost).await.unwrap();
        state.changed().await.unwrap();
        assert_eq!(*state.borrow(), ConnectionState::Connecting);
        // Initial join plus the re-join after loss.
        assert_eq!(driver.joins(), 2);

        token.cancel();
        drive.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn wait_survives_a_timeout_then_connects() {
        let driver = CountingDriver::arc();
        let mgr = Arc::new(manager(Arc::clone(&driver)));
        let (tx, rx) = mpsc::channel(8);
        let token = CancellationToken::new();

        let drive = {
            let mgr = Arc::clone(&mgr);
            let token = token.clone();
            tokio::spawn(async move { mgr.drive(rx, token).await })
        };

        let waiter = {
            let mgr = Arc::clone(&mgr);
            tokio::spawn(async move { mgr.wait_for_connection().await })
        };

        // Let two bounded attempts elapse before the address shows up.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(mgr.retry_count(), 2);

        tx.send(LinkEvent::AddressAcquired {
            address: "172.16.0.4".to_string(),
        })
        .await
        .unwrap();

        waiter.await.unwrap().unwrap();
        assert_eq!(mgr.retry_count(), 0);

        token.cancel();
        drive.await.unwrap();
    }
}
