//! # Node: wiring, bootstrap ordering, and graceful shutdown.
//!
//! [`Node`] assembles the managers around one event bus and drives them as
//! cancellable tasks:
//!
//! ```text
//! Inputs to Node::new():
//!   NodeConfig + LinkDriver + MessageChannel + AdcDriver + subscribers
//!
//! Bootstrap ordering (enforced by sequencing, not by a dependency system):
//!   1. ConnectivityManager::drive()  — issues the initial join
//!   2. wait_for_connection()         — bounded 10 s × 5 wait
//!   3. SessionManager::drive()       — subscribe-on-Established from here on
//!   4. Sequencer::run()              — consumes validated requests
//!
//! Event flow:
//!   managers ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!
//! Shutdown path:
//!   OS signal or NodeHandles::shutdown
//!             ──► publish(ShutdownRequested) ──► cancel all child tokens
//!             └─► wait up to cfg.grace:
//!                    ├─ all loops joined  → AllStoppedWithinGrace
//!                    └─ timeout           → GraceExceeded (error)
//! ```
//!
//! The external transports feed [`LinkEvent`]s and [`SessionEvent`]s through
//! the senders in [`NodeHandles`]; the node never talks to the network
//! directly.

use std::sync::Arc;

use log::warn;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::clock::SystemClock;
use crate::command::MeasurementRequest;
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::events::{Bus, Event, EventKind};
use crate::link::{ConnectivityManager, LinkDriver, LinkEvent};
use crate::sensor::{AdcDriver, TemperatureReader};
use crate::sequencer::Sequencer;
use crate::session::{MessageChannel, SessionEvent, SessionManager, Topics};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Capacity of the driver-facing event queues.
///
/// Link and session events are rare and cheap; a small bound keeps a wedged
/// manager from hiding unbounded memory growth.
const EVENT_QUEUE_CAPACITY: usize = 32;

/// Senders through which the external transports inject their events, plus
/// the programmatic shutdown trigger.
#[derive(Clone)]
pub struct NodeHandles {
    /// Feed for network-join events.
    pub link_events: mpsc::Sender<LinkEvent>,
    /// Feed for broker session events.
    pub session_events: mpsc::Sender<SessionEvent>,
    /// Cancelling this token starts the same graceful shutdown an OS signal
    /// would.
    pub shutdown: CancellationToken,
}

/// The assembled sensor node.
pub struct Node {
    cfg: NodeConfig,
    bus: Bus,
    subscribers: Arc<SubscriberSet>,
    link: Arc<ConnectivityManager>,
    session: Arc<SessionManager>,
    sequencer: Arc<Sequencer>,
    shutdown: CancellationToken,
    link_events: mpsc::Receiver<LinkEvent>,
    session_events: mpsc::Receiver<SessionEvent>,
    requests: mpsc::Receiver<MeasurementRequest>,
}

impl Node {
    /// Wires the managers together around one bus.
    ///
    /// Returns the node plus the [`NodeHandles`] the transport glue uses to
    /// deliver events.
    pub fn new(
        cfg: NodeConfig,
        link_driver: Arc<dyn LinkDriver>,
        channel: Arc<dyn MessageChannel>,
        adc: Arc<dyn AdcDriver>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> (Self, NodeHandles) {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subscribers = Arc::new(SubscriberSet::new(subscribers));

        let (link_tx, link_events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let (session_tx, session_events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        // One in flight at most: requests never queue behind a sequence.
        let (req_tx, requests) = mpsc::channel(1);
        let (busy_tx, busy_rx) = tokio::sync::watch::channel(false);

        let link = Arc::new(ConnectivityManager::new(
            link_driver,
            cfg.link,
            bus.clone(),
        ));
        let session = Arc::new(SessionManager::new(
            channel,
            Topics {
                command: cfg.command_topic.clone(),
                response: cfg.response_topic.clone(),
            },
            bus.clone(),
            req_tx,
            busy_rx,
        ));
        let sequencer = Arc::new(Sequencer::new(
            TemperatureReader::new(adc),
            Arc::clone(&session),
            Arc::new(SystemClock::new()),
            bus.clone(),
            cfg.completion_hold,
            busy_tx,
        ));

        let shutdown = CancellationToken::new();
        let node = Self {
            cfg,
            bus,
            subscribers,
            link,
            session,
            sequencer,
            shutdown: shutdown.clone(),
            link_events,
            session_events,
            requests,
        };
        let handles = NodeHandles {
            link_events: link_tx,
            session_events: session_tx,
            shutdown,
        };
        (node, handles)
    }

    /// Returns a clone of the node's event bus (for extra listeners).
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Runs the node until all loops finish, a fatal error occurs, or an OS
    /// signal triggers graceful shutdown.
    pub async fn run(self) -> Result<(), NodeError> {
        let Self {
            cfg,
            bus,
            subscribers,
            link,
            session,
            sequencer,
            shutdown,
            link_events,
            session_events,
            requests,
        } = self;

        // Bus listener feeding the subscriber set (fire-and-forget).
        {
            let mut rx = bus.subscribe();
            tokio::spawn(async move {
                while let Ok(ev) = rx.recv().await {
                    subscribers.emit(&ev);
                }
            });
        }

        let mut set: JoinSet<Result<(), NodeError>> = JoinSet::new();

        // Connectivity first: the drive loop issues the initial join, and the
        // bounded wait completes (or exhausts) before any broker activity.
        {
            let link = Arc::clone(&link);
            let child = shutdown.child_token();
            set.spawn(async move {
                link.drive(link_events, child).await;
                Ok(())
            });
        }
        if let Err(e) = link.wait_for_connection().await {
            // Not fatal: keep running and let an async reconnect arrive.
            warn!("continuing without connectivity: {e}");
        }

        {
            let child = shutdown.child_token();
            set.spawn(async move {
                session.drive(session_events, child).await;
                Ok(())
            });
        }
        {
            let child = shutdown.child_token();
            set.spawn(async move { sequencer.run(requests, child).await });
        }

        tokio::select! {
            sig = wait_for_shutdown_signal() => sig?,
            _ = shutdown.cancelled() => {}
            res = drain(&mut set) => return res,
        }

        bus.publish(Event::new(EventKind::ShutdownRequested));
        shutdown.cancel();
        wait_with_grace(&bus, cfg.grace, &mut set).await
    }
}

/// Waits for the drive loops to finish within the grace period.
async fn wait_with_grace(
    bus: &Bus,
    grace: std::time::Duration,
    set: &mut JoinSet<Result<(), NodeError>>,
) -> Result<(), NodeError> {
    match time::timeout(grace, drain(set)).await {
        Ok(res) => {
            bus.publish(Event::new(EventKind::AllStoppedWithinGrace));
            res
        }
        Err(_) => {
            bus.publish(Event::new(EventKind::GraceExceeded));
            Err(NodeError::GraceExceeded { grace })
        }
    }
}

/// Joins every task; the first fatal error wins, panics are logged.
async fn drain(set: &mut JoinSet<Result<(), NodeError>>) -> Result<(), NodeError> {
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(join_err) => warn!("drive loop panicked: {join_err}"),
        }
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Unix: SIGINT, SIGTERM, SIGQUIT. Elsewhere: ctrl-c.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal (ctrl-c only off Unix).
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LinkError, SensorError, SessionError};
    use crate::session::QoS;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct QuietDriver {
        joins: AtomicU32,
    }

    #[async_trait]
    impl LinkDriver for QuietDriver {
        async fn join(&self) -> Result<(), LinkError> {
            self.joins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug, PartialEq)]
    enum Op {
        Subscribe(String),
        Publish(String, String),
    }

    struct ScriptedChannel {
        ops: Mutex<Vec<Op>>,
    }

    #[async_trait]
    impl MessageChannel for ScriptedChannel {
        async fn subscribe(&self, topic: &str, _qos: QoS) -> Result<(), SessionError> {
            self.ops.lock().unwrap().push(Op::Subscribe(topic.to_string()));
            Ok(())
        }

        async fn publish(
            &self,
            topic: &str,
            payload: &[u8],
            _qos: QoS,
            _retain: bool,
        ) -> Result<(), SessionError> {
            self.ops.lock().unwrap().push(Op::Publish(
                topic.to_string(),
                String::from_utf8(payload.to_vec()).unwrap(),
            ));
            Ok(())
        }
    }

    struct SteadyAdc;

    impl AdcDriver for SteadyAdc {
        fn sample_raw(&self) -> Result<u16, SensorError> {
            Ok(1234)
        }

        fn calibrate(&self, _raw: u16) -> Result<f64, SensorError> {
            Ok(1777.3)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_bootstrap_command_and_sequence() {
        let driver = Arc::new(QuietDriver {
            joins: AtomicU32::new(0),
        });
        let channel = Arc::new(ScriptedChannel {
            ops: Mutex::new(Vec::new()),
        });

        let (node, handles) = Node::new(
            NodeConfig::default(),
            driver.clone() as _,
            channel.clone() as _,
            Arc::new(SteadyAdc),
            Vec::new(),
        );

        let mut bus_rx = node.bus().subscribe();
        let runner = tokio::spawn(node.run());

        // Transport glue: join handshake, then broker session, then command.
        handles
            .link_events
            .send(LinkEvent::AddressAcquired {
                address: "192.168.1.50".to_string(),
            })
            .await
            .unwrap();
        handles
            .session_events
            .send(SessionEvent::Established)
            .await
            .unwrap();
        handles
            .session_events
            .send(SessionEvent::Message {
                topic: "node/command".to_string(),
                payload: b"measure:2,1000".to_vec(),
            })
            .await
            .unwrap();

        // Wait until both samples are visibly out.
        let mut published = 0;
        while published < 2 {
            if bus_rx.recv().await.unwrap().kind == EventKind::SamplePublished {
                published += 1;
            }
        }

        handles.shutdown.cancel();
        runner.await.unwrap().unwrap();

        let ops = channel.ops.lock().unwrap();
        assert_eq!(ops.first(), Some(&Op::Subscribe("node/command".to_string())));
        assert_eq!(
            ops[1..],
            [
                Op::Publish("node/response".to_string(), "1,30.00,0".to_string()),
                Op::Publish("node/response".to_string(), "0,30.00,1000".to_string()),
            ]
        );
        // Exactly the bootstrap join: the link never timed out.
        assert_eq!(driver.joins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_link_wait_is_not_fatal() {
        let driver = Arc::new(QuietDriver {
            joins: AtomicU32::new(0),
        });
        let channel = Arc::new(ScriptedChannel {
            ops: Mutex::new(Vec::new()),
        });

        let (node, handles) = Node::new(
            NodeConfig::default(),
            driver.clone() as _,
            channel.clone() as _,
            Arc::new(SteadyAdc),
            Vec::new(),
        );
        let mut bus_rx = node.bus().subscribe();
        let runner = tokio::spawn(node.run());

        // Never acquire an address; let the 10 s × 5 wait exhaust, then let
        // the node keep serving the broker session anyway.
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(driver.joins.load(Ordering::SeqCst), 6);

        handles
            .session_events
            .send(SessionEvent::Established)
            .await
            .unwrap();
        loop {
            if bus_rx.recv().await.unwrap().kind == EventKind::SessionEstablished {
                break;
            }
        }
        handles.shutdown.cancel();
        runner.await.unwrap().unwrap();

        let ops = channel.ops.lock().unwrap();
        assert_eq!(
            ops.as_slice(),
            &[Op::Subscribe("node/command".to_string())]
        );
    }
}
