//! # Example: simulated_node
//!
//! Runs the full node against in-process stand-ins for the radio, the
//! broker, and the analog front end. No network, no hardware.
//!
//! Shows how to:
//! - Implement the [`LinkDriver`], [`MessageChannel`], and [`AdcDriver`]
//!   seams.
//! - Feed [`LinkEvent`] / [`SessionEvent`] through [`NodeHandles`].
//! - Attach a custom [`Subscribe`] implementation alongside processing.
//!
//! ## Flow
//! ```text
//! main
//!   ├─► Node::new(cfg, SimulatedLink, SimulatedBroker, SimulatedAdc, [console])
//!   ├─► node.run()
//!   │     ├─► join issued ──► SimulatedLink replies AddressAcquired (300 ms)
//!   │     ├─► SessionEvent::Established ──► subscribe node/command
//!   │     ├─► "measure:3,500" ──► 3 status lines on node/response
//!   │     ├─► "measure:9,500" mid-sequence ──► ignored
//!   │     └─► "bogus" ──► rejected
//!   └─► handles.shutdown.cancel() ──► graceful stop
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example simulated_node
//! ```

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use thermonode::{
    AdcDriver, Event, EventKind, LinkDriver, LinkError, LinkEvent, MessageChannel, Node,
    NodeConfig, QoS, SensorError, SessionError, SessionEvent, Subscribe,
};

/// Radio stand-in: every accepted join produces an address 300 ms later.
struct SimulatedLink {
    events: Mutex<Option<mpsc::Sender<LinkEvent>>>,
}

impl SimulatedLink {
    fn arc() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(None),
        })
    }

    /// Wires the driver to the node's link-event feed (call before run).
    fn attach(&self, events: mpsc::Sender<LinkEvent>) {
        *self.events.lock().unwrap() = Some(events);
    }
}

#[async_trait]
impl LinkDriver for SimulatedLink {
    async fn join(&self) -> Result<(), LinkError> {
        println!("[radio] join requested");
        let Some(events) = self.events.lock().unwrap().clone() else {
            return Err(LinkError::JoinFailed {
                reason: "driver not attached".to_string(),
            });
        };
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = events
                .send(LinkEvent::AddressAcquired {
                    address: "192.168.4.23".to_string(),
                })
                .await;
        });
        Ok(())
    }
}

/// Broker stand-in: prints every wire operation.
struct SimulatedBroker;

#[async_trait]
impl MessageChannel for SimulatedBroker {
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), SessionError> {
        println!("[broker] subscribe {topic} (qos {})", qos as u8);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        _retain: bool,
    ) -> Result<(), SessionError> {
        println!(
            "[broker] {topic} <- {:?} (qos {})",
            String::from_utf8_lossy(payload),
            qos as u8
        );
        Ok(())
    }
}

/// Analog front end stand-in: a slowly drifting reading around 30 °C.
struct SimulatedAdc {
    ticks: AtomicU16,
}

impl AdcDriver for SimulatedAdc {
    fn sample_raw(&self) -> Result<u16, SensorError> {
        Ok(self.ticks.fetch_add(1, Ordering::Relaxed))
    }

    fn calibrate(&self, raw: u16) -> Result<f64, SensorError> {
        // Drift a few millivolts per sample below V0, so the Celsius value
        // creeps up from 30 °C.
        Ok(1777.3 - f64::from(raw % 32) * 3.0)
    }
}

/// Console subscriber that prints selected runtime events.
struct ConsoleSubscriber;

#[async_trait]
impl Subscribe for ConsoleSubscriber {
    async fn on_event(&self, ev: &Event) {
        match ev.kind {
            EventKind::AddressAcquired => {
                println!("[node] address acquired: {:?}", ev.address.as_deref());
            }
            EventKind::SessionEstablished => {
                println!("[node] session up, listening on {:?}", ev.topic.as_deref());
            }
            EventKind::CommandAccepted => {
                println!(
                    "[node] command accepted: count={:?} interval={:?}ms",
                    ev.remaining, ev.delay_ms
                );
            }
            EventKind::CommandIgnored => {
                println!("[node] command ignored (sequence active)");
            }
            EventKind::CommandRejected => {
                println!("[node] command rejected: {:?}", ev.reason.as_deref());
            }
            EventKind::SamplePublished => {
                println!("[node] sample out: {:?}", ev.payload.as_deref());
            }
            EventKind::SequenceCompleted => println!("[node] sequence complete"),
            EventKind::ShutdownRequested => println!("[node] shutting down"),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("simulated_node demo\n");

    let mut cfg = NodeConfig::default();
    cfg.ssid = "demo-net".to_string();
    cfg.password = "demo-pass".to_string();
    // Shorter hold than the firmware default to keep the demo snappy.
    cfg.completion_hold = Duration::from_millis(500);

    let link = SimulatedLink::arc();
    let (node, handles) = Node::new(
        cfg,
        link.clone() as _,
        Arc::new(SimulatedBroker),
        Arc::new(SimulatedAdc {
            ticks: AtomicU16::new(0),
        }),
        vec![Arc::new(ConsoleSubscriber)],
    );
    link.attach(handles.link_events.clone());

    let runner = tokio::spawn(node.run());

    // Broker glue: session up, then a command sequence.
    tokio::time::sleep(Duration::from_millis(500)).await;
    handles.session_events.send(SessionEvent::Established).await?;

    let command = |payload: &[u8]| SessionEvent::Message {
        topic: "node/command".to_string(),
        payload: payload.to_vec(),
    };

    tokio::time::sleep(Duration::from_millis(200)).await;
    handles.session_events.send(command(b"measure:3,500")).await?;

    // Arrives mid-sequence: ignored by policy.
    tokio::time::sleep(Duration::from_millis(700)).await;
    handles.session_events.send(command(b"measure:9,500")).await?;

    // Malformed: rejected, no response published.
    handles.session_events.send(command(b"bogus")).await?;

    // Let the sequence and its completion hold run out, then stop.
    tokio::time::sleep(Duration::from_secs(3)).await;
    handles.shutdown.cancel();

    match runner.await? {
        Ok(()) => println!("\nnode stopped gracefully"),
        Err(e) => println!("\nnode stopped with error: {e}"),
    }
    Ok(())
}
