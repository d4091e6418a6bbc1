//! # SessionManager: broker session lifecycle and command dispatch.
//!
//! Owns the message-channel connection lifecycle:
//! - on `Established`: subscribe to the command topic (QoS 0) — exactly one
//!   subscribe, and it happens before any inbound message is processed
//!   because events are handled in arrival order on one loop;
//! - on `Lost`: log only — transport-level reconnection is the broker
//!   client's concern;
//! - on `Message`: parse the payload; accepted requests go to the sequencer
//!   unless a sequence is active or a request is already pending (then the
//!   command is **ignored**, by policy); rejected payloads are logged and
//!   discarded with no response;
//! - `publish_status`: fire-and-forget publish to the response topic,
//!   QoS 1, retain off.

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::command::{parse_command, MeasurementRequest};
use crate::error::SessionError;
use crate::events::{Bus, Event, EventKind};

/// Delivery-guarantee tier for published/subscribed messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QoS {
    /// At-most-once delivery (fire and forget).
    AtMostOnce = 0,
    /// At-least-once delivery (acknowledged).
    AtLeastOnce = 1,
}

/// The node's fixed topic pair.
#[derive(Clone, Debug)]
pub struct Topics {
    /// Inbound command topic (`measure:<count>,<interval_ms>` payloads).
    pub command: String,
    /// Outbound response topic (status lines).
    pub response: String,
}

/// Events emitted by the broker transport collaborator.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// An authenticated session to the broker is up.
    Established,
    /// The session dropped. The transport retries on its own.
    Lost,
    /// A message arrived on a subscribed topic.
    Message {
        /// Topic the message arrived on.
        topic: String,
        /// Raw payload bytes.
        payload: Vec<u8>,
    },
}

/// Message-channel collaborator.
///
/// Wire protocol internals live behind this seam; the manager only
/// subscribes and publishes.
#[async_trait]
pub trait MessageChannel: Send + Sync + 'static {
    /// Subscribes to a topic at the given QoS level.
    async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), SessionError>;

    /// Publishes a payload to a topic.
    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), SessionError>;
}

/// Owns the broker session lifecycle and the inbound command path.
pub struct SessionManager {
    channel: Arc<dyn MessageChannel>,
    topics: Topics,
    bus: Bus,
    requests: mpsc::Sender<MeasurementRequest>,
    sequencer_busy: watch::Receiver<bool>,
}

impl SessionManager {
    /// Creates a session manager.
    ///
    /// `requests` feeds the sequencer; `sequencer_busy` is the gate that
    /// makes commands arriving mid-sequence get ignored instead of queued.
    pub fn new(
        channel: Arc<dyn MessageChannel>,
        topics: Topics,
        bus: Bus,
        requests: mpsc::Sender<MeasurementRequest>,
        sequencer_busy: watch::Receiver<bool>,
    ) -> Self {
        Self {
            channel,
            topics,
            bus,
            requests,
            sequencer_busy,
        }
    }

    /// Runs the event loop until cancellation or channel closure.
    pub async fn drive(&self, mut events: mpsc::Receiver<SessionEvent>, token: CancellationToken) {
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

    async fn handle(&self, ev: SessionEvent) {
        match ev {
            SessionEvent::Established => {
                if let Err(e) = self
                    .channel
                    .subscribe(&self.topics.command, QoS::AtMostOnce)
                    .await
                {
                    warn!("command topic subscription failed: {e}");
                }
                self.bus.publish(
                    Event::new(EventKind::SessionEstablished)
                        .with_topic(self.topics.command.as_str()),
                );
            }
            SessionEvent::Lost => {
                info!("broker session lost; transport will reconnect");
                self.bus.publish(Event::new(EventKind::SessionLost));
            }
            SessionEvent::Message { topic, payload } => {
                self.on_message(&topic, &payload).await;
            }
        }
    }

    async fn on_message(&self, topic: &str, payload: &[u8]) {
        match parse_command(payload) {
            Ok(req) => {
                if *self.sequencer_busy.borrow() {
                    warn!("measurement sequence active; ignoring command on '{topic}'");
                    self.bus.publish(
                        Event::new(EventKind::CommandIgnored).with_remaining(req.count),
                    );
                    return;
                }
                // Forward first: acceptance is only reported once the
                // sequencer is guaranteed to see the request. The queue
                // holds one pending request; a command arriving before the
                // sequencer takes it is ignored like any other command that
                // cannot run now.
                if self.requests.try_send(req).is_err() {
                    warn!("request already pending; ignoring command on '{topic}'");
                    self.bus.publish(
                        Event::new(EventKind::CommandIgnored).with_remaining(req.count),
                    );
                    return;
                }
                self.bus.publish(
                    Event::new(EventKind::CommandAccepted)
                        .with_remaining(req.count)
                        .with_delay(req.interval()),
                );
            }
            Err(e) => {
                warn!("malformed command on '{topic}': {e}");
                self.bus
                    .publish(Event::new(EventKind::CommandRejected).with_reason(e.as_label()));
            }
        }
    }

    /// Publishes one status line to the response topic (QoS 1, retain off).
    ///
    /// Fire-and-forget: delivery failures are logged, never surfaced.
    pub async fn publish_status(&self, line: &str) {
        if let Err(e) = self
            .channel
            .publish(&self.topics.response, line.as_bytes(), QoS::AtLeastOnce, false)
            .await
        {
            warn!("status publish failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    enum Op {
        Subscribe(String, QoS),
        Publish(String, Vec<u8>, QoS, bool),
    }

    struct RecordingChannel {
        ops: Mutex<Vec<Op>>,
    }

    impl RecordingChannel {
        fn arc() -> Arc<Self> {
            Arc::new(Self {
                ops: Mutex::new(Vec::new()),
            })
        }

        fn ops(&self) -> std::sync::MutexGuard<'_, Vec<Op>> {
            self.ops.lock().unwrap()
        }
    }

    #[async_trait]
    impl MessageChannel for RecordingChannel {
        async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), SessionError> {
            self.ops().push(Op::Subscribe(topic.to_string(), qos));
            Ok(())
        }

        async fn publish(
            &self,
            topic: &str,
            payload: &[u8],
            qos: QoS,
            retain: bool,
        ) -> Result<(), SessionError> {
            self.ops()
                .push(Op::Publish(topic.to_string(), payload.to_vec(), qos, retain));
            Ok(())
        }
    }

    fn topics() -> Topics {
        Topics {
            command: "node/command".to_string(),
            response: "node/response".to_string(),
        }
    }

    struct Fixture {
        channel: Arc<RecordingChannel>,
        manager: Arc<SessionManager>,
        requests: mpsc::Receiver<MeasurementRequest>,
        busy_tx: watch::Sender<bool>,
        bus: Bus,
    }

    fn fixture() -> Fixture {
        let channel = RecordingChannel::arc();
        let (req_tx, requests) = mpsc::channel(1);
        let (busy_tx, busy_rx) = watch::channel(false);
        let bus = Bus::new(64);
        let manager = Arc::new(SessionManager::new(
            channel.clone() as _,
            topics(),
            bus.clone(),
            req_tx,
            busy_rx,
        ));
        Fixture {
            channel,
            manager,
            requests,
            busy_tx,
            bus,
        }
    }

    #[tokio::test]
    async fn subscribes_once_on_established_before_messages() {
        let mut fx = fixture();

        fx.manager.handle(SessionEvent::Established).await;
        fx.manager
            .handle(SessionEvent::Message {
                topic: "node/command".to_string(),
                payload: b"measure:3,1000".to_vec(),
            })
            .await;

        let ops = fx.channel.ops();
        assert_eq!(
            ops.first(),
            Some(&Op::Subscribe("node/command".to_string(), QoS::AtMostOnce))
        );
        assert_eq!(
            ops.iter()
                .filter(|op| matches!(op, Op::Subscribe(..)))
                .count(),
            1
        );
        drop(ops);

        let req = fx.requests.try_recv().unwrap();
        assert_eq!(
            req,
            MeasurementRequest {
                count: 3,
                interval_ms: 1000
            }
        );
    }

    #[tokio::test]
    async fn malformed_payloads_are_discarded_silently() {
        let mut fx = fixture();
        let mut events = fx.bus.subscribe();

        for payload in [&b"measure:zero,10"[..], b"bogus", b"measure:0,10"] {
            fx.manager
                .handle(SessionEvent::Message {
                    topic: "node/command".to_string(),
                    payload: payload.to_vec(),
                })
                .await;
        }

        // Nothing published on the wire, nothing forwarded to the sequencer.
        assert!(fx.channel.ops().is_empty());
        assert!(fx.requests.try_recv().is_err());
        // Every rejection is observable, none triggers any other event.
        for _ in 0..3 {
            assert_eq!(events.try_recv().unwrap().kind, EventKind::CommandRejected);
        }
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn command_during_active_sequence_is_ignored() {
        let mut fx = fixture();
        let mut events = fx.bus.subscribe();
        fx.busy_tx.send_replace(true);

        fx.manager
            .handle(SessionEvent::Message {
                topic: "node/command".to_string(),
                payload: b"measure:2,500".to_vec(),
            })
            .await;

        assert!(fx.requests.try_recv().is_err());
        assert_eq!(events.try_recv().unwrap().kind, EventKind::CommandIgnored);
    }

    #[tokio::test]
    async fn command_behind_pending_request_is_ignored_not_accepted() {
        let mut fx = fixture();
        let mut events = fx.bus.subscribe();

        // First command fills the single-slot queue; the second arrives
        // before the sequencer has taken it.
        for payload in [&b"measure:2,500"[..], b"measure:9,500"] {
            fx.manager
                .handle(SessionEvent::Message {
                    topic: "node/command".to_string(),
                    payload: payload.to_vec(),
                })
                .await;
        }

        assert_eq!(events.try_recv().unwrap().kind, EventKind::CommandAccepted);
        let ignored = events.try_recv().unwrap();
        assert_eq!(ignored.kind, EventKind::CommandIgnored);
        assert_eq!(ignored.remaining, Some(9));
        assert!(events.try_recv().is_err());

        // Only the first request reaches the sequencer.
        assert_eq!(fx.requests.try_recv().unwrap().count, 2);
        assert!(fx.requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn session_lost_logs_only() {
        let fx = fixture();
        fx.manager.handle(SessionEvent::Lost).await;
        // No subscribe, no publish, no reconnect attempt from the manager.
        assert!(fx.channel.ops().is_empty());
    }

    #[tokio::test]
    async fn status_lines_go_to_response_topic_qos1_no_retain() {
        let fx = fixture();
        fx.manager.publish_status("2,24.81,12045").await;

        let ops = fx.channel.ops();
        assert_eq!(
            ops.as_slice(),
            &[Op::Publish(
                "node/response".to_string(),
                b"2,24.81,12045".to_vec(),
                QoS::AtLeastOnce,
                false
            )]
        );
    }
}
