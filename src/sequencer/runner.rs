//! # Sequencer: drives measurement sequences to completion.
//!
//! Consumes validated [`MeasurementRequest`]s from a bounded queue and runs
//! one sequence at a time, synchronously from its own point of view:
//!
//! ```text
//! recv request
//!   ├─► busy = true
//!   ├─► anchor = clock.now_ms()          (once per sequence)
//!   │   loop {
//!   │     ├─► read_temperature()          (fatal on error)
//!   │     ├─► publish "<index>,<t:.2>,<expected_uptime>"
//!   │     ├─► sleep(interval)             (cancellable)
//!   │     └─► advance() ── Done? ─► sleep(completion_hold) ─► break
//!   │   }
//!   └─► busy = false
//! ```
//!
//! While `busy` is set, the session manager ignores new commands — a second
//! command never queues behind or interrupts a running sequence.
//!
//! Cancellation is honored at every sleep: shutdown aborts a sequence at the
//! next suspension point instead of running it out.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::{mpsc, watch};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::clock::MonotonicClock;
use crate::command::MeasurementRequest;
use crate::error::NodeError;
use crate::events::{Bus, Event, EventKind};
use crate::sensor::TemperatureReader;
use crate::session::SessionManager;

use super::state::{SequencerState, Tick};

/// Runs measurement sequences against the sensor and the broker session.
pub struct Sequencer {
    reader: TemperatureReader,
    session: Arc<SessionManager>,
    clock: Arc<dyn MonotonicClock>,
    bus: Bus,
    completion_hold: Duration,
    busy_tx: watch::Sender<bool>,
}

impl Sequencer {
    /// Creates a sequencer.
    ///
    /// `busy_tx` is the flag the session manager gates on; it must be the
    /// sender side of the receiver given to
    /// [`SessionManager::new`](crate::SessionManager::new).
    pub fn new(
        reader: TemperatureReader,
        session: Arc<SessionManager>,
        clock: Arc<dyn MonotonicClock>,
        bus: Bus,
        completion_hold: Duration,
        busy_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            reader,
            session,
            clock,
            bus,
            completion_hold,
            busy_tx,
        }
    }

    /// Consumes requests until cancellation or queue closure.
    ///
    /// A sensor failure inside a sequence is fatal and aborts the loop with
    /// [`NodeError::Sensor`]; everything else runs forever.
    pub async fn run(
        &self,
        mut requests: mpsc::Receiver<MeasurementRequest>,
        token: CancellationToken,
    ) -> Result<(), NodeError> {
        loop {
            let req = tokio::select! {
                _ = token.cancelled() => return Ok(()),
                req = requests.recv() => match req {
                    Some(req) => req,
                    None => return Ok(()),
                },
            };

            self.busy_tx.send_replace(true);
            let outcome = self.run_sequence(req, &token).await;
            self.busy_tx.send_replace(false);
            outcome?;
        }
    }

    /// Runs one sequence to completion (or cancellation).
    async fn run_sequence(
        &self,
        req: MeasurementRequest,
        token: &CancellationToken,
    ) -> Result<(), NodeError> {
        let mut state = SequencerState::new(&req, self.clock.now_ms());
        self.bus.publish(
            Event::new(EventKind::SequenceStarted)
                .with_remaining(req.count)
                .with_delay(req.interval()),
        );

        loop {
            let temperature = self.reader.read_temperature()?;
            let line = format!(
                "{},{:.2},{}",
                state.index(),
                temperature,
                state.expected_uptime_ms()
            );
            self.session.publish_status(&line).await;
            self.bus.publish(
                Event::new(EventKind::SamplePublished)
                    .with_remaining(state.index())
                    .with_payload(line),
            );

            // The interval sleep follows every sample, the last included.
            if !self.pause(state.interval(), token).await {
                return Ok(());
            }

            match state.advance() {
                Tick::Running => {}
                Tick::Done => {
                    info!("measurement sequence complete");
                    self.bus.publish(Event::new(EventKind::SequenceCompleted));
                    self.pause(self.completion_hold, token).await;
                    return Ok(());
                }
            }
        }
    }

    /// Cancellable sleep. Returns `false` if cancellation cut it short.
    async fn pause(&self, duration: Duration, token: &CancellationToken) -> bool {
        if duration.is_zero() {
            return !token.is_cancelled();
        }
        tokio::select! {
            _ = time::sleep(duration) => true,
            _ = token.cancelled() => false,
        }
    }
}
