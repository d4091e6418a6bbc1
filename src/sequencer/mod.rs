//! # Measurement sequencing.
//!
//! This module contains the heart of the node:
//! - [`SequencerState`], [`Tick`] — the pure countdown state machine
//! - [`Sequencer`] — the async runner that samples, publishes, and sleeps

mod runner;
mod state;

pub use runner::Sequencer;
pub use state::{SequencerState, Tick};
