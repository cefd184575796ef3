#![forbid(unsafe_code)]

//! Surge traffic mixing layer.
//!
//! Decides *how much* a source transmits: a four-state Markov chain picks the intensity level
//! on every clock tick and [`RateRedraw`] jitters the packet rate of an active sender.

pub mod markov;
pub mod rate;
pub mod state;

pub use markov::{TrafficStateMachine, TransitionMatrix, TRANSITION_MATRIX};
pub use rate::RateRedraw;
pub use state::TrafficState;
