#![forbid(unsafe_code)]

//! Four-state intensity chain.
//!
//! The next state is chosen by a *weighted arg-max*: every candidate state gets an independent
//! die roll in `0..1000`, the roll is multiplied by the transition probability, and the largest
//! product wins (lowest index on ties). This favours likely states without reproducing the
//! exact categorical distribution of the matrix; time-in-state statistics depend on it, so it
//! must not be replaced by inverse-CDF sampling.

use rand::Rng;
use tracing::error;

use crate::state::TrafficState;

const N: usize = TrafficState::COUNT;

/// Row-stochastic matrix indexed `[from][to]` in OFF, IDLE, LOW, HIGH order.
pub type TransitionMatrix = [[f64; N]; N];

pub const TRANSITION_MATRIX: TransitionMatrix = [
    [0.70, 0.30, 0.00, 0.00],
    [0.05, 0.78, 0.16, 0.01],
    [0.00, 0.20, 0.75, 0.05],
    [0.00, 0.05, 0.20, 0.75],
];

/// Exclusive upper bound of each die roll.
pub const DICE_SIDES: u32 = 1000;

/// Per-source chain holding the current state.
#[derive(Debug, Clone)]
pub struct TrafficStateMachine {
    state: TrafficState,
    matrix: &'static TransitionMatrix,
}

impl Default for TrafficStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficStateMachine {
    /// Start in OFF using [`TRANSITION_MATRIX`].
    #[must_use]
    pub fn new() -> Self {
        Self { state: TrafficState::Off, matrix: &TRANSITION_MATRIX }
    }

    pub fn state(&self) -> TrafficState {
        self.state
    }

    pub fn set_state(&mut self, state: TrafficState) {
        self.state = state;
    }

    pub fn matrix(&self) -> &TransitionMatrix {
        self.matrix
    }

    /// Draw the successor of the current state. Does not change `self`.
    pub fn next_state(&self) -> TrafficState {
        self.next_state_with(&mut rand::thread_rng())
    }

    pub fn next_state_with<R: Rng + ?Sized>(&self, rng: &mut R) -> TrafficState {
        let rolls: [u32; N] = std::array::from_fn(|_| rng.gen_range(0..DICE_SIDES));
        let idx = weighted_argmax(&self.matrix[self.state.index()], &rolls);
        TrafficState::from_index(idx).unwrap_or_else(|| {
            error!(index = idx, "system in unknown state, falling back to OFF");
            TrafficState::Off
        })
    }

    /// Distribution over states after `steps` transitions starting from OFF
    /// (the OFF one-hot row times `P^steps`).
    pub fn distribution_after(&self, steps: u32) -> [f64; N] {
        matrix_power(self.matrix, steps)[TrafficState::Off.index()]
    }

    /// Probability of being in LOW or HIGH after `steps` transitions from OFF.
    pub fn expected_on_fraction(&self, steps: u32) -> f64 {
        let d = self.distribution_after(steps);
        d[TrafficState::Low.index()] + d[TrafficState::High.index()]
    }

    /// Probability of being in OFF or IDLE after `steps` transitions from OFF.
    pub fn expected_off_fraction(&self, steps: u32) -> f64 {
        let d = self.distribution_after(steps);
        d[TrafficState::Off.index()] + d[TrafficState::Idle.index()]
    }
}

/// Index of the largest `p[i] * rolls[i]`, first index winning ties.
#[must_use]
pub fn weighted_argmax(row: &[f64; N], rolls: &[u32; N]) -> usize {
    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, (p, roll)) in row.iter().zip(rolls).enumerate() {
        let score = p * f64::from(*roll);
        if score > best_score {
            best = i;
            best_score = score;
        }
    }
    best
}

fn mat_mul(a: &TransitionMatrix, b: &TransitionMatrix) -> TransitionMatrix {
    let mut out = [[0.0; N]; N];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..N).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// `m^n` by repeated squaring; `m^0` is the identity.
#[must_use]
pub fn matrix_power(m: &TransitionMatrix, mut n: u32) -> TransitionMatrix {
    let mut result = [[0.0; N]; N];
    for (i, row) in result.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    let mut base = *m;
    while n > 0 {
        if n & 1 == 1 {
            result = mat_mul(&result, &base);
        }
        base = mat_mul(&base, &base);
        n >>= 1;
    }
    result
}
