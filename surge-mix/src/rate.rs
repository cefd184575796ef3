#![forbid(unsafe_code)]

use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Random packet-rate generator for variable-rate senders.
/// Each draw is `U(0,1) * max_rate` packets per second.
#[derive(Debug, Clone, Copy)]
pub struct RateRedraw {
    max_rate: f64,
}

impl RateRedraw {
    pub fn new(max_rate: f64) -> Self {
        Self { max_rate }
    }

    pub fn max_rate(&self) -> f64 {
        self.max_rate
    }

    /// Sample the next target rate.
    pub fn next_rate(&self) -> f64 {
        self.next_rate_with(&mut rand::thread_rng())
    }

    pub fn next_rate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = Uniform::new(0.0, 1.0).sample(rng);
        u * self.max_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_stay_below_max() {
        let redraw = RateRedraw::new(50.0);
        assert_eq!(redraw.max_rate(), 50.0);
        for _ in 0..10_000 {
            let r = redraw.next_rate();
            assert!((0.0..50.0).contains(&r), "rate {r}");
        }
    }

    #[test]
    fn mean_close_to_half_max() {
        let redraw = RateRedraw::new(10.0);
        let n = 20_000;
        let mean = (0..n).map(|_| redraw.next_rate()).sum::<f64>() / n as f64;
        // Expected 5.0 with a standard error around 0.02.
        assert!((mean - 5.0).abs() < 0.2, "mean {mean}");
    }
}
