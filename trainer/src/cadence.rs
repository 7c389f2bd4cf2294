use std::num::NonZeroUsize;

use crate::{Result, TrainErr, config::TrainConfig};

/// Fires every `k` iterations, starting at iteration zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence(NonZeroUsize);

impl Cadence {
    pub fn new(every: NonZeroUsize) -> Self {
        Self(every)
    }

    /// Builds a cadence from a raw interval, rejecting zero.
    ///
    /// # Errors
    /// A config error naming `what` if `every` is zero.
    pub fn try_from_interval(what: &str, every: usize) -> Result<Self> {
        NonZeroUsize::new(every)
            .map(Self)
            .ok_or_else(|| TrainErr::Config(format!("{what} must be positive")))
    }

    pub fn every(&self) -> usize {
        self.0.get()
    }

    /// Returns true if the action is due at `iteration`.
    #[inline]
    pub fn is_due(&self, iteration: usize) -> bool {
        iteration % self.0.get() == 0
    }
}

/// The independent periodic actions of the training loop.
#[derive(Debug, Clone, Copy)]
pub struct Cadences {
    pub print: Cadence,
    pub eval: Cadence,
    pub log: Cadence,
    pub snapshot: Cadence,
}

impl Cadences {
    pub fn from_config(cfg: &TrainConfig) -> Result<Self> {
        Ok(Self {
            print: Cadence::try_from_interval("print_every", cfg.print_every)?,
            eval: Cadence::try_from_interval("eval_every", cfg.eval_every)?,
            log: Cadence::try_from_interval("log_every", cfg.log_every)?,
            snapshot: Cadence::try_from_interval("save_every", cfg.save_every)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_on_multiples_including_zero() {
        let c = Cadence::new(NonZeroUsize::new(3).unwrap());

        let due: Vec<usize> = (0..10).filter(|&i| c.is_due(i)).collect();
        assert_eq!(due, [0, 3, 6, 9]);
    }

    #[test]
    fn every_one_is_always_due() {
        let c = Cadence::new(NonZeroUsize::MIN);
        assert!((0..5).all(|i| c.is_due(i)));
    }

    #[test]
    fn zero_is_rejected() {
        assert!(Cadence::try_from_interval("log_every", 0).is_err());
    }
}
