use log::debug;

use crate::{Result, TrainErr};

/// Marks the end of the decay boundaries, no epoch ever matches it.
const SENTINEL: i64 = -1;
const DECAY_FACTOR: f32 = 0.1;

/// Step decay of the learning rate, keyed by epoch.
///
/// The rate is multiplied by `0.1` once at each listed epoch, in order.
#[derive(Debug, Clone)]
pub struct LearningRateSchedule {
    rate: f32,
    boundaries: Vec<i64>,
    next: usize,
}

impl LearningRateSchedule {
    /// Parses a comma separated list of decay epochs, e.g. `"5,10"` or `"-1"` for no decay.
    ///
    /// # Arguments
    /// * `initial_rate` - The rate used until the first boundary.
    /// * `decay_schedule` - The epochs at which to decay.
    ///
    /// # Errors
    /// A config error if an item is not an integer, if the epochs are not strictly increasing
    /// or if `-1` shows up anywhere but last.
    pub fn parse(initial_rate: f32, decay_schedule: &str) -> Result<Self> {
        let mut boundaries = decay_schedule
            .split(',')
            .map(|item| {
                item.trim().parse::<i64>().map_err(|_| {
                    TrainErr::Config(format!("invalid decay epoch '{item}' in '{decay_schedule}'"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let last = boundaries.len() - 1;
        for (i, &epoch) in boundaries.iter().enumerate() {
            let misplaced_sentinel = epoch == SENTINEL && i != last;
            if (epoch < 0 && epoch != SENTINEL) || misplaced_sentinel {
                return Err(TrainErr::Config(format!(
                    "invalid decay epoch {epoch} in '{decay_schedule}'"
                )));
            }
        }

        let increasing = boundaries
            .iter()
            .filter(|&&e| e != SENTINEL)
            .collect::<Vec<_>>()
            .windows(2)
            .all(|w| w[0] < w[1]);

        if !increasing {
            return Err(TrainErr::Config(format!(
                "decay epochs must be strictly increasing: '{decay_schedule}'"
            )));
        }

        if boundaries.last().is_some_and(|&e| e > 0) {
            boundaries.push(SENTINEL);
        }

        Ok(Self {
            rate: initial_rate,
            boundaries,
            next: 0,
        })
    }

    /// Called once at the start of every epoch, decays the rate if `epoch` is the next boundary.
    ///
    /// # Returns
    /// The rate to use for the epoch.
    pub fn advance(&mut self, epoch: usize) -> f32 {
        let Some(&boundary) = self.boundaries.get(self.next) else {
            return self.rate;
        };

        if boundary != SENTINEL && boundary as usize == epoch {
            self.rate *= DECAY_FACTOR;
            self.next += 1;
            debug!(epoch = epoch, rate = self.rate; "learning rate decayed");
        }

        self.rate
    }

    /// The rate currently in use.
    pub fn current(&self) -> f32 {
        self.rate
    }
}
