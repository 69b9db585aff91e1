use crate::config::KeytimeConfig;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::error;

/// Human inter-key delays: a normal distribution scaled by a speed multiplier
/// with a soft floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayModel {
    mean: f64,
    std_dev: f64,
    min_delay: f64,
}

impl DelayModel {
    pub fn new(mean: f64, std_dev: f64, min_delay: f64) -> Self {
        Self {
            mean,
            std_dev,
            min_delay,
        }
    }

    pub fn from_config(config: &KeytimeConfig) -> Self {
        Self::new(config.delay_mean, config.delay_std_dev, config.min_delay)
    }

    pub fn min_delay(&self) -> f64 {
        self.min_delay
    }

    /// Draw one delay in seconds. The result is not rounded.
    ///
    /// A draw below the floor becomes `floor + draw / 10`, which keeps some
    /// spread instead of piling every fast key onto the floor itself.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, speed_multiplier: f64) -> f64 {
        let speed = if speed_multiplier.is_finite() && speed_multiplier > 0.0 {
            speed_multiplier
        } else {
            error!(speed_multiplier, "Invalid speed multiplier, setting to 1");
            1.0
        };

        let delay = match Normal::new(self.mean / speed, self.std_dev / speed) {
            Ok(normal) => normal.sample(rng),
            Err(e) => {
                error!("Invalid delay distribution ({e}), using the mean");
                self.mean / speed
            }
        };
        let delay = if delay < self.min_delay {
            self.min_delay + delay / 10.0
        } else {
            delay
        };
        delay.max(0.0)
    }
}

impl Default for DelayModel {
    fn default() -> Self {
        Self::from_config(&KeytimeConfig::default())
    }
}
