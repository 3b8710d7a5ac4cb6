use std::time::Duration;

use rand::Rng;

/// Reconnect delay that doubles per attempt up to a ceiling, with +/- jitter
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    base: Duration,
    ceiling: Duration,
    jitter: f64,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new(base: Duration, ceiling: Duration) -> Self {
        Self {
            base,
            ceiling,
            jitter: 0.1,
            attempt: 0,
        }
    }

    /// Fraction of the delay randomly added or removed, clamped to `0.0..=1.0`
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(16));
        self.attempt = self.attempt.saturating_add(1);

        let delay = self.base.saturating_mul(factor).min(self.ceiling);
        if self.jitter == 0.0 {
            return delay;
        }

        let spread = delay.as_secs_f64() * self.jitter;
        let offset = rand::rng().random_range(-spread..=spread);
        Duration::from_secs_f64((delay.as_secs_f64() + offset).max(0.001))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}
