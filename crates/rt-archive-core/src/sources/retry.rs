//! Blocking retry with exponential backoff and jitter for source fetches.

use crate::config::RetrySettings;
use rand::Rng;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.base_delay(),
            max_delay: settings.max_delay(),
            jitter: settings.jitter,
        }
    }
}

impl RetryPolicy {
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retrying after `attempt` (0-indexed) failed.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped = secs.min(self.max_delay.as_secs_f64());

        let final_secs = if self.jitter {
            // 0.5x..1.5x keeps the mean while avoiding near-zero delays
            let factor = rand::rng().random_range(0.5..1.5);
            (capped * factor).min(self.max_delay.as_secs_f64())
        } else {
            capped
        };
        Duration::from_secs_f64(final_secs)
    }

    /// Run `operation` until it succeeds, a non-retryable error occurs, or
    /// attempts run out. Returns the last error in the latter two cases.
    pub fn run<T, E, F, P>(&self, mut operation: F, should_retry: P) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Request succeeded after {} attempts", attempt + 1);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    if !should_retry(&e) || attempt + 1 >= self.max_attempts {
                        return Err(e);
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        self.max_attempts,
                        e,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
