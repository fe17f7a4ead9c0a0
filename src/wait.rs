//! Polling helper for conditions that take time to become true.
//!
//! Find commands issued from inside [`Wait::until`] are recognized as
//! retries: only the last attempt is reported.

use std::thread;
use std::time::{Duration, Instant};

/// Default total time to wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause between attempts
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("Condition not met after {attempts} attempt(s) in {timeout:?}")]
    Timeout { timeout: Duration, attempts: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    timeout: Duration,
    interval: Duration,
}

impl Wait {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: DEFAULT_INTERVAL,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll `condition` until it returns `Some` or the timeout elapses
    ///
    /// The condition runs at least once.
    #[inline(never)]
    pub fn until<D, T, F>(&self, target: &mut D, mut condition: F) -> Result<T, WaitError>
    where
        D: ?Sized,
        F: FnMut(&mut D) -> Option<T>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut attempts = 0;

        loop {
            attempts += 1;
            if let Some(value) = condition(target) {
                return Ok(value);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WaitError::Timeout {
                    timeout: self.timeout,
                    attempts,
                });
            }
            thread::sleep(self.interval.min(deadline - now));
        }
    }
}

impl Default for Wait {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
