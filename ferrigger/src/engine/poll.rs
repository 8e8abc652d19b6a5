//! Bounded retry loop timing.

use std::time::Duration;

use tokio::time::{sleep, Instant};

use crate::config::Timeout;

/// Paces the attempts of one polled step.
///
/// The first attempt happens immediately. After a failed attempt,
/// [`Poller::wait`] sleeps for the interval (shortened to the time left)
/// and reports whether another attempt fits in the budget.
#[derive(Debug)]
pub struct Poller {
    deadline: Instant,
    interval: Duration,
    max_time: Duration,
    attempts: u32,
}

impl Poller {
    /// Start the clock for a step.
    pub fn new(timeout: &Timeout) -> Self {
        Self {
            deadline: Instant::now() + timeout.max_time,
            interval: timeout.interval,
            max_time: timeout.max_time,
            attempts: 0,
        }
    }

    /// Count an attempt and return its number, starting at 1.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The step's total budget.
    pub fn max_time(&self) -> Duration {
        self.max_time
    }

    /// Sleep before the next attempt. Returns `false` once the budget is
    /// spent, without sleeping.
    pub async fn wait(&self) -> bool {
        let now = Instant::now();
        if now >= self.deadline {
            return false;
        }
        sleep(self.interval.min(self.deadline - now)).await;
        true
    }
}
