//! Exponential reconnect backoff.
//!
//! The delay before the next reconnect is
//! `min(initial × 2^attempts, max)`. The attempt counter is advanced when a
//! scheduled reconnect actually fires and reset on an explicit connect or a
//! successful open, so the Nth consecutive drop waits `initial × 2^N`.

use std::time::Duration;

/// Smallest delay a [`Backoff`] hands out, so a zero setting cannot turn
/// reconnects into a busy loop.
pub const MIN_DELAY: Duration = Duration::from_millis(1);

/// Backoff state for the realtime connection.
///
/// ```
/// use livescore_client::backoff::Backoff;
/// use std::time::Duration;
///
/// let mut backoff = Backoff::new(Duration::from_millis(1000), Duration::from_millis(30_000));
/// assert_eq!(backoff.delay(), Duration::from_millis(1000));
/// backoff.record_attempt();
/// assert_eq!(backoff.delay(), Duration::from_millis(2000));
/// backoff.reset();
/// assert_eq!(backoff.attempts(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    attempts: u32,
}

impl Backoff {
    /// `initial` is raised to [`MIN_DELAY`] and `max` to `initial`.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(MIN_DELAY);
        Self {
            initial,
            max: max.max(initial),
            attempts: 0,
        }
    }

    /// Number of reconnect attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Delay to wait before the next reconnect attempt.
    pub fn delay(&self) -> Duration {
        delay_for(self.initial, self.max, self.attempts)
    }

    /// Count one reconnect attempt.
    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// `min(initial × 2^attempts, max)`, saturating instead of overflowing.
pub fn delay_for(initial: Duration, max: Duration, attempts: u32) -> Duration {
    let factor = 1_u32.checked_shl(attempts).unwrap_or(u32::MAX);
    initial.saturating_mul(factor).min(max)
}
