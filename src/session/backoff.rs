//! Reconnect backoff schedule

use std::time::Duration;

/// Ordered, fixed list of waits between reconnect attempts
///
/// The number of attempts per reconnect cycle equals the schedule length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    /// Create a schedule from explicit delays
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Create a schedule from millisecond values
    pub fn from_millis(delays: &[u64]) -> Self {
        Self::new(delays.iter().copied().map(Duration::from_millis).collect())
    }

    /// Maximum attempts per reconnect cycle
    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }

    /// Delay before attempt `attempt` (1-based)
    pub fn delay(&self, attempt: usize) -> Option<Duration> {
        attempt.checked_sub(1).and_then(|i| self.delays.get(i).copied())
    }

    /// Iterate `(attempt, delay)` pairs, attempts numbered from 1
    pub fn attempts(&self) -> impl Iterator<Item = (usize, Duration)> + '_ {
        self.delays.iter().copied().enumerate().map(|(i, d)| (i + 1, d))
    }

    /// Sum of the delays before the first `attempts` attempts
    pub fn total_delay(&self, attempts: usize) -> Duration {
        self.delays.iter().take(attempts).sum()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for BackoffSchedule {
    /// 1s, 5s, 10s, 20s, 30s
    fn default() -> Self {
        Self::new(
            [1, 5, 10, 20, 30]
                .into_iter()
                .map(Duration::from_secs)
                .collect(),
        )
    }
}

/// What a session does once a whole schedule failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Stay running but disconnected until a manual reconnect request
    #[default]
    AwaitRequest,
    /// Start the schedule over immediately
    RetryForever,
    /// End the session task
    Stop,
}
