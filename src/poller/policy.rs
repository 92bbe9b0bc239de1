use std::time::Duration;

/// Delay between status checks of a running job.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

/// Pause between seeing `completed` and announcing it.
pub const DEFAULT_COMPLETION_DELAY_MS: u64 = 1000;

/// Upper bound on a grown delay when backoff is enabled.
pub const DEFAULT_MAX_INTERVAL_MS: u64 = 30_000;

/// How a [`JobPoller`](super::JobPoller) paces itself.
///
/// The default reproduces the product's long-standing behaviour: a fixed
/// 2 s interval, no attempt limit.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second poll (and every poll when not backing off).
    pub interval: Duration,
    /// Factor the delay grows by after each non-terminal poll. `1.0` keeps
    /// the interval fixed.
    pub backoff_multiplier: f64,
    /// Cap on a grown delay.
    pub max_interval: Duration,
    /// Give up after this many status requests. `None` polls until the
    /// job reaches a terminal state.
    pub max_attempts: Option<u32>,
    pub completion_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            backoff_multiplier: 1.0,
            max_interval: Duration::from_millis(DEFAULT_MAX_INTERVAL_MS),
            max_attempts: None,
            completion_delay: Duration::from_millis(DEFAULT_COMPLETION_DELAY_MS),
        }
    }
}

impl PollPolicy {
    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, multiplier: f64, max_interval: Duration) -> Self {
        self.backoff_multiplier = multiplier;
        self.max_interval = max_interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    /// Delay to use after `current`.
    ///
    /// Clamped to `max_interval` and never shorter than `interval`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 1.0 {
            return current;
        }
        let next_ms = (current.as_millis() as f64 * self.backoff_multiplier) as u64;
        Duration::from_millis(next_ms)
            .min(self.max_interval)
            .max(self.interval)
    }

    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fixed_two_seconds_unbounded() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(2000));
        assert_eq!(policy.max_attempts, None);
        assert_eq!(policy.next_delay(policy.interval), Duration::from_millis(2000));
        assert!(!policy.attempts_exhausted(u32::MAX));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = PollPolicy::fixed(Duration::from_secs(1))
            .with_backoff(2.0, Duration::from_secs(5));

        let mut delay = policy.interval;
        let mut seen = vec![delay];
        for _ in 0..4 {
            delay = policy.next_delay(delay);
            seen.push(delay);
        }

        let secs: Vec<u64> = seen.iter().map(|d| d.as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn backoff_never_drops_below_interval() {
        let policy = PollPolicy::fixed(Duration::from_secs(3))
            .with_backoff(2.0, Duration::from_secs(1));
        assert_eq!(policy.next_delay(policy.interval), Duration::from_secs(3));
    }

    #[test]
    fn nonsense_multiplier_keeps_interval_fixed() {
        let policy = PollPolicy::default().with_backoff(f64::NAN, Duration::from_secs(60));
        assert_eq!(policy.next_delay(policy.interval), policy.interval);
    }

    #[test]
    fn attempt_budget() {
        let policy = PollPolicy::default().with_max_attempts(3);
        assert!(!policy.attempts_exhausted(2));
        assert!(policy.attempts_exhausted(3));
    }
}
