//! Bounded polling with backoff.
//!
//! Used for provider jobs that complete asynchronously. The loop waits
//! *before* each poll, so a job is never polled the instant it was
//! submitted.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;

/// Polling schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Wait before the first poll
    pub interval: Duration,
    /// Maximum number of polls
    pub max_attempts: u32,
    /// Multiplier applied to the wait after each poll (1.0 = fixed interval)
    pub backoff: f64,
    /// Upper bound for a single wait
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 10,
            backoff: 1.0,
            max_interval: Duration::from_secs(60),
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_backoff(mut self, backoff: f64) -> Self {
        self.backoff = backoff;
        self
    }

    /// Wait before poll number `attempt` (zero-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let ceiling = self.max_interval.max(self.interval);
        let factor = self.backoff.max(1.0).powi(attempt as i32);
        Duration::try_from_secs_f64(self.interval.as_secs_f64() * factor)
            .map_or(ceiling, |delay| delay.min(ceiling))
    }
}

/// Outcome of [`poll_until`].
#[derive(Debug, PartialEq)]
pub enum PollOutcome<T> {
    /// The check reported a value.
    Ready(T),
    /// Every attempt came back pending.
    Exhausted { attempts: u32 },
}

/// Run `check` until it yields a value or the policy runs out of attempts.
///
/// `check` receives the 1-based attempt number and returns `Ok(None)` while
/// the job is still pending. Errors end the loop immediately.
pub async fn poll_until<F, Fut, T, E>(
    policy: &PollPolicy,
    clock: &dyn Clock,
    operation: &str,
    mut check: F,
) -> Result<PollOutcome<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    for attempt in 0..policy.max_attempts {
        clock.sleep(policy.delay_for_attempt(attempt)).await;
        if let Some(value) = check(attempt + 1).await? {
            return Ok(PollOutcome::Ready(value));
        }
        debug!(
            "{} still pending after attempt {}/{}",
            operation,
            attempt + 1,
            policy.max_attempts
        );
    }
    Ok(PollOutcome::Exhausted {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_fixed_interval_by_default() {
        let policy = PollPolicy::new(Duration::from_secs(5), 10);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(5));
        assert_eq!(policy.delay_for_attempt(9), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy::new(Duration::from_secs(1), 10).with_backoff(2.0);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for_attempt(9), Duration::from_secs(60));
    }

    #[test]
    fn test_huge_interval_with_backoff_does_not_overflow() {
        let interval = Duration::from_secs(u64::MAX / 2);
        let policy = PollPolicy::new(interval, 10).with_backoff(2.0);
        assert_eq!(policy.delay_for_attempt(0), interval);
        assert_eq!(policy.delay_for_attempt(5), interval);

        let policy = PollPolicy::new(Duration::from_secs(1), 2000).with_backoff(10.0);
        assert_eq!(policy.delay_for_attempt(1500), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_ready_on_third_attempt_sleeps_three_times() {
        let clock = ManualClock::new();
        let policy = PollPolicy::new(Duration::from_secs(5), 10);

        let outcome: Result<_, ()> = poll_until(&policy, &clock, "job", |attempt| async move {
            Ok((attempt == 3).then_some("done"))
        })
        .await;

        assert_eq!(outcome, Ok(PollOutcome::Ready("done")));
        assert_eq!(clock.sleeps().len(), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let clock = ManualClock::new();
        let policy = PollPolicy::new(Duration::from_secs(5), 10);

        let outcome: Result<PollOutcome<()>, ()> =
            poll_until(&policy, &clock, "job", |_| async { Ok(None) }).await;

        assert_eq!(outcome, Ok(PollOutcome::Exhausted { attempts: 10 }));
        assert_eq!(clock.elapsed(), Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_error_stops_polling() {
        let clock = ManualClock::new();
        let policy = PollPolicy::new(Duration::from_millis(10), 10);

        let outcome: Result<PollOutcome<()>, &str> = poll_until(&policy, &clock, "job", |n| async move {
            if n == 2 {
                Err("job failed")
            } else {
                Ok(None)
            }
        })
        .await;

        assert_eq!(outcome, Err("job failed"));
        assert_eq!(clock.sleeps().len(), 2);
    }
}
