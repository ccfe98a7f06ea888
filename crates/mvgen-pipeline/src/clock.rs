//! Time source for pipeline waits.
//!
//! Every wait in the pipeline (poll intervals, rate-limit spacing) goes
//! through a [`Clock`], so tests can run the full timing logic instantly.

use std::time::Duration;

use async_trait::async_trait;

/// Something that can wait.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "test-support"))]
mod manual {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::Clock;

    /// Clock that returns immediately and records every requested sleep.
    #[derive(Debug, Default)]
    pub struct ManualClock {
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        /// All sleeps requested so far, in order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
        }

        /// Total simulated time.
        pub fn elapsed(&self) -> Duration {
            self.sleeps().iter().sum()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        async fn sleep(&self, duration: Duration) {
            if let Ok(mut sleeps) = self.sleeps.lock() {
                sleeps.push(duration);
            }
            tokio::task::yield_now().await;
        }
    }
}
