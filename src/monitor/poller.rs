//! Poller contract and the reference random poller.

use std::time::Duration;

use rand::Rng;
use tokio::time::timeout;

use crate::monitor::{ERROR_SENTINEL, TargetDefinition};

/// One sample attempt against a target.
///
/// Implementations must never fail past this boundary: every failure mode
/// (timeout, I/O error, bad reading) collapses to [`ERROR_SENTINEL`] or any
/// other negative value. The scheduler additionally bounds each call by the
/// target's timeout.
#[async_trait::async_trait]
pub trait Poller: Send + Sync + 'static {
    /// Poller kind, used in logs.
    fn kind(&self) -> &str;

    /// Take one reading.
    async fn poll(&self, target: &TargetDefinition) -> i64;
}

/// Stand-in poller that sleeps a random duration and returns a random reading.
///
/// The sleep ranges from one second up to 120% of the target timeout, so some
/// polls overrun and report the sentinel.
#[derive(Debug, Clone, Default)]
pub struct RandomPoller;

/// Upper bound of the random reading.
const MAX_READING: i64 = 100;

impl RandomPoller {
    pub fn new() -> Self {
        Self
    }

    fn draw(target: &TargetDefinition) -> (Duration, i64) {
        let max_secs = ((target.timeout as f64) * 1.2).round().max(1.0) as u64;
        let mut rng = rand::rng();
        let secs = rng.random_range(1..=max_secs);
        let reading = rng.random_range(0..=MAX_READING);
        (Duration::from_secs(secs), reading)
    }
}

#[async_trait::async_trait]
impl Poller for RandomPoller {
    fn kind(&self) -> &str {
        "random"
    }

    async fn poll(&self, target: &TargetDefinition) -> i64 {
        let (delay, reading) = Self::draw(target);
        match timeout(target.timeout_duration(), tokio::time::sleep(delay)).await {
            Ok(()) => reading,
            Err(_) => {
                tracing::warn!(target_id = %target.id, name = %target.name, "Poll timed out");
                ERROR_SENTINEL
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::TargetSpec;

    #[test]
    fn test_draw_stays_in_bounds() {
        let target = TargetDefinition::new(TargetSpec::new("r", 10, 5)).unwrap();
        for _ in 0..200 {
            let (delay, reading) = RandomPoller::draw(&target);
            assert!(delay >= Duration::from_secs(1));
            assert!(delay <= Duration::from_secs(6));
            assert!((0..=MAX_READING).contains(&reading));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_random_poller_result_is_reading_or_sentinel() {
        let target = TargetDefinition::new(TargetSpec::new("r", 2, 2)).unwrap();
        let poller = RandomPoller::new();
        for _ in 0..20 {
            let value = poller.poll(&target).await;
            assert!(value == ERROR_SENTINEL || (0..=MAX_READING).contains(&value));
        }
    }
}
