//! Suspend until a predicate holds or a deadline elapses.
//!
//! Polling is cooperative: between attempts the task sleeps on the tokio timer,
//! so a paused test clock drives it deterministically. Transport failures
//! (no JSON-RPC error code) are treated as transient and polled through; any
//! error carrying a remote payload ends the wait.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use migration_verifier_types::{millis, RetryConfig, VerifyError, VerifyResult};

/// How the delay between polls evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Exponential,
}

/// Polling cadence and overall budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(with = "millis")]
    pub interval: Duration,
    /// Upper bound for exponential growth.
    #[serde(with = "millis")]
    pub max_interval: Duration,
    #[serde(default)]
    pub strategy: BackoffStrategy,
    #[serde(with = "millis")]
    pub timeout: Duration,
}

impl PollConfig {
    pub fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            strategy: BackoffStrategy::Fixed,
            timeout,
        }
    }

    pub fn exponential(initial: Duration, max_interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: initial,
            max_interval,
            strategy: BackoffStrategy::Exponential,
            timeout,
        }
    }

    /// Delay after poll number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.strategy {
            BackoffStrategy::Fixed => self.interval,
            BackoffStrategy::Exponential => {
                let shift = attempt.saturating_sub(1).min(16);
                self.interval
                    .saturating_mul(1u32 << shift)
                    .min(self.max_interval.max(self.interval))
            }
        }
    }

    pub fn deadline_from_now(&self) -> Instant {
        Instant::now() + self.timeout
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1), Duration::from_secs(300))
    }
}

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStatus<T> {
    Ready(T),
    /// Not yet; `observed` is the latest progress marker (e.g. a block height).
    Pending { observed: Option<u64> },
}

pub fn is_transient(err: &VerifyError) -> bool {
    matches!(err, VerifyError::Rpc(e) if e.code.is_none())
}

/// Poll until `poll` yields [`PollStatus::Ready`] or `deadline` passes.
///
/// One final poll happens at the deadline, so a condition that becomes true
/// during the last sleep is still observed.
pub async fn wait_until<T, F, Fut>(
    config: &PollConfig,
    deadline: Instant,
    waiting_for: &str,
    mut poll: F,
) -> VerifyResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = VerifyResult<PollStatus<T>>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    let mut last_observed = None;

    loop {
        attempt += 1;
        match poll().await {
            Ok(PollStatus::Ready(value)) => {
                debug!(waiting_for, attempt, "wait condition satisfied");
                return Ok(value);
            }
            Ok(PollStatus::Pending { observed }) => {
                if observed.is_some() {
                    last_observed = observed;
                }
                debug!(waiting_for, attempt, ?observed, "still waiting");
            }
            Err(e) if is_transient(&e) => {
                warn!(waiting_for, attempt, error = %e, "transient poll failure");
            }
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(VerifyError::Timeout {
                waiting_for: waiting_for.to_string(),
                waited: now.duration_since(started),
                last_observed_tip: last_observed,
            });
        }
        tokio::time::sleep(config.delay_for(attempt).min(deadline - now)).await;
    }
}

/// Retry `fetch` while it yields `None`, at most `retry.retries` extra times.
pub async fn retry_until_some<T, F, Fut>(
    retry: &RetryConfig,
    waiting_for: &str,
    mut fetch: F,
) -> VerifyResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = VerifyResult<Option<T>>>,
{
    let started = Instant::now();
    let mut attempt = 0usize;
    loop {
        if let Some(value) = fetch().await? {
            return Ok(value);
        }
        if attempt >= retry.retries {
            return Err(VerifyError::Timeout {
                waiting_for: waiting_for.to_string(),
                waited: started.elapsed(),
                last_observed_tip: None,
            });
        }
        attempt += 1;
        let backoff = retry.backoff_for(attempt);
        debug!(waiting_for, attempt, ?backoff, "not materialized yet, retrying");
        tokio::time::sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration_verifier_types::RpcError;
    use std::cell::Cell;

    #[test]
    fn test_delay_for_strategies() {
        let fixed = PollConfig::fixed(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(fixed.delay_for(5), Duration::from_millis(100));

        let exp = PollConfig::exponential(
            Duration::from_millis(100),
            Duration::from_millis(500),
            Duration::from_secs(1),
        );
        assert_eq!(exp.delay_for(1), Duration::from_millis(100));
        assert_eq!(exp.delay_for(2), Duration::from_millis(200));
        assert_eq!(exp.delay_for(3), Duration::from_millis(400));
        assert_eq!(exp.delay_for(4), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_ready_after_pending() {
        let config = PollConfig::fixed(Duration::from_millis(100), Duration::from_secs(5));
        let polls = Cell::new(0u64);
        let value = wait_until(&config, config.deadline_from_now(), "counter", || {
            polls.set(polls.get() + 1);
            let n = polls.get();
            async move {
                if n >= 3 {
                    Ok(PollStatus::Ready(n))
                } else {
                    Ok(PollStatus::Pending { observed: Some(n) })
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_times_out_with_last_observation() {
        let config = PollConfig::fixed(Duration::from_millis(200), Duration::from_secs(1));
        let err = wait_until(&config, config.deadline_from_now(), "never", || async {
            Ok::<_, VerifyError>(PollStatus::<()>::Pending { observed: Some(7) })
        })
        .await
        .unwrap_err();
        match err {
            VerifyError::Timeout {
                last_observed_tip,
                waited,
                ..
            } => {
                assert_eq!(last_observed_tip, Some(7));
                assert!(waited >= Duration::from_secs(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_polled_through() {
        let config = PollConfig::fixed(Duration::from_millis(10), Duration::from_secs(1));
        let polls = Cell::new(0u32);
        let out = wait_until(&config, config.deadline_from_now(), "flaky", || {
            polls.set(polls.get() + 1);
            let n = polls.get();
            async move {
                if n == 1 {
                    Err(VerifyError::Rpc(RpcError::transport("eth_blockNumber", "connection refused")))
                } else {
                    Ok(PollStatus::Ready("up"))
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, "up");

        let err = wait_until(&config, config.deadline_from_now(), "broken", || async {
            Err::<PollStatus<()>, _>(VerifyError::Rpc(RpcError::remote(
                "eth_blockNumber",
                -32000,
                "boom",
                None,
            )))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, VerifyError::Rpc(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_some_is_bounded() {
        let retry = RetryConfig::new(2, 10, 100);
        let calls = Cell::new(0usize);
        let err = retry_until_some(&retry, "diff", || {
            calls.set(calls.get() + 1);
            async { Ok::<Option<u8>, VerifyError>(None) }
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(calls.get(), 3);

        let calls = Cell::new(0usize);
        let v = retry_until_some(&retry, "diff", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Ok::<_, VerifyError>((n == 2).then_some(n)) }
        })
        .await
        .unwrap();
        assert_eq!(v, 2);
    }
}
