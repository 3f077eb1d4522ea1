// src/retry.rs
//! Bounded retries with capped exponential backoff and jitter.
//!
//! [`retry_with_backoff`] is the one place the backoff math lives; the
//! HTTP helpers and the endpoint failover in [`crate::failover`] are
//! built on top of it.

use backon::{BackoffBuilder, Retryable};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::warn;

/// Upper bound of the random addition, as a fraction of the base delay.
pub const JITTER_FRACTION: f64 = 0.2;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected payload: {0}")]
    Decode(String),
    #[error("rpc: {0}")]
    Rpc(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32, // >= 1
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub timeout: Duration, // per attempt
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(120),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Base wait after the `failed`-th attempt (1-based), before jitter:
    /// `min(initial * 2^(failed-1), max)`.
    pub fn delay_for(&self, failed: u32) -> Duration {
        let factor = 2u32.saturating_pow(failed.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn backoff(&self) -> JitteredBackoff {
        JitteredBackoff { policy: *self, failed: 0, rng: fastrand::Rng::new() }
    }
}

/// Yields one jittered delay per retry, `max_attempts - 1` in total.
#[derive(Debug, Clone)]
pub struct JitteredBackoff {
    policy: RetryPolicy,
    failed: u32,
    rng: fastrand::Rng,
}

impl Iterator for JitteredBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.failed += 1;
        if self.failed >= self.policy.max_attempts {
            return None;
        }
        let base = self.policy.delay_for(self.failed);
        Some(base + base.mul_f64(JITTER_FRACTION * self.rng.f64()))
    }
}

impl BackoffBuilder for RetryPolicy {
    type Backoff = JitteredBackoff;

    fn build(self) -> Self::Backoff {
        self.backoff()
    }
}

/// Run `op` up to `policy.max_attempts` times.
///
/// Every attempt is bounded by `policy.timeout`; an attempt that runs over
/// is dropped (which cancels the in-flight request) and counts as a
/// failure. The last error is returned once the budget is spent.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let timeout = policy.timeout;
    let max = policy.max_attempts.max(1);
    let attempt = AtomicU32::new(0);

    let run = || {
        attempt.fetch_add(1, Ordering::Relaxed);
        let fut = op();
        async move {
            tokio::time::timeout(timeout, fut)
                .await
                .map_err(|_| FetchError::Timeout(timeout))?
        }
    };

    let outcome = run
        .retry(RetryPolicy { max_attempts: max, ..*policy })
        .sleep(tokio::time::sleep)
        .notify(|err: &FetchError, wait: Duration| {
            let n = attempt.load(Ordering::Relaxed);
            warn!("{label}: attempt {n}/{max} failed: {err}; retrying in {:.1}s", wait.as_secs_f64());
            #[cfg(feature = "metrics")]
            {
                crate::metrics::FETCH_FAILURES_TOTAL.with_label_values(&[label]).inc();
                crate::metrics::RETRY_WAIT_SECONDS.with_label_values(&[label]).observe(wait.as_secs_f64());
            }
        })
        .await;

    if let Err(err) = &outcome {
        let n = attempt.load(Ordering::Relaxed);
        warn!("{label}: attempt {n}/{max} failed: {err}; giving up");
        #[cfg(feature = "metrics")]
        crate::metrics::FETCH_FAILURES_TOTAL.with_label_values(&[label]).inc();
    }
    outcome
}

async fn send_checked(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, FetchError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status { status: status.as_u16(), url: url.to_string() });
    }
    Ok(resp)
}

/// GET `url` with retries; any non-2xx status is a failed attempt.
pub async fn fetch_with_retry(
    client: &reqwest::Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<reqwest::Response, FetchError> {
    retry_with_backoff(policy, url, move || send_checked(client, url)).await
}

/// Like [`fetch_with_retry`], but the body is decoded inside the attempt so
/// a payload of the wrong shape is retried like any other failure.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<T, FetchError> {
    retry_with_backoff(policy, url, move || async move {
        let resp = send_checked(client, url).await?;
        resp.json::<T>().await.map_err(|e| FetchError::Decode(e.to_string()))
    })
    .await
}

pub async fn get_text(
    client: &reqwest::Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String, FetchError> {
    retry_with_backoff(policy, url, move || async move {
        let resp = send_checked(client, url).await?;
        Ok(resp.text().await?)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn delay_doubles_and_caps() {
        let p = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(120),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(p.delay_for(1), Duration::from_secs(10));
        assert_eq!(p.delay_for(2), Duration::from_secs(20));
        assert_eq!(p.delay_for(3), Duration::from_secs(40));
        assert_eq!(p.delay_for(4), Duration::from_secs(80));
        assert_eq!(p.delay_for(5), Duration::from_secs(120));
        assert_eq!(p.delay_for(40), Duration::from_secs(120));
    }

    #[test]
    fn backoff_yields_jittered_delays_within_bounds() {
        let p = RetryPolicy {
            max_attempts: 6,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1_000),
            timeout: Duration::from_secs(1),
        };
        for _ in 0..50 {
            let delays: Vec<Duration> = p.backoff().collect();
            assert_eq!(delays.len(), 5);
            for (k, d) in delays.iter().enumerate() {
                let base = p.delay_for(k as u32 + 1);
                assert!(*d >= base, "{d:?} < {base:?}");
                assert!(*d <= base.mul_f64(1.0 + JITTER_FRACTION), "{d:?} too large for {base:?}");
            }
        }
    }

    #[test]
    fn single_attempt_policy_never_waits() {
        assert_eq!(instant(1).backoff().count(), 0);
    }

    #[tokio::test]
    async fn succeeds_on_last_allowed_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let out = retry_with_backoff(&instant(3), "flaky", move || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(FetchError::Rpc(format!("fail {n}"))) } else { Ok(n) }
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_last_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let out: Result<(), _> = retry_with_backoff(&instant(4), "down", move || {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst) + 1;
                Err(FetchError::Rpc(format!("fail {n}")))
            }
        })
        .await;
        assert!(matches!(out, Err(FetchError::Rpc(ref m)) if m == "fail 4"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn slow_attempt_times_out_and_counts_as_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let policy = RetryPolicy { timeout: Duration::from_millis(20), ..instant(2) };
        let out: Result<(), _> = retry_with_backoff(&policy, "slow", move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            }
        })
        .await;
        assert!(matches!(out, Err(FetchError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn waits_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(40),
            timeout: Duration::from_secs(1),
        };
        let started = std::time::Instant::now();
        let out: Result<(), _> =
            retry_with_backoff(&policy, "paced", || async { Err(FetchError::Rpc("no".into())) }).await;
        assert!(out.is_err());
        // 20ms + 40ms at minimum
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn http_error_status_is_retried_then_reported() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/price");
                then.status(503);
            })
            .await;

        let client = reqwest::Client::new();
        let url = server.url("/price");
        let out = fetch_with_retry(&client, &url, &instant(3)).await;
        assert!(matches!(out, Err(FetchError::Status { status: 503, .. })));
        mock.assert_hits_async(3).await;
    }

    #[tokio::test]
    async fn json_is_decoded_on_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/fng");
                then.status(200)
                    .json_body(serde_json::json!({"data": [{"value": "40", "value_classification": "Fear"}]}));
            })
            .await;

        let client = reqwest::Client::new();
        let body: crate::types::FngResponse =
            get_json(&client, &server.url("/fng"), &instant(2)).await.unwrap();
        assert_eq!(body.data[0].value, "40");
    }

    #[tokio::test]
    async fn wrong_payload_shape_is_a_retried_failure() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/fng");
                then.status(200).body("<html>maintenance</html>");
            })
            .await;

        let client = reqwest::Client::new();
        let out: Result<crate::types::FngResponse, _> =
            get_json(&client, &server.url("/fng"), &instant(2)).await;
        assert!(matches!(out, Err(FetchError::Decode(_))));
        mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn text_body_is_returned() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/q/hashrate");
                then.status(200).body("650123456789");
            })
            .await;

        let client = reqwest::Client::new();
        let text = get_text(&client, &server.url("/q/hashrate"), &instant(1)).await.unwrap();
        assert_eq!(text, "650123456789");
    }
}
