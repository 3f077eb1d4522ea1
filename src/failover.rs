// src/failover.rs
use std::future::Future;
use tracing::{info, warn};

use crate::retry::{retry_with_backoff, FetchError, RetryPolicy};

/// Try each endpoint in order, each under its own retry budget.
///
/// The first endpoint to succeed wins and later ones are not contacted.
/// An endpoint that exhausts its budget is skipped. `None` means every
/// endpoint was exhausted (or the list was empty); callers treat that as
/// "unavailable this cycle".
pub async fn query_with_failover<T, F, Fut>(
    endpoints: &[String],
    per_endpoint: &RetryPolicy,
    mut op: F,
) -> Option<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    for endpoint in endpoints {
        match retry_with_backoff(per_endpoint, endpoint, || op(endpoint.clone())).await {
            Ok(value) => {
                info!("served by {endpoint}");
                return Some(value);
            }
            Err(e) => warn!("endpoint {endpoint} exhausted: {e}"),
        }
    }
    if !endpoints.is_empty() {
        warn!("all {} endpoints failed", endpoints.len());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
        }
    }

    fn urls(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    type Calls = Arc<Mutex<HashMap<String, u32>>>;

    fn counting_op(
        calls: Calls,
        good: &'static str,
    ) -> impl FnMut(String) -> futures::future::BoxFuture<'static, Result<u32, FetchError>> {
        move |endpoint: String| {
            let calls = calls.clone();
            Box::pin(async move {
                *calls.lock().unwrap().entry(endpoint.clone()).or_default() += 1;
                if endpoint == good { Ok(42) } else { Err(FetchError::Rpc(format!("{endpoint} down"))) }
            })
        }
    }

    #[tokio::test]
    async fn falls_through_to_first_healthy_endpoint() {
        let calls: Calls = Default::default();
        let out = query_with_failover(&urls(&["A", "B", "C"]), &policy(3), counting_op(calls.clone(), "C")).await;
        assert_eq!(out, Some(42));
        let calls = calls.lock().unwrap();
        assert_eq!(calls["A"], 3);
        assert_eq!(calls["B"], 3);
        assert_eq!(calls["C"], 1);
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let calls: Calls = Default::default();
        let out = query_with_failover(&urls(&["A", "B", "C"]), &policy(2), counting_op(calls.clone(), "A")).await;
        assert_eq!(out, Some(42));
        let calls = calls.lock().unwrap();
        assert_eq!(calls.get("A"), Some(&1));
        assert!(calls.get("B").is_none());
        assert!(calls.get("C").is_none());
    }

    #[tokio::test]
    async fn all_exhausted_is_unavailable() {
        let calls: Calls = Default::default();
        let out = query_with_failover(&urls(&["A", "B"]), &policy(2), counting_op(calls.clone(), "Z")).await;
        assert_eq!(out, None);
        let calls = calls.lock().unwrap();
        assert_eq!(calls["A"], 2);
        assert_eq!(calls["B"], 2);
    }

    #[tokio::test]
    async fn empty_endpoint_list_is_unavailable() {
        let calls: Calls = Default::default();
        let out = query_with_failover(&[], &policy(2), counting_op(calls.clone(), "A")).await;
        assert_eq!(out, None);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn endpoint_recovering_within_its_budget_wins() {
        let calls: Calls = Default::default();
        let c = calls.clone();
        let op = move |endpoint: String| {
            let c = c.clone();
            async move {
                let mut map = c.lock().unwrap();
                let n = map.entry(endpoint.clone()).or_default();
                *n += 1;
                if endpoint == "B" && *n == 2 { Ok(*n) } else { Err(FetchError::Rpc("flaky".into())) }
            }
        };
        let out = query_with_failover(&urls(&["A", "B", "C"]), &policy(3), op).await;
        assert_eq!(out, Some(2));
        assert!(calls.lock().unwrap().get("C").is_none());
    }
}
