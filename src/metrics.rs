// src/metrics.rs
use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub static FETCH_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ticker_fetch_failures_total", "Failed fetch attempts", &["source"] // url or rpc endpoint
    ).unwrap()
});

pub static UPDATES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "ticker_updates_total", "Daily update runs", &["outcome"] // sent|price_unavailable|empty_payload|send_failed
    ).unwrap()
});

pub static RETRY_WAIT_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "ticker_retry_wait_seconds",
        "Backoff wait before a retry",
        &["source"],
        vec![1.0, 5.0, 10.0, 20.0, 40.0, 80.0, 150.0]
    ).unwrap()
});
