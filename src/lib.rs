// src/lib.rs
pub mod types;
pub mod config;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod truncate;
pub mod retry;
pub mod failover;
pub mod alarm;
pub mod history;
pub mod format;
pub mod transport;
pub mod providers;
pub mod bot;
