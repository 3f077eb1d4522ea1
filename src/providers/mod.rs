// src/providers/mod.rs
use async_trait::async_trait;

use crate::retry::FetchError;
use crate::types::{BorrowRates, FearGreed, PriceQuote};

pub mod aave;
pub mod coingecko;
pub mod fear_greed;
pub mod hashrate;

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("not configured: {0}")]
    NotConfigured(&'static str),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Spot price and 24h change of the tracked asset.
    async fn spot(&self) -> Result<PriceQuote, ProviderError>;
}

#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn fear_greed(&self) -> Result<FearGreed, ProviderError>;
}

#[async_trait]
pub trait HashrateProvider: Send + Sync {
    /// Network hashrate in GH/s.
    async fn hashrate(&self) -> Result<u64, ProviderError>;
}

#[async_trait]
pub trait BorrowRateProvider: Send + Sync {
    async fn borrow_rates(&self) -> Result<BorrowRates, ProviderError>;
}
