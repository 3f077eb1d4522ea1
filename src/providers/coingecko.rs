// src/providers/coingecko.rs
use super::{PriceProvider, ProviderError};
use crate::retry::{get_json, RetryPolicy};
use crate::types::{PriceQuote, SimplePriceResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

pub struct CoinGeckoPrice {
    pub http: reqwest::Client,
    pub base_url: String,
    pub asset: String,    // e.g. "bitcoin"
    pub currency: String, // e.g. "eur"
    pub retry: RetryPolicy,
}

impl CoinGeckoPrice {
    pub fn url(&self) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies={}&include_24hr_change=true",
            self.base_url.trim_end_matches('/'),
            self.asset,
            self.currency
        )
    }

    fn extract(&self, body: &SimplePriceResponse) -> Result<PriceQuote, ProviderError> {
        let row = body
            .get(&self.asset)
            .ok_or_else(|| ProviderError::InvalidData(format!("no entry for {}", self.asset)))?;
        let price = row
            .get(&self.currency)
            .copied()
            .flatten()
            .filter(|p| p.is_finite() && *p >= 0.0)
            .ok_or_else(|| ProviderError::InvalidData(format!("no {} price", self.currency)))?;
        let change_24h = row.get(&format!("{}_24h_change", self.currency)).copied().flatten();
        Ok(PriceQuote { price, change_24h })
    }
}

#[async_trait::async_trait]
impl PriceProvider for CoinGeckoPrice {
    async fn spot(&self) -> Result<PriceQuote, ProviderError> {
        let body: SimplePriceResponse = get_json(&self.http, &self.url(), &self.retry).await?;
        self.extract(&body)
    }
}
