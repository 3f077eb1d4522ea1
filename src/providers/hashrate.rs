// src/providers/hashrate.rs
use super::{HashrateProvider, ProviderError};
use crate::retry::{get_text, RetryPolicy};

pub const DEFAULT_BASE_URL: &str = "https://blockchain.info";

/// blockchain.info `/q/hashrate`: a bare integer in GH/s.
pub struct BlockchainInfoHashrate {
    pub http: reqwest::Client,
    pub base_url: String,
    pub retry: RetryPolicy,
}

fn parse_gh(text: &str) -> Result<u64, ProviderError> {
    let trimmed = text.trim();
    // some mirrors answer with a float
    let gh = trimmed
        .parse::<u64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64))
        .ok_or_else(|| ProviderError::InvalidData(format!("hashrate {trimmed:?}")))?;
    if gh == 0 {
        return Err(ProviderError::InvalidData("zero hashrate".into()));
    }
    Ok(gh)
}

#[async_trait::async_trait]
impl HashrateProvider for BlockchainInfoHashrate {
    async fn hashrate(&self) -> Result<u64, ProviderError> {
        let url = format!("{}/q/hashrate", self.base_url.trim_end_matches('/'));
        let text = get_text(&self.http, &url, &self.retry).await?;
        parse_gh(&text)
    }
}
