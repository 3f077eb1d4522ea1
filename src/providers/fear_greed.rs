// src/providers/fear_greed.rs
use super::{ProviderError, SentimentProvider};
use crate::retry::{get_json, RetryPolicy};
use crate::types::{FearGreed, FngResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.alternative.me";

/// alternative.me Fear & Greed index, latest reading only.
pub struct AlternativeMeFng {
    pub http: reqwest::Client,
    pub base_url: String,
    pub retry: RetryPolicy,
}

impl AlternativeMeFng {
    pub fn url(&self) -> String {
        format!("{}/fng/?limit=1", self.base_url.trim_end_matches('/'))
    }
}

fn latest(body: FngResponse) -> Result<FearGreed, ProviderError> {
    let entry = body
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidData("empty fng data".into()))?;
    let value: u32 = entry
        .value
        .trim()
        .parse()
        .map_err(|_| ProviderError::InvalidData(format!("fng value {:?}", entry.value)))?;
    if value > 100 {
        return Err(ProviderError::InvalidData(format!("fng value {value} out of range")));
    }
    Ok(FearGreed { value, classification: entry.value_classification })
}

#[async_trait::async_trait]
impl SentimentProvider for AlternativeMeFng {
    async fn fear_greed(&self) -> Result<FearGreed, ProviderError> {
        let body: FngResponse = get_json(&self.http, &self.url(), &self.retry).await?;
        latest(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FngEntry;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn entry(value: &str) -> FngResponse {
        FngResponse {
            data: vec![FngEntry { value: value.into(), value_classification: "Neutral".into() }],
        }
    }

    #[test]
    fn validates_value() {
        assert_eq!(latest(entry("50")).unwrap().value, 50);
        assert!(latest(entry("abc")).is_err());
        assert!(latest(entry("101")).is_err());
        assert!(latest(FngResponse { data: vec![] }).is_err());
    }

    #[tokio::test]
    async fn fetches_latest_reading() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/fng/").query_param("limit", "1");
                then.status(200).json_body(serde_json::json!({
                    "name": "Fear and Greed Index",
                    "data": [{"value": "27", "value_classification": "Fear", "timestamp": "1700000000"}]
                }));
            })
            .await;

        let src = AlternativeMeFng {
            http: reqwest::Client::new(),
            base_url: server.base_url(),
            retry: RetryPolicy {
                max_attempts: 1,
                initial_delay: Duration::ZERO,
                max_delay: Duration::ZERO,
                timeout: Duration::from_secs(5),
            },
        };
        let fng = src.fear_greed().await.unwrap();
        assert_eq!(fng, FearGreed { value: 27, classification: "Fear".into() });
    }
}
