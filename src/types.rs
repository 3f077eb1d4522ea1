// src/types.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    pub change_24h: Option<f64>, // percent, as reported by the source
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FearGreed {
    pub value: u32, // 0..=100
    pub classification: String,
}

/// Variable borrow rates in percent (already converted from RAY).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorrowRates {
    pub eurc: f64,
    pub usdc: f64,
}

/// One update cycle's view of the market. Only `price` is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub price: PriceQuote,
    pub sentiment: Option<FearGreed>,
    pub hashrate_gh: Option<u64>,
    pub borrow_rates: Option<BorrowRates>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
}

impl Trend {
    /// `None` on the first run, when there is nothing to compare against.
    pub fn between(previous: Option<f64>, current: f64) -> Option<Self> {
        previous.map(|prev| if current > prev { Trend::Up } else { Trend::Down })
    }
}

pub const RAY: f64 = 1e27;

/// RAY-scaled rate to percent. Display only, f64 precision is fine.
#[inline]
pub fn ray_to_percent(scaled: u128) -> f64 {
    scaled as f64 * 100.0 / RAY
}

// ---- external API response shapes ----

/// `/simple/price?ids=<asset>&vs_currencies=<ccy>&include_24hr_change=true`
/// keyed by asset, then by currency / `<ccy>_24h_change`.
pub type SimplePriceResponse = HashMap<String, HashMap<String, Option<f64>>>;

#[derive(Debug, Clone, Deserialize)]
pub struct FngResponse {
    pub data: Vec<FngEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FngEntry {
    pub value: String, // integer as string, e.g. "62"
    pub value_classification: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_first_run_has_no_marker() {
        assert_eq!(Trend::between(None, 65_000.0), None);
    }

    #[test]
    fn trend_compares_against_previous() {
        assert_eq!(Trend::between(Some(60_000.0), 65_000.0), Some(Trend::Up));
        assert_eq!(Trend::between(Some(70_000.0), 65_000.0), Some(Trend::Down));
        assert_eq!(Trend::between(Some(65_000.0), 65_000.0), Some(Trend::Down));
    }

    #[test]
    fn ray_conversion() {
        // 5.25% expressed in RAY
        let scaled: u128 = 52_500_000_000_000_000_000_000_000;
        assert!((ray_to_percent(scaled) - 5.25).abs() < 1e-9);
        assert_eq!(ray_to_percent(0), 0.0);
    }

    #[test]
    fn fng_payload_parses() {
        let raw = r#"{"name":"Fear and Greed Index","data":[{"value":"62","value_classification":"Greed","timestamp":"1700000000"}]}"#;
        let parsed: FngResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data[0].value, "62");
        assert_eq!(parsed.data[0].value_classification, "Greed");
    }
}
