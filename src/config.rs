// src/config.rs
use alloy::primitives::Address;
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alarm::{AlarmTime, MAX_POLL_INTERVAL};
use crate::providers::{aave, coingecko, fear_greed, hashrate};
use crate::retry::RetryPolicy;

/// Channel category the daily summary goes to.
pub const BITCOIN_CHANNEL: &str = "bitcoin";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "d_port")]                 pub port: String,
    #[serde(default = "d_alarm")]                pub alarm: AlarmTime,
    #[serde(default)]                            pub timezone: Option<String>,
    #[serde(default = "d_poll_secs")]            pub poll_interval_secs: u64,
    #[serde(default = "d_channels")]             pub channels: BTreeMap<String, String>,
    #[serde(default)]                            pub bitcoin: BitcoinConfig,
    #[serde(default)]                            pub ethereum: EthereumConfig,
    #[serde(default)]                            pub sources: SourcesConfig,
    #[serde(default)]                            pub retry: RetryConfig,
    #[serde(default = "d_rpc_retry")]            pub rpc_retry: RetryConfig,
    #[serde(default)]                            pub transport: TransportConfig,
}
fn d_port() -> String { "/dev/ttyUSB0".into() }
fn d_alarm() -> AlarmTime { AlarmTime { hour: 9, minute: 0 } }
fn d_poll_secs() -> u64 { 30 }
fn d_channels() -> BTreeMap<String, String> {
    BTreeMap::from([(BITCOIN_CHANNEL.to_string(), "Bitcoin".to_string())])
}
fn d_rpc_retry() -> RetryConfig {
    RetryConfig { max_attempts: 2, initial_delay_ms: 2_000, max_delay_ms: 10_000, timeout_ms: 15_000 }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BitcoinConfig {
    #[serde(default = "d_price_file")]           pub price_file: PathBuf,
    #[serde(default = "d_true")]                 pub show_fear_greed: bool,
    #[serde(default = "d_true")]                 pub show_hashrate: bool,
    #[serde(default)]                            pub show_borrow_rates: bool,
    #[serde(default = "d_asset")]                pub asset: String,
    #[serde(default = "d_currency")]             pub currency: String,
    #[serde(default = "d_symbol")]               pub symbol: String,
    #[serde(default = "d_sign")]                 pub currency_sign: String,
}
fn d_price_file() -> PathBuf { "price_history.json".into() }
fn d_true() -> bool { true }
fn d_asset() -> String { "bitcoin".into() }
fn d_currency() -> String { "eur".into() }
fn d_symbol() -> String { "BTC".into() }
fn d_sign() -> String { "€".into() }

impl Default for BitcoinConfig {
    fn default() -> Self {
        Self {
            price_file: d_price_file(),
            show_fear_greed: true,
            show_hashrate: true,
            show_borrow_rates: false,
            asset: d_asset(),
            currency: d_currency(),
            symbol: d_symbol(),
            currency_sign: d_sign(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EthereumConfig {
    #[serde(default)]                            pub rpc_urls: Vec<String>,
    #[serde(default)]                            pub aave_pool_address: Option<Address>,
    #[serde(default = "d_usdc")]                 pub usdc_address: Address,
    #[serde(default = "d_eurc")]                 pub eurc_address: Address,
}
fn d_usdc() -> Address { aave::USDC }
fn d_eurc() -> Address { aave::EURC }

impl Default for EthereumConfig {
    fn default() -> Self {
        Self { rpc_urls: Vec::new(), aave_pool_address: None, usdc_address: d_usdc(), eurc_address: d_eurc() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "d_coingecko")]            pub coingecko_url: String,
    #[serde(default = "d_fng")]                  pub fear_greed_url: String,
    #[serde(default = "d_hashrate")]             pub hashrate_url: String,
}
fn d_coingecko() -> String { coingecko::DEFAULT_BASE_URL.into() }
fn d_fng() -> String { fear_greed::DEFAULT_BASE_URL.into() }
fn d_hashrate() -> String { hashrate::DEFAULT_BASE_URL.into() }

impl Default for SourcesConfig {
    fn default() -> Self {
        Self { coingecko_url: d_coingecko(), fear_greed_url: d_fng(), hashrate_url: d_hashrate() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "d_attempts")]             pub max_attempts: u32,
    #[serde(default = "d_initial_ms")]           pub initial_delay_ms: u64,
    #[serde(default = "d_max_ms")]               pub max_delay_ms: u64,
    #[serde(default = "d_timeout_ms")]           pub timeout_ms: u64,
}
fn d_attempts() -> u32 { 3 }
fn d_initial_ms() -> u64 { 10_000 }
fn d_max_ms() -> u64 { 120_000 }
fn d_timeout_ms() -> u64 { 30_000 }

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: d_attempts(),
            initial_delay_ms: d_initial_ms(),
            max_delay_ms: d_max_ms(),
            timeout_ms: d_timeout_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: ms(self.initial_delay_ms),
            max_delay: ms(self.max_delay_ms),
            timeout: ms(self.timeout_ms),
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(format!("[{section}] max_attempts must be >= 1")));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid(format!("[{section}] initial_delay_ms exceeds max_delay_ms")));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(format!("[{section}] timeout_ms must be > 0")));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "d_max_bytes")]            pub max_message_bytes: usize,
    #[serde(default = "d_cooldown")]             pub cooldown_secs: u64,
}
fn d_max_bytes() -> usize { 155 }
fn d_cooldown() -> u64 { 30 }

impl Default for TransportConfig {
    fn default() -> Self {
        Self { max_message_bytes: d_max_bytes(), cooldown_secs: d_cooldown() }
    }
}

#[inline]
pub fn ms(d: u64) -> Duration { Duration::from_millis(d) }

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            alarm: d_alarm(),
            timezone: None,
            poll_interval_secs: d_poll_secs(),
            channels: d_channels(),
            bitcoin: BitcoinConfig::default(),
            ethereum: EthereumConfig::default(),
            sources: SourcesConfig::default(),
            retry: RetryConfig::default(),
            rpc_retry: d_rpc_retry(),
            transport: TransportConfig::default(),
        }
    }
}

impl BotConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: BotConfig = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let poll = self.poll_interval();
        if poll.is_zero() || poll >= MAX_POLL_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "poll_interval_secs = {} must be between 1 and 59",
                self.poll_interval_secs
            )));
        }
        self.tz()?;
        if !self.channels.contains_key(BITCOIN_CHANNEL) {
            return Err(ConfigError::Invalid(format!("[channels] needs a {BITCOIN_CHANNEL:?} entry")));
        }
        self.retry.validate("retry")?;
        self.rpc_retry.validate("rpc_retry")?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Option<Tz>, ConfigError> {
        self.timezone
            .as_deref()
            .map(|name| name.parse::<Tz>().map_err(|e| ConfigError::Invalid(format!("timezone {name:?}: {e}"))))
            .transpose()
    }

    pub fn poll_interval(&self) -> Duration { Duration::from_secs(self.poll_interval_secs) }

    pub fn cooldown(&self) -> Duration { Duration::from_secs(self.transport.cooldown_secs) }
}
