// src/bot.rs
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::BotConfig;
use crate::format;
use crate::history::{HistoryStore, PriceHistory};
use crate::providers::aave::{AaveBorrowRates, AlloyReserveReader};
use crate::providers::coingecko::CoinGeckoPrice;
use crate::providers::fear_greed::AlternativeMeFng;
use crate::providers::hashrate::BlockchainInfoHashrate;
use crate::providers::{BorrowRateProvider, HashrateProvider, PriceProvider, ProviderError, SentimentProvider};
use crate::transport::{Channel, MeshTransport};
use crate::truncate::shorten_to_bytes;
use crate::types::{MarketSnapshot, Trend};

/// Data sources for one update. A `None` enrichment is disabled and never
/// contacted.
pub struct Sources {
    pub price: Arc<dyn PriceProvider>,
    pub sentiment: Option<Arc<dyn SentimentProvider>>,
    pub hashrate: Option<Arc<dyn HashrateProvider>>,
    pub borrow_rates: Option<Arc<dyn BorrowRateProvider>>,
}

impl Sources {
    pub fn from_config(cfg: &BotConfig, http: reqwest::Client) -> Self {
        let retry = cfg.retry.policy();
        let price = Arc::new(CoinGeckoPrice {
            http: http.clone(),
            base_url: cfg.sources.coingecko_url.clone(),
            asset: cfg.bitcoin.asset.clone(),
            currency: cfg.bitcoin.currency.clone(),
            retry,
        });
        let sentiment = cfg.bitcoin.show_fear_greed.then(|| {
            Arc::new(AlternativeMeFng { http: http.clone(), base_url: cfg.sources.fear_greed_url.clone(), retry })
                as Arc<dyn SentimentProvider>
        });
        let hashrate = cfg.bitcoin.show_hashrate.then(|| {
            Arc::new(BlockchainInfoHashrate { http: http.clone(), base_url: cfg.sources.hashrate_url.clone(), retry })
                as Arc<dyn HashrateProvider>
        });
        let borrow_rates = cfg.bitcoin.show_borrow_rates.then(|| {
            Arc::new(AaveBorrowRates {
                reader: Arc::new(AlloyReserveReader),
                rpc_urls: cfg.ethereum.rpc_urls.clone(),
                pool: cfg.ethereum.aave_pool_address,
                eurc: cfg.ethereum.eurc_address,
                usdc: cfg.ethereum.usdc_address,
                retry: cfg.rpc_retry.policy(),
            }) as Arc<dyn BorrowRateProvider>
        });
        Self { price, sentiment, hashrate, borrow_rates }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// `message` is the full text, `payload` what went over the air.
    Sent { message: String, payload: String },
    PriceUnavailable,
    EmptyPayload,
    SendFailed,
}

impl UpdateOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            UpdateOutcome::Sent { .. } => "sent",
            UpdateOutcome::PriceUnavailable => "price_unavailable",
            UpdateOutcome::EmptyPayload => "empty_payload",
            UpdateOutcome::SendFailed => "send_failed",
        }
    }
}

pub struct TickerBot<T: MeshTransport> {
    transport: Arc<T>,
    channel: Channel,
    sources: Sources,
    store: HistoryStore,
    // Held for the whole update, so a second caller waits its turn.
    history: Mutex<PriceHistory>,
    pub symbol: String,
    pub currency_sign: String,
    pub max_message_bytes: usize,
    pub cooldown: Duration,
}

impl<T: MeshTransport> TickerBot<T> {
    pub fn new(transport: Arc<T>, channel: Channel, sources: Sources, store: HistoryStore, history: PriceHistory) -> Self {
        Self {
            transport,
            channel,
            sources,
            store,
            history: Mutex::new(history),
            symbol: "BTC".into(),
            currency_sign: "€".into(),
            max_message_bytes: 155,
            cooldown: Duration::from_secs(30),
        }
    }

    pub fn with_config(mut self, cfg: &BotConfig) -> Self {
        self.symbol = cfg.bitcoin.symbol.clone();
        self.currency_sign = cfg.bitcoin.currency_sign.clone();
        self.max_message_bytes = cfg.transport.max_message_bytes;
        self.cooldown = cfg.cooldown();
        self
    }

    pub async fn history(&self) -> PriceHistory {
        *self.history.lock().await
    }

    /// Price first (mandatory), then the enabled enrichments concurrently.
    pub async fn collect(&self) -> Result<MarketSnapshot, ProviderError> {
        let price = self.sources.price.spot().await?;

        let (sentiment, hashrate_gh, borrow_rates) = tokio::join!(
            optional("fear & greed", self.sources.sentiment.as_ref().map(|s| s.fear_greed())),
            optional("hashrate", self.sources.hashrate.as_ref().map(|s| s.hashrate())),
            optional("borrow rates", self.sources.borrow_rates.as_ref().map(|s| s.borrow_rates())),
        );
        Ok(MarketSnapshot { price, sentiment, hashrate_gh, borrow_rates })
    }

    /// Segments in fixed order: price, sentiment, hashrate, borrow rates.
    pub fn compose(&self, snapshot: &MarketSnapshot, previous: Option<f64>) -> String {
        let trend = Trend::between(previous, snapshot.price.price);
        let mut parts = vec![format::price_segment(trend, &self.symbol, snapshot.price.price, &self.currency_sign)];
        if let Some(fng) = &snapshot.sentiment {
            parts.push(format::sentiment_segment(fng));
        }
        if let Some(gh) = snapshot.hashrate_gh {
            parts.push(format::hashrate_segment(gh));
        }
        if let Some(rates) = &snapshot.borrow_rates {
            parts.push(format::borrow_segment(rates));
        }
        parts.join(" ")
    }

    /// One daily cycle. Never panics or propagates: every failure ends in
    /// an [`UpdateOutcome`] and leaves the stored history untouched.
    pub async fn run_daily_update(&self) -> UpdateOutcome {
        let outcome = self.update_once().await;
        #[cfg(feature = "metrics")]
        crate::metrics::UPDATES_TOTAL.with_label_values(&[outcome.label()]).inc();
        outcome
    }

    async fn update_once(&self) -> UpdateOutcome {
        let mut history = self.history.lock().await;

        let snapshot = match self.collect().await {
            Ok(s) => s,
            Err(e) => {
                error!("{} price unavailable, skipping today's update: {e}", self.symbol);
                return UpdateOutcome::PriceUnavailable;
            }
        };

        let message = self.compose(&snapshot, history.last_price);
        let payload = shorten_to_bytes(&message, self.max_message_bytes);
        if payload.is_empty() {
            warn!("message does not fit in {} bytes: {message}", self.max_message_bytes);
            return UpdateOutcome::EmptyPayload;
        }

        if let Err(e) = self.transport.send_channel_text_message(self.channel.idx, &payload).await {
            error!("send to [{}] failed: {e:?}", self.channel.name);
            return UpdateOutcome::SendFailed;
        }
        info!("Sent out [{}]: {message}", self.channel.name);

        history.record(snapshot.price.price, Utc::now());
        if let Err(e) = self.store.save(&history) {
            warn!("failed to persist price history to {}: {e}", self.store.path().display());
        }

        // airtime pacing
        tokio::time::sleep(self.cooldown).await;
        UpdateOutcome::Sent { message, payload }
    }
}

async fn optional<V, Fut>(what: &str, fetch: Option<Fut>) -> Option<V>
where
    Fut: Future<Output = Result<V, ProviderError>>,
{
    match fetch?.await {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("{what} unavailable, omitting: {e}");
            None
        }
    }
}
