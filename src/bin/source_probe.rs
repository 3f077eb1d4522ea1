// src/bin/source_probe.rs
use mesh_ticker::bot::Sources;
use mesh_ticker::config::BotConfig;
use std::path::PathBuf;

/// Fetch every data source once, ignoring the show_* flags.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let path: PathBuf = std::env::args().nth(1).unwrap_or_else(|| "ticker.toml".to_string()).into();
    let mut cfg = if path.exists() { BotConfig::load(&path)? } else { BotConfig::default() };
    cfg.bitcoin.show_fear_greed = true;
    cfg.bitcoin.show_hashrate = true;
    cfg.bitcoin.show_borrow_rates = true;

    let sources = Sources::from_config(&cfg, reqwest::Client::new());
    match sources.price.spot().await {
        Ok(q) => println!("price -> {} {} (24h {:?}%)", q.price, cfg.bitcoin.currency, q.change_24h),
        Err(e) => println!("price -> error: {e}"),
    }
    if let Some(s) = &sources.sentiment {
        match s.fear_greed().await {
            Ok(f) => println!("fear&greed -> {} ({})", f.value, f.classification),
            Err(e) => println!("fear&greed -> error: {e}"),
        }
    }
    if let Some(s) = &sources.hashrate {
        match s.hashrate().await {
            Ok(gh) => println!("hashrate -> {gh} GH/s"),
            Err(e) => println!("hashrate -> error: {e}"),
        }
    }
    if let Some(s) = &sources.borrow_rates {
        match s.borrow_rates().await {
            Ok(r) => println!("borrow -> EURC {:.2}% USDC {:.2}%", r.eurc, r.usdc),
            Err(e) => println!("borrow -> error: {e}"),
        }
    }
    Ok(())
}
