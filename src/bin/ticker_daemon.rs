// src/bin/ticker_daemon.rs
use clap::Parser;
use mesh_ticker::{
    alarm::{spawn_daily, DailyAlarm, SystemClock},
    bot::{Sources, TickerBot},
    config::{BotConfig, BITCOIN_CHANNEL},
    history::HistoryStore,
    transport::{pump_events, resolve_channels, ConsoleTransport, MeshTransport, TransportEvent},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Broadcast a daily Bitcoin summary on a mesh channel")]
struct Args {
    /// Device port; overrides `port` from the config file.
    port: Option<String>,
    #[arg(long, env = "TICKER_CONFIG", default_value = "ticker.toml")]
    config: PathBuf,
    /// Send one update right away, then keep the daily schedule.
    #[arg(long)]
    now: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let mut cfg = BotConfig::load(&args.config)?;
    if let Some(port) = args.port {
        cfg.port = port;
    }

    info!("Connecting to {}", cfg.port);
    let transport = Arc::new(ConsoleTransport::new(cfg.port.clone(), cfg.channels.values().cloned()));
    let mut events = transport.connect().await?;
    loop {
        match events.recv().await {
            Some(TransportEvent::Connected) => break,
            Some(other) => tracing::debug!("ignoring {other:?} before connect"),
            None => anyhow::bail!("transport closed before connecting"),
        }
    }
    info!("Connected to {}", cfg.port);

    let channels = match resolve_channels(transport.as_ref(), &cfg.channels).await {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            transport.close().await.ok();
            return Err(e);
        }
    };
    let channel = channels
        .get(BITCOIN_CHANNEL)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no {BITCOIN_CHANNEL} channel configured"))?;

    let store = HistoryStore::new(&cfg.bitcoin.price_file);
    let history = store.load();
    info!("Loaded price history: {history:?}");

    let sources = Sources::from_config(&cfg, reqwest::Client::new());
    let bot = Arc::new(TickerBot::new(transport.clone(), channel, sources, store, history).with_config(&cfg));

    if args.now {
        let outcome = bot.run_daily_update().await;
        info!("manual update: {}", outcome.label());
    }

    let clock = SystemClock { tz: cfg.tz()? };
    let job = bot.clone();
    let alarm = spawn_daily(DailyAlarm::new(cfg.alarm), cfg.poll_interval(), clock, move |_now| {
        let job = job.clone();
        async move {
            job.run_daily_update().await;
        }
    })?;

    info!("ticker bot ready");
    tokio::select! {
        _ = pump_events(transport.as_ref(), events) => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    alarm.cancel();
    transport.close().await?;
    Ok(())
}
