// src/transport.rs
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A named broadcast group on the mesh, addressed by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub idx: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Contact { from: String, text: String },
    Channel { channel_idx: u8, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    /// Inbound messages are queued on the device; drain with
    /// [`MeshTransport::waiting_messages`].
    MessageWaiting,
    Disconnected,
}

pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

#[async_trait::async_trait]
pub trait MeshTransport: Send + Sync + 'static {
    /// Open the link. `Connected` arrives on the returned stream once the
    /// device is ready.
    async fn connect(&self) -> anyhow::Result<EventStream>;
    async fn close(&self) -> anyhow::Result<()>;
    async fn find_channel_by_name(&self, name: &str) -> anyhow::Result<Option<Channel>>;
    async fn send_channel_text_message(&self, channel_idx: u8, text: &str) -> anyhow::Result<()>;
    async fn waiting_messages(&self) -> anyhow::Result<Vec<InboundMessage>>;
}

/// Look up every configured category's channel. Any missing channel is an
/// error; without a destination the bot has nothing to do.
pub async fn resolve_channels<T: MeshTransport + ?Sized>(
    transport: &T,
    wanted: &BTreeMap<String, String>,
) -> anyhow::Result<BTreeMap<String, Channel>> {
    let mut out = BTreeMap::new();
    for (category, name) in wanted {
        match transport.find_channel_by_name(name).await? {
            Some(ch) => {
                debug!("channel {category}: {name:?} -> #{}", ch.idx);
                out.insert(category.clone(), ch);
            }
            None => anyhow::bail!("channel {category}: {name:?} not found"),
        }
    }
    Ok(out)
}

/// Log whatever is queued on the device. Inbound traffic is informational.
pub async fn drain_waiting<T: MeshTransport + ?Sized>(transport: &T) {
    match transport.waiting_messages().await {
        Ok(messages) => {
            for m in messages {
                match m {
                    InboundMessage::Contact { from, text } => info!("received contact message from {from}: {text}"),
                    InboundMessage::Channel { channel_idx, text } => {
                        info!("received channel message on #{channel_idx}: {text}")
                    }
                }
            }
        }
        Err(e) => warn!("failed to read waiting messages: {e:?}"),
    }
}

/// Handle transport events until the link goes away.
pub async fn pump_events<T: MeshTransport + ?Sized>(transport: &T, mut events: EventStream) {
    while let Some(ev) = events.recv().await {
        match ev {
            TransportEvent::MessageWaiting => drain_waiting(transport).await,
            TransportEvent::Connected => debug!("transport reconnected"),
            TransportEvent::Disconnected => {
                warn!("transport disconnected");
                return;
            }
        }
    }
    warn!("transport event stream closed");
}

/// Dry-run transport: knows a fixed set of channel names and prints
/// messages instead of keying the radio.
pub struct ConsoleTransport {
    pub port: String,
    channels: Vec<String>,
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
}

impl ConsoleTransport {
    pub fn new(port: impl Into<String>, channels: impl IntoIterator<Item = String>) -> Self {
        Self { port: port.into(), channels: channels.into_iter().collect(), events: Mutex::new(None) }
    }
}

#[async_trait::async_trait]
impl MeshTransport for ConsoleTransport {
    async fn connect(&self) -> anyhow::Result<EventStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(TransportEvent::Connected)?;
        if let Ok(mut slot) = self.events.lock() {
            *slot = Some(tx);
        }
        Ok(rx)
    }

    async fn close(&self) -> anyhow::Result<()> {
        if let Ok(mut slot) = self.events.lock() {
            if let Some(tx) = slot.take() {
                let _ = tx.send(TransportEvent::Disconnected);
            }
        }
        Ok(())
    }

    async fn find_channel_by_name(&self, name: &str) -> anyhow::Result<Option<Channel>> {
        Ok(self
            .channels
            .iter()
            .position(|c| c == name)
            .map(|i| Channel { idx: i as u8, name: name.to_string() }))
    }

    async fn send_channel_text_message(&self, channel_idx: u8, text: &str) -> anyhow::Result<()> {
        println!("[MESH {} #{}] {} ({} bytes)", self.port, channel_idx, text, text.len());
        Ok(())
    }

    async fn waiting_messages(&self) -> anyhow::Result<Vec<InboundMessage>> {
        Ok(Vec::new())
    }
}
