use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use axum::extract::ws::Message;
use reflector_core::SignalMessage;
use tokio::sync::mpsc;

/// Outbound half of a peer's signaling connection.
///
/// Implementations must serialize writes: frames handed to `send` may never
/// interleave on the wire.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send(&self, message: &SignalMessage) -> Result<()>;
}

/// WebSocket-backed sink. Frames funnel through one unbounded channel
/// drained by a single writer task, so JSON frames cannot interleave no
/// matter how many callbacks send concurrently.
pub struct WsSignalChannel {
    tx: mpsc::UnboundedSender<Message>,
}

impl WsSignalChannel {
    pub fn new(tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl SignalSink for WsSignalChannel {
    async fn send(&self, message: &SignalMessage) -> Result<()> {
        let json = message
            .encode()
            .context("failed to encode signaling frame")?;
        self.tx
            .send(Message::Text(json))
            .map_err(|_| anyhow!("signaling channel closed"))?;
        Ok(())
    }
}
