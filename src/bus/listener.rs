use crate::bus::{ConnectionStatus, InboundMessage, SessionNotification};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::error;

/// Receiver of the three caller-facing session notifications.
///
/// Called from the session's dispatch loop, one event at a time.
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// A fresh pairing code was issued by the transport.
    async fn on_qr(&self, payload: &str);

    async fn on_status(&self, status: ConnectionStatus);

    async fn on_message(&self, msg: InboundMessage);
}

/// Forwards every notification onto an mpsc channel.
pub struct BusListener {
    tx: mpsc::Sender<SessionNotification>,
}

impl BusListener {
    pub fn new(tx: mpsc::Sender<SessionNotification>) -> Self {
        Self { tx }
    }

    async fn forward(&self, notification: SessionNotification) {
        if let Err(e) = self.tx.send(notification).await {
            error!("Failed to forward session notification: {}", e);
        }
    }
}

#[async_trait]
impl SessionListener for BusListener {
    async fn on_qr(&self, payload: &str) {
        self.forward(SessionNotification::Qr(payload.to_string()))
            .await;
    }

    async fn on_status(&self, status: ConnectionStatus) {
        self.forward(SessionNotification::Status(status)).await;
    }

    async fn on_message(&self, msg: InboundMessage) {
        self.forward(SessionNotification::Message(msg)).await;
    }
}
