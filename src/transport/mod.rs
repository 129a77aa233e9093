pub mod raw;
#[cfg(test)]
pub(crate) mod testing;

pub use raw::{ImageAttachment, MessageKey, MessageKind, RawEvent};

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opens fresh engine sessions. One call per connect / reconnect.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Start a session using the credentials under `auth_dir`.
    ///
    /// Resolves once the engine is wired up; the network handshake continues
    /// in the background and reports progress through the event stream.
    async fn open(&self, auth_dir: &Path) -> Result<TransportSession>;
}

/// Live engine session primitives.
#[async_trait]
pub trait TransportHandle: Send + Sync {
    /// Send a plain text message, returning the engine's message id if any.
    async fn send_text(&self, to: &str, text: &str) -> Result<Option<String>>;

    /// Download and decrypt the media referenced by `event`.
    async fn download_media(&self, event: &RawEvent) -> Result<Vec<u8>>;

    /// Flush updated credentials to the auth directory.
    async fn persist_credentials(&self) -> Result<()>;

    /// Close the underlying socket. Must be safe to call more than once.
    async fn end(&self);
}

pub struct TransportSession {
    pub handle: Arc<dyn TransportHandle>,
    pub events: mpsc::Receiver<TransportEvent>,
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    ConnectionUpdate(ConnectionUpdate),
    CredentialsUpdate,
    MessagesUpsert(MessageBatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Close,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionUpdate {
    pub connection: Option<ConnectionPhase>,
    /// Pairing code, present while the device is not yet linked.
    pub qr: Option<String>,
    pub last_disconnect: Option<CloseReason>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseReason {
    pub status_code: Option<u16>,
}

impl CloseReason {
    /// Status code the engine uses when the device was unlinked.
    pub const LOGGED_OUT: u16 = 401;

    pub fn new(status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
        }
    }

    pub fn logged_out() -> Self {
        Self::new(Self::LOGGED_OUT)
    }

    pub fn is_logged_out(&self) -> bool {
        self.status_code == Some(Self::LOGGED_OUT)
    }
}

/// How the engine obtained a batch of messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    /// Newly received, live traffic.
    Notify,
    /// History sync or other backfill.
    Append,
}

#[derive(Debug, Clone)]
pub struct MessageBatch {
    pub kind: UpsertKind,
    pub messages: Vec<RawEvent>,
}
