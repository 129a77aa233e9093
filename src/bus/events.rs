use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized inbound chat message.
///
/// `content` is never empty: events with nothing to say are dropped before
/// one of these is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    /// Opaque network address of the chat (e.g. `123@s.whatsapp.net`).
    pub sender: String,
    pub content: String,
    /// Seconds since the Unix epoch, as reported by the transport.
    pub timestamp: i64,
    #[serde(rename = "isGroup")]
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => f.write_str("connected"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Everything the session reports to its caller, as one stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotification {
    Qr(String),
    Status(ConnectionStatus),
    Message(InboundMessage),
}
