use thiserror::Error;

/// Typed error hierarchy for the bridge.
///
/// Returned from the public session operations. Internal helpers keep using
/// `anyhow::Result`; the `Internal` variant lets `?` lift them at the boundary.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Not connected")]
    NotConnected,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl BridgeError {
    /// Whether the caller can reasonably retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotConnected | Self::Transport(_) | Self::Internal(_) => true,
            Self::Config(_) => false,
        }
    }
}
