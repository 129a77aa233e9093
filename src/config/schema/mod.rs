use crate::errors::BridgeError;
use crate::utils::get_nanobot_home;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_RECONNECT_DELAY_SECS: u64 = 5;
const DEFAULT_MAX_MEDIA_BYTES: usize = 50 * 1024 * 1024; // 50 MB

fn default_reconnect_delay_secs() -> u64 {
    DEFAULT_RECONNECT_DELAY_SECS
}

fn default_max_media_bytes() -> usize {
    DEFAULT_MAX_MEDIA_BYTES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Credential directory handed to the transport untouched.
    #[serde(default, rename = "authDir")]
    pub auth_dir: Option<PathBuf>,
    #[serde(default, rename = "mediaDir")]
    pub media_dir: Option<PathBuf>,
    #[serde(
        default = "default_reconnect_delay_secs",
        rename = "reconnectDelaySecs"
    )]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_max_media_bytes", rename = "maxMediaBytes")]
    pub max_media_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            auth_dir: None,
            media_dir: None,
            reconnect_delay_secs: default_reconnect_delay_secs(),
            max_media_bytes: default_max_media_bytes(),
        }
    }
}

impl BridgeConfig {
    /// Configured auth directory, or `<home>/whatsapp-auth`.
    pub fn resolved_auth_dir(&self) -> PathBuf {
        self.auth_dir.clone().unwrap_or_else(|| {
            get_nanobot_home().map_or_else(
                |_| PathBuf::from(".nanobot/whatsapp-auth"),
                |home| home.join("whatsapp-auth"),
            )
        })
    }

    /// Configured media root, or `<home>/media/whatsapp`.
    pub fn resolved_media_dir(&self) -> PathBuf {
        self.media_dir.clone().unwrap_or_else(|| {
            get_nanobot_home().map_or_else(
                |_| PathBuf::from(".nanobot/media/whatsapp"),
                |home| home.join("media").join("whatsapp"),
            )
        })
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self
            .auth_dir
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(BridgeError::Config("authDir must not be empty".into()));
        }
        if self
            .media_dir
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(BridgeError::Config("mediaDir must not be empty".into()));
        }
        if self.reconnect_delay_secs == 0 {
            return Err(BridgeError::Config("reconnectDelaySecs must be > 0".into()));
        }
        if self.reconnect_delay_secs > 3600 {
            return Err(BridgeError::Config(
                "reconnectDelaySecs is unreasonably large (> 3600)".into(),
            ));
        }
        if self.max_media_bytes == 0 {
            return Err(BridgeError::Config("maxMediaBytes must be > 0".into()));
        }
        Ok(())
    }
}
