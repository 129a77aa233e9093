use crate::config::BridgeConfig;
use crate::transport::{RawEvent, TransportHandle};
use crate::utils::safe_filename;
use anyhow::{Context, Result, bail};
use chrono::Utc;
use std::path::PathBuf;
use tracing::{info, warn};

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// What to download: the event carrying the media and its declared MIME type.
#[derive(Debug, Clone, Copy)]
pub struct MediaDescriptor<'a> {
    pub mime_type: &'a str,
    pub source_event: &'a RawEvent,
}

impl<'a> MediaDescriptor<'a> {
    /// Descriptor for the event's image, if it carries one.
    pub fn image(event: &'a RawEvent) -> Option<Self> {
        let img = event.image.as_ref()?;
        Some(Self {
            mime_type: img.mimetype.as_deref().unwrap_or(DEFAULT_IMAGE_MIME),
            source_event: event,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMediaRef {
    pub absolute_path: PathBuf,
}

/// Downloads inline media through the transport and writes it under a
/// fixed media root as `<eventId>-<unixMillis><ext>`.
#[derive(Debug, Clone)]
pub struct MediaFetcher {
    media_root: PathBuf,
    max_bytes: usize,
}

impl MediaFetcher {
    pub fn new(media_root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            media_root: media_root.into(),
            max_bytes,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.resolved_media_dir(), config.max_media_bytes)
    }

    /// Download and store the media. Every failure is logged and mapped to
    /// `None` so the message can still go out as text.
    pub async fn fetch(
        &self,
        handle: Option<&dyn TransportHandle>,
        media: &MediaDescriptor<'_>,
    ) -> Option<StoredMediaRef> {
        match self.try_fetch(handle, media).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!(
                    "failed to download WhatsApp media for {}: {:#}",
                    media.source_event.key.id, e
                );
                None
            }
        }
    }

    async fn try_fetch(
        &self,
        handle: Option<&dyn TransportHandle>,
        media: &MediaDescriptor<'_>,
    ) -> Result<StoredMediaRef> {
        let handle = handle.context("transport not connected")?;
        let data = handle.download_media(media.source_event).await?;
        if data.is_empty() {
            bail!("empty media buffer");
        }
        if data.len() > self.max_bytes {
            bail!(
                "media too large ({} bytes, max {})",
                data.len(),
                self.max_bytes
            );
        }

        tokio::fs::create_dir_all(&self.media_root)
            .await
            .with_context(|| {
                format!(
                    "failed to create media directory: {}",
                    self.media_root.display()
                )
            })?;

        let millis = Utc::now().timestamp_millis();
        let id = &media.source_event.key.id;
        let stem = if id.is_empty() {
            millis.to_string()
        } else {
            safe_filename(id)
        };
        let file_path = self.media_root.join(format!(
            "{}-{}{}",
            stem,
            millis,
            image_extension(media.mime_type)
        ));

        tokio::fs::write(&file_path, &data)
            .await
            .with_context(|| format!("failed to write media file: {}", file_path.display()))?;

        let absolute_path = std::path::absolute(&file_path).unwrap_or(file_path);
        info!(
            "WhatsApp media saved: {} ({} bytes)",
            absolute_path.display(),
            data.len()
        );
        Ok(StoredMediaRef { absolute_path })
    }
}

/// File extension (with dot) for an image MIME type. Unknown types are
/// stored as JPEG, the engine's default encoding.
pub fn image_extension(mime: &str) -> &'static str {
    if mime.contains("png") {
        ".png"
    } else if mime.contains("webp") {
        ".webp"
    } else if mime.contains("gif") {
        ".gif"
    } else {
        ".jpg"
    }
}
