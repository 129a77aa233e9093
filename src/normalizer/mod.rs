use crate::bus::InboundMessage;
use crate::jid;
use crate::media::{MediaDescriptor, MediaFetcher};
use crate::transport::{MessageKind, RawEvent, TransportHandle};
use tracing::debug;

const IMAGE_PLACEHOLDER: &str = "[Image]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Echo of a message this account sent.
    OwnMessage,
    StatusBroadcast,
}

/// Events that must never reach the caller, whatever they contain.
pub fn drop_reason(event: &RawEvent) -> Option<DropReason> {
    if event.key.from_me {
        return Some(DropReason::OwnMessage);
    }
    if jid::is_status_broadcast(&event.key.remote_jid) {
        return Some(DropReason::StatusBroadcast);
    }
    None
}

/// Text rendering of a message body, or `None` when it has nothing to show.
pub fn extract_content(kind: &MessageKind) -> Option<String> {
    match kind {
        MessageKind::Text(text) | MessageKind::ExtendedText(text) => Some(text.clone()),
        MessageKind::Image {
            caption: Some(caption),
        } => Some(format!("[Image] {}", caption)),
        MessageKind::Image { caption: None } => Some(IMAGE_PLACEHOLDER.to_string()),
        MessageKind::Video { caption } => Some(format!("[Video] {}", caption)),
        MessageKind::Document { caption } => Some(format!("[Document] {}", caption)),
        MessageKind::Audio => Some("[Voice Message]".to_string()),
        MessageKind::Unrecognized => None,
    }
}

/// Maps one raw event to zero or one [`InboundMessage`], downloading any
/// attached image on the way.
#[derive(Debug, Clone)]
pub struct MessageNormalizer {
    fetcher: MediaFetcher,
}

impl MessageNormalizer {
    pub fn new(fetcher: MediaFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn normalize(
        &self,
        handle: Option<&dyn TransportHandle>,
        event: &RawEvent,
    ) -> Option<InboundMessage> {
        if let Some(reason) = drop_reason(event) {
            debug!("Dropping WhatsApp event {}: {:?}", event.key.id, reason);
            return None;
        }

        let content = extract_content(&event.kind);
        let mut media = Vec::new();

        // Images are fetched even when a text field already supplied content
        if let Some(descriptor) = MediaDescriptor::image(event)
            && let Some(stored) = self.fetcher.fetch(handle, &descriptor).await
        {
            media.push(stored.absolute_path.to_string_lossy().to_string());
        }

        if content.is_none() && media.is_empty() {
            debug!(
                "WhatsApp event {} has no usable content, skipping",
                event.key.id
            );
            return None;
        }

        Some(InboundMessage {
            id: event.key.id.clone(),
            sender: event.key.remote_jid.clone(),
            content: content.unwrap_or_else(|| IMAGE_PLACEHOLDER.to_string()),
            timestamp: event.timestamp,
            is_group: jid::is_group(&event.key.remote_jid),
            media,
        })
    }
}
