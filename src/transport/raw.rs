use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageKey {
    pub id: String,
    pub remote_jid: String,
    /// Echo of a message sent from this account.
    pub from_me: bool,
}

/// Message body, first matching variant wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text(String),
    /// Replies and link previews.
    ExtendedText(String),
    Image { caption: Option<String> },
    Video { caption: String },
    Document { caption: String },
    /// Voice notes and audio files.
    Audio,
    Unrecognized,
}

/// Downloadable image carried by the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawEvent {
    pub key: MessageKey,
    /// Seconds since the Unix epoch; 0 when the engine sent none.
    pub timestamp: i64,
    pub kind: MessageKind,
    pub image: Option<ImageAttachment>,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    key: Option<KeyEnvelope>,
    #[serde(default)]
    message: Option<BodyEnvelope>,
    #[serde(default, rename = "messageTimestamp")]
    message_timestamp: Value,
}

#[derive(Deserialize)]
struct KeyEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "remoteJid")]
    remote_jid: Option<String>,
    #[serde(default, rename = "fromMe")]
    from_me: Option<bool>,
}

#[derive(Deserialize)]
struct BodyEnvelope {
    #[serde(default)]
    conversation: Option<String>,
    #[serde(default, rename = "extendedTextMessage")]
    extended_text_message: Option<TextPayload>,
    #[serde(default, rename = "imageMessage")]
    image_message: Option<MediaPayload>,
    #[serde(default, rename = "videoMessage")]
    video_message: Option<MediaPayload>,
    #[serde(default, rename = "documentMessage")]
    document_message: Option<MediaPayload>,
    #[serde(default, rename = "audioMessage")]
    audio_message: Option<MediaPayload>,
}

#[derive(Deserialize)]
struct TextPayload {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MediaPayload {
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    mimetype: Option<String>,
}

impl RawEvent {
    /// Classify an engine payload. Fails only when the envelope itself is
    /// structurally wrong (e.g. `key` is not an object).
    pub fn from_json(payload: Value) -> Result<Self> {
        let envelope: Envelope = serde_json::from_value(payload)
            .context("malformed message envelope")?;

        let key = envelope.key.map_or_else(MessageKey::default, |k| MessageKey {
            id: k.id.unwrap_or_default(),
            remote_jid: k.remote_jid.unwrap_or_default(),
            from_me: k.from_me.unwrap_or(false),
        });

        let image = envelope
            .message
            .as_ref()
            .and_then(|m| m.image_message.as_ref())
            .map(|img| ImageAttachment {
                mimetype: non_empty(img.mimetype.as_deref()),
            });
        let kind = envelope
            .message
            .as_ref()
            .map_or(MessageKind::Unrecognized, classify);

        Ok(Self {
            key,
            timestamp: parse_timestamp(&envelope.message_timestamp),
            kind,
            image,
        })
    }
}

fn classify(body: &BodyEnvelope) -> MessageKind {
    if let Some(text) = non_empty(body.conversation.as_deref()) {
        return MessageKind::Text(text);
    }
    if let Some(text) = body
        .extended_text_message
        .as_ref()
        .and_then(|m| non_empty(m.text.as_deref()))
    {
        return MessageKind::ExtendedText(text);
    }
    if let Some(img) = &body.image_message {
        return MessageKind::Image {
            caption: non_empty(img.caption.as_deref()),
        };
    }
    if let Some(caption) = caption_of(body.video_message.as_ref()) {
        return MessageKind::Video { caption };
    }
    if let Some(caption) = caption_of(body.document_message.as_ref()) {
        return MessageKind::Document { caption };
    }
    if body.audio_message.is_some() {
        return MessageKind::Audio;
    }
    MessageKind::Unrecognized
}

fn caption_of(media: Option<&MediaPayload>) -> Option<String> {
    media.and_then(|m| non_empty(m.caption.as_deref()))
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(ToString::to_string)
}

/// Engines emit the timestamp as a number, a numeric string, or a protobuf
/// `Long` object (`{low, high, unsigned}`).
fn parse_timestamp(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        Value::Object(map) => {
            let low = map.get("low").and_then(Value::as_i64).unwrap_or(0);
            let high = map.get("high").and_then(Value::as_i64).unwrap_or(0);
            (high << 32) | i64::from(low as u32)
        }
        _ => 0,
    }
}
