//! Raw message parsing.

use chrono::{DateTime, Utc};
use log::debug;
use mail_parser::MessageParser;

use super::error::{MailError, Result};

/// Immutable snapshot of a fetched email. Discarded after processing,
/// never persisted.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Server-assigned UID within the current mailbox generation.
    pub uid: u32,
    /// Message-ID header, or a synthesized `uidvalidity:uid` id when the
    /// header is missing. Stable across rescans.
    pub message_id: String,
    /// Sender address.
    pub sender: String,
    /// Sender display name, when the From header carries one.
    pub sender_display: Option<String>,
    pub subject: String,
    /// Plain-text body; HTML-only messages are converted to text.
    pub body: String,
    pub received: DateTime<Utc>,
}

/// Parses RFC 822 bytes into a [`RawMessage`].
pub fn parse_raw_message(raw: &[u8], uid: u32, uidvalidity: u32) -> Result<RawMessage> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| MailError::ParseError(format!("unparseable message at UID {uid}")))?;

    let message_id = message
        .message_id()
        .map(|id| format!("<{id}>"))
        .unwrap_or_else(|| format!("uid:{uidvalidity}:{uid}"));

    let from = message.from().and_then(|addrs| addrs.first());
    let sender = from
        .and_then(|addr| addr.address())
        .unwrap_or_default()
        .to_string();
    let sender_display = from
        .and_then(|addr| addr.name())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    let subject = message.subject().unwrap_or_default().to_string();
    let body = message
        .body_text(0)
        .map(|text| text.to_string())
        .unwrap_or_default();

    let received = match message.date() {
        Some(date) => DateTime::parse_from_rfc3339(&date.to_rfc3339())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        None => {
            debug!("Message UID {uid} has no Date header, using current time");
            Utc::now()
        }
    };

    Ok(RawMessage {
        uid,
        message_id,
        sender,
        sender_display,
        subject,
        body,
        received,
    })
}
