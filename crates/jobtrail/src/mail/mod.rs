//! Mailbox access: the IMAP adapter and the `MailSource` seam the
//! pipeline consumes.

pub mod client;
pub mod error;
pub mod message;

pub use client::ImapMailbox;
pub use error::{MailError, Result};
pub use message::RawMessage;

use async_trait::async_trait;

/// Cursor marking the last message already processed in a mailbox.
///
/// UIDs are only meaningful within one mailbox generation; when the
/// server reports a different UIDVALIDITY the stored watermark is void
/// and the mailbox is refetched from the start (Message-ID dedup in the
/// store keeps the refetch idempotent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    pub uidvalidity: u32,
    pub last_uid: u32,
}

/// One fetch pass worth of messages.
#[derive(Debug, Default)]
pub struct FetchBatch {
    /// Mailbox generation the UIDs below belong to.
    pub uidvalidity: u32,
    /// Parsed messages in ascending UID order.
    pub messages: Vec<RawMessage>,
    /// Messages that could not be fetched or parsed; logged and
    /// counted, never fatal for the pass.
    pub parse_failures: usize,
    /// Highest UID requested this pass, including undelivered and
    /// unparseable messages. The watermark must cover these too or they
    /// would be refetched forever.
    pub last_fetched_uid: Option<u32>,
}

/// Source of new mail for one scan pass. `ImapMailbox` is the real
/// implementation; tests drive the pipeline with a scripted fake.
#[async_trait]
pub trait MailSource: Send {
    /// Fetches messages strictly after the watermark, ascending by UID.
    /// A `None` watermark (first run, or a stale generation) fetches
    /// from the start of the mailbox.
    async fn fetch_since(&mut self, watermark: Option<Watermark>) -> Result<FetchBatch>;

    /// Releases the underlying connection, if any.
    async fn close(&mut self) -> Result<()>;
}

