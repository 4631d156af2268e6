//! IMAP mailbox adapter.

use async_imap::Session;
use async_native_tls::TlsConnector;
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::ExposeSecret;

use crate::config::{MailboxSettings, ScanSettings};

use super::error::{MailError, Result};
use super::message::parse_raw_message;
use super::{FetchBatch, MailSource, Watermark};

/// Type alias for the underlying async stream (async-std compatible TcpStream).
type AsyncTcpStream = async_io::Async<std::net::TcpStream>;

/// Type alias for the TLS stream used by the IMAP session.
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

/// IMAP mailbox client. Connects lazily on the first fetch and keeps
/// the session across passes until an error or an explicit close.
pub struct ImapMailbox {
    session: Option<Session<TlsStream>>,
    settings: MailboxSettings,
    batch_size: usize,
}

impl ImapMailbox {
    pub fn new(settings: MailboxSettings, scan: &ScanSettings) -> Self {
        Self {
            session: None,
            settings,
            batch_size: scan.batch_size,
        }
    }

    /// Connects to the IMAP server and authenticates with LOGIN.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Already connected to IMAP server");
            return Ok(());
        }

        let addr = format!("{}:{}", self.settings.imap_host, self.settings.imap_port);
        info!("Connecting to IMAP server at {}", addr);

        // Establish TCP connection using std::net and wrap with async-io
        let std_stream = std::net::TcpStream::connect(&addr)
            .map_err(|e| MailError::ConnectionFailed(e.to_string()))?;
        std_stream
            .set_nonblocking(true)
            .map_err(|e| MailError::ConnectionFailed(e.to_string()))?;
        let tcp_stream = async_io::Async::new(std_stream)
            .map_err(|e| MailError::ConnectionFailed(e.to_string()))?;

        // Wrap with TLS
        let tls = TlsConnector::new();
        let tls_stream = tls
            .connect(&self.settings.imap_host, tcp_stream)
            .await
            .map_err(|e| MailError::TlsError(e.to_string()))?;

        let client = async_imap::Client::new(tls_stream);

        if self.settings.password.is_some() {
            warn!(
                "Using a direct password value is not recommended. \
                 Consider passwordEnvVar or passwordFile instead."
            );
        }
        let password = self.resolve_password()?;

        let session = client
            .login(&self.settings.address, password.expose_secret())
            .await
            .map_err(|(e, _)| MailError::AuthenticationFailed(e.to_string()))?;

        info!("Successfully authenticated to IMAP server");
        self.session = Some(session);
        Ok(())
    }

    fn resolve_password(&self) -> Result<secrecy::SecretString> {
        crate::secrets::resolve_secret(
            self.settings.password.as_deref(),
            self.settings.password_file.as_deref(),
            self.settings.password_env_var.as_deref(),
        )
        .map_err(|e| MailError::CredentialsNotFound(e.to_string()))
    }

    /// Opens the configured folder and returns its UIDVALIDITY. Uses
    /// EXAMINE (read-only) unless `mark_seen` is on, in which case the
    /// folder must be writable and SELECT is used.
    async fn open_folder(&mut self) -> Result<u32> {
        let folder = self.settings.inbox.clone();
        let mark_seen = self.settings.mark_seen;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| MailError::ConnectionFailed("Not connected".to_string()))?;

        info!("Opening folder: {}", folder);

        let mailbox = if mark_seen {
            session.select(&folder).await
        } else {
            session.examine(&folder).await
        }
        .map_err(|e| {
            if e.to_string().contains("Mailbox doesn't exist") || e.to_string().contains("NO") {
                MailError::FolderNotFound(folder.clone())
            } else {
                MailError::ProtocolError(e.to_string())
            }
        })?;

        let uidvalidity = mailbox.uid_validity.ok_or_else(|| {
            MailError::ProtocolError("Server did not provide UIDVALIDITY".to_string())
        })?;

        debug!("Folder '{}' opened with UIDVALIDITY={}", folder, uidvalidity);
        Ok(uidvalidity)
    }

    /// Searches for messages with UID strictly greater than `last_uid`.
    async fn search_since_uid(&mut self, last_uid: u32) -> Result<Vec<u32>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| MailError::ConnectionFailed("Not connected".to_string()))?;

        let query = format!("UID {}:*", last_uid.saturating_add(1));
        debug!("Searching with query: {}", query);

        let uids = session
            .uid_search(&query)
            .await
            .map_err(|e| MailError::ProtocolError(e.to_string()))?;

        // "UID n:*" always matches the newest message even when its UID
        // is below n, so the strict bound must be re-applied here.
        let mut uid_list: Vec<u32> = uids.into_iter().filter(|uid| *uid > last_uid).collect();
        uid_list.sort_unstable();
        debug!("Found {} messages matching search", uid_list.len());
        Ok(uid_list)
    }

    /// Fetches full messages for the given UIDs with BODY.PEEK[].
    async fn fetch_bodies(&mut self, uids: &[u32]) -> Result<Vec<(u32, Vec<u8>)>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| MailError::ConnectionFailed("Not connected".to_string()))?;

        let uid_set = uids
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(",");

        debug!("Fetching {} emails with UIDs: {}", uids.len(), uid_set);

        let mut messages = session
            .uid_fetch(&uid_set, "(UID BODY.PEEK[])")
            .await
            .map_err(|e| MailError::ProtocolError(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(message_result) = messages.next().await {
            match message_result {
                Ok(message) => {
                    if let (Some(uid), Some(body)) = (message.uid, message.body()) {
                        results.push((uid, body.to_vec()));
                    } else {
                        warn!("Fetched message missing UID or body");
                    }
                }
                Err(e) => {
                    warn!("Error fetching message: {}", e);
                }
            }
        }

        debug!("Successfully fetched {} emails", results.len());
        Ok(results)
    }

    /// Flags the given UIDs `\Seen`. Only called when `mark_seen` is
    /// configured; this is the adapter's one deliberate side effect.
    async fn mark_seen(&mut self, uids: &[u32]) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| MailError::ConnectionFailed("Not connected".to_string()))?;

        let uid_set = uids
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(",");

        debug!("Marking {} messages as seen", uids.len());

        let mut responses = session
            .uid_store(&uid_set, "+FLAGS.SILENT (\\Seen)")
            .await
            .map_err(|e| MailError::ProtocolError(e.to_string()))?;
        while responses.next().await.is_some() {}
        Ok(())
    }

    /// Disconnects from the IMAP server gracefully.
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");
            session
                .logout()
                .await
                .map_err(|e| MailError::ProtocolError(e.to_string()))?;
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

#[async_trait]
impl MailSource for ImapMailbox {
    async fn fetch_since(&mut self, watermark: Option<Watermark>) -> Result<FetchBatch> {
        self.connect().await?;
        let uidvalidity = self.open_folder().await?;

        // A stored watermark from another mailbox generation is void.
        let last_uid = match watermark {
            Some(wm) if wm.uidvalidity == uidvalidity => wm.last_uid,
            Some(wm) => {
                warn!(
                    "UIDVALIDITY changed ({} -> {}), refetching folder from the start",
                    wm.uidvalidity, uidvalidity
                );
                0
            }
            None => 0,
        };

        let mut uids = self.search_since_uid(last_uid).await?;
        uids.truncate(self.batch_size);

        let bodies = self.fetch_bodies(&uids).await?;
        let batch = build_batch(uidvalidity, &uids, &bodies);

        if self.settings.mark_seen {
            let fetched: Vec<u32> = bodies.iter().map(|(uid, _)| *uid).collect();
            self.mark_seen(&fetched).await?;
        }

        Ok(batch)
    }

    async fn close(&mut self) -> Result<()> {
        self.disconnect().await
    }
}

/// Assembles the pass result from fetched bodies. Requested UIDs the
/// server never delivered count as failures alongside unparseable
/// messages, so the watermark still covers them and the pass reports
/// them instead of losing them silently.
fn build_batch(uidvalidity: u32, requested: &[u32], bodies: &[(u32, Vec<u8>)]) -> FetchBatch {
    let mut batch = FetchBatch {
        uidvalidity,
        last_fetched_uid: requested.last().copied(),
        parse_failures: requested.len().saturating_sub(bodies.len()),
        ..Default::default()
    };
    if batch.parse_failures > 0 {
        warn!(
            "{} of {} requested messages were not delivered",
            batch.parse_failures,
            requested.len()
        );
    }

    for (uid, raw) in bodies {
        match parse_raw_message(raw, *uid, uidvalidity) {
            Ok(message) => batch.messages.push(message),
            Err(e) => {
                warn!("Skipping UID {}: {}", uid, e);
                batch.parse_failures += 1;
            }
        }
    }
    batch.messages.sort_unstable_by_key(|m| m.uid);
    batch
}

impl Drop for ImapMailbox {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapMailbox dropped without explicit disconnect - session will be closed");
        }
    }
}
