//! Mailbox adapter error types.

use thiserror::Error;

/// Errors that can occur while talking to the mailbox.
#[derive(Error, Debug)]
pub enum MailError {
    /// Failed to connect to the IMAP server.
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    /// TLS/SSL error during connection.
    #[error("TLS error: {0}")]
    TlsError(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Failed to resolve the mailbox credentials.
    #[error("Credentials not found: {0}")]
    CredentialsNotFound(String),

    /// IMAP protocol error.
    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    /// Failed to parse an email message.
    #[error("Failed to parse email: {0}")]
    ParseError(String),

    /// Folder not found.
    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// IO error on the underlying stream.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MailError {
    /// Fatal errors are not retried automatically; they need the user to
    /// reconfigure something. Everything else is transient and handled
    /// by the scheduler's backoff.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MailError::AuthenticationFailed(_)
                | MailError::CredentialsNotFound(_)
                | MailError::FolderNotFound(_)
                | MailError::ConfigError(_)
        )
    }
}

impl From<async_native_tls::Error> for MailError {
    fn from(err: async_native_tls::Error) -> Self {
        MailError::TlsError(err.to_string())
    }
}

/// Result type for mailbox operations.
pub type Result<T> = std::result::Result<T, MailError>;
