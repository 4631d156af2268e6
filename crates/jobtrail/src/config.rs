//! Configuration for the mailbox connection and the scan pipeline.
//!
//! Loaded from a JSON file. Settings are treated as immutable for the
//! duration of a scan pass; the embedding application reloads and
//! rebuilds the scheduler when they change.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// IMAP mailbox connection settings.
///
/// The password is resolved through [`crate::secrets::resolve_secret`]
/// from one of three sources and never written back to disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MailboxSettings {
    /// Account address, also used as the IMAP login name.
    pub address: String,
    pub imap_host: String,
    pub imap_port: u16,
    /// Folder to scan.
    pub inbox: String,
    /// Direct password value. Discouraged outside local testing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Path to a file whose trimmed contents are the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_file: Option<String>,
    /// Name of an environment variable holding the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env_var: Option<String>,
    /// When true the folder is opened writable and fetched messages are
    /// flagged `\Seen`. Off by default so scanning leaves no trace.
    pub mark_seen: bool,
}

impl Default for MailboxSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            imap_host: String::new(),
            imap_port: 993,
            inbox: "INBOX".to_string(),
            password: None,
            password_file: None,
            password_env_var: None,
            mark_seen: false,
        }
    }
}

/// Tunables for the scan pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanSettings {
    /// Seconds between automatic scan passes.
    pub interval_secs: u64,
    /// Classification confidence below which the stage resolves to
    /// Unknown and unmatched candidates are not created as records.
    pub confidence_floor: f32,
    /// Normalized similarity in [0,1] above which two company or
    /// position strings are considered the same.
    pub fuzzy_threshold: f64,
    /// Maximum messages fetched per pass.
    pub batch_size: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            confidence_floor: 0.35,
            fuzzy_threshold: 0.85,
            batch_size: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub mailbox: MailboxSettings,
    pub scan: ScanSettings,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailbox.address.is_empty() {
            return Err(validation("mailbox.address must not be empty"));
        }
        if self.mailbox.imap_host.is_empty() {
            return Err(validation("mailbox.imapHost must not be empty"));
        }
        if self.mailbox.imap_port == 0 {
            return Err(validation("mailbox.imapPort must be nonzero"));
        }
        if self.mailbox.inbox.is_empty() {
            return Err(validation("mailbox.inbox must not be empty"));
        }
        if self.scan.interval_secs == 0 {
            return Err(validation("scan.intervalSecs must be nonzero"));
        }
        if !(0.0..=1.0).contains(&self.scan.confidence_floor) {
            return Err(validation("scan.confidenceFloor must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.scan.fuzzy_threshold) {
            return Err(validation("scan.fuzzyThreshold must be within [0, 1]"));
        }
        if self.scan.batch_size == 0 {
            return Err(validation("scan.batchSize must be nonzero"));
        }
        Ok(())
    }
}

/// Loads and validates a config from a JSON file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: Config = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

fn validation(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}
