//! jobtrail — job application tracking core.
//!
//! Scans an IMAP mailbox on a background cadence, classifies
//! job-application-related email, extracts company / position / stage /
//! date with heuristic NLP, and reconciles the results into a SQLite
//! application store without creating duplicates. The interactive
//! surface subscribes to scan events; it never blocks on the pipeline.

pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod logging;
pub mod mail;
pub mod pipeline;
pub mod reconcile;
pub mod scheduler;
pub mod secrets;
pub mod store;

pub use classify::{Classification, Classifier, Stage};
pub use config::{load_config, Config, MailboxSettings, ScanSettings};
pub use error::{ConfigError, JobtrailError, Result};
pub use events::{ScanEvent, ScanEventBroadcaster, ScanSummary};
pub use extract::{CandidateRecord, ExtractedDate, ExtractedField, FieldExtractor};
pub use mail::{FetchBatch, ImapMailbox, MailError, MailSource, RawMessage, Watermark};
pub use pipeline::{ScanFailure, ScanPipeline};
pub use reconcile::{ReconcileOutcome, ReconcileReport, Reconciler};
pub use scheduler::{ScanGate, ScanScheduler};
pub use secrets::{resolve_secret, SecretError};
pub use store::{Database, StoreError};
