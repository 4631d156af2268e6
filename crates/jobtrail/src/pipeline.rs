//! One scan pass: fetch new mail, classify, extract, reconcile, then
//! advance the watermark.
//!
//! Messages are processed in ascending UID order and the watermark is
//! written once, after the last message of the pass has been reconciled.
//! If a store error aborts the pass mid-way, the watermark advances only
//! to the last message that made it through, so a restart reprocesses at
//! most the tail (which the Message-ID dedup absorbs).

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn};

use crate::classify::Classifier;
use crate::config::ScanSettings;
use crate::error::JobtrailError;
use crate::events::ScanSummary;
use crate::extract::FieldExtractor;
use crate::mail::{MailSource, Watermark};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::store::{watermark_repo, Database};

/// A failed scan pass: the error plus everything counted before the
/// failure, so partial progress stays reportable.
#[derive(Debug)]
pub struct ScanFailure {
    pub error: JobtrailError,
    pub summary: ScanSummary,
}

impl ScanFailure {
    fn new(error: impl Into<JobtrailError>, summary: ScanSummary) -> Self {
        Self {
            error: error.into(),
            summary,
        }
    }
}

impl std::fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for ScanFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub struct ScanPipeline {
    db: Database,
    mailbox_name: String,
    classifier: Classifier,
    extractor: FieldExtractor,
    reconciler: Reconciler,
}

impl ScanPipeline {
    pub fn new(db: Database, mailbox_name: String, scan: &ScanSettings) -> Self {
        Self {
            classifier: Classifier::new(scan.confidence_floor),
            extractor: FieldExtractor::new(),
            reconciler: Reconciler::new(db.clone(), scan),
            db,
            mailbox_name,
        }
    }

    pub fn mailbox_name(&self) -> &str {
        &self.mailbox_name
    }

    /// Runs one scan pass against the given source. A failed pass hands
    /// back the error together with the counts accumulated before it,
    /// so records reconciled before the failure stay countable.
    pub async fn run<S: MailSource>(&self, source: &mut S) -> Result<ScanSummary, ScanFailure> {
        let _span = info_span!("scan_pass", mailbox = %self.mailbox_name).entered();

        let watermark = self
            .db
            .with_conn(|conn| watermark_repo::load(conn, &self.mailbox_name))
            .map_err(|e| ScanFailure::new(e, ScanSummary::default()))?;
        debug!("Loaded watermark: {:?}", watermark);

        let batch = match source.fetch_since(watermark).await {
            Ok(batch) => batch,
            Err(e) => return Err(ScanFailure::new(e, ScanSummary::default())),
        };
        let mut summary = ScanSummary {
            fetched: batch.messages.len(),
            parse_failures: batch.parse_failures,
            ..Default::default()
        };

        if batch.messages.is_empty() {
            info!("No new mail");
        }

        let mut last_done: Option<u32> = None;
        for message in &batch.messages {
            let classification = self.classifier.classify(message);
            if !classification.is_job_related {
                debug!("UID {} not job-related, skipping", message.uid);
                summary.skipped += 1;
                last_done = Some(message.uid);
                continue;
            }

            let candidate = self.extractor.extract(message, &classification);
            match self.reconciler.reconcile(&candidate) {
                Ok(report) => {
                    match report.outcome {
                        ReconcileOutcome::Created => summary.created += 1,
                        ReconcileOutcome::Updated => summary.updated += 1,
                        ReconcileOutcome::Skipped => summary.skipped += 1,
                    }
                    last_done = Some(message.uid);
                }
                Err(e) => {
                    // A failing store aborts the pass; the watermark is
                    // left at the last reconciled message so nothing is
                    // lost.
                    error!("Reconciliation failed at UID {}: {}", message.uid, e);
                    summary
                        .errors
                        .push(format!("UID {}: {}", message.uid, e));
                    if let Err(save_err) = self.save_watermark(batch.uidvalidity, last_done) {
                        summary
                            .errors
                            .push(format!("watermark save failed: {save_err}"));
                    }
                    self.close_source(source).await;
                    return Err(ScanFailure::new(e, summary));
                }
            }
        }

        // Every fetched message was either reconciled or counted as a
        // parse failure; the watermark may cover the full batch.
        if let Err(e) =
            self.save_watermark(batch.uidvalidity, last_fetched(last_done, batch.last_fetched_uid))
        {
            self.close_source(source).await;
            return Err(ScanFailure::new(e, summary));
        }

        self.close_source(source).await;

        info!(
            "Scan pass complete: {} fetched, {} created, {} updated, {} skipped",
            summary.fetched, summary.created, summary.updated, summary.skipped
        );
        Ok(summary)
    }

    /// Persists the watermark for this mailbox. `last_uid` of `None`
    /// means nothing was processed; the stored value is kept as-is
    /// unless no watermark exists yet.
    fn save_watermark(&self, uidvalidity: u32, last_uid: Option<u32>) -> Result<(), JobtrailError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let current = watermark_repo::load(conn, &self.mailbox_name)?;
            let next_uid = match (current, last_uid) {
                // Same generation: only move forward.
                (Some(wm), Some(uid)) if wm.uidvalidity == uidvalidity => wm.last_uid.max(uid),
                (Some(wm), None) if wm.uidvalidity == uidvalidity => wm.last_uid,
                // New generation (or first run): take what we have.
                (_, Some(uid)) => uid,
                (_, None) => 0,
            };
            watermark_repo::save(
                conn,
                &self.mailbox_name,
                Watermark {
                    uidvalidity,
                    last_uid: next_uid,
                },
                &now,
            )
        })?;
        Ok(())
    }

    async fn close_source<S: MailSource>(&self, source: &mut S) {
        if let Err(e) = source.close().await {
            warn!("Failed to close mail source: {}", e);
        }
    }
}

fn last_fetched(last_done: Option<u32>, last_fetched_uid: Option<u32>) -> Option<u32> {
    match (last_done, last_fetched_uid) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
