//! Reconciliation engine: merges extracted candidates into the store
//! without creating duplicates.
//!
//! The whole match-then-write sequence runs inside one transaction so
//! two near-simultaneous passes can never both decide "no match" and
//! create duplicate records.

pub mod fuzzy;

use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::Connection;
use uuid::Uuid;

use crate::classify::Stage;
use crate::config::ScanSettings;
use crate::extract::CandidateRecord;
use crate::store::application_repo::{self, ApplicationRow};
use crate::store::{message_repo, Database, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub outcome: ReconcileOutcome,
    pub application_id: Option<String>,
    /// The record was created from ambiguous extraction and is marked
    /// for user review.
    pub flagged: bool,
}

pub struct Reconciler {
    db: Database,
    fuzzy_threshold: f64,
    confidence_floor: f32,
}

impl Reconciler {
    pub fn new(db: Database, scan: &ScanSettings) -> Self {
        Self {
            db,
            fuzzy_threshold: scan.fuzzy_threshold,
            confidence_floor: scan.confidence_floor,
        }
    }

    /// Folds one candidate into the store.
    pub fn reconcile(&self, candidate: &CandidateRecord) -> Result<ReconcileReport, StoreError> {
        let now = Utc::now();
        self.db.with_txn(|txn| self.reconcile_in(txn, candidate, now))
    }

    fn reconcile_in(
        &self,
        conn: &Connection,
        candidate: &CandidateRecord,
        now: DateTime<Utc>,
    ) -> Result<ReconcileReport, StoreError> {
        // Idempotence: a message already folded in stays where it is.
        if let Some(existing) = message_repo::find_application(conn, &candidate.source_message_id)?
        {
            debug!(
                "Message {} already linked to {}",
                candidate.source_message_id, existing
            );
            return Ok(ReconcileReport {
                outcome: ReconcileOutcome::Skipped,
                application_id: Some(existing),
                flagged: false,
            });
        }

        let (matched, company_near_miss) = self.select_match(conn, candidate)?;

        if let Some(record) = matched {
            let id = self.apply_update(conn, record, candidate, now)?;
            message_repo::link(conn, &candidate.source_message_id, &id, &now.to_rfc3339())?;
            return Ok(ReconcileReport {
                outcome: ReconcileOutcome::Updated,
                application_id: Some(id),
                flagged: false,
            });
        }

        if candidate.job_confidence < self.confidence_floor {
            debug!(
                "Candidate from {} below confidence floor, not creating a record",
                candidate.source_message_id
            );
            return Ok(ReconcileReport {
                outcome: ReconcileOutcome::Skipped,
                application_id: None,
                flagged: false,
            });
        }

        let (id, flagged) = self.create_record(conn, candidate, company_near_miss, now)?;
        message_repo::link(conn, &candidate.source_message_id, &id, &now.to_rfc3339())?;
        Ok(ReconcileReport {
            outcome: ReconcileOutcome::Created,
            application_id: Some(id),
            flagged,
        })
    }

    /// Finds the record the candidate belongs to. Company must be
    /// present on both sides and similar; position must be similar
    /// unless either side lacks one. `all()` returns records most
    /// recently updated first, so the first full match is also the
    /// documented tie-break winner.
    ///
    /// The second return value reports a near miss: a record whose
    /// company matched but whose position clearly differs, which makes
    /// a subsequent create ambiguous enough to flag.
    fn select_match(
        &self,
        conn: &Connection,
        candidate: &CandidateRecord,
    ) -> Result<(Option<ApplicationRow>, bool), StoreError> {
        let candidate_company = match &candidate.company {
            Some(field) => &field.value,
            None => return Ok((None, false)),
        };

        let mut company_near_miss = false;
        for record in application_repo::all(conn)? {
            let record_company = match &record.company {
                Some(c) => c,
                None => continue,
            };
            if !fuzzy::is_match(candidate_company, record_company, self.fuzzy_threshold) {
                continue;
            }
            match (&candidate.position, &record.position) {
                (Some(cp), Some(rp)) => {
                    if fuzzy::is_match(&cp.value, rp, self.fuzzy_threshold) {
                        return Ok((Some(record), false));
                    }
                    company_near_miss = true;
                }
                _ => return Ok((Some(record), false)),
            }
        }
        Ok((None, company_near_miss))
    }

    /// Applies the candidate to a matched record: stage only moves
    /// forward (or jumps to Rejected), fields are only overwritten by
    /// higher-confidence extractions, and a note line records the
    /// source message.
    fn apply_update(
        &self,
        conn: &Connection,
        mut record: ApplicationRow,
        candidate: &CandidateRecord,
        now: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        if candidate.stage != Stage::Unknown && record.stage.advances_to(candidate.stage) {
            debug!(
                "Application {}: stage {} -> {}",
                record.id,
                record.stage.as_str(),
                candidate.stage.as_str()
            );
            record.stage = candidate.stage;
        }

        if let Some(company) = &candidate.company {
            if company.confidence > record.company_confidence {
                record.company = Some(company.value.clone());
                record.company_confidence = company.confidence;
            }
        }
        if let Some(position) = &candidate.position {
            if position.confidence > record.position_confidence {
                record.position = Some(position.value.clone());
                record.position_confidence = position.confidence;
            }
        }

        append_note(&mut record.notes, candidate, now);
        record.last_updated = now.to_rfc3339();

        application_repo::update(conn, &record)?;
        Ok(record.id)
    }

    fn create_record(
        &self,
        conn: &Connection,
        candidate: &CandidateRecord,
        company_near_miss: bool,
        now: DateTime<Utc>,
    ) -> Result<(String, bool), StoreError> {
        let stage = match candidate.stage {
            Stage::Unknown => Stage::Applied,
            stage => stage,
        };
        let flagged =
            candidate.company.is_none() || candidate.position.is_none() || company_near_miss;

        let mut notes = String::new();
        append_note(&mut notes, candidate, now);

        let record = ApplicationRow {
            id: Uuid::new_v4().to_string(),
            company: candidate.company.as_ref().map(|f| f.value.clone()),
            position: candidate.position.as_ref().map(|f| f.value.clone()),
            stage,
            applied_date: candidate.date.date.format("%Y-%m-%d").to_string(),
            last_updated: now.to_rfc3339(),
            notes,
            company_confidence: candidate
                .company
                .as_ref()
                .map(|f| f.confidence)
                .unwrap_or(0.0),
            position_confidence: candidate
                .position
                .as_ref()
                .map(|f| f.confidence)
                .unwrap_or(0.0),
            needs_review: flagged,
        };
        application_repo::insert(conn, &record)?;
        debug!(
            "Created application {} ({:?} / {:?})",
            record.id, record.company, record.position
        );
        Ok((record.id, flagged))
    }
}

/// Appends one note line recording the folded-in message.
fn append_note(notes: &mut String, candidate: &CandidateRecord, now: DateTime<Utc>) {
    let subject: String = candidate.source_subject.chars().take(120).collect();
    if !notes.is_empty() {
        notes.push('\n');
    }
    notes.push_str(&format!("[{}] {}", now.format("%Y-%m-%d"), subject));
}
