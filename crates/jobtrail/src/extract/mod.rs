//! Field extractor: pulls company, position and date out of a classified
//! message. Every field carries its own confidence so reconciliation can
//! refuse to overwrite better data with worse. Fields that cannot be
//! extracted are absent, never placeholder text.

pub mod company;
pub mod date;
pub mod position;

use chrono::NaiveDate;

use crate::classify::{Classification, Stage};
use crate::mail::RawMessage;

/// An extracted string field with the confidence of the method that
/// produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedField {
    pub value: String,
    pub confidence: f32,
}

impl ExtractedField {
    pub fn new(value: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }
}

/// The application date with its provenance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractedDate {
    pub date: NaiveDate,
    pub confidence: f32,
    /// True when the body named the date explicitly, false when it is
    /// the received timestamp.
    pub explicit: bool,
}

/// Provisional application record extracted from one message, not yet
/// merged into the store.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub company: Option<ExtractedField>,
    pub position: Option<ExtractedField>,
    pub stage: Stage,
    pub date: ExtractedDate,
    pub source_message_id: String,
    pub source_subject: String,
    /// Classification confidence; gates record creation downstream.
    pub job_confidence: f32,
}

#[derive(Debug, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(
        &self,
        message: &RawMessage,
        classification: &Classification,
    ) -> CandidateRecord {
        CandidateRecord {
            company: company::extract_company(message),
            position: position::extract_position(message),
            stage: classification.stage,
            date: date::extract_date(message),
            source_message_id: message.message_id.clone(),
            source_subject: message.subject.clone(),
            job_confidence: classification.confidence,
        }
    }
}
