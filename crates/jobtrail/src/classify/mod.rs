//! Message classifier: is this email about a job application, and which
//! lifecycle stage does it represent?
//!
//! Classification is a scored walk over the rule tables in [`rules`]:
//! weighted keywords, tracking-system boilerplate phrases, and sender
//! domain heuristics. The stage with the highest score wins, except that
//! strong rejection evidence wins outright: rejections are final and must
//! not be masked by earlier-stage phrasing quoted in the same thread.

pub mod rules;

use serde::{Deserialize, Serialize};

use crate::mail::RawMessage;
use rules::{is_ats_sender, JOB_RELATED_FLOOR, PHRASE_RULES, PHRASE_WEIGHT, STAGE_RULES};

/// Lifecycle stage of a job application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Applied,
    Interview,
    Offer,
    Rejected,
    Unknown,
}

impl Stage {
    /// Position along the forward lifecycle. `Rejected` ranks above all
    /// other stages; `Unknown` has no rank.
    pub fn rank(&self) -> u8 {
        match self {
            Stage::Applied => 0,
            Stage::Interview => 1,
            Stage::Offer => 2,
            Stage::Rejected => 3,
            Stage::Unknown => 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Offer | Stage::Rejected)
    }

    /// Whether a stored record at `self` may transition to `next`.
    ///
    /// Transitions move forward along Applied -> Interview -> Offer, or
    /// jump to Rejected from any non-rejected state. Terminal stages
    /// never regress.
    pub fn advances_to(&self, next: Stage) -> bool {
        match (self, next) {
            (_, Stage::Unknown) => false,
            (Stage::Rejected, _) => false,
            (_, Stage::Rejected) => true,
            (Stage::Offer, _) => false,
            (Stage::Unknown, _) => true,
            (current, next) => next.rank() > current.rank(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::Interview => "interview",
            Stage::Offer => "offer",
            Stage::Rejected => "rejected",
            Stage::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Stage> {
        match s {
            "applied" => Some(Stage::Applied),
            "interview" => Some(Stage::Interview),
            "offer" => Some(Stage::Offer),
            "rejected" => Some(Stage::Rejected),
            "unknown" => Some(Stage::Unknown),
            _ => None,
        }
    }
}

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_job_related: bool,
    pub stage: Stage,
    /// Winning share of the total stage evidence, in [0, 1].
    pub confidence: f32,
}

impl Classification {
    fn unrelated() -> Self {
        Self {
            is_job_related: false,
            stage: Stage::Unknown,
            confidence: 0.0,
        }
    }
}

/// Rejection evidence at or above this score wins the stage outright.
/// One boilerplate rejection phrase or two weighted keywords reach it.
const REJECTION_OVERRIDE_SCORE: u32 = PHRASE_WEIGHT;

pub struct Classifier {
    confidence_floor: f32,
}

impl Classifier {
    pub fn new(confidence_floor: f32) -> Self {
        Self { confidence_floor }
    }

    pub fn classify(&self, message: &RawMessage) -> Classification {
        let text = format!("{}\n{}", message.subject, message.body).to_lowercase();

        // Per-stage evidence, indexed by Stage::rank of the known stages.
        let mut scores = [0u32; 4];
        let mut keyword_hits = 0u32;

        for token in text.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            for rule in STAGE_RULES {
                if rule.keywords.contains(&token) {
                    scores[rule.stage.rank() as usize] += rule.weight;
                    keyword_hits += 1;
                }
            }
        }

        let mut phrase_hit = false;
        for rule in PHRASE_RULES {
            if text.contains(rule.phrase) {
                scores[rule.stage.rank() as usize] += PHRASE_WEIGHT;
                phrase_hit = true;
            }
        }

        let job_related =
            keyword_hits >= JOB_RELATED_FLOOR || phrase_hit || is_ats_sender(&message.sender);
        if !job_related {
            return Classification::unrelated();
        }

        let total: u32 = scores.iter().sum();
        if total == 0 {
            // Job-related by sender domain alone, no stage evidence.
            return Classification {
                is_job_related: true,
                stage: Stage::Unknown,
                confidence: 0.0,
            };
        }

        let mut stage = winning_stage(&scores);
        if stage != Stage::Rejected && scores[Stage::Rejected.rank() as usize] >= REJECTION_OVERRIDE_SCORE
        {
            stage = Stage::Rejected;
        }

        let confidence = scores[stage.rank() as usize] as f32 / total as f32;
        if confidence < self.confidence_floor {
            stage = Stage::Unknown;
        }

        Classification {
            is_job_related: true,
            stage,
            confidence,
        }
    }
}

/// Highest score wins; equal scores break toward the more terminal
/// stage.
fn winning_stage(scores: &[u32; 4]) -> Stage {
    let ordered = [Stage::Applied, Stage::Interview, Stage::Offer, Stage::Rejected];
    let mut best = Stage::Applied;
    for stage in ordered {
        if scores[stage.rank() as usize] >= scores[best.rank() as usize] {
            best = stage;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(sender: &str, subject: &str, body: &str) -> RawMessage {
        RawMessage {
            uid: 1,
            message_id: "<test@example.com>".to_string(),
            sender: sender.to_string(),
            sender_display: None,
            subject: subject.to_string(),
            body: body.to_string(),
            received: Utc::now(),
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(0.35)
    }

    #[test]
    fn test_application_confirmation_is_applied() {
        let msg = message(
            "careers@acme.example",
            "Your application to Acme Corp",
            "Thank you for applying for the Backend Engineer position.",
        );
        let c = classifier().classify(&msg);
        assert!(c.is_job_related);
        assert_eq!(c.stage, Stage::Applied);
        assert!(c.confidence > 0.0);
    }

    #[test]
    fn test_interview_invitation() {
        let msg = message(
            "recruiting@acme.example",
            "Next steps",
            "We'd like to schedule an interview to discuss the role.",
        );
        let c = classifier().classify(&msg);
        assert!(c.is_job_related);
        assert_eq!(c.stage, Stage::Interview);
    }

    #[test]
    fn test_offer_message() {
        let msg = message(
            "hr@acme.example",
            "Congratulations!",
            "We are pleased to offer you the position. Details on compensation and benefits attached.",
        );
        let c = classifier().classify(&msg);
        assert_eq!(c.stage, Stage::Offer);
    }

    #[test]
    fn test_rejection_message_with_no_prior_signals() {
        let msg = message(
            "noreply@acme.example",
            "Your application",
            "Unfortunately we have decided to move forward with other candidates.",
        );
        let c = classifier().classify(&msg);
        assert!(c.is_job_related);
        assert_eq!(c.stage, Stage::Rejected);
    }

    #[test]
    fn test_rejection_wins_over_interview_phrasing_in_thread() {
        // A rejection quoting the earlier interview invitation below it.
        let msg = message(
            "recruiting@acme.example",
            "Re: Interview for Backend Engineer",
            "We regret to inform you that we will not be moving forward. \
             > We'd like to schedule an interview to discuss the position. \
             > Please share your availability for a call.",
        );
        let c = classifier().classify(&msg);
        assert_eq!(c.stage, Stage::Rejected);
    }

    #[test]
    fn test_unrelated_mail() {
        let msg = message(
            "friend@gmail.com",
            "Dinner on Friday?",
            "Want to grab dinner at that new place downtown?",
        );
        let c = classifier().classify(&msg);
        assert!(!c.is_job_related);
        assert_eq!(c.stage, Stage::Unknown);
        assert_eq!(c.confidence, 0.0);
    }

    #[test]
    fn test_single_weak_keyword_is_not_job_related() {
        let msg = message(
            "newsletter@shop.example",
            "Summer hours",
            "Our store has a new opening this summer.",
        );
        let c = classifier().classify(&msg);
        assert!(!c.is_job_related);
    }

    #[test]
    fn test_ats_sender_alone_is_job_related() {
        let msg = message("no-reply@greenhouse.io", "Hi", "See the portal.");
        let c = classifier().classify(&msg);
        assert!(c.is_job_related);
        assert_eq!(c.stage, Stage::Unknown);
    }

    #[test]
    fn test_low_confidence_resolves_to_unknown_but_stays_related() {
        // Evenly split evidence across stages keeps every share below a
        // high floor.
        let msg = message(
            "careers@acme.example",
            "Update on your application",
            "Your interview assessment and the offer contract are pending; \
             we will schedule a call about compensation and benefits.",
        );
        let c = Classifier::new(0.95).classify(&msg);
        assert!(c.is_job_related);
        assert_eq!(c.stage, Stage::Unknown);
        assert!(c.confidence < 0.95);
    }

    #[test]
    fn test_stage_advances_forward_only() {
        assert!(Stage::Applied.advances_to(Stage::Interview));
        assert!(Stage::Applied.advances_to(Stage::Offer));
        assert!(Stage::Interview.advances_to(Stage::Offer));
        assert!(!Stage::Interview.advances_to(Stage::Applied));
        assert!(!Stage::Offer.advances_to(Stage::Interview));
        assert!(!Stage::Applied.advances_to(Stage::Applied));
    }

    #[test]
    fn test_rejected_reachable_from_anywhere_and_terminal() {
        assert!(Stage::Applied.advances_to(Stage::Rejected));
        assert!(Stage::Offer.advances_to(Stage::Rejected));
        assert!(!Stage::Rejected.advances_to(Stage::Applied));
        assert!(!Stage::Rejected.advances_to(Stage::Offer));
        assert!(!Stage::Rejected.advances_to(Stage::Rejected));
    }

    #[test]
    fn test_stage_round_trips_through_text() {
        for stage in [
            Stage::Applied,
            Stage::Interview,
            Stage::Offer,
            Stage::Rejected,
            Stage::Unknown,
        ] {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(Stage::parse("bogus"), None);
    }
}
