//! Data-driven rule tables for message classification.
//!
//! Keyword weights: application-stage words are common in unrelated mail
//! ("job", "position" show up in newsletters), so they score 1; words
//! tied to the later stages are much stronger signals and score 4. A
//! message counts as job-related once its total keyword evidence reaches
//! [`JOB_RELATED_FLOOR`], or as soon as any template phrase or tracking
//! system domain fires.

use super::Stage;

/// Minimum keyword hits for a message to count as job-related on
/// keyword evidence alone.
pub const JOB_RELATED_FLOOR: u32 = 2;

/// Weight granted by a template phrase hit.
pub const PHRASE_WEIGHT: u32 = 6;

/// A weighted keyword list voting for one stage.
pub struct StageRule {
    pub stage: Stage,
    pub weight: u32,
    pub keywords: &'static [&'static str],
}

pub const STAGE_RULES: &[StageRule] = &[
    StageRule {
        stage: Stage::Applied,
        weight: 1,
        keywords: &[
            "application",
            "applied",
            "applying",
            "submitted",
            "consider",
            "job",
            "opening",
            "position",
            "role",
            "opportunity",
            "resume",
            "cv",
            "candidacy",
        ],
    },
    StageRule {
        stage: Stage::Interview,
        weight: 4,
        keywords: &[
            "interview",
            "meet",
            "meeting",
            "discuss",
            "conversation",
            "call",
            "schedule",
            "availability",
            "screen",
            "screening",
            "assessment",
            "assignment",
            "onsite",
        ],
    },
    StageRule {
        stage: Stage::Offer,
        weight: 4,
        keywords: &[
            "offer",
            "congratulations",
            "welcome",
            "hired",
            "contract",
            "compensation",
            "salary",
            "benefits",
            "onboarding",
            "excited",
        ],
    },
    StageRule {
        stage: Stage::Rejected,
        weight: 4,
        keywords: &[
            "unfortunately",
            "regret",
            "sorry",
            "declined",
            "unsuccessful",
            "qualified",
            "competitive",
            "pursue",
        ],
    },
];

/// A boilerplate phrase tied to one stage. Matched as a case-insensitive
/// substring of subject + body; any hit also marks the message
/// job-related.
pub struct PhraseRule {
    pub stage: Stage,
    pub phrase: &'static str,
}

pub const PHRASE_RULES: &[PhraseRule] = &[
    PhraseRule {
        stage: Stage::Applied,
        phrase: "thank you for applying",
    },
    PhraseRule {
        stage: Stage::Applied,
        phrase: "thank you for your application",
    },
    PhraseRule {
        stage: Stage::Applied,
        phrase: "we have received your application",
    },
    PhraseRule {
        stage: Stage::Applied,
        phrase: "your application has been received",
    },
    PhraseRule {
        stage: Stage::Applied,
        phrase: "your application to",
    },
    PhraseRule {
        stage: Stage::Applied,
        phrase: "thank you for your interest in",
    },
    PhraseRule {
        stage: Stage::Interview,
        phrase: "schedule an interview",
    },
    PhraseRule {
        stage: Stage::Interview,
        phrase: "invite you to interview",
    },
    PhraseRule {
        stage: Stage::Interview,
        phrase: "like to speak with you",
    },
    PhraseRule {
        stage: Stage::Interview,
        phrase: "move forward with an interview",
    },
    PhraseRule {
        stage: Stage::Offer,
        phrase: "pleased to offer",
    },
    PhraseRule {
        stage: Stage::Offer,
        phrase: "offer of employment",
    },
    PhraseRule {
        stage: Stage::Offer,
        phrase: "extend an offer",
    },
    PhraseRule {
        stage: Stage::Rejected,
        phrase: "we regret to inform",
    },
    PhraseRule {
        stage: Stage::Rejected,
        phrase: "not to move forward",
    },
    PhraseRule {
        stage: Stage::Rejected,
        phrase: "will not be moving forward",
    },
    PhraseRule {
        stage: Stage::Rejected,
        phrase: "decided to move forward with other candidates",
    },
    PhraseRule {
        stage: Stage::Rejected,
        phrase: "pursue other candidates",
    },
    PhraseRule {
        stage: Stage::Rejected,
        phrase: "position has been filled",
    },
];

/// Applicant tracking system domains. Mail from these is job-related by
/// construction.
pub const ATS_DOMAINS: &[&str] = &[
    "greenhouse.io",
    "lever.co",
    "myworkday.com",
    "myworkdayjobs.com",
    "smartrecruiters.com",
    "icims.com",
    "ashbyhq.com",
    "workable.com",
    "jobvite.com",
    "bamboohr.com",
    "successfactors.com",
];

/// Returns true when the sender address belongs to a known tracking
/// system domain (exact domain or subdomain).
pub fn is_ats_sender(sender: &str) -> bool {
    let domain = match sender.rsplit_once('@') {
        Some((_, d)) => d.to_ascii_lowercase(),
        None => return false,
    };
    ATS_DOMAINS
        .iter()
        .any(|ats| domain == *ats || domain.ends_with(&format!(".{ats}")))
}
