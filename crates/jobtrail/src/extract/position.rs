//! Position title extraction.
//!
//! Tiers in confidence order: an explicit label ("Position: X"), the
//! "for the X position" phrasing, a known-title dictionary scan, and
//! finally a quoted string that contains a title word.

use regex::Regex;
use std::sync::LazyLock;

use super::ExtractedField;
use crate::mail::RawMessage;

const LABELED_CONFIDENCE: f32 = 0.85;
const PHRASE_CONFIDENCE: f32 = 0.75;
const DICTIONARY_CONFIDENCE: f32 = 0.7;
const QUOTED_CONFIDENCE: f32 = 0.6;

/// Common titles, scanned case-insensitively as a last structured tier.
/// Longer entries are preferred so "senior software engineer" beats
/// "software engineer".
const KNOWN_TITLES: &[&str] = &[
    "senior software engineer",
    "staff software engineer",
    "principal software engineer",
    "software engineer",
    "software developer",
    "backend engineer",
    "frontend engineer",
    "full stack engineer",
    "full stack developer",
    "web developer",
    "mobile developer",
    "ios developer",
    "android developer",
    "machine learning engineer",
    "data scientist",
    "data engineer",
    "data analyst",
    "business analyst",
    "devops engineer",
    "site reliability engineer",
    "platform engineer",
    "cloud engineer",
    "security engineer",
    "qa engineer",
    "test engineer",
    "systems engineer",
    "network engineer",
    "database administrator",
    "solutions architect",
    "software architect",
    "engineering manager",
    "product manager",
    "project manager",
    "program manager",
    "product designer",
    "ux designer",
    "ui designer",
    "graphic designer",
    "technical writer",
    "research scientist",
    "account manager",
    "marketing manager",
    "sales representative",
    "customer success manager",
    "software engineering intern",
];

/// Words that make a quoted string look like a job title.
const TITLE_WORDS: &[&str] = &[
    "engineer",
    "developer",
    "manager",
    "analyst",
    "designer",
    "scientist",
    "architect",
    "administrator",
    "consultant",
    "specialist",
    "director",
    "lead",
    "intern",
    "writer",
    "representative",
];

static LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:position|role|job title)\s*[:\-]\s*([^\r\n]{3,80})")
        .expect("labeled position regex must compile")
});

static FOR_THE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bfor (?:the|a|an|our|this) +([A-Za-z][A-Za-z0-9 /&+#.'-]{2,59}?) +(?:position|role|opening|posting|job)\b",
    )
    .expect("position phrase regex must compile")
});

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"\r\n]{3,60})""#).expect("quoted title regex must compile")
});

pub fn extract_position(message: &RawMessage) -> Option<ExtractedField> {
    let text = format!("{}\n{}", message.subject, message.body);
    from_label(&text)
        .or_else(|| from_phrase(&text))
        .or_else(|| from_dictionary(&text))
        .or_else(|| from_quotes(&text))
}

fn from_label(text: &str) -> Option<ExtractedField> {
    let captures = LABELED.captures(text)?;
    let title = clean_title(captures.get(1)?.as_str())?;
    Some(ExtractedField::new(title, LABELED_CONFIDENCE))
}

fn from_phrase(text: &str) -> Option<ExtractedField> {
    let captures = FOR_THE.captures(text)?;
    let title = clean_title(captures.get(1)?.as_str())?;
    Some(ExtractedField::new(title, PHRASE_CONFIDENCE))
}

fn from_dictionary(text: &str) -> Option<ExtractedField> {
    let lower = text.to_lowercase();
    let best = KNOWN_TITLES
        .iter()
        .filter(|title| lower.contains(*title))
        .max_by_key(|title| title.len())?;
    Some(ExtractedField::new(title_case(best), DICTIONARY_CONFIDENCE))
}

fn from_quotes(text: &str) -> Option<ExtractedField> {
    for captures in QUOTED.captures_iter(text) {
        let quoted = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let lower = quoted.to_lowercase();
        if TITLE_WORDS.iter().any(|word| lower.contains(word)) {
            if let Some(title) = clean_title(quoted) {
                return Some(ExtractedField::new(title, QUOTED_CONFIDENCE));
            }
        }
    }
    None
}

/// Collapses whitespace, strips wrapping punctuation, and rejects
/// captures with no letters in them.
fn clean_title(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let title = collapsed
        .trim_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '"' | '\''))
        .trim()
        .to_string();
    if title.len() < 3 || !title.chars().any(|c| c.is_alphabetic()) {
        return None;
    }
    Some(title)
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
