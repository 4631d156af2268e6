//! Company name extraction.
//!
//! Three tiers, highest confidence first:
//! 1. sender display name, stripped of recruiting boilerplate (0.9)
//! 2. capitalized phrase after a trigger ("your application to X") (0.75)
//! 3. sender domain label, unless freemail or a tracking system (0.55)

use regex::Regex;
use std::sync::LazyLock;

use super::ExtractedField;
use crate::classify::rules::is_ats_sender;
use crate::mail::RawMessage;

const DISPLAY_NAME_CONFIDENCE: f32 = 0.9;
const TRIGGER_PHRASE_CONFIDENCE: f32 = 0.75;
const DOMAIN_CONFIDENCE: f32 = 0.55;

/// Tokens stripped from display names; what remains is the company.
const DISPLAY_SUFFIXES: &[&str] = &[
    "careers",
    "career",
    "recruiting",
    "recruitment",
    "recruiter",
    "talent",
    "hiring",
    "jobs",
    "hr",
    "team",
    "notifications",
    "noreply",
    "no-reply",
];

/// Freemail providers; their domain says nothing about the employer.
const FREEMAIL_DOMAINS: &[&str] = &[
    "gmail",
    "googlemail",
    "yahoo",
    "outlook",
    "hotmail",
    "live",
    "icloud",
    "aol",
    "proton",
    "protonmail",
    "gmx",
    "fastmail",
    "mail",
];

/// Job boards relay mail for many employers.
const JOB_BOARDS: &[&str] = &[
    "linkedin",
    "indeed",
    "glassdoor",
    "ziprecruiter",
    "monster",
    "dice",
    "wellfound",
];

static TRIGGER_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[Yy]our application (?:to|at|with)|[Aa]pplication (?:to|at|with)|[Aa]pplying (?:to|at)|[Pp]osition at|[Rr]ole at|[Oo]pportunity at|[Tt]eam at|[Ii]nterest in)\s+([A-Z][\w&.'-]*(?:\s+(?:[A-Z][\w&.'-]*|of|and|the)){0,3})",
    )
    .expect("trigger phrase regex must compile")
});

pub fn extract_company(message: &RawMessage) -> Option<ExtractedField> {
    from_display_name(message)
        .or_else(|| from_trigger_phrase(message))
        .or_else(|| from_domain(message))
}

fn from_display_name(message: &RawMessage) -> Option<ExtractedField> {
    let display = message.sender_display.as_deref()?.trim();
    if display.is_empty() || display.contains('@') {
        return None;
    }

    // "Acme Corp via Greenhouse" names the relay after "via".
    let display = match display.split_once(" via ") {
        Some((before, _)) => before,
        None => display,
    };

    let kept: Vec<&str> = display
        .split_whitespace()
        .filter(|word| {
            let w = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            !w.is_empty() && !DISPLAY_SUFFIXES.contains(&w.as_str())
        })
        .collect();
    if kept.is_empty() {
        return None;
    }

    let name = clean(&kept.join(" "))?;
    if JOB_BOARDS.contains(&name.to_lowercase().as_str()) {
        return None;
    }
    Some(ExtractedField::new(name, DISPLAY_NAME_CONFIDENCE))
}

fn from_trigger_phrase(message: &RawMessage) -> Option<ExtractedField> {
    let text = format!("{}\n{}", message.subject, message.body);
    let captures = TRIGGER_PHRASE.captures(&text)?;
    let name = clean(captures.get(1)?.as_str())?;
    Some(ExtractedField::new(name, TRIGGER_PHRASE_CONFIDENCE))
}

fn from_domain(message: &RawMessage) -> Option<ExtractedField> {
    if is_ats_sender(&message.sender) {
        return None;
    }
    let (_, domain) = message.sender.rsplit_once('@')?;
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    // Second-level label, stepping over country-code registries like
    // acme.co.uk.
    let mut label = labels[labels.len() - 2];
    if labels.len() >= 3 && matches!(label, "co" | "com" | "org" | "net" | "ac" | "gov") {
        label = labels[labels.len() - 3];
    }
    let label = label.to_lowercase();
    if label.is_empty()
        || FREEMAIL_DOMAINS.contains(&label.as_str())
        || JOB_BOARDS.contains(&label.as_str())
    {
        return None;
    }
    Some(ExtractedField::new(capitalize(&label), DOMAIN_CONFIDENCE))
}

/// Collapses whitespace and strips trailing connectives and punctuation.
/// Returns None when nothing substantial remains.
fn clean(raw: &str) -> Option<String> {
    let mut words: Vec<&str> = raw.split_whitespace().collect();
    while let Some(last) = words.last() {
        let bare = last.trim_matches(|c: char| !c.is_alphanumeric());
        if bare.is_empty() || matches!(bare.to_lowercase().as_str(), "of" | "and" | "the") {
            words.pop();
        } else {
            break;
        }
    }
    if words.is_empty() {
        return None;
    }
    let name = words
        .join(" ")
        .trim_matches(|c: char| c == ',' || c == '.' || c == ';' || c == ':')
        .to_string();
    if name.chars().any(|c| c.is_alphabetic()) {
        Some(name)
    } else {
        None
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
