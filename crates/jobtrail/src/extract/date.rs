//! Application date extraction. An explicit date in the body ("applied
//! on January 5, 2026") wins over the received timestamp.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

use super::ExtractedDate;
use crate::mail::RawMessage;

const EXPLICIT_CONFIDENCE: f32 = 0.9;
const RECEIVED_CONFIDENCE: f32 = 0.6;

static EXPLICIT_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:applied|submitted)\s+on|application\s+date:?)\s+(\d{4}-\d{2}-\d{2}|(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2},?\s+\d{4})",
    )
    .expect("explicit date regex must compile")
});

pub fn extract_date(message: &RawMessage) -> ExtractedDate {
    if let Some(date) = explicit_date(&message.body) {
        return ExtractedDate {
            date,
            confidence: EXPLICIT_CONFIDENCE,
            explicit: true,
        };
    }
    ExtractedDate {
        date: message.received.date_naive(),
        confidence: RECEIVED_CONFIDENCE,
        explicit: false,
    }
}

fn explicit_date(body: &str) -> Option<NaiveDate> {
    let captures = EXPLICIT_DATE.captures(body)?;
    parse_date(captures.get(1)?.as_str())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    let cleaned = raw.replace(',', "");
    NaiveDate::parse_from_str(&cleaned, "%B %d %Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(body: &str) -> RawMessage {
        RawMessage {
            uid: 1,
            message_id: "<m@x>".to_string(),
            sender: "hr@acme.example".to_string(),
            sender_display: None,
            subject: "Update".to_string(),
            body: body.to_string(),
            received: Utc.with_ymd_and_hms(2026, 8, 20, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_received_timestamp_is_the_default() {
        let extracted = extract_date(&message("We will be in touch."));
        assert_eq!(extracted.date, NaiveDate::from_ymd_opt(2026, 8, 20).unwrap());
        assert!(!extracted.explicit);
    }

    #[test]
    fn test_explicit_iso_date_wins() {
        let extracted = extract_date(&message("You applied on 2026-08-01 via our portal."));
        assert_eq!(extracted.date, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert!(extracted.explicit);
        assert!(extracted.confidence > RECEIVED_CONFIDENCE);
    }

    #[test]
    fn test_explicit_spelled_out_date() {
        let extracted = extract_date(&message(
            "Your application was submitted on January 5, 2026 and is under review.",
        ));
        assert_eq!(extracted.date, NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
        assert!(extracted.explicit);
    }

    #[test]
    fn test_unparseable_explicit_date_falls_back() {
        let extracted = extract_date(&message("You applied on 2026-99-99, allegedly."));
        assert!(!extracted.explicit);
        assert_eq!(extracted.date, NaiveDate::from_ymd_opt(2026, 8, 20).unwrap());
    }

    #[test]
    fn test_application_date_label() {
        let extracted = extract_date(&message("Application date: 2026-07-15"));
        assert_eq!(extracted.date, NaiveDate::from_ymd_opt(2026, 7, 15).unwrap());
    }
}
