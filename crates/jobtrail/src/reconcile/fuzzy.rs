//! String similarity for record matching. Pure functions, independently
//! testable from the store.

/// Case-folds, strips punctuation and collapses whitespace.
pub fn normalize(s: &str) -> String {
    let mut folded = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_alphanumeric() {
            folded.extend(c.to_lowercase());
        } else {
            folded.push(' ');
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized Levenshtein similarity in [0, 1] over normalized inputs.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize(a), &normalize(b))
}

/// True when both strings normalize to something substantial and their
/// similarity clears the threshold. Empty strings match nothing.
pub fn is_match(a: &str, b: &str, threshold: f64) -> bool {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    strsim::normalized_levenshtein(&na, &nb) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Acme,  Corp. "), "acme corp");
        assert_eq!(normalize("ACME-CORP"), "acme corp");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn test_exact_after_normalization() {
        assert_eq!(similarity("Acme Corp", "acme   corp."), 1.0);
    }

    #[test]
    fn test_non_ascii_names_case_fold() {
        assert_eq!(normalize("Müller GmbH"), "müller gmbh");
        assert!(is_match("Müller GmbH", "müller gmbh", 0.99));
        assert!(is_match("SOCIÉTÉ Générale", "société générale", 0.99));
    }

    #[test]
    fn test_minor_variation_matches() {
        assert!(is_match("Acme Corp", "Acmecorp", 0.85));
        assert!(is_match("Backend Engineer", "Backend  Engineer.", 0.85));
    }

    #[test]
    fn test_different_strings_do_not_match() {
        assert!(!is_match("Acme Corp", "Initech", 0.85));
        assert!(!is_match("Backend Engineer", "Product Manager", 0.85));
    }

    #[test]
    fn test_empty_matches_nothing() {
        assert!(!is_match("", "", 0.5));
        assert!(!is_match("Acme", "...", 0.5));
    }

    #[test]
    fn test_threshold_is_respected() {
        let sim = similarity("Acme Corp", "Acme Core");
        assert!(is_match("Acme Corp", "Acme Core", sim - 0.01));
        assert!(!is_match("Acme Corp", "Acme Core", sim + 0.01));
    }
}
