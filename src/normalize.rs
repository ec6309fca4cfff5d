//! Canonical comparison forms for identity fields.

use unicode_normalization::UnicodeNormalization;

/// Separator characters removed from free text before comparison.
const SEPARATORS: [char; 4] = [' ', '-', '.', '\''];

/// Canonicalizes a name or partner name.
///
/// Accented letters decompose to their ASCII base (`"José"` -> `"jose"`), anything
/// else outside ASCII is dropped, separators are removed and the result is lower-cased.
pub fn normalize_text(text: Option<&str>) -> String {
    let Some(text) = text else {
        return String::new();
    };

    text.nfkd()
        .filter(|c| c.is_ascii())
        .filter(|c| !SEPARATORS.contains(c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Keeps digits and a single leading `+`.
pub fn normalize_phone(phone: Option<&str>) -> String {
    let Some(phone) = phone else {
        return String::new();
    };

    let trimmed = phone.trim();
    let mut normalized = String::with_capacity(trimmed.len());
    if trimmed.starts_with('+') {
        normalized.push('+');
    }
    normalized.extend(trimmed.chars().filter(|c| c.is_ascii_digit()));
    normalized
}

/// Substring containment where an empty needle never matches.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_accents_and_separators() {
        assert_eq!(normalize_text(Some("José O'Neil-Díaz Jr.")), "joseoneildiazjr");
        assert_eq!(normalize_text(Some("  Ana  María ")), "anamaria");
        assert_eq!(normalize_text(Some("Beyoncé")), "beyonce");
    }

    #[test]
    fn test_drops_unrecognized_characters() {
        assert_eq!(normalize_text(Some("Björk 🎵")), "bjork");
        assert_eq!(normalize_text(Some("李小龍")), "");
    }

    #[test]
    fn test_absent_text_is_empty() {
        assert_eq!(normalize_text(None), "");
        assert_eq!(normalize_text(Some("")), "");
    }

    #[test]
    fn test_phone_keeps_digits_and_leading_plus() {
        assert_eq!(normalize_phone(Some("+1 (555) 010-2030")), "+15550102030");
        assert_eq!(normalize_phone(Some("555.010.2030")), "5550102030");
        assert_eq!(normalize_phone(Some("555+010")), "555010");
        assert_eq!(normalize_phone(None), "");
    }

    #[test]
    fn test_empty_needle_never_matches() {
        assert!(!contains_normalized("janedoe", ""));
        assert!(!contains_normalized("", ""));
        assert!(contains_normalized("janedoe", "jane"));
    }
}
