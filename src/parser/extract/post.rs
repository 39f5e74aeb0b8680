use std::sync::LazyLock;

use regex::Regex;

use super::CandidateFields;

// Sizing tokens at the tail of the text, the thread's reply convention:
// an optional convention label, the size, an optional width, an optional
// trailing convention label, then nothing but punctuation. No lookahead in
// the regex crate, so the width class is kept to real Brannock codes rather
// than guarded [A-Z]{1,3}.
static TRAILING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(us|uk|eu)\s+)?\b([0-9]{1,2}(?:\.5)?)(?:\s*(narrow|wide|[a-e]{1,3})\b)?(?:\s+(us|uk|eu)\b)?\s*\.?\s*$",
    )
    .unwrap()
});

/// Extract candidate fields from a sizing text whose size/width tokens
/// trail any supplementary text. The primary strategy: it only fires on
/// texts that end in sizing tokens, so a hit means the text follows the
/// expected format.
pub fn post_match(text: &str) -> CandidateFields {
    let Some(caps) = TRAILING_RE.captures(text) else {
        return CandidateFields::default();
    };

    CandidateFields {
        size: caps.get(2).map(|m| m.as_str().to_string()),
        intl: caps
            .get(1)
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().to_uppercase()),
        width: caps.get(3).map(|m| m.as_str().to_string()),
        text: Some(caps.get(0).unwrap().as_str().trim().to_string()),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_size_and_width() {
        let fields = post_match("9.5D");
        assert_eq!(fields.size.as_deref(), Some("9.5"));
        assert_eq!(fields.width.as_deref(), Some("D"));
        assert_eq!(fields.intl, None);
    }

    #[test]
    fn leading_intl() {
        let fields = post_match("US 9.5D");
        assert_eq!(fields.intl.as_deref(), Some("US"));
        assert_eq!(fields.size.as_deref(), Some("9.5"));
    }

    #[test]
    fn trailing_intl() {
        let fields = post_match("43 EU");
        assert_eq!(fields.size.as_deref(), Some("43"));
        assert_eq!(fields.intl.as_deref(), Some("EU"));
        assert_eq!(fields.width, None);
    }

    #[test]
    fn width_adjective() {
        let fields = post_match("9.5 Wide");
        assert_eq!(fields.width.as_deref(), Some("Wide"));
    }

    #[test]
    fn triple_letter_width() {
        let fields = post_match("8 EEE");
        assert_eq!(fields.width.as_deref(), Some("EEE"));
    }

    #[test]
    fn supplementary_text_defeats_the_anchor() {
        assert!(post_match("9.5D true to size").is_empty());
    }

    #[test]
    fn takes_the_trailing_size() {
        let fields = post_match("9.5, but sized down to 9");
        assert_eq!(fields.size.as_deref(), Some("9"));
    }

    #[test]
    fn trailing_period_tolerated() {
        let fields = post_match("Went with 10.");
        assert_eq!(fields.size.as_deref(), Some("10"));
    }

    #[test]
    fn intl_is_never_read_as_width() {
        let fields = post_match("10 UK");
        assert_eq!(fields.width, None);
        assert_eq!(fields.intl.as_deref(), Some("UK"));
    }

    #[test]
    fn no_size_no_match() {
        assert!(post_match("true to size").is_empty());
        assert!(post_match("").is_empty());
    }

    #[test]
    fn matched_text_is_reported() {
        let fields = post_match("US 9.5D");
        assert_eq!(fields.text.as_deref(), Some("US 9.5D"));
    }
}
