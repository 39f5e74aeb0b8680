use std::sync::LazyLock;

use regex::Regex;

use super::CandidateFields;

// Size/width must precede any supplementary text: only punctuation may come
// before the size token. Width class as in the trailing strategy.
static LEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\W*(?:\b(us|uk|eu)\s+)?([0-9]{1,2}(?:\.5)?)(?:\s*(narrow|wide|[a-e]{1,3})\b)?",
    )
    .unwrap()
});

static INTL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\b(us|uk|eu)\b").unwrap());

/// Extract candidate fields from a sizing text whose size/width tokens lead
/// the text, with supplementary words after. The convention label is
/// scanned for across the whole text rather than only adjacent to the size,
/// which makes this the more reliable intl extractor of the two.
pub fn precedes_match(text: &str) -> CandidateFields {
    let Some(caps) = LEADING_RE.captures(text) else {
        return CandidateFields::default();
    };

    let intl = caps
        .get(1)
        .map(|m| m.as_str().to_uppercase())
        .or_else(|| INTL_RE.find(text).map(|m| m.as_str().to_uppercase()));

    CandidateFields {
        size: caps.get(2).map(|m| m.as_str().to_string()),
        intl,
        width: caps.get(3).map(|m| m.as_str().to_string()),
        text: Some(caps.get(0).unwrap().as_str().trim().to_string()),
    }
}

// ── Tests ──
