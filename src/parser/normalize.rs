use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

const SIZE_PAIR_DELIM: char = ':';

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]*)`").unwrap());
static STRIKE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~([^~]*)~~").unwrap());
static EMPHASIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_]{1,3}([^*_]+)[*_]{1,3}").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap());
static LIST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*[-+*]\s+").unwrap());
static ORDERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\.\s+").unwrap());
static RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*_]\s*){3,}$").unwrap());

/// A normalized sizing line: manufacturer last on the left of the colon,
/// free-form sizing text on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct SizingPair {
    pub last: String,
    pub text: String,
}

/// Normalize markdown from a sizing comment into trimmed plain-text lines.
pub fn normalize_md(md: &str) -> Vec<String> {
    let text = html_escape::decode_html_entities(md);
    let stripped = strip_markdown(&text);
    stripped
        .split('\n')
        .filter(|line| !line.is_empty())
        // Strip the lead symbol from unordered list items written without a
        // space between the symbol and the text. Improperly formatted, so
        // the markdown stripper leaves them alone, but not a rare sight on
        // Reddit.
        .map(|line| {
            line.strip_prefix(|c| matches!(c, '-' | '+' | '*' | '>'))
                .unwrap_or(line)
        })
        .map(|line| line.trim().to_string())
        .collect()
}

/// Split a line into its last and sizing-text components. None if the line
/// does not hold exactly one sizing pair.
pub fn split_sizing_pair(line: &str) -> Option<SizingPair> {
    let parts: Vec<&str> = line.split(SIZE_PAIR_DELIM).map(str::trim).collect();
    match parts.as_slice() {
        [last, text] => {
            // Lines for notes carry commentary, not size information.
            if last.to_lowercase().contains("note") {
                debug!("Encountered 'note' in manufacturer last '{}'", line);
                return None;
            }
            Some(SizingPair {
                last: (*last).to_string(),
                text: (*text).to_string(),
            })
        }
        _ => None,
    }
}

/// Lines likely to contain sizing information, split into last and
/// sizing-text pairs. Order and duplicates are preserved.
pub fn get_size_pairs(md: &str) -> Vec<SizingPair> {
    normalize_md(md)
        .iter()
        .filter_map(|line| split_sizing_pair(line))
        .collect()
}

fn strip_markdown(text: &str) -> String {
    let text = IMAGE_RE.replace_all(text, "");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = CODE_RE.replace_all(&text, "$1");
    let text = STRIKE_RE.replace_all(&text, "$1");
    let text = EMPHASIS_RE.replace_all(&text, "$1");
    let text = HEADING_RE.replace_all(&text, "");
    let text = RULE_RE.replace_all(&text, "");
    let text = LIST_RE.replace_all(&text, "");
    ORDERED_RE.replace_all(&text, "").into_owned()
}

// ── Tests ──
