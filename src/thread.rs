use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]{1,2}(\.5)?").unwrap());
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b[0-9]{1,2}(\.5)?\s*(narrow|wide|[a-e]{1,3})\b").unwrap());

const WIDTH_ADJECTIVES: &[&str] = &["NARROW", "WIDE"];

/// A `kind: "Listing"` node of a thread export. Owns its child comments.
#[derive(Debug, Clone)]
pub struct Listing {
    pub kind: String,
    pub modhash: String,
    pub children: Vec<Comment>,
}

impl Listing {
    pub fn from_value(value: &Value) -> Result<Listing> {
        let kind = value.get("kind").and_then(Value::as_str).unwrap_or("");
        if kind != "Listing" {
            bail!("Expected 'Listing', got '{}' instead", kind);
        }

        let data = value.get("data").context("listing has no data")?;
        let children = data
            .get("children")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(Comment::from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(Listing {
            kind: kind.to_string(),
            modhash: data
                .get("modhash")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            children,
        })
    }
}

/// Inner payload of a `t1`/`t3` node. Reddit leaves `selftext` to posts and
/// `body` to comments; an absent `replies` tree arrives as the empty string.
#[derive(Debug, Deserialize)]
struct CommentData {
    #[serde(default)]
    author: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    selftext: Option<String>,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    id: String,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    replies: Value,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub author: String,
    pub body: Option<String>,
    pub created_utc: f64,
    pub id: String,
    pub kind: String,
    pub parent_id: Option<String>,
    pub replies: Option<Listing>,
}

impl Comment {
    pub fn from_value(value: &Value) -> Result<Comment> {
        let kind = value.get("kind").and_then(Value::as_str).unwrap_or("");
        if kind != "t1" && kind != "t3" {
            bail!("Expected 't1' or 't3', got '{}' instead", kind);
        }

        let data: CommentData = value
            .get("data")
            .context("comment has no data")
            .and_then(|d| serde_json::from_value(d.clone()).context("malformed comment data"))?;

        let replies = match &data.replies {
            Value::Object(_) => Some(Listing::from_value(&data.replies)?),
            _ => None,
        };

        Ok(Comment {
            author: data.author,
            body: data
                .selftext
                .filter(|s| !s.is_empty())
                .or(data.body.filter(|s| !s.is_empty())),
            created_utc: data.created_utc,
            id: data.id,
            kind: kind.to_string(),
            parent_id: data.parent_id,
            replies,
        })
    }
}

/// A Brannock device reading: numeric size plus a width code ("D", "EE")
/// or adjective ("Narrow", "Wide").
#[derive(Debug, Clone, PartialEq)]
pub struct BrannockSize {
    pub size: f64,
    pub width: String,
}

impl BrannockSize {
    /// Parse the anchoring size out of a top-level comment's body.
    pub fn from_comment(comment: &Comment) -> Result<BrannockSize> {
        let md = comment
            .body
            .as_deref()
            .with_context(|| format!("comment '{}' has no body", comment.id))?;
        let m = COMMENT_RE
            .find(md)
            .with_context(|| format!("no size found in comment '{}'", comment.id))?;
        m.as_str().parse()
    }
}

impl FromStr for BrannockSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<BrannockSize> {
        let input = s.trim();
        let m = SIZE_RE
            .find(input)
            .with_context(|| format!("no size found in '{}'", input))?;
        let width = format!("{}{}", &input[..m.start()], &input[m.end()..]);
        Ok(BrannockSize {
            size: m.as_str().parse()?,
            width: width.trim().to_uppercase(),
        })
    }
}

impl fmt::Display for BrannockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if WIDTH_ADJECTIVES.contains(&self.width.as_str()) {
            // Adjective widths read as words, not codes.
            write!(f, "{} {}", self.size, capitalize(&self.width))
        } else {
            write!(f, "{}{}", self.size, self.width)
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t1(author: &str, body: &str, replies: Value) -> Value {
        json!({
            "kind": "t1",
            "data": {
                "author": author,
                "body": body,
                "created_utc": 1546300800.0,
                "id": "abc123",
                "parent_id": "t3_root",
                "replies": replies,
            }
        })
    }

    #[test]
    fn listing_rejects_wrong_tag() {
        let err = Listing::from_value(&json!({"kind": "t1", "data": {}})).unwrap_err();
        assert!(err.to_string().contains("Expected 'Listing'"));
    }

    #[test]
    fn comment_rejects_wrong_tag() {
        let err = Comment::from_value(&json!({"kind": "Listing", "data": {}})).unwrap_err();
        assert!(err.to_string().contains("Expected 't1' or 't3'"));
    }

    #[test]
    fn comment_empty_replies_string() {
        let c = Comment::from_value(&t1("alice", "9D", json!(""))).unwrap();
        assert!(c.replies.is_none());
        assert_eq!(c.author, "alice");
        assert_eq!(c.body.as_deref(), Some("9D"));
        assert_eq!(c.kind, "t1");
        assert_eq!(c.parent_id.as_deref(), Some("t3_root"));
    }

    #[test]
    fn comment_nested_replies() {
        let nested = json!({
            "kind": "Listing",
            "data": { "modhash": "abc", "children": [t1("bob", "Barrie: 9D", json!(""))] }
        });
        let c = Comment::from_value(&t1("alice", "9D", nested)).unwrap();
        let replies = c.replies.unwrap();
        assert_eq!(replies.kind, "Listing");
        assert_eq!(replies.modhash, "abc");
        assert_eq!(replies.children.len(), 1);
        assert_eq!(replies.children[0].author, "bob");
    }

    #[test]
    fn post_prefers_selftext() {
        let v = json!({
            "kind": "t3",
            "data": { "author": "op", "selftext": "intro", "id": "t3x", "replies": "" }
        });
        let c = Comment::from_value(&v).unwrap();
        assert_eq!(c.body.as_deref(), Some("intro"));
    }

    #[test]
    fn empty_selftext_falls_through_to_body() {
        let v = json!({
            "kind": "t3",
            "data": { "author": "op", "selftext": "", "body": "fallback", "id": "t3x" }
        });
        let c = Comment::from_value(&v).unwrap();
        assert_eq!(c.body.as_deref(), Some("fallback"));
    }

    #[test]
    fn brannock_roundtrip_adjective() {
        let size: BrannockSize = "9.5 Wide".parse().unwrap();
        assert_eq!(size.size, 9.5);
        assert_eq!(size.width, "WIDE");
        assert_eq!(size.to_string(), "9.5 Wide");
    }

    #[test]
    fn brannock_roundtrip_code() {
        let size: BrannockSize = "10D".parse().unwrap();
        assert_eq!(size.to_string(), "10D");
    }

    #[test]
    fn brannock_narrow() {
        let size: BrannockSize = "8 narrow".parse().unwrap();
        assert_eq!(size.to_string(), "8 Narrow");
    }

    #[test]
    fn brannock_rejects_sizeless_string() {
        assert!("extra wide".parse::<BrannockSize>().is_err());
    }

    #[test]
    fn brannock_from_comment() {
        let c = Comment::from_value(&t1("op", "Next size: 9.5EE, post below", json!(""))).unwrap();
        let size = BrannockSize::from_comment(&c).unwrap();
        assert_eq!(size.size, 9.5);
        assert_eq!(size.width, "EE");
    }

    #[test]
    fn brannock_from_comment_requires_body() {
        let v = json!({"kind": "t1", "data": {"author": "op", "id": "x", "replies": ""}});
        let c = Comment::from_value(&v).unwrap();
        assert!(BrannockSize::from_comment(&c).is_err());
    }
}
