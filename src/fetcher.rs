use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

// Reddit rejects requests without a descriptive User-Agent.
const USER_AGENT: &str = concat!("brannock/", env!("CARGO_PKG_VERSION"), " (sizing thread archiver)");
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const COMMENT_LIMIT: u32 = 500;

pub struct FetchedThread {
    pub source: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub raw: Value,
}

/// Load a thread export from a URL or a local file path.
pub async fn fetch_thread(source: &str) -> Result<FetchedThread> {
    let raw = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_remote(source).await?
    } else {
        let text = std::fs::read_to_string(source)
            .with_context(|| format!("failed to read '{}'", source))?;
        serde_json::from_str(&text)
            .with_context(|| format!("'{}' is not a valid thread export", source))?
    };

    let (title, author) = thread_meta(&raw);
    Ok(FetchedThread {
        source: source.to_string(),
        title,
        author,
        raw,
    })
}

async fn fetch_remote(url: &str) -> Result<Value> {
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let url = export_url(url);
    info!("Fetching thread export: {}", url);

    let mut attempt = 0;
    loop {
        let response = client.get(&url).send().await?;
        let status = response.status();

        if (status.as_u16() == 429 || status.is_server_error()) && attempt < MAX_RETRIES {
            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
            warn!(
                "Got {} from '{}' (attempt {}/{}), backing off {:.1}s",
                status,
                url,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
            continue;
        }

        if !status.is_success() {
            bail!("'{}' answered {}", url, status);
        }

        return response
            .json()
            .await
            .with_context(|| format!("'{}' did not return a thread export", url));
    }
}

/// Normalize a thread permalink to its JSON export URL. Comment bodies come
/// back HTML-entity-escaped; the normalizer decodes them downstream.
fn export_url(url: &str) -> String {
    let (base, _query) = url.split_once('?').unwrap_or((url, ""));
    let base = base.trim_end_matches('/');
    if base.ends_with(".json") {
        format!("{}?limit={}", base, COMMENT_LIMIT)
    } else {
        format!("{}.json?limit={}", base, COMMENT_LIMIT)
    }
}

/// Title and author of the original post, when present.
fn thread_meta(raw: &Value) -> (Option<String>, Option<String>) {
    let post = raw
        .get(0)
        .and_then(|listing| listing.get("data"))
        .and_then(|data| data.get("children"))
        .and_then(|children| children.get(0))
        .and_then(|child| child.get("data"));

    let get = |key: &str| {
        post.and_then(|data| data.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    (get("title"), get("author"))
}

// ── Tests ──
