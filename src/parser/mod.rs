pub mod extract;
pub mod normalize;
pub mod reconcile;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{debug, error};

use crate::db::{SizeRecordRow, SubthreadRow};
use crate::thread::{BrannockSize, Comment, Listing};
use normalize::get_size_pairs;
use reconcile::{process_replies, LogReporter, SizingInput};

/// Everything extracted from one stored thread.
pub struct ThreadRecords {
    pub subthreads: Vec<SubthreadRow>,
    pub records: Vec<SizeRecordRow>,
}

/// Each subthread is a top-level comment with its own replies: the thread
/// author posts one comment per Brannock size, and sizing reports hang off
/// those.
pub fn to_subthreads(raw: &Value) -> Result<Vec<Comment>> {
    let listings = raw.as_array().context("thread export is not an array")?;
    let [op, main_thread] = listings.as_slice() else {
        bail!(
            "expected a two-element thread export, got {} elements",
            listings.len()
        );
    };

    let op = Listing::from_value(op)?;
    let main_thread = Listing::from_value(main_thread)?;

    let thread_author = op
        .children
        .first()
        .map(|comment| comment.author.clone())
        .context("thread export has no original post")?;

    Ok(main_thread
        .children
        .into_iter()
        .filter(|comment| comment.author == thread_author)
        .filter(|comment| comment.replies.is_some())
        .collect())
}

/// Full pipeline over one thread export: select subthreads, explode each
/// reply into sizing inputs, reconcile, and shape rows for storage.
pub fn process_thread(thread_id: i64, raw: &Value) -> Result<ThreadRecords> {
    let reporter = LogReporter;
    let mut subthreads = Vec::new();
    let mut records = Vec::new();

    for comment in to_subthreads(raw)? {
        let brannock = match BrannockSize::from_comment(&comment) {
            Ok(size) => size.to_string(),
            Err(e) => {
                error!("Skipping subthread '{}': {}", comment.id, e);
                continue;
            }
        };

        let replies: &[Comment] = comment
            .replies
            .as_ref()
            .map(|listing| listing.children.as_slice())
            .unwrap_or_default();

        let inputs: Vec<SizingInput> = replies.iter().flat_map(collect_inputs).collect();
        let accepted = process_replies(inputs, &reporter);
        debug!(
            "Subthread '{}' ({}): {} records accepted from {} replies",
            comment.id,
            brannock,
            accepted.len(),
            replies.len()
        );

        subthreads.push(SubthreadRow {
            thread_id,
            comment_id: comment.id.clone(),
            brannock: brannock.clone(),
            author: comment.author.clone(),
            created_utc: comment.created_utc,
            reply_count: replies.len() as i64,
        });

        records.extend(accepted.into_iter().map(|record| SizeRecordRow {
            thread_id,
            subthread_comment_id: comment.id.clone(),
            comment_id: record.comment_id,
            author: record.author,
            created_utc: record.created_utc,
            last: record.last,
            text: record.text,
            size: record.size,
            intl: record.intl,
            width: record.width,
        }));
    }

    Ok(ThreadRecords {
        subthreads,
        records,
    })
}

/// One reply may list several lasts; each sizing pair becomes its own
/// candidate input.
fn collect_inputs(reply: &Comment) -> Vec<SizingInput> {
    let Some(body) = reply.body.as_deref() else {
        return Vec::new();
    };

    get_size_pairs(body)
        .into_iter()
        .map(|pair| SizingInput {
            comment_id: reply.id.clone(),
            author: reply.author.clone(),
            created_utc: reply.created_utc,
            last: Some(pair.last),
            text: Some(pair.text),
        })
        .collect()
}

// ── Tests ──
