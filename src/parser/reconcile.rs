use super::extract::{post_match, precedes_match, CandidateFields};

pub const DEFAULT_INTL: &str = "US";
pub const DEFAULT_WIDTH: &str = "D";

// Adult US/UK sizes stay well below this; EU sizes start above it.
const EU_CUTOFF: f64 = 39.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Debug,
}

/// Side channel for reconciliation diagnostics. Rejections and corrections
/// are reported here and never surfaced to the caller as errors.
pub trait Reporter {
    fn record(&self, severity: Severity, message: &str);
}

/// Production reporter: forwards to the tracing subscriber.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn record(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error => tracing::error!("{}", message),
            Severity::Debug => tracing::debug!("{}", message),
        }
    }
}

fn is_eu(size: f64) -> bool {
    size >= EU_CUTOFF
}

/// One candidate size claim: reply metadata plus the last/text pair chosen
/// for it upstream.
#[derive(Debug, Clone)]
pub struct SizingInput {
    pub comment_id: String,
    pub author: String,
    pub created_utc: f64,
    pub last: Option<String>,
    pub text: Option<String>,
}

/// A reconciled, validated size report.
#[derive(Debug, Clone)]
pub struct SizeRecord {
    pub comment_id: String,
    pub author: String,
    pub created_utc: f64,
    pub last: Option<String>,
    pub text: String,
    pub size: f64,
    pub intl: String,
    pub width: String,
}

/// Combine both extraction strategies' reads of one sizing text into a
/// single record, or None if the text is beyond saving.
pub fn reconcile(input: &SizingInput, reporter: &dyn Reporter) -> Option<SizeRecord> {
    let text = input.text.as_deref()?;

    // 'post' is the first option, as it checks for the expected reply
    // format. 'precedes' is the fallback iff it extracts more data than
    // 'post'. Specifically the intl convention, which is where the
    // strategies differ in implementation.
    let post = post_match(text);
    let pre = precedes_match(text);

    if post.size != pre.size {
        reporter.record(
            Severity::Error,
            &format!(
                "Expected sizes to match, instead got '{}' and '{}'",
                post.text.as_deref().unwrap_or(""),
                pre.text.as_deref().unwrap_or(""),
            ),
        );
        return None;
    }

    let mut sizing: CandidateFields = post;
    if sizing.intl.is_none() && pre.intl.is_some() {
        reporter.record(
            Severity::Debug,
            "Intl found using precedes_match but not post_match, falling back to precedes_match",
        );
        sizing = pre;
    }

    if sizing.is_empty() {
        reporter.record(
            Severity::Error,
            &format!("Failed to extract any information from '{}'", text),
        );
        return None;
    }

    let size = match sizing
        .size
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|s| s.is_finite())
    {
        Some(size) => size,
        None => {
            // Should not be possible given the patterns the strategies use.
            reporter.record(
                Severity::Error,
                &format!(
                    "Extracted unparsable size '{}'",
                    sizing.size.as_deref().unwrap_or("")
                ),
            );
            return None;
        }
    };

    // Guess the international convention from the size itself, overriding
    // an extracted label that cannot be right.
    if is_eu(size) {
        if let Some(intl) = sizing.intl.as_deref() {
            if intl != "EU" {
                reporter.record(
                    Severity::Error,
                    &format!("Expected 'EU', got '{}' from '{}'", intl, text),
                );
            }
        }
        sizing.intl = Some("EU".to_string());
    } else if sizing.intl.as_deref() == Some("EU") {
        reporter.record(
            Severity::Error,
            &format!("Expected 'US' or 'UK', got 'EU' from '{}'", text),
        );
        return None;
    }

    if sizing.has_gaps() {
        reporter.record(
            Severity::Debug,
            &format!("Encountered one or more missing values from '{}'", text),
        );
    }

    Some(SizeRecord {
        comment_id: input.comment_id.clone(),
        author: input.author.clone(),
        created_utc: input.created_utc,
        last: input.last.clone(),
        text: text.to_string(),
        size,
        intl: sizing.intl.unwrap_or_else(|| DEFAULT_INTL.to_string()),
        width: sizing
            .width
            .map(|w| w.to_uppercase())
            .unwrap_or_else(|| DEFAULT_WIDTH.to_string()),
    })
}

/// Reconcile every reply that carries a sizing text, dropping the ones that
/// fail. Output order is a subsequence of input order.
pub fn process_replies(replies: Vec<SizingInput>, reporter: &dyn Reporter) -> Vec<SizeRecord> {
    replies
        .into_iter()
        .filter(|reply| reply.text.is_some())
        .filter_map(|reply| reconcile(&reply, reporter))
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<(Severity, String)>>);

    impl Reporter for Recorder {
        fn record(&self, severity: Severity, message: &str) {
            self.0.borrow_mut().push((severity, message.to_string()));
        }
    }

    impl Recorder {
        fn errors(&self) -> usize {
            self.0
                .borrow()
                .iter()
                .filter(|(s, _)| *s == Severity::Error)
                .count()
        }
    }

    fn input(text: Option<&str>) -> SizingInput {
        SizingInput {
            comment_id: "c1".to_string(),
            author: "boot_guy".to_string(),
            created_utc: 1546300800.0,
            last: Some("Barrie".to_string()),
            text: text.map(str::to_string),
        }
    }

    #[test]
    fn plain_size_gets_defaults() {
        let recorder = Recorder::default();
        let record = reconcile(&input(Some("9.5")), &recorder).unwrap();
        assert_eq!(record.size, 9.5);
        assert_eq!(record.intl, "US");
        assert_eq!(record.width, "D");
        assert_eq!(record.last.as_deref(), Some("Barrie"));
    }

    #[test]
    fn extracted_width_is_uppercased() {
        let recorder = Recorder::default();
        let record = reconcile(&input(Some("9.5 wide")), &recorder).unwrap();
        assert_eq!(record.width, "WIDE");
    }

    #[test]
    fn size_disagreement_is_fatal() {
        let recorder = Recorder::default();
        assert!(reconcile(&input(Some("9.5, but sized down to 9")), &recorder).is_none());
        assert_eq!(recorder.errors(), 1);
    }

    #[test]
    fn empty_extraction_is_fatal() {
        let recorder = Recorder::default();
        assert!(reconcile(&input(Some("true to size")), &recorder).is_none());
        assert_eq!(recorder.errors(), 1);
    }

    #[test]
    fn eu_inferred_from_large_size() {
        let recorder = Recorder::default();
        let record = reconcile(&input(Some("43")), &recorder).unwrap();
        assert_eq!(record.intl, "EU");
        // Missing label is inferred, not a contradiction.
        assert_eq!(recorder.errors(), 0);
    }

    #[test]
    fn wrong_label_on_large_size_is_corrected() {
        let recorder = Recorder::default();
        let record = reconcile(&input(Some("US 43")), &recorder).unwrap();
        assert_eq!(record.intl, "EU");
        assert_eq!(recorder.errors(), 1);
    }

    #[test]
    fn eu_label_on_small_size_is_fatal() {
        let recorder = Recorder::default();
        assert!(reconcile(&input(Some("EU 9")), &recorder).is_none());
        assert_eq!(recorder.errors(), 1);
    }

    #[test]
    fn fallback_switches_the_whole_record() {
        // post sees the trailing "9.5 D" without a label; precedes sees the
        // leading "US 9.5 Wide". Same size, so the fallback must bring
        // precedes' width along with its intl.
        let recorder = Recorder::default();
        let record = reconcile(&input(Some("US 9.5 Wide 9.5 D")), &recorder).unwrap();
        assert_eq!(record.intl, "US");
        assert_eq!(record.width, "WIDE");
    }

    #[test]
    fn partial_extraction_logs_debug_only() {
        let recorder = Recorder::default();
        let record = reconcile(&input(Some("9.5D")), &recorder).unwrap();
        assert_eq!(record.width, "D");
        assert_eq!(recorder.errors(), 0);
        assert!(!recorder.0.borrow().is_empty());
    }

    #[test]
    fn replies_without_text_are_filtered_first() {
        let recorder = Recorder::default();
        let records = process_replies(vec![input(None), input(Some("9.5D"))], &recorder);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, 9.5);
    }

    #[test]
    fn output_order_follows_input_order() {
        let recorder = Recorder::default();
        let records = process_replies(
            vec![
                input(Some("8D")),
                input(Some("no sizes here")),
                input(Some("10 Narrow")),
            ],
            &recorder,
        );
        let sizes: Vec<f64> = records.iter().map(|r| r.size).collect();
        assert_eq!(sizes, vec![8.0, 10.0]);
    }
}
