//! Correlation of request/response chains and per-entry metadata
//!
//! Runs in two explicit passes: group entries by correlation id and reduce
//! each chain to a summary, then scatter the summaries back onto every member.
//! Re-running over its own output yields the same fields.

use std::collections::HashMap;

use tfscope_types::{ChainStatus, LogLevel, NormalizedEntry, OperationType};

/// `(lowercase substring, case-sensitive capitalized substring, operation)`,
/// checked in order
const OPERATION_RULES: [(&str, &str, OperationType); 4] = [
    ("creating", "Create", OperationType::Create),
    ("updating", "Update", OperationType::Update),
    ("destroying", "Destroy", OperationType::Delete),
    ("reading", "Read", OperationType::Read),
];

const COMPUTE_BONUS: u32 = 2;
const FAILURE_BONUS: u32 = 3;

/// Reduced view of one chain
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainSummary {
    /// Only for chains of two or more entries
    pub duration_ms: Option<i64>,
    pub status: ChainStatus,
}

/// Enrich a batch, returning it in the same order
pub fn enrich(mut entries: Vec<NormalizedEntry>) -> Vec<NormalizedEntry> {
    enrich_in_place(&mut entries);
    entries
}

/// Chain fields go to correlated entries only, the operation type to entries
/// with a resource type, and the severity score to every entry.
pub fn enrich_in_place(entries: &mut [NormalizedEntry]) {
    // pass 1: group + reduce
    let summaries: Vec<(Vec<usize>, ChainSummary)> = group_chains(entries)
        .into_values()
        .map(|mut members| {
            let summary = summarize(entries, &mut members);
            (members, summary)
        })
        .collect();

    // pass 2: scatter
    for entry in entries.iter_mut() {
        entry.duration_ms = None;
        entry.status = None;
        entry.operation_type = entry
            .resource_type
            .as_ref()
            .map(|_| infer_operation(&entry.message));
        entry.severity_score = Some(severity_score(entry));
    }
    for (members, summary) in &summaries {
        for &idx in members {
            entries[idx].duration_ms = summary.duration_ms;
            entries[idx].status = Some(summary.status);
        }
    }

    tracing::debug!(
        entries = entries.len(),
        chains = summaries.len(),
        "enriched batch"
    );
}

/// Indices of entries per non-empty correlation id, in input order
fn group_chains(entries: &[NormalizedEntry]) -> HashMap<&str, Vec<usize>> {
    let mut chains: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        if let Some(key) = entry.chain_key() {
            chains.entry(key).or_default().push(idx);
        }
    }
    chains
}

/// Order `members` by timestamp (stable) and reduce them
fn summarize(entries: &[NormalizedEntry], members: &mut [usize]) -> ChainSummary {
    members.sort_by_key(|&idx| entries[idx].timestamp);

    let duration_ms = match (members.first(), members.last()) {
        (Some(&first), Some(&last)) if members.len() >= 2 => {
            Some((entries[last].timestamp - entries[first].timestamp).num_milliseconds())
        }
        _ => None,
    };

    let has_level = |level: LogLevel| members.iter().any(|&idx| entries[idx].level == level);
    let status = if has_level(LogLevel::Error) {
        ChainStatus::Failed
    } else if has_level(LogLevel::Warn) {
        ChainStatus::Warning
    } else {
        ChainStatus::Success
    };

    ChainSummary {
        duration_ms,
        status,
    }
}

/// Infer the resource operation a message describes.
///
/// Lowercase forms match case-insensitively, capitalized forms only literally.
pub fn infer_operation(message: &str) -> OperationType {
    let lower = message.to_lowercase();
    OPERATION_RULES
        .iter()
        .find(|(word, capitalized, _)| lower.contains(word) || message.contains(capitalized))
        .map(|(_, _, op)| *op)
        .unwrap_or(OperationType::Unknown)
}

/// Level base points plus context bonuses; no upper bound
pub fn severity_score(entry: &NormalizedEntry) -> u32 {
    let base = match entry.level {
        LogLevel::Error => 10,
        LogLevel::Warn => 5,
        LogLevel::Info => 1,
        LogLevel::Debug | LogLevel::Other(_) => 0,
    };

    let compute = entry
        .resource_type
        .as_deref()
        .is_some_and(|rt| rt.contains("compute"));

    let lower = entry.message.to_lowercase();
    let failure = lower.contains("failed") || lower.contains("error");

    base + if compute { COMPUTE_BONUS } else { 0 } + if failure { FAILURE_BONUS } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn base() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn entry(msg: &str, req: Option<&str>, offset_ms: i64, level: LogLevel) -> NormalizedEntry {
        let mut e = NormalizedEntry::new(
            "f".into(),
            1,
            msg.into(),
            base() + Duration::milliseconds(offset_ms),
        );
        e.correlation_id = req.map(str::to_string);
        e.level = level;
        e
    }

    #[test]
    fn test_duration_written_to_every_member() {
        let out = enrich(vec![
            entry("response", Some("r1"), 1500, LogLevel::Info),
            entry("unrelated", None, 0, LogLevel::Info),
            entry("request", Some("r1"), 0, LogLevel::Info),
            entry("mid", Some("r1"), 700, LogLevel::Info),
        ]);

        assert_eq!(out[0].duration_ms, Some(1500));
        assert_eq!(out[2].duration_ms, Some(1500));
        assert_eq!(out[3].duration_ms, Some(1500));
        assert_eq!(out[1].duration_ms, None);
        assert_eq!(out[1].status, None);
        // order is never changed
        assert_eq!(out[1].message, "unrelated");
    }

    #[test]
    fn test_single_member_chain_has_no_duration() {
        let out = enrich(vec![entry("alone", Some("solo"), 0, LogLevel::Warn)]);
        assert_eq!(out[0].duration_ms, None);
        assert_eq!(out[0].status, Some(ChainStatus::Warning));
    }

    #[test]
    fn test_status_precedence() {
        let out = enrich(vec![
            entry("a", Some("x"), 0, LogLevel::Warn),
            entry("b", Some("x"), 1, LogLevel::Error),
            entry("c", Some("y"), 0, LogLevel::Info),
            entry("d", Some("y"), 5, LogLevel::Other("TRACE".into())),
        ]);
        assert_eq!(out[0].status, Some(ChainStatus::Failed));
        assert_eq!(out[1].status, Some(ChainStatus::Failed));
        assert_eq!(out[2].status, Some(ChainStatus::Success));
        assert_eq!(out[3].status, Some(ChainStatus::Success));
    }

    #[test]
    fn test_empty_correlation_id_is_ungrouped() {
        let out = enrich(vec![
            entry("a", Some(""), 0, LogLevel::Info),
            entry("b", Some(""), 10, LogLevel::Info),
        ]);
        assert!(out.iter().all(|e| e.duration_ms.is_none() && e.status.is_none()));
    }

    #[test]
    fn test_operation_casing_asymmetry() {
        assert_eq!(infer_operation("aws_instance.web: Creating..."), OperationType::Create);
        assert_eq!(infer_operation("CreateResource"), OperationType::Create);
        assert_eq!(infer_operation("UPDATING things"), OperationType::Update);
        // capitalized forms are literal: no lowercase "destroy" rule
        assert_eq!(infer_operation("destroy requested"), OperationType::Unknown);
        assert_eq!(infer_operation("Destroy requested"), OperationType::Delete);
        assert_eq!(infer_operation("ReadResource"), OperationType::Read);
        assert_eq!(infer_operation("nothing to see"), OperationType::Unknown);
    }

    #[test]
    fn test_operation_only_for_resource_entries() {
        let mut resource = entry("aws_instance.web: Creating...", None, 0, LogLevel::Info);
        resource.resource_type = Some("aws_instance".into());
        let out = enrich(vec![
            resource,
            entry("plain line", None, 0, LogLevel::Info),
            entry("Creating without a resource", Some("r"), 0, LogLevel::Info),
        ]);

        assert_eq!(out[0].operation_type, Some(OperationType::Create));
        assert_eq!(out[1].operation_type, None);
        assert_eq!(out[2].operation_type, None);
        assert!(out.iter().all(|e| e.severity_score.is_some()));
    }

    #[test]
    fn test_severity_score() {
        assert_eq!(severity_score(&entry("all good", None, 0, LogLevel::Info)), 1);
        assert_eq!(
            severity_score(&entry("Apply failed", None, 0, LogLevel::Error)),
            13
        );

        let mut compute = entry("slow Error", None, 0, LogLevel::Warn);
        compute.resource_type = Some("yandex_compute_instance".into());
        assert_eq!(severity_score(&compute), 10);

        assert_eq!(
            severity_score(&entry("x", None, 0, LogLevel::Other("TRACE".into()))),
            0
        );
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let once = enrich(vec![
            entry("Creating", Some("r"), 0, LogLevel::Info),
            entry("done", Some("r"), 20, LogLevel::Warn),
            entry("loose", None, 5, LogLevel::Debug),
        ]);
        let twice = enrich(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_equal_timestamps_keep_order() {
        let out = enrich(vec![
            entry("first", Some("t"), 0, LogLevel::Info),
            entry("second", Some("t"), 0, LogLevel::Info),
        ]);
        assert_eq!(out[0].duration_ms, Some(0));
        assert_eq!(out[1].duration_ms, Some(0));
    }
}
