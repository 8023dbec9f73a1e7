//! Property tests for batch-level guarantees.

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use tfscope_logs::{
    ChainStatus, LogLevel, NormalizedEntry, SearchFilterSpec, compile_filter, enrich, parse,
};

fn level_strategy() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Error),
        Just(LogLevel::Warn),
        Just(LogLevel::Info),
        Just(LogLevel::Debug),
    ]
}

fn base() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z")
        .expect("valid rfc3339")
        .with_timezone(&Utc)
}

fn chain(members: &[(i64, LogLevel)], req: &str) -> Vec<NormalizedEntry> {
    members
        .iter()
        .enumerate()
        .map(|(idx, (offset, level))| {
            let mut entry = NormalizedEntry::new(
                "p".into(),
                idx + 1,
                format!("member {idx}"),
                base() + Duration::milliseconds(*offset),
            );
            entry.level = level.clone();
            entry.correlation_id = Some(req.to_string());
            entry
        })
        .collect()
}

proptest! {
    #[test]
    fn parse_maps_lines_one_to_one(lines in proptest::collection::vec("[ -~]{0,120}", 0..40)) {
        let outcome = parse(&lines, "prop");
        prop_assert_eq!(outcome.entries.len(), lines.len());
        for (idx, (entry, raw)) in outcome.entries.iter().zip(&lines).enumerate() {
            prop_assert_eq!(entry.line_number, idx + 1);
            prop_assert_eq!(&entry.raw_message, raw);
        }
    }

    #[test]
    fn enrich_is_idempotent(lines in proptest::collection::vec(
        prop_oneof![
            "[ -~]{0,60}",
            "2024-01-15 10:3[0-5]:[0-5][0-9] \\{\"tf_req_id\":\"r[0-3]\"\\}",
            "2024-01-15 10:3[0-5]:[0-5][0-9] \\[(ERROR|WARN|INFO)\\] Creating \\{\"tf_req_id\":\"r[0-3]\"\\}",
        ],
        0..30,
    )) {
        let once = enrich(parse(&lines, "prop").entries);
        let twice = enrich(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn chain_duration_spans_min_to_max(
        members in proptest::collection::vec((0i64..100_000, level_strategy()), 2..12)
    ) {
        let out = enrich(chain(&members, "req"));

        let min = members.iter().map(|(o, _)| *o).min().unwrap_or_default();
        let max = members.iter().map(|(o, _)| *o).max().unwrap_or_default();
        for entry in &out {
            prop_assert_eq!(entry.duration_ms, Some(max - min));
        }
    }

    #[test]
    fn any_error_member_fails_the_chain(
        mut members in proptest::collection::vec((0i64..10_000, level_strategy()), 1..10),
        pick in any::<prop::sample::Index>(),
    ) {
        let idx = pick.index(members.len());
        members[idx].1 = LogLevel::Error;

        let out = enrich(chain(&members, "req"));
        prop_assert!(out.iter().all(|e| e.status == Some(ChainStatus::Failed)));
    }

    #[test]
    fn only_unread_never_returns_read_entries(flags in proptest::collection::vec(any::<bool>(), 0..30)) {
        let query = compile_filter(&SearchFilterSpec {
            only_unread: Some(true),
            ..Default::default()
        });
        let match_all = compile_filter(&SearchFilterSpec::default());

        for (idx, read) in flags.iter().enumerate() {
            let mut entry = NormalizedEntry::new("p".into(), idx + 1, String::new(), base());
            entry.is_read = *read;
            prop_assert_eq!(query.matches(&entry), !read);
            prop_assert!(match_all.matches(&entry));
        }
    }
}
