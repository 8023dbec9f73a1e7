use serde::Serialize;
use std::collections::HashSet;

use tfscope_types::{LogLevel, NormalizedEntry, Section};

/// Counts over one processed batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total_entries: usize,
    pub plan_section_entries: usize,
    pub apply_section_entries: usize,
    pub error_entries: usize,
    pub warn_entries: usize,
    pub parse_errors: usize,
    pub correlated_chains: usize,
}

impl BatchStats {
    pub fn from_entries(entries: &[NormalizedEntry]) -> Self {
        let mut stats = Self {
            total_entries: entries.len(),
            ..Self::default()
        };
        let mut chains = HashSet::new();

        for entry in entries {
            match entry.section {
                Section::Plan => stats.plan_section_entries += 1,
                Section::Apply => stats.apply_section_entries += 1,
                Section::Other => {}
            }
            match entry.level {
                LogLevel::Error => stats.error_entries += 1,
                LogLevel::Warn => stats.warn_entries += 1,
                _ => {}
            }
            if entry.parsing_error {
                stats.parse_errors += 1;
            }
            if let Some(key) = entry.chain_key() {
                chains.insert(key);
            }
        }

        stats.correlated_chains = chains.len();
        stats
    }
}
