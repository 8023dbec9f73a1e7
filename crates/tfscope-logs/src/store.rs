use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use tfscope_types::{LogFileInfo, LogLevel, NormalizedEntry};

use crate::filter::{CompiledQuery, SortOrder};

/// One page of search results
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub content: Vec<NormalizedEntry>,
    /// Matches across all pages
    pub total_hits: usize,
    pub page: usize,
    pub size: usize,
}

/// Thread-safe in-memory store for normalized entries
///
/// Stands in for the persistent search store: assigns ids, answers compiled
/// queries and owns the read/unread flag.
#[derive(Clone)]
pub struct EntryStore {
    /// Internal storage, in insertion order
    entries: Arc<RwLock<Vec<NormalizedEntry>>>,

    /// First upload time per log file id
    uploads: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,

    /// Next entry ID
    next_id: Arc<AtomicU64>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            uploads: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Store a processed batch, returning the assigned ids in order
    pub fn insert_batch(&self, batch: Vec<NormalizedEntry>) -> Vec<u64> {
        let now = Utc::now();
        let mut ids = Vec::with_capacity(batch.len());

        {
            let mut uploads = self.uploads.write();
            for entry in &batch {
                uploads.entry(entry.log_file_id.clone()).or_insert(now);
            }
        }

        let mut entries = self.entries.write();
        entries.reserve(batch.len());
        for mut entry in batch {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            entry.id = Some(id);
            ids.push(id);
            entries.push(entry);
        }

        tracing::debug!(inserted = ids.len(), total = entries.len(), "stored batch");
        ids
    }

    /// Run a compiled query and return the requested page
    pub fn search(&self, query: &CompiledQuery) -> Page {
        let entries = self.entries.read();
        let mut hits: Vec<&NormalizedEntry> = entries.iter().filter(|e| query.matches(e)).collect();

        match query.sort {
            SortOrder::TimestampAscending => hits.sort_by_key(|e| e.timestamp),
        }

        Page {
            total_hits: hits.len(),
            content: hits
                .into_iter()
                .skip(query.offset())
                .take(query.size)
                .cloned()
                .collect(),
            page: query.page,
            size: query.size,
        }
    }

    /// Flag entries as read; returns how many ids were found
    pub fn mark_as_read(&self, ids: &[u64]) -> usize {
        let mut entries = self.entries.write();
        let mut marked = 0;
        for entry in entries.iter_mut() {
            if entry.id.is_some_and(|id| ids.contains(&id)) {
                entry.is_read = true;
                marked += 1;
            }
        }
        marked
    }

    /// Unread entries, optionally limited to one log file
    pub fn unread_count(&self, log_file_id: Option<&str>) -> usize {
        self.entries
            .read()
            .iter()
            .filter(|e| !e.is_read)
            .filter(|e| log_file_id.is_none_or(|id| e.log_file_id == id))
            .count()
    }

    /// All entries sharing a correlation id, ordered by timestamp
    pub fn request_chain(&self, correlation_id: &str) -> Vec<NormalizedEntry> {
        let mut chain: Vec<NormalizedEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.chain_key() == Some(correlation_id))
            .cloned()
            .collect();
        chain.sort_by_key(|e| e.timestamp);
        chain
    }

    pub fn distinct_resource_types(&self) -> Vec<String> {
        self.distinct(|e| e.resource_type.as_deref())
    }

    pub fn distinct_correlation_ids(&self) -> Vec<String> {
        self.distinct(|e| e.chain_key())
    }

    fn distinct<F>(&self, key: F) -> Vec<String>
    where
        F: Fn(&NormalizedEntry) -> Option<&str>,
    {
        let entries = self.entries.read();
        let set: BTreeSet<&str> = entries
            .iter()
            .filter_map(|e| key(e))
            .filter(|v| !v.is_empty())
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// One summary per uploaded log file, oldest upload first
    pub fn log_files(&self) -> Vec<LogFileInfo> {
        let uploads = self.uploads.read();
        let entries = self.entries.read();

        let mut files: Vec<LogFileInfo> = uploads
            .iter()
            .map(|(id, upload_time)| {
                let (entry_count, error_count) = entries
                    .iter()
                    .filter(|e| &e.log_file_id == id)
                    .fold((0, 0), |(total, errors), e| {
                        (total + 1, errors + u64::from(e.level == LogLevel::Error))
                    });
                LogFileInfo {
                    id: id.clone(),
                    upload_time: *upload_time,
                    entry_count,
                    error_count,
                }
            })
            .collect();

        files.sort_by(|a, b| a.upload_time.cmp(&b.upload_time).then_with(|| a.id.cmp(&b.id)));
        files
    }
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new()
    }
}
