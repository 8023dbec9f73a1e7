//! Reading log files and running them through the pipeline.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use tfscope_logs::{BatchStats, EntryStore, LogPipeline, ParseOutcome};

/// One processed file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedFile {
    pub log_file_id: String,
    pub stats: BatchStats,
    #[serde(flatten)]
    pub outcome: ParseOutcome,
}

/// Identifier of a batch read from `path`: its file name
pub fn log_file_id(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read and process every file, each batch on its own blocking task.
///
/// Results come back in argument order.
pub async fn process_files(pipeline: &LogPipeline, paths: &[PathBuf]) -> Result<Vec<ProcessedFile>> {
    let mut handles = Vec::with_capacity(paths.len());

    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read log file {}", path.display()))?;
        let id = log_file_id(path);
        let pipeline = pipeline.clone();

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "read log file");

        handles.push(tokio::task::spawn_blocking(move || {
            let text = decode_lossy(&bytes, &id);
            let lines: Vec<&str> = text.lines().collect();
            let outcome = pipeline.process(&lines, &id);
            ProcessedFile {
                stats: BatchStats::from_entries(&outcome.entries),
                log_file_id: id,
                outcome,
            }
        }));
    }

    let mut processed = Vec::with_capacity(handles.len());
    for handle in handles {
        processed.push(handle.await.context("Log processing task failed")?);
    }
    Ok(processed)
}

/// Decode file contents, replacing invalid UTF-8 with U+FFFD so every line
/// still becomes an entry
fn decode_lossy<'a>(bytes: &'a [u8], log_file_id: &str) -> Cow<'a, str> {
    let text = String::from_utf8_lossy(bytes);
    if let Cow::Owned(_) = text {
        tracing::warn!(log_file_id, "log file contains invalid UTF-8, bytes replaced");
    }
    text
}

/// Process the files and load all entries into a fresh store
pub async fn load_store(pipeline: &LogPipeline, paths: &[PathBuf]) -> Result<EntryStore> {
    let store = EntryStore::new();
    for file in process_files(pipeline, paths).await? {
        store.insert_batch(file.outcome.entries);
    }
    Ok(store)
}
