//! Shared types for tfscope
//!
//! This crate contains the normalized log entry and the small vocabularies
//! (level, section, exchange role, chain status, operation type) shared by the
//! pipeline, the reference store and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Vocabularies
// ============================================================================

/// Log severity level
///
/// Text heuristics only ever produce the four canonical levels. A level taken
/// from a structured payload is kept as-is (uppercased), so it may be any
/// label, e.g. `TRACE`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Other(String),
}

impl LogLevel {
    /// Build a level from a free-form label; the label is uppercased first
    pub fn from_label(label: &str) -> Self {
        let upper = label.trim().to_uppercase();
        match upper.as_str() {
            "ERROR" => Self::Error,
            "WARN" => Self::Warn,
            "INFO" => Self::Info,
            "DEBUG" => Self::Debug,
            _ => Self::Other(upper),
        }
    }

    /// Uppercase label
    pub fn as_str(&self) -> &str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for LogLevel {
    fn from(label: String) -> Self {
        Self::from_label(&label)
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

/// Coarse phase of a provisioning run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Plan,
    Apply,
    #[default]
    Other,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::Other => "other",
        }
    }

    /// Parse a section name, case-insensitive
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "plan" => Some(Self::Plan),
            "apply" => Some(Self::Apply),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of an RPC exchange a structured line describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeRole {
    Request,
    Response,
}

/// Outcome of a correlated request chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Success,
    Warning,
    Failed,
}

impl ChainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failed => "failed",
        }
    }
}

/// Resource operation inferred from a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Delete,
    Read,
    Unknown,
}

// ============================================================================
// Entries
// ============================================================================

/// A single normalized log entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEntry {
    /// Assigned by the store, never by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    /// Caller-supplied key of the batch this entry came from
    pub log_file_id: String,

    /// 1-based position in the source batch
    pub line_number: usize,

    pub timestamp: DateTime<Utc>,

    pub level: LogLevel,

    pub section: Section,

    /// Original raw line
    pub raw_message: String,

    /// Line with timestamp and level prefix stripped
    pub message: String,

    pub has_structured_payload: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_payload: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_role: Option<ExchangeRole>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_addr: Option<String>,

    #[serde(default)]
    pub parsing_error: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsing_error_message: Option<String>,

    // Filled in by the correlation enricher
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ChainStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<OperationType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_score: Option<u32>,

    /// Only changed by an explicit "mark as read"
    #[serde(default)]
    pub is_read: bool,
}

impl NormalizedEntry {
    /// Create a new entry with minimal fields
    pub fn new(
        log_file_id: String,
        line_number: usize,
        raw_message: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            log_file_id,
            line_number,
            timestamp,
            level: LogLevel::Info,
            section: Section::Other,
            message: raw_message.clone(),
            raw_message,
            has_structured_payload: false,
            structured_payload: None,
            resource_type: None,
            correlation_id: None,
            exchange_role: None,
            module: None,
            provider_addr: None,
            parsing_error: false,
            parsing_error_message: None,
            duration_ms: None,
            status: None,
            operation_type: None,
            severity_score: None,
            is_read: false,
        }
    }

    /// Correlation id, if present and non-empty
    pub fn chain_key(&self) -> Option<&str> {
        self.correlation_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// A line that could not be normalized
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseError {
    pub line_number: usize,
    pub raw_line: String,
    pub message: String,
}

// ============================================================================
// Queries
// ============================================================================

/// Structured search request; every field is optional
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilterSpec {
    pub log_file_id: Option<String>,
    pub free_text: Option<String>,
    pub resource_type: Option<String>,
    pub level: Option<LogLevel>,
    pub section: Option<Section>,
    pub correlation_id: Option<String>,
    pub timestamp_from: Option<DateTime<Utc>>,
    pub timestamp_to: Option<DateTime<Utc>>,
    pub only_unread: Option<bool>,
    pub page: Option<usize>,
    pub size: Option<usize>,
}

/// Summary of one uploaded batch as seen by the store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFileInfo {
    pub id: String,
    pub upload_time: DateTime<Utc>,
    pub entry_count: u64,
    pub error_count: u64,
}
