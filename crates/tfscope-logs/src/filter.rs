use chrono::{DateTime, Utc};
use serde::Serialize;

use tfscope_types::{LogLevel, NormalizedEntry, SearchFilterSpec, Section};

use crate::error::QueryError;
use crate::timestamp::parse_instant;

/// Page size used when the filter does not name one
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Entry fields a predicate can reference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    LogFileId,
    Message,
    RawMessage,
    ResourceType,
    Level,
    Section,
    CorrelationId,
    Timestamp,
    IsRead,
}

impl Field {
    /// Stored field name
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogFileId => "logFileId",
            Self::Message => "message",
            Self::RawMessage => "rawMessage",
            Self::ResourceType => "resourceType",
            Self::Level => "level",
            Self::Section => "section",
            Self::CorrelationId => "correlationId",
            Self::Timestamp => "timestamp",
            Self::IsRead => "isRead",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Level(LogLevel),
    Section(Section),
    Bool(bool),
}

/// Store-agnostic filter expression
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    MatchAll,
    Eq { field: Field, value: FieldValue },
    /// Case-insensitive substring; `text` is kept lowercased
    Contains { field: Field, text: String },
    /// Inclusive on both ends; either bound may be open
    Range {
        field: Field,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// How a storage collaborator spells predicates in its own query language
pub trait QueryBackend {
    type Query;

    fn match_all(&self) -> Self::Query;
    fn eq(&self, field: Field, value: &FieldValue) -> Self::Query;
    fn contains(&self, field: Field, text: &str) -> Self::Query;
    fn range(
        &self,
        field: Field,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self::Query;
    fn and(&self, clauses: Vec<Self::Query>) -> Self::Query;
    fn or(&self, clauses: Vec<Self::Query>) -> Self::Query;
}

impl Predicate {
    /// Evaluate against an in-memory entry
    pub fn matches(&self, entry: &NormalizedEntry) -> bool {
        match self {
            Self::MatchAll => true,
            Self::Eq { field, value } => field_equals(entry, *field, value),
            Self::Contains { field, text } => text_field(entry, *field)
                .is_some_and(|haystack| haystack.to_lowercase().contains(text.as_str())),
            Self::Range { field, from, to } => {
                if *field != Field::Timestamp {
                    return false;
                }
                from.is_none_or(|from| entry.timestamp >= from)
                    && to.is_none_or(|to| entry.timestamp <= to)
            }
            Self::And(clauses) => clauses.iter().all(|c| c.matches(entry)),
            Self::Or(clauses) => clauses.iter().any(|c| c.matches(entry)),
        }
    }

    /// Translate into a backend's query representation
    pub fn lower<B: QueryBackend>(&self, backend: &B) -> B::Query {
        match self {
            Self::MatchAll => backend.match_all(),
            Self::Eq { field, value } => backend.eq(*field, value),
            Self::Contains { field, text } => backend.contains(*field, text),
            Self::Range { field, from, to } => backend.range(*field, *from, *to),
            Self::And(clauses) => backend.and(clauses.iter().map(|c| c.lower(backend)).collect()),
            Self::Or(clauses) => backend.or(clauses.iter().map(|c| c.lower(backend)).collect()),
        }
    }
}

fn text_field(entry: &NormalizedEntry, field: Field) -> Option<&str> {
    match field {
        Field::LogFileId => Some(entry.log_file_id.as_str()),
        Field::Message => Some(entry.message.as_str()),
        Field::RawMessage => Some(entry.raw_message.as_str()),
        Field::ResourceType => entry.resource_type.as_deref(),
        Field::CorrelationId => entry.correlation_id.as_deref(),
        Field::Level | Field::Section | Field::Timestamp | Field::IsRead => None,
    }
}

fn field_equals(entry: &NormalizedEntry, field: Field, value: &FieldValue) -> bool {
    match (field, value) {
        (Field::Level, FieldValue::Level(level)) => entry.level == *level,
        (Field::Section, FieldValue::Section(section)) => entry.section == *section,
        (Field::IsRead, FieldValue::Bool(flag)) => entry.is_read == *flag,
        (_, FieldValue::Text(text)) => text_field(entry, field) == Some(text.as_str()),
        _ => false,
    }
}

/// Result ordering requested from the store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    #[default]
    TimestampAscending,
}

/// A predicate plus the pagination that travels alongside it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledQuery {
    pub predicate: Predicate,
    /// 0-based page index
    pub page: usize,
    pub size: usize,
    pub sort: SortOrder,
}

impl CompiledQuery {
    pub fn matches(&self, entry: &NormalizedEntry) -> bool {
        self.predicate.matches(entry)
    }

    /// Offset of the first entry of the requested page
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}

/// Translate a filter spec into an AND of one predicate per non-empty field
pub fn compile_filter(spec: &SearchFilterSpec) -> CompiledQuery {
    let mut clauses = Vec::new();

    if let Some(id) = non_empty(&spec.log_file_id) {
        clauses.push(text_eq(Field::LogFileId, id));
    }

    if let Some(text) = non_empty(&spec.free_text) {
        let text = text.to_lowercase();
        clauses.push(Predicate::Or(vec![
            Predicate::Contains {
                field: Field::Message,
                text: text.clone(),
            },
            Predicate::Contains {
                field: Field::RawMessage,
                text,
            },
        ]));
    }

    if let Some(resource_type) = non_empty(&spec.resource_type) {
        clauses.push(text_eq(Field::ResourceType, resource_type));
    }

    if let Some(level) = &spec.level {
        clauses.push(Predicate::Eq {
            field: Field::Level,
            value: FieldValue::Level(level.clone()),
        });
    }

    if let Some(section) = spec.section {
        clauses.push(Predicate::Eq {
            field: Field::Section,
            value: FieldValue::Section(section),
        });
    }

    if let Some(id) = non_empty(&spec.correlation_id) {
        clauses.push(text_eq(Field::CorrelationId, id));
    }

    if spec.timestamp_from.is_some() || spec.timestamp_to.is_some() {
        clauses.push(Predicate::Range {
            field: Field::Timestamp,
            from: spec.timestamp_from,
            to: spec.timestamp_to,
        });
    }

    if spec.only_unread == Some(true) {
        clauses.push(Predicate::Eq {
            field: Field::IsRead,
            value: FieldValue::Bool(false),
        });
    }

    let predicate = if clauses.is_empty() {
        Predicate::MatchAll
    } else {
        Predicate::And(clauses)
    };

    CompiledQuery {
        predicate,
        page: spec.page.unwrap_or(0),
        size: spec.size.unwrap_or(DEFAULT_PAGE_SIZE),
        sort: SortOrder::TimestampAscending,
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn text_eq(field: Field, value: &str) -> Predicate {
    Predicate::Eq {
        field,
        value: FieldValue::Text(value.to_string()),
    }
}

/// Parse a section name given on the command line
pub fn parse_section_arg(arg: &str) -> Result<Section, QueryError> {
    Section::parse(arg).ok_or_else(|| QueryError::UnknownSection(arg.to_string()))
}

/// Parse a timestamp bound given on the command line
pub fn parse_timestamp_arg(arg: &str) -> Result<DateTime<Utc>, QueryError> {
    parse_instant(arg).ok_or_else(|| QueryError::InvalidTimestamp(arg.to_string()))
}
