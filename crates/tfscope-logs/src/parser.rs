use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tfscope_types::{LogLevel, NormalizedEntry, ParseError, Section};

use crate::error::LineError;
use crate::level::{classify_level, strip_level_prefix};
use crate::section::SectionTracker;
use crate::structured::{StructuredRecord, extract_structured};
use crate::timestamp::extract_timestamp;

/// Prefix of the message of an entry whose line could not be normalized
pub const PARSING_ERROR_MARKER: &str = "PARSING ERROR: ";

/// Tunables for line parsing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserOptions {
    /// Lines longer than this are flagged as parsing errors
    pub max_line_bytes: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_line_bytes: 1024 * 1024,
        }
    }
}

/// State carried from line to line within one batch.
///
/// Never share a context between batches: section and timestamp carry-over
/// would leak from one into the other.
#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    sections: SectionTracker,
    last_timestamp: Option<DateTime<Utc>>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn fallback_timestamp(&self) -> DateTime<Utc> {
        self.last_timestamp.unwrap_or_else(Utc::now)
    }
}

/// Entries and per-line failures for one batch
#[derive(Clone, Debug, Default, Serialize)]
pub struct ParseOutcome {
    /// Exactly one entry per input line, in input order
    pub entries: Vec<NormalizedEntry>,
    pub errors: Vec<ParseError>,
}

/// Converts raw lines into normalized entries
#[derive(Clone, Debug, Default)]
pub struct LineParser {
    options: ParserOptions,
}

impl LineParser {
    pub fn new(options: ParserOptions) -> Self {
        Self { options }
    }

    /// Parse a whole batch. Never fails; lines that cannot be normalized
    /// become error-flagged entries and are also listed in `errors`.
    pub fn parse<S: AsRef<str>>(&self, lines: &[S], log_file_id: &str) -> ParseOutcome {
        let mut ctx = ParseContext::new();
        let mut outcome = ParseOutcome {
            entries: Vec::with_capacity(lines.len()),
            errors: Vec::new(),
        };

        tracing::debug!(log_file_id, lines = lines.len(), "parsing batch");

        for (idx, raw) in lines.iter().enumerate() {
            let raw = raw.as_ref();
            let line_number = idx + 1;

            match self.parse_line(&mut ctx, raw, line_number, log_file_id) {
                Ok(entry) => outcome.entries.push(entry),
                Err(err) => {
                    tracing::warn!(log_file_id, line_number, error = %err, "line could not be normalized");
                    let (entry, error) = error_entry(&ctx, raw, line_number, log_file_id, &err);
                    outcome.entries.push(entry);
                    outcome.errors.push(error);
                }
            }
        }

        outcome
    }

    /// Parse one line against the batch context.
    ///
    /// The context is only updated when the line succeeds.
    pub fn parse_line(
        &self,
        ctx: &mut ParseContext,
        raw: &str,
        line_number: usize,
        log_file_id: &str,
    ) -> Result<NormalizedEntry, LineError> {
        if raw.len() > self.options.max_line_bytes {
            return Err(LineError::LineTooLong {
                len: raw.len(),
                max: self.options.max_line_bytes,
            });
        }

        let structured = extract_structured(raw)?;
        let clean = match &structured {
            Some(record) => format!("{}{}", &raw[..record.span.start], &raw[record.span.end..]),
            None => raw.to_string(),
        };
        let clean = clean.trim();
        let payload_message = structured
            .as_ref()
            .and_then(|r| r.message.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty());

        // whole-line JSON records carry their text in the payload
        let text = match payload_message {
            Some(m) if clean.is_empty() => m,
            _ => clean,
        };

        let found = extract_timestamp(text, ctx.last_timestamp)?;
        let explicit = structured
            .as_ref()
            .and_then(|r| r.timestamp)
            .or(found.as_ref().map(|m| m.instant));
        let timestamp = explicit.unwrap_or_else(|| ctx.fallback_timestamp());

        let level = structured
            .as_ref()
            .and_then(|r| r.level.clone())
            .unwrap_or_else(|| classify_level(text));

        let mut message = match &found {
            Some(m) => build_message(&format!("{}{}", &text[..m.span.start], &text[m.span.end..]), &level),
            None => build_message(text, &level),
        };

        // only a timestamp and level precede the payload
        let mut marker_text = text;
        if message.is_empty() {
            if let Some(m) = payload_message {
                message = m.to_string();
                marker_text = m;
            }
        }

        let mut sections = ctx.sections.clone();
        let section = sections.advance(marker_text)?;

        ctx.sections = sections;
        if explicit.is_some() {
            ctx.last_timestamp = explicit;
        }

        let mut entry =
            NormalizedEntry::new(log_file_id.to_string(), line_number, raw.to_string(), timestamp);
        entry.level = level;
        entry.section = section;
        entry.message = message;
        if let Some(record) = structured {
            apply_record(&mut entry, record);
        }

        Ok(entry)
    }
}

fn build_message(text: &str, level: &LogLevel) -> String {
    strip_level_prefix(text.trim(), level).trim().to_string()
}

fn apply_record(entry: &mut NormalizedEntry, record: StructuredRecord) {
    entry.has_structured_payload = true;
    entry.structured_payload = Some(record.payload);
    entry.resource_type = record.resource_type;
    entry.correlation_id = record.correlation_id;
    entry.exchange_role = record.exchange_role;
    entry.module = record.module;
    entry.provider_addr = record.provider_addr;
}

/// Best-effort entry for a line that failed: ERROR, section "other", and the
/// batch's last known timestamp.
fn error_entry(
    ctx: &ParseContext,
    raw: &str,
    line_number: usize,
    log_file_id: &str,
    err: &LineError,
) -> (NormalizedEntry, ParseError) {
    let mut entry = NormalizedEntry::new(
        log_file_id.to_string(),
        line_number,
        raw.to_string(),
        ctx.fallback_timestamp(),
    );
    entry.level = LogLevel::Error;
    entry.section = Section::Other;
    entry.message = format!("{PARSING_ERROR_MARKER}{raw}");
    entry.parsing_error = true;
    entry.parsing_error_message = Some(err.to_string());

    let error = ParseError {
        line_number,
        raw_line: raw.to_string(),
        message: err.to_string(),
    };

    (entry, error)
}
