//! Terraform log processing for tfscope
//!
//! Normalizes raw provisioning log lines into entries, correlates
//! request/response chains and compiles search filters into queries.

mod enricher;
mod error;
mod filter;
mod level;
mod parser;
mod patterns;
mod pipeline;
mod section;
mod stats;
mod store;
mod structured;
mod timestamp;

pub use enricher::{ChainSummary, enrich, enrich_in_place, infer_operation, severity_score};
pub use error::{LineError, QueryError};
pub use filter::{
    CompiledQuery, DEFAULT_PAGE_SIZE, Field, FieldValue, Predicate, QueryBackend, SortOrder,
    compile_filter, parse_section_arg, parse_timestamp_arg,
};
pub use level::{classify_level, strip_level_prefix};
pub use parser::{LineParser, PARSING_ERROR_MARKER, ParseContext, ParseOutcome, ParserOptions};
pub use patterns::{PatternError, PatternSet};
pub use pipeline::LogPipeline;
pub use section::SectionTracker;
pub use stats::BatchStats;
pub use store::{EntryStore, Page};
pub use structured::{StructuredRecord, extract_structured};
pub use timestamp::{TimestampMatch, extract_timestamp, parse_instant};

// Re-export types used in our public API
pub use tfscope_types::{
    ChainStatus, ExchangeRole, LogFileInfo, LogLevel, NormalizedEntry, OperationType, ParseError,
    SearchFilterSpec, Section,
};

/// Parse a batch with default options, without enrichment
pub fn parse<S: AsRef<str>>(lines: &[S], log_file_id: &str) -> ParseOutcome {
    LineParser::default().parse(lines, log_file_id)
}
