use crate::enricher::enrich_in_place;
use crate::parser::{LineParser, ParseOutcome, ParserOptions};

/// Parse then enrich, one batch at a time
#[derive(Clone, Debug, Default)]
pub struct LogPipeline {
    parser: LineParser,
}

impl LogPipeline {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            parser: LineParser::new(options),
        }
    }

    /// Normalize and correlate a batch.
    ///
    /// Each call gets a fresh parse context, so batches can run concurrently.
    pub fn process<S: AsRef<str>>(&self, lines: &[S], log_file_id: &str) -> ParseOutcome {
        let mut outcome = self.parser.parse(lines, log_file_id);
        enrich_in_place(&mut outcome.entries);

        tracing::info!(
            log_file_id,
            entries = outcome.entries.len(),
            errors = outcome.errors.len(),
            "processed batch"
        );

        outcome
    }
}
