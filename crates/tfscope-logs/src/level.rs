use tfscope_types::LogLevel;

/// Keyword table in priority order; the first level with any keyword present wins
fn keyword_table() -> [(LogLevel, &'static [&'static str]); 4] {
    [
        (LogLevel::Error, &["error", "failed", "failure", "exception"]),
        (LogLevel::Warn, &["warn", "warning", "deprecated"]),
        (LogLevel::Info, &["info", "applying", "creating", "destroying"]),
        (LogLevel::Debug, &["debug", "trace", "verbose"]),
    ]
}

/// Classify a line by keyword heuristics, defaulting to INFO
pub fn classify_level(text: &str) -> LogLevel {
    let lower = text.to_lowercase();

    keyword_table()
        .into_iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
        .map(|(level, _)| level)
        .unwrap_or_default()
}

/// Strip a leading level label (`INFO`, `[INFO]`, `INFO:`) from a message
pub fn strip_level_prefix<'a>(message: &'a str, level: &LogLevel) -> &'a str {
    let label = level.as_str();
    let trimmed = message.trim_start();
    let label_len = label.len();

    let candidates = [format!("[{label}]"), format!("{label}:"), label.to_string()];
    for candidate in candidates {
        let len = candidate.len();
        if trimmed
            .get(..len)
            .is_some_and(|head| head.eq_ignore_ascii_case(&candidate))
        {
            // bare label must end at a word boundary
            if len == label_len
                && trimmed[len..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphanumeric())
            {
                continue;
            }
            return trimmed[len..].trim_start();
        }
    }

    message
}
