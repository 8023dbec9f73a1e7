//! Lazily compiled, named regex tables

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PatternError {
    #[error("pattern '{name}' failed to compile: {source}")]
    CompilationFailed {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern index out of bounds: {index} >= {max}")]
    IndexOutOfBounds { index: usize, max: usize },

    #[error("pattern not found: {name}")]
    NotFound { name: String },
}

/// A static list of `(name, pattern)` pairs compiled on first use
///
/// Compilation happens once for the whole process; a failure is remembered and
/// returned to every caller.
pub struct PatternSet {
    patterns: &'static [(&'static str, &'static str)],
    compiled: OnceLock<Result<Vec<Regex>, PatternError>>,
}

impl PatternSet {
    pub const fn new(patterns: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            patterns,
            compiled: OnceLock::new(),
        }
    }

    fn compiled(&self) -> Result<&[Regex], PatternError> {
        let compiled = self.compiled.get_or_init(|| {
            self.patterns
                .iter()
                .map(|(name, pattern)| {
                    Regex::new(pattern).map_err(|source| PatternError::CompilationFailed {
                        name: name.to_string(),
                        source,
                    })
                })
                .collect()
        });

        match compiled {
            Ok(regexes) => Ok(regexes.as_slice()),
            Err(e) => Err(e.clone()),
        }
    }

    pub fn get(&self, index: usize) -> Result<&Regex, PatternError> {
        let regexes = self.compiled()?;
        regexes.get(index).ok_or(PatternError::IndexOutOfBounds {
            index,
            max: regexes.len(),
        })
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Regex, PatternError> {
        let index = self
            .patterns
            .iter()
            .position(|(pattern_name, _)| *pattern_name == name)
            .ok_or_else(|| PatternError::NotFound {
                name: name.to_string(),
            })?;

        self.get(index)
    }

    /// All compiled patterns in declaration order, paired with their names
    pub fn iter(&self) -> Result<impl Iterator<Item = (&'static str, &Regex)>, PatternError> {
        let regexes = self.compiled()?;
        Ok(self.patterns.iter().map(|(name, _)| *name).zip(regexes.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static GOOD: PatternSet = PatternSet::new(&[("digits", r"\d+"), ("word", r"[a-z]+")]);
    static BAD: PatternSet = PatternSet::new(&[("broken", r"[unclosed")]);

    #[test]
    fn test_lookup_by_name_and_index() {
        assert!(GOOD.get_by_name("word").unwrap().is_match("abc"));
        assert!(GOOD.get(0).unwrap().is_match("42"));
        assert_eq!(GOOD.iter().unwrap().count(), 2);
    }

    #[test]
    fn test_missing_pattern() {
        assert!(matches!(
            GOOD.get_by_name("nope"),
            Err(PatternError::NotFound { .. })
        ));
        assert!(matches!(
            GOOD.get(5),
            Err(PatternError::IndexOutOfBounds { index: 5, max: 2 })
        ));
    }

    #[test]
    fn test_compile_failure_is_sticky() {
        assert!(matches!(
            BAD.get(0),
            Err(PatternError::CompilationFailed { .. })
        ));
        assert!(BAD.get_by_name("broken").is_err());
    }
}
