//! Configuration for the tfscope CLI.
//!
//! [`Config::load`] reads an explicit `--config` file or, failing that,
//! `$XDG_CONFIG_HOME/tfscope/config.toml` (`~/.config/tfscope/config.toml`).
//! A missing default file means built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use tfscope_logs::{DEFAULT_PAGE_SIZE, ParserOptions};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub parser: ParserOptions,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

/// `[search]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Page size when `--size` is not given
    pub page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// `[output]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.parser.max_line_bytes == 0 {
            anyhow::bail!("parser.max_line_bytes must be greater than 0");
        }
        if self.search.page_size == 0 {
            anyhow::bail!("search.page_size must be greater than 0");
        }
        Ok(())
    }
}

fn default_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("tfscope").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.parser.max_line_bytes, 1024 * 1024);
        assert_eq!(config.search.page_size, 50);
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
            [parser]
            max_line_bytes = 4096

            [output]
            pretty = true
            "#,
        )
        .unwrap();
        assert_eq!(config.parser.max_line_bytes, 4096);
        assert_eq!(config.search.page_size, 50);
        assert!(config.output.pretty);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::from_toml("[search]\npage = 3\n").is_err());
        assert!(Config::from_toml("[extra]\n").is_err());
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(Config::from_toml("[search]\npage_size = 0\n").is_err());
        assert!(Config::from_toml("[parser]\nmax_line_bytes = 0\n").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/tfscope.toml"))).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config file"));
    }
}
