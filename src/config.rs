use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::Error;

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub limits: LimitsConfig,
    pub output: OutputConfig,
}

/// Literal text the default renderer rules emit for block constructs
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderConfig {
    pub bullet: String,
    /// Passed through the escaper, so reserved characters are allowed here.
    pub rule_line: String,
    pub paragraph_separator: String,
    pub list_indent: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bullet: "• ".to_string(),
            rule_line: "------".to_string(),
            paragraph_separator: "\n\n".to_string(),
            list_indent: "  ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_nesting: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_nesting: 32 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Telegram rejects messages longer than this many characters.
    pub max_message_len: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_message_len: 4096,
        }
    }
}

impl Config {
    /// The configuration embedded at build time from `default_config.toml`.
    pub fn compiled_default() -> Self {
        Self::parse_or_default(DEFAULT_CONFIG)
    }

    fn parse_or_default(content: &str) -> Self {
        match toml::from_str(content) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, "embedded config does not match the schema, using built-in defaults");
                Self::default()
            }
        }
    }

    /// Load config from a TOML file, failing on a missing or malformed file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from a TOML file, or return the compiled defaults if that fails.
    pub fn load(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, "falling back to default config");
                Self::compiled_default()
            }
        }
    }
}
