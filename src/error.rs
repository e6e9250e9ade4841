use std::path::PathBuf;

use thiserror::Error;

/// Failure while turning Markdown into the render token stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("markdown nesting depth {depth} exceeds the limit of {limit}")]
    TooDeep { depth: usize, limit: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("markdown parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("input is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
