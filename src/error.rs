//! Error types shared across the harvester.

use std::path::PathBuf;

/// Errors that abort a harvest run.
///
/// Per-page and per-document fetch problems never surface here; the crawler
/// absorbs them into `PageStatus` values and keeps going.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("cannot open output file {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not resolve topic id for '{0}'")]
    UnknownTopic(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
