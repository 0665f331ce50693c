use std::path::PathBuf;

use thiserror::Error;

pub type RevshareResult<T> = Result<T, RevshareError>;

#[derive(Error, Debug)]
pub enum RevshareError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Malformed timestamp in row {row}: {field} = {value:?}")]
    MalformedTimestamp {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("Malformed revenue in row {row}: {value:?}")]
    MalformedRevenue { row: usize, value: String },

    #[error("Object storage error: {0}")]
    Storage(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RevshareError {
    /// Errors that concern a single input row rather than the whole run.
    pub fn is_record_local(&self) -> bool {
        matches!(
            self,
            Self::MalformedTimestamp { .. } | Self::MalformedRevenue { .. }
        )
    }
}

impl From<config::ConfigError> for RevshareError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
