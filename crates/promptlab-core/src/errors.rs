use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Fatal problems with the input result table.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{column}' (header: {header})")]
    MissingColumn { column: String, header: String },

    #[error("line {line}: invalid {column} value '{value}': {reason}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
        reason: &'static str,
    },
}
