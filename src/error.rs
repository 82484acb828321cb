use thiserror::Error;

#[derive(Error, Debug)]
pub enum BqCatError {
    #[error("column count mismatch: expected {expected}, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("renderer misuse: {0}")]
    RendererState(String),

    #[error("source error: {0}")]
    Source(String),

    #[error("BigQuery error: {0}")]
    BigQuery(#[from] gcp_bigquery_client::error::BQError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to create output file '{path}': {source}")]
    CreateFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Query error: {0}")]
    Query(String),
}

pub type Result<T> = std::result::Result<T, BqCatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message() {
        let err = BqCatError::ColumnCountMismatch {
            expected: 2,
            actual: 3,
        };
        assert_eq!(err.to_string(), "column count mismatch: expected 2, got 3");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: BqCatError = io.into();
        assert!(matches!(err, BqCatError::Io(_)));
        assert_eq!(err.to_string(), "IO error: pipe closed");
    }
}
