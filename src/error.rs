// Error kinds shared by the import pipeline, the stores and the exporter

use thiserror::Error;

/// Fatal to an import attempt: the source could not be turned into rows at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file empty")]
    Empty,

    #[error("decode failure: {0}")]
    Decode(String),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Raised by a `TransactionStore` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no data to export")]
    Empty,

    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("exported data is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_messages() {
        assert_eq!(ParseError::Empty.to_string(), "file empty");
        assert_eq!(
            ParseError::Decode("invalid utf-8".to_string()).to_string(),
            "decode failure: invalid utf-8"
        );
    }

    #[test]
    fn test_store_error_not_found() {
        let err = StoreError::NotFound("abc".to_string());
        assert_eq!(err.to_string(), "transaction not found: abc");
    }
}
