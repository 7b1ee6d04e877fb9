use thiserror::Error;

/// Failures of a concrete key-value backend. The state store never lets
/// these escape a load; they only surface from an explicit save.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid storage key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },
    #[error("failed to read '{key}': {source}")]
    Read {
        key: String,
        source: std::io::Error,
    },
    #[error("failed to write '{key}': {source}")]
    Write {
        key: String,
        source: std::io::Error,
    },
    #[error("failed to remove '{key}': {source}")]
    Remove {
        key: String,
        source: std::io::Error,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("worker index {index} out of range ({len} workers)")]
    WorkerOutOfRange { index: usize, len: usize },
    #[error("company index {index} out of range ({len} companies)")]
    CompanyOutOfRange { index: usize, len: usize },
    #[error("at least one company is required")]
    LastCompany,
}
