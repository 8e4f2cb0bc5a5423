//! Error types for the harness and the workloads it runs.

use thiserror::Error;

/// Failure raised by a benchmarked operation itself.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error("arithmetic overflow in {what}")]
    Overflow { what: &'static str },

    #[error("{0}")]
    Failed(String),
}

/// Errors produced by the harness, the runner and the reporting layer.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// A case's operation failed; the run is aborted and no report is produced.
    #[error("case '{case}' failed: {source}")]
    Operation {
        case: String,
        #[source]
        source: CaseError,
    },

    #[error("{probe} probe unavailable: {reason}")]
    ProbeUnavailable { probe: &'static str, reason: String },

    #[error("duplicate benchmark case name: {0}")]
    DuplicateCase(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
