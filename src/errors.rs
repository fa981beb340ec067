use thiserror::Error;

/// Failures a report run can end with
///
/// Object database and reference code returns `anyhow::Error`; the variants
/// below travel inside it and can be recovered with `downcast_ref`.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Invalid log query. {0}")]
    Format(String),
    #[error("Invalid usage. {0}")]
    Usage(String),
    #[error("Reference not found. {0}")]
    ReferenceResolution(String),
    #[error("Errored while handling a file. {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            ReportError::Usage(_) => 2,
            _ => 1,
        }
    }
}

/// Convenience alias for results that bubble `ReportError`.
pub type ReportResult<T> = Result<T, ReportError>;
