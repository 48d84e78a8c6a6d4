use thiserror::Error;

/// Outcome classes for a single pull from a sample source.
///
/// `Empty` and `Malformed` are transient: the caller skips the current tick
/// and retries on the next one. `Unavailable` ends the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("empty reading")]
    Empty,
    #[error("malformed reading: {0:?}")]
    Malformed(String),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Transient errors skip one tick; fatal ones terminate the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}
