use thiserror::Error;

/// Errors surfaced by snapshot subscriptions.
///
/// The reducer and all analysis functions are total and never fail; the
/// only fallible surface of the store is receiving from a broadcast
/// subscription that fell behind or whose store was dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The subscriber lagged and `n` updates were dropped. The next `recv`
    /// resumes at the oldest retained update.
    #[error("subscriber lagged behind, {0} update(s) skipped")]
    Lagged(u64),

    /// The store (and its channel) was dropped; no further updates.
    #[error("snapshot stream closed")]
    Closed,
}

impl From<tokio::sync::broadcast::error::RecvError> for StoreError {
    fn from(e: tokio::sync::broadcast::error::RecvError) -> Self {
        use tokio::sync::broadcast::error::RecvError;
        match e {
            RecvError::Lagged(n) => Self::Lagged(n),
            RecvError::Closed => Self::Closed,
        }
    }
}
