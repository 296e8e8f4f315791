//! Error types for the store layer.

/// Errors a store backend can report.
///
/// Absent records are not errors: lookups return `Ok(None)` and callers
/// decide whether that is a `NotFound` in their own domain.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading a seed file failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A seed file is not valid JSON for [`StoreSeed`](crate::StoreSeed).
    #[error("invalid seed: {0}")]
    Seed(#[from] serde_json::Error),

    /// Applying the delta would overflow the balance.
    #[error("balance overflow for user {0}")]
    BalanceOverflow(String),

    /// The backend could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
