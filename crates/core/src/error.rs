//! Error types surfaced by the storefront session.

use thiserror::Error;

/// Convenience alias for results produced by this crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Failures the storefront recognises. None of them is fatal; the session
/// turns each into a notice and keeps running.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The catalog could not be fetched or decoded.
    #[error("failed to load catalog from {source_name}: {reason}")]
    CatalogLoad {
        /// Path or URL the catalog was requested from.
        source_name: String,
        /// Human readable cause.
        reason: String,
    },

    /// The checkout endpoint was unreachable or answered with a non-success status.
    #[error("checkout failed: {0}")]
    Checkout(String),

    /// The persisted cart slot exists but does not hold a valid cart.
    #[error("persisted cart is malformed: {0}")]
    MalformedPersistedState(#[source] serde_json::Error),

    /// Filesystem access failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read.
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn catalog(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::CatalogLoad {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}
