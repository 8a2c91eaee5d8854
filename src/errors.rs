//! Typed error taxonomy for the sync engine.
//!
//! Local command failures use `anyhow` directly. Anything that crosses the
//! remote-store boundary is classified here so that the retry loop can decide
//! between retrying (version/lock conflicts) and surfacing immediately
//! (auth, rate-limit, unknown).

use thiserror::Error;

/// Why a concurrency conflict was detected during an incremental apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// Remote data version no longer matches the version the changeset was
    /// computed against.
    Version,
    /// A row we need to touch already carries a foreign lock token.
    Lock,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictKind::Version => write!(f, "version conflict"),
            ConflictKind::Lock => write!(f, "row lock conflict"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// Filesystem permission failure. Fatal: the run cannot make progress.
    #[error("permission denied for {path}: {message}")]
    Permission { path: String, message: String },

    /// The engine could not be constructed (bad sheet layout, missing header).
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Invalid or missing configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Remote store rejected our credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Remote store API failure other than auth/rate-limit.
    #[error("remote API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Remote store throttled us. Surfaced immediately, never retried inside
    /// the apply loop.
    #[error("rate limited by remote store: {0}")]
    RateLimited(String),

    /// Optimistic concurrency failure, retryable up to the attempt bound.
    #[error("concurrency conflict ({kind}): {message}")]
    Concurrency { kind: ConflictKind, message: String },

    /// Catch-all wrapper for anything we could not classify.
    #[error("unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl SyncError {
    /// Whether the incremental apply loop may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Concurrency { .. })
    }

    /// Remediation hint attached to the error when surfaced to the user.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SyncError::Permission { .. } => {
                Some("Check file ownership and mode of the catalog directory.")
            }
            SyncError::Authentication(_) => {
                Some("Verify the remote token (LEXSYNC_TOKEN) and sheet permissions.")
            }
            SyncError::RateLimited(_) => {
                Some("Wait a minute and re-run; consider raising retryBaseDelayMs.")
            }
            SyncError::Concurrency { .. } => {
                Some("Another writer is active; re-run to retry the sync.")
            }
            SyncError::Api { .. } => Some("Re-run with --verbose to see the failing request."),
            _ => None,
        }
    }
}
