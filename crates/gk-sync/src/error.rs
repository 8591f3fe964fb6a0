//! Error types for the synchronization layer.
//!
//! Parse failures never appear here: malformed user patterns and CSP text
//! degrade to skipped rules in `gk-core`. These variants cover the external
//! collaborators only.

/// Error type for host-facing operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The scripting permission is unavailable. Surfaced verbatim so the UI
    /// can prompt the user; never retried automatically.
    #[error("scripting capability unavailable: {0}")]
    Capability(String),
    /// A register/update/unregister call was rejected by the host.
    #[error("host call failed: {0}")]
    Host(String),
    /// The external code compiler rejected a script body.
    #[error("compilation failed for script {id}: {reason}")]
    Compile { id: String, reason: String },
}
