//! The core's closed error taxonomy (§7).
//!
//! The teacher crate threads `anyhow::Error` everywhere; the taxonomy table
//! in §7 is closed and user-facing policy depends on which row fired, so
//! it gets a real enum here. The CLI boundary still converts this to
//! `anyhow::Result` for `main()`, same as the teacher does.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReachError {
    #[error("config invalid: {0}")]
    ConfigInvalid(String),

    #[error("no files matched the configured include/exclude globs")]
    FileDiscoveryEmpty,

    #[error("failed to parse {file}: {message}")]
    ExtractorParseError { file: String, message: String },

    #[error("helper toolchain unavailable for {language}: {message}")]
    HelperUnavailable { language: String, message: String },

    #[error("helper process for {language} exceeded its time budget ({timeout_secs}s)")]
    HelperTimeout { language: String, timeout_secs: u64 },

    #[error("entry-point glob invalid: {pattern}: {message}")]
    MatcherGlobInvalid { pattern: String, message: String },

    #[error("unsupported schema major version: {found} (expected {expected})")]
    SchemaVersionUnsupported { found: String, expected: String },

    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors that are per-file (§7: "Per-file; log diagnostic, continue") are
/// not fatal to the run — `ReachError` is only raised for the fatal rows
/// of the taxonomy. Callers that hit a per-file failure should route it
/// through `Diagnostic` (see `diagnostics.rs`) instead of returning early.
impl ReachError {
    /// Whether this error kind should abort the run with no artifact, per
    /// the policy column of the §7 taxonomy table.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ReachError::FileDiscoveryEmpty)
    }
}

pub type Result<T> = std::result::Result<T, ReachError>;
