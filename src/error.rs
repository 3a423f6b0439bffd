//! Crate-wide error type.
//!
//! Analyses are pure computations over a well-formed IR, so most "errors"
//! are degradations handled locally (unknown operators become NAC, rules
//! that match nothing are skipped). The variants here cover the faults
//! that must surface to the caller: malformed input structures and
//! configuration I/O.

use crate::ir::MethodId;

/// Errors produced by the analysis engine.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// A statement kind appeared where the surrounding structure forbids it,
    /// e.g. a jump target outside the method body.
    #[error("malformed IR in method {method:?}: {reason}")]
    MalformedIr {
        /// Method whose body is inconsistent.
        method: MethodId,
        /// Human-readable description of the inconsistency.
        reason: String,
    },

    /// The program has no entry method with a body.
    #[error("entry method {0:?} has no IR")]
    MissingEntryBody(MethodId),

    /// Taint configuration could not be read from disk.
    #[error("failed to read taint config {path}: {source}")]
    ConfigIo {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Taint configuration could not be parsed.
    #[error("failed to parse taint config {path}: {source}")]
    ConfigParse {
        /// Path that was attempted.
        path: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FlowError>;
