//! # Design
//!
//! - One error type for every snapshot failure surfaced to callers.
//! - Keep error messages constant; identifiers, paths and bodies travel as fields.
//! - Stage-specific errors are preserved as sources.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::canonical::CanonicalError;
use crate::mask::{MaskEvaluationError, MaskPathError};

/// Result alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors produced while serializing, masking, storing or comparing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// One or more mask paths could not be parsed.
    #[error("snapshot serialization failed: invalid mask path")]
    InvalidMaskPath {
        /// Every supplied path that failed to parse, in input order.
        paths: Vec<String>,
        /// Parse error of the first invalid path.
        source: MaskPathError,
    },
    /// A mask path could not be applied to the document shape.
    #[error("snapshot serialization failed: mask evaluation failed")]
    MaskEvaluation {
        /// Path whose evaluation failed.
        path: String,
        /// Underlying evaluation error.
        source: MaskEvaluationError,
    },
    /// The value graph could not be converted into a canonical document.
    #[error("snapshot serialization failed")]
    Serialization {
        /// Underlying canonicalization error.
        source: CanonicalError,
    },
    /// Encoding or decoding JSON text failed.
    #[error("snapshot serialization failed: json encoding")]
    Encode {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// No stored snapshot exists and recording is disabled.
    #[error("snapshot missing")]
    SnapshotMissing {
        /// Identifier of the missing snapshot.
        identifier: String,
        /// Snapshot file that was searched.
        path: PathBuf,
    },
    /// The stored snapshot differs from the freshly produced one.
    #[error("snapshot does not match")]
    SnapshotMismatch {
        /// Identifier of the compared snapshot.
        identifier: String,
        /// Stored body.
        expected: String,
        /// Freshly produced body.
        actual: String,
    },
    /// The same identifier was verified twice during one run.
    #[error("snapshot already taken")]
    DuplicateSnapshot {
        /// Identifier verified more than once.
        identifier: String,
    },
    /// Stored snapshots were never verified during the run.
    #[error("orphaned snapshots")]
    OrphanedSnapshots {
        /// Snapshot file holding the orphans.
        path: PathBuf,
        /// Identifiers of the orphaned entries.
        identifiers: Vec<String>,
    },
    /// A snapshot file entry could not be parsed.
    #[error("snapshot file corrupt")]
    SnapshotFileCorrupt {
        /// Snapshot file path.
        path: PathBuf,
        /// One-based line where the malformed entry starts.
        line: usize,
    },
    /// Filesystem access failed.
    #[error("snapshot io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The configuration file could not be parsed.
    #[error("snapshot configuration invalid")]
    ConfigParse {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
    /// A configuration value was out of range.
    #[error("snapshot configuration invalid")]
    InvalidConfig {
        /// Field or environment variable carrying the value.
        field: &'static str,
        /// Offending value.
        value: String,
    },
}
