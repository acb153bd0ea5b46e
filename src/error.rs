//! Crate-level error types.
//!
//! Fatal conditions only: everything recoverable during a merge is reported
//! as a [`Diagnostic`](crate::merge::Diagnostic) value in the merge report,
//! never raised through this type.

use thiserror::Error;

use crate::opc::OpcError;

/// Result type for merge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Errors that abort a merge before any output is produced.
#[derive(Error, Debug)]
pub enum MergeError {
    /// No slide in the package contains the marker token.
    #[error("marker '{marker}' not found in any slide")]
    MarkerNotFound { marker: String },

    /// The supplied name list contains no usable entries.
    #[error("name list is empty")]
    EmptyNameList,

    /// The container or one of its parts is malformed.
    #[error(transparent)]
    Opc(#[from] OpcError),

    /// The package is structurally not a presentation.
    #[error("not a presentation package: {0}")]
    NotAPresentation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
