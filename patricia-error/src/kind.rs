//! Error kinds for patricia tree operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on ErrorKind to decide how to react. Lifecycle kinds
/// (`DeltaAlreadyAttached`, `NoDeltaAttached`, `UnknownRoot`) signal caller
/// misuse and should end the current unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// Invalid configuration
    ConfigInvalid,

    /// Invalid argument passed to function
    InvalidArgument,

    // =========================================================================
    // Tree errors
    // =========================================================================
    /// Root hash is neither zero nor present in the data source
    UnknownRoot,

    /// A node referenced by a branch link is missing from the data source
    NodeNotFound,

    // =========================================================================
    // Delta lifecycle errors
    // =========================================================================
    /// `rebase` called while another attached delta is alive
    DeltaAlreadyAttached,

    /// `commit` called without an attached delta
    NoDeltaAttached,

    // =========================================================================
    // Storage errors
    // =========================================================================
    /// Storage temporarily refused the operation
    StorageBusy,

    /// Serialization/deserialization failed
    SerializationFailed,

    /// Stored node bytes could not be decoded
    CorruptNode,

    // =========================================================================
    // IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// Failed to parse input
    ParseFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            // General
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::ConfigInvalid => "ConfigInvalid",
            ErrorKind::InvalidArgument => "InvalidArgument",

            // Tree
            ErrorKind::UnknownRoot => "UnknownRoot",
            ErrorKind::NodeNotFound => "NodeNotFound",

            // Delta lifecycle
            ErrorKind::DeltaAlreadyAttached => "DeltaAlreadyAttached",
            ErrorKind::NoDeltaAttached => "NoDeltaAttached",

            // Storage
            ErrorKind::StorageBusy => "StorageBusy",
            ErrorKind::SerializationFailed => "SerializationFailed",
            ErrorKind::CorruptNode => "CorruptNode",

            // IO
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoFailed => "IoFailed",

            // Parse
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::StorageBusy)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
