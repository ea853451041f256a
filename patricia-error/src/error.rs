//! The Error type shared by the tree, its data sources and the CLI

use crate::{ErrorKind, ErrorStatus};
use std::fmt;

/// The error type for all patricia tree operations.
///
/// Carries:
/// - `kind`: what went wrong
/// - `message`: human-readable description
/// - `status`: whether a retry could help
/// - `operation`: the operation that failed
/// - `context`: key-value pairs for debugging
/// - `source`: the underlying error, if any
///
/// # Example
///
/// ```rust
/// use patricia_error::{Error, ErrorKind, ErrorStatus};
///
/// let err = Error::new(ErrorKind::StorageBusy, "store is locked by another writer")
///     .with_operation("file_store::put")
///     .with_context("key", "8F03");
///
/// assert_eq!(err.kind(), ErrorKind::StorageBusy);
/// assert_eq!(err.status(), ErrorStatus::Temporary);
/// ```
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: ErrorStatus,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<anyhow::Error>,
}

impl Error {
    /// Create an error; the status follows from the kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: ErrorStatus::for_kind(kind),
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Innermost operation last set with [`with_operation`](Self::with_operation)
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    pub fn source_ref(&self) -> Option<&anyhow::Error> {
        self.source.as_ref()
    }

    /// Whether a caller may retry the failed operation
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_status(self, status: ErrorStatus) -> Self {
        Self { status, ..self }
    }

    pub fn temporary(self) -> Self {
        self.with_status(ErrorStatus::Temporary)
    }

    pub fn permanent(self) -> Self {
        self.with_status(ErrorStatus::Permanent)
    }

    /// A temporary error that failed again after retries
    pub fn persist(self) -> Self {
        let status = self.status.persist();
        self.with_status(status)
    }

    /// Name the failing operation.
    ///
    /// An operation set earlier moves into context as `called`, so an error
    /// from a store reads `called: file_store::put` once the tree adds its own.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        let previous = std::mem::replace(&mut self.operation, operation);
        if !previous.is_empty() {
            self.context.push(("called", previous.to_string()));
        }
        self
    }

    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Attach the underlying error. Setting a second source is a bug and
    /// trips a debug assertion.
    pub fn set_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        debug_assert!(self.source.is_none(), "error source set twice");
        self.source = Some(source.into());
        self
    }
}

/// `UnknownRoot (permanent) at delta::reset, context { root: 4B2A } => message`
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;

        let mut pairs = self.context.iter();
        if let Some((key, value)) = pairs.next() {
            write!(f, ", context {{ {}: {}", key, value)?;
            for (key, value) in pairs {
                write!(f, ", {}: {}", key, value)?;
            }
            f.write_str(" }")?;
        }

        match self.message.as_str() {
            "" => Ok(()),
            message => write!(f, " => {}", message),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({}) at {}", self.kind, self.status, self.operation)?;
        if !self.message.is_empty() {
            writeln!(f, "  message: {}", self.message)?;
        }
        for (key, value) in &self.context {
            writeln!(f, "  {:<10} {}", format!("{}:", key), value)?;
        }
        if let Some(source) = &self.source {
            writeln!(f, "  source:    {:?}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            std::io::ErrorKind::WouldBlock
            | std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::TimedOut => ErrorKind::StorageBusy,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    /// Create an Unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an UnknownRoot error for a root hash the data source does not hold
    pub fn unknown_root(root: impl Into<String>) -> Self {
        let root = root.into();
        Self::new(ErrorKind::UnknownRoot, format!("root '{}' is not in the data source", root))
            .with_context("root", root)
    }

    /// Create a NodeNotFound error for a dangling branch link
    pub fn node_not_found(hash: impl Into<String>) -> Self {
        let hash = hash.into();
        Self::new(ErrorKind::NodeNotFound, format!("linked node '{}' not found", hash))
            .with_context("hash", hash)
    }

    /// Create a DeltaAlreadyAttached error
    pub fn delta_already_attached() -> Self {
        Self::new(ErrorKind::DeltaAlreadyAttached, "only one attached delta is allowed at a time")
    }

    /// Create a NoDeltaAttached error
    pub fn no_delta_attached() -> Self {
        Self::new(ErrorKind::NoDeltaAttached, "commit requires an attached delta")
    }

    /// Create a CorruptNode error for undecodable node bytes
    pub fn corrupt_node(hash: impl Into<String>) -> Self {
        let hash = hash.into();
        Self::new(ErrorKind::CorruptNode, format!("stored node '{}' cannot be decoded", hash))
            .with_context("hash", hash)
    }

    /// Create a SerializationFailed error
    pub fn serialization_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationFailed, message)
    }

    /// Create a ParseFailed error
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }
}
