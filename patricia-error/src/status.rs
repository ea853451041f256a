//! Error status: whether an error is worth retrying

use crate::ErrorKind;
use std::fmt;

/// How the caller should treat an error.
///
/// Tree operations never retry on their own; the status only tells the
/// caller whether the failing storage call could succeed if repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorStatus {
    /// Retrying will not help
    Permanent,

    /// The operation may succeed if retried
    Temporary,

    /// A temporary error that kept failing after retries
    Persistent,
}

impl ErrorStatus {
    /// Starting status of a new error of `kind`
    pub fn for_kind(kind: ErrorKind) -> Self {
        if kind.is_retryable() {
            ErrorStatus::Temporary
        } else {
            ErrorStatus::Permanent
        }
    }

    /// Check if this status allows a retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorStatus::Temporary)
    }

    /// Turn a temporary status into a persistent one
    pub fn persist(self) -> Self {
        match self {
            ErrorStatus::Temporary => ErrorStatus::Persistent,
            other => other,
        }
    }

    /// Returns the status as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorStatus::Permanent => "permanent",
            ErrorStatus::Temporary => "temporary",
            ErrorStatus::Persistent => "persistent",
        }
    }
}

impl Default for ErrorStatus {
    fn default() -> Self {
        ErrorStatus::Permanent
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
