//! # patricia-error
//!
//! Unified error handling for the patricia tree workspace.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g., UnknownRoot, NoDeltaAttached)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Locate the cause with key-value context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use patricia_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::UnknownRoot, "root is not in the data source")
//!         .with_operation("delta::reset")
//!         .with_context("root", "4B2A..."))
//! }
//! ```
//!
//! ## Principles
//!
//! - Fallible functions return `Result<T, patricia_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - An error is handled once; callers further up only append context
//! - Absence is not an error: lookups return `Option` or `bool`

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the workspace Error
pub type Result<T> = std::result::Result<T, Error>;
