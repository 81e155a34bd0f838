// src/error.rs

//! Central error type for the modscry library.
//!
//! Only genuinely fatal conditions surface as errors: a malformed installer
//! config, an unusable store, or a caller-requested cancellation. Weak
//! matches, ambiguous selections, and unreadable payload files are not
//! errors; they are reported through [`crate::detect::Report`] so callers
//! can inspect the uncertainty instead of losing the whole run.

use thiserror::Error;

/// Errors produced by modscry operations
#[derive(Error, Debug)]
pub enum Error {
    /// The installer config is structurally invalid and cannot be evaluated
    #[error("malformed installer config: {0}")]
    Config(String),

    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing SQLite store failed
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A requested record or file does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A record with the same identity is already stored
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A hash string failed validation
    #[error("invalid hash: {0}")]
    InvalidHash(#[from] crate::hash::HashError),

    /// An installed-file listing could not be decoded
    #[error("invalid file listing: {0}")]
    Listing(#[from] serde_json::Error),

    /// The operation was canceled through a [`crate::progress::CancelToken`]
    #[error("operation canceled")]
    Canceled,
}

/// Convenience alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
