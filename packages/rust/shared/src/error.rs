//! Error types for postsync.
//!
//! Library crates use [`PostsyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all postsync operations.
#[derive(Debug, thiserror::Error)]
pub enum PostsyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during feed or archive fetch.
    #[error("network error: {0}")]
    Network(String),

    /// Feed document parsing error.
    #[error("feed error: {message}")]
    Feed { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PostsyncError>;

impl PostsyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a feed error from any displayable message.
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = PostsyncError::config("no owner.json found");
        assert_eq!(err.to_string(), "config error: no owner.json found");

        let err = PostsyncError::validation("metadata file without a post file: 2024-01-01_hello");
        assert!(err.to_string().contains("2024-01-01_hello"));
    }
}
