//! Error types and handling infrastructure for fileio.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! the library error type. The binary layers `anyhow` on top for context.
//!
//! ## Design Principles
//!
//! - **Path context**: errors raised while touching a resource name that resource
//! - **Distinct kinds**: callers can match on not-found, closed handle, bad offset, etc.
//! - **No swallowing**: every facade operation surfaces failures to its caller
//! - **Consistency**: Standardized Result type across all modules

use std::path::{Path, PathBuf};
use thiserror::Error;

/// The main error type for fileio operations.
#[derive(Error, Debug)]
pub enum FileIoError {
    /// Generic I/O failure of the underlying transport
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The mode requires existing content and the resource does not exist
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Exclusive creation was requested for a path that already exists
    #[error("File already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Permission denied accessing file
    #[error("Permission denied accessing file: {path}")]
    PermissionDenied { path: PathBuf },

    /// The handle was used after it had been closed
    #[error("Cannot {operation}: handle is closed")]
    ClosedHandle { operation: &'static str },

    /// A seek resolved to a position outside the valid range
    #[error("Invalid offset: resulting position {position} is out of range")]
    InvalidOffset { position: i128 },

    /// Bytes could not be decoded, or text could not be encoded
    #[error("Encoding error ({encoding}): {message}")]
    Encoding {
        encoding: &'static str,
        message: String,
    },

    /// Malformed structured payload
    #[error("Malformed {format} payload: {message}")]
    Format {
        format: &'static str,
        message: String,
    },

    /// The operation is not allowed by the handle's mode or stream kind
    #[error("Unsupported operation '{operation}' for mode '{mode}'")]
    Unsupported {
        operation: &'static str,
        mode: String,
    },

    /// Memory mapping related errors
    #[error("Memory mapping failed: {message}")]
    MemoryMapping { message: String },

    /// Compression format detection or codec errors
    #[error("Compression error: {message}")]
    Compression { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid argument (mode string, encoding name, payload/format mismatch)
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Standard Result type for fileio operations.
pub type Result<T> = std::result::Result<T, FileIoError>;

impl FileIoError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Map an io::Error raised while accessing `path` to the matching variant.
    ///
    /// `NotFound`, `AlreadyExists` and `PermissionDenied` become their
    /// path-carrying variants; everything else is a `FileError`.
    pub fn from_io(err: std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Self::FileError {
                message: format!("I/O on {} failed", path.display()),
                source: err,
            },
        }
    }

    /// Create a ClosedHandle error for the named operation
    pub fn closed(operation: &'static str) -> Self {
        Self::ClosedHandle { operation }
    }

    /// Create an Unsupported error for an operation the mode forbids
    pub fn unsupported(operation: &'static str, mode: impl ToString) -> Self {
        Self::Unsupported {
            operation,
            mode: mode.to_string(),
        }
    }

    /// Create an Encoding error with a descriptive message
    pub fn encoding(encoding: &'static str, message: impl Into<String>) -> Self {
        Self::Encoding {
            encoding,
            message: message.into(),
        }
    }

    /// Create a Format error with a descriptive message
    pub fn format(format: &'static str, message: impl Into<String>) -> Self {
        Self::Format {
            format,
            message: message.into(),
        }
    }

    /// Create a MemoryMapping error with a descriptive message
    pub fn memory_mapping(message: impl Into<String>) -> Self {
        Self::MemoryMapping {
            message: message.into(),
        }
    }

    /// Create a Compression error with a descriptive message
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression {
            message: message.into(),
        }
    }

    /// Create a Config error with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for FileIoError {
    fn from(err: serde_json::Error) -> Self {
        Self::format("json", err.to_string())
    }
}

impl From<csv::Error> for FileIoError {
    fn from(err: csv::Error) -> Self {
        Self::format("csv", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display_messages() {
        let path = PathBuf::from("/test/data.json");

        let not_found = FileIoError::NotFound { path: path.clone() };
        assert_eq!(not_found.to_string(), "File not found: /test/data.json");

        let exists = FileIoError::AlreadyExists { path };
        assert_eq!(exists.to_string(), "File already exists: /test/data.json");

        let closed = FileIoError::closed("read");
        assert_eq!(closed.to_string(), "Cannot read: handle is closed");

        let offset = FileIoError::InvalidOffset { position: -3 };
        assert_eq!(
            offset.to_string(),
            "Invalid offset: resulting position -3 is out of range"
        );
    }

    #[test]
    fn test_from_io_maps_kinds() {
        let path = Path::new("missing.txt");

        let err = FileIoError::from_io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "nope"),
            path,
        );
        assert!(matches!(err, FileIoError::NotFound { ref path } if path == Path::new("missing.txt")));

        let err = FileIoError::from_io(
            std::io::Error::new(std::io::ErrorKind::AlreadyExists, "exists"),
            path,
        );
        assert!(matches!(err, FileIoError::AlreadyExists { .. }));

        let err = FileIoError::from_io(
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            path,
        );
        assert!(matches!(err, FileIoError::PermissionDenied { .. }));

        let err = FileIoError::from_io(std::io::Error::other("disk on fire"), path);
        assert!(matches!(err, FileIoError::FileError { .. }));
    }

    #[test]
    fn test_file_error_keeps_io_source() {
        use std::error::Error;

        let err = FileIoError::from_io(std::io::Error::other("disk on fire"), Path::new("a.txt"));
        assert_eq!(err.to_string(), "File operation failed: I/O on a.txt failed");
        let source = err.source().expect("io error kept as source");
        assert_eq!(source.to_string(), "disk on fire");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: FileIoError = json_err.into();
        assert!(matches!(err, FileIoError::Format { format: "json", .. }));
    }
}
