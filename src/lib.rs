//! # fileio - Scoped, Mode-Checked File Access
//!
//! A small facade over files and file-like streams: open a resource under an
//! access mode, read and write through a single cursor, and have it released
//! on every exit path.
//!
//! ## Features
//!
//! - **Access Modes**: `r`, `w`, `a`, `x` with text/binary and update variants
//! - **Text Encodings**: UTF-8, UTF-16, Latin-1 and ASCII with per-character reads
//! - **Structured Payloads**: JSON documents and CSV rows over any handle
//! - **Compression Support**: Transparent gzip and zstd streams
//! - **Memory Mapping**: Directly addressable views of open files
//! - **Scoped Release**: Handles close exactly once, even when the body fails
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`file_handler`] - Handles, modes, encodings, compression and mapping
//! - [`structured`] - JSON and CSV payloads
//! - [`config`] - Facade defaults, optionally loaded from a TOML file

// Core modules
pub mod error;
pub mod file_handler;

// Layers built on top of handles
pub mod config;
pub mod structured;

// Re-export commonly used types for convenience
pub use error::{FileIoError, Result};

// Public API surface for external usage
pub use config::FacadeConfig;
pub use file_handler::{
    open, scoped, with_scoped_handle, AccessMode, CompressionType, Data, Encoding, Handle,
    MappedRegion, OpenOptions, SeekOrigin,
};
pub use structured::{read_structured, write_structured, Payload, StructuredFormat};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
