//! Compression format detection and compressed stream construction.
//!
//! Compressed handles wrap the underlying file with a codec; the cursor and mode
//! rules then apply to the decompressed logical stream. Detection uses magic
//! numbers (file signatures) first and falls back to the file extension.

use crate::error::{FileIoError, Result};
use crate::file_handler::channel::Stream;
use crate::file_handler::mode::{AccessMode, Intent};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Supported compression formats for compressed handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    /// No compression - plain file
    #[default]
    None,
    /// Gzip compression (.gz files)
    Gzip,
    /// Zstandard compression (.zst, .zstd files)
    Zstd,
}

impl CompressionType {
    /// Get human-readable name for the compression type
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Zstd => "zstd",
        }
    }

    /// Check if this type represents a compressed format
    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Detect the compression of an existing file, or guess it from the
    /// extension when the file does not exist yet.
    ///
    /// # Magic Numbers Used
    /// - Gzip: `1f 8b` (RFC 1952)
    /// - Zstd: `28 b5 2f fd` (Zstandard frame format)
    pub fn detect(path: &Path) -> Result<Self> {
        // Try magic bytes first (most reliable)
        if let Ok(file) = File::open(path) {
            let mut buffer = Vec::with_capacity(4);
            file.take(4)
                .read_to_end(&mut buffer)
                .map_err(|e| FileIoError::from_io(e, path))?;

            if let Some(format) = detect_by_magic(&buffer) {
                return Ok(format);
            }
        }

        // Fall back to extension-based detection
        Ok(detect_by_extension(path).unwrap_or(Self::None))
    }
}

impl std::str::FromStr for CompressionType {
    type Err = FileIoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            "zstd" | "zst" => Ok(Self::Zstd),
            other => Err(FileIoError::invalid_argument(format!(
                "unknown compression '{}'",
                other
            ))),
        }
    }
}

/// Detect compression format from magic bytes
fn detect_by_magic(magic: &[u8]) -> Option<CompressionType> {
    if magic.starts_with(&[0x1f, 0x8b]) {
        Some(CompressionType::Gzip)
    } else if magic.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
        Some(CompressionType::Zstd)
    } else {
        None
    }
}

/// Detect compression format from file extension
fn detect_by_extension(path: &Path) -> Option<CompressionType> {
    let ext = path.extension()?.to_str()?;
    match ext.to_lowercase().as_str() {
        "gz" => Some(CompressionType::Gzip),
        "zst" | "zstd" => Some(CompressionType::Zstd),
        _ => None,
    }
}

/// Open `path` under `mode` wrapped in a codec for `compression`.
///
/// Update modes are rejected: a compressed stream is either read or written.
/// Append mode starts a new gzip member or zstd frame after the existing ones.
pub(crate) fn open_stream(
    path: &Path,
    mode: AccessMode,
    compression: CompressionType,
    level: Option<u32>,
) -> Result<Stream> {
    if !compression.is_compressed() {
        return Err(FileIoError::compression(
            "open_stream called with no compression",
        ));
    }
    if mode.is_update() {
        return Err(FileIoError::unsupported("update compressed stream", mode));
    }

    let file = mode
        .to_open_options()
        .open(path)
        .map_err(|e| FileIoError::from_io(e, path))?;

    if mode.intent() == Intent::Read {
        reader(file, compression)
    } else {
        writer(file, compression, level)
    }
}

/// Wrap a file positioned at the start of compressed data in a decoder
pub(crate) fn reader(file: File, compression: CompressionType) -> Result<Stream> {
    let file = BufReader::new(file);
    match compression {
        CompressionType::Gzip => Ok(Stream::GzipReader(MultiGzDecoder::new(file))),
        CompressionType::Zstd => zstd::stream::read::Decoder::with_buffer(file)
            .map(Stream::ZstdReader)
            .map_err(|e| FileIoError::compression(format!("Failed to start zstd decoder: {}", e))),
        CompressionType::None => unreachable!("Should not decode uncompressed files"),
    }
}

fn writer(file: File, compression: CompressionType, level: Option<u32>) -> Result<Stream> {
    match compression {
        CompressionType::Gzip => {
            let level = level.map_or(flate2::Compression::default(), |l| {
                flate2::Compression::new(l.min(9))
            });
            Ok(Stream::GzipWriter(GzEncoder::new(file, level)))
        }
        CompressionType::Zstd => {
            let level = level.map_or(zstd::DEFAULT_COMPRESSION_LEVEL, |l| l.min(22) as i32);
            zstd::stream::write::Encoder::new(file, level)
                .map(Stream::ZstdWriter)
                .map_err(|e| {
                    FileIoError::compression(format!("Failed to start zstd encoder: {}", e))
                })
        }
        CompressionType::None => unreachable!("Should not encode uncompressed files"),
    }
}
