//! Scoped, mode-checked access to files and streams.
//!
//! This module provides the core file access functionality for fileio: opening
//! a resource under an access mode, bounded reads and writes over a shared
//! cursor, guaranteed release, compressed streams and memory-mapped views.
//!
//! ```no_run
//! use fileio::file_handler::{self, SeekOrigin};
//!
//! # fn main() -> fileio::Result<()> {
//! file_handler::with_scoped_handle("example.txt", "r+".parse()?, |file| {
//!     file.seek(5, SeekOrigin::Start)?;
//!     file.write("INSERT")?;
//!     file.rewind()?;
//!     println!("{:?}", file.read(None)?);
//!     Ok::<_, fileio::FileIoError>(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub(crate) mod channel;
pub mod compression;
pub mod encoding;
pub mod handle;
pub mod mmap;
pub mod mode;
pub mod probe;
pub mod scope;

pub use compression::CompressionType;
pub use encoding::Encoding;
pub use handle::{Data, Handle, Lines, OpenOptions, SeekOrigin};
pub use mmap::MappedRegion;
pub use mode::{AccessMode, Format, Intent};
pub use probe::{absolute, exists, file_size, list_dir, remove, rename};
pub use scope::{scoped, with_scoped_handle, Release};

use crate::error::Result;
use std::path::Path;

/// Open `path` under `mode` (`"r"`, `"w+"`, `"ab"`, ...)
///
/// Text modes use `encoding`, or UTF-8 when it is `None`.
pub fn open(path: impl AsRef<Path>, mode: &str, encoding: Option<Encoding>) -> Result<Handle> {
    Handle::open(path, mode.parse()?, encoding)
}

/// Open `path` through a compression codec
pub fn open_compressed(
    path: impl AsRef<Path>,
    mode: &str,
    compression: CompressionType,
    encoding: Option<Encoding>,
) -> Result<Handle> {
    let mut options = OpenOptions::new(mode.parse()?).compression(compression);
    if let Some(encoding) = encoding {
        options = options.encoding(encoding);
    }
    options.open(path)
}

/// Read the whole file as text
pub fn read_text(path: impl AsRef<Path>, encoding: Option<Encoding>) -> Result<String> {
    let handle = Handle::open(path, AccessMode::new(Intent::Read, Format::Text, false), encoding)?;
    scoped(handle, |file| file.read_to_string())
}

/// Replace the file's content with `text`; returns characters written
pub fn write_text(path: impl AsRef<Path>, text: &str, encoding: Option<Encoding>) -> Result<usize> {
    let handle = Handle::open(path, AccessMode::new(Intent::Write, Format::Text, false), encoding)?;
    scoped(handle, |file| file.write(text))
}

/// Read the whole file as bytes
pub fn read_bytes(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let handle = Handle::open(path, AccessMode::new(Intent::Read, Format::Binary, false), None)?;
    scoped(handle, |file| file.read(None).map(Data::into_bytes))
}

/// Replace the file's content with `bytes`
pub fn write_bytes(path: impl AsRef<Path>, bytes: &[u8]) -> Result<usize> {
    let handle = Handle::open(path, AccessMode::new(Intent::Write, Format::Binary, false), None)?;
    scoped(handle, |file| file.write(bytes))
}

/// Open with compression detected from magic bytes or extension
pub fn open_detected(path: impl AsRef<Path>, mode: &str, encoding: Option<Encoding>) -> Result<Handle> {
    let path = path.as_ref();
    let compression = CompressionType::detect(path)?;
    if compression.is_compressed() {
        log::debug!("{} detected as {}", path.display(), compression.name());
    }
    open_compressed(path, mode, compression, encoding)
}
