//! Memory-mapped views over open handles
//!
//! A [`MappedRegion`] exposes a file's bytes as directly addressable memory. The
//! mapping is shared with the file, so writes through the region are visible to
//! later reads through the handle and the other way round.

use crate::error::{FileIoError, Result};
use crate::file_handler::handle::SeekOrigin;
use memmap2::{Mmap, MmapMut};
use std::fs::File;
use std::marker::PhantomData;

/// Backing mapping, read-only or read-write
#[derive(Debug)]
enum MapStorage {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

/// Directly addressable view of a mapped file.
///
/// The region borrows the handle it came from, so it cannot outlive it. It keeps
/// its own cursor, independent of the handle's.
#[derive(Debug)]
pub struct MappedRegion<'h> {
    /// Memory-mapped file content
    ///
    /// Pages are loaded on demand as they are accessed.
    storage: MapStorage,

    /// Offset of the next `read`, `read_line` or `write`
    pos: usize,

    _handle: PhantomData<&'h mut ()>,
}

impl<'h> MappedRegion<'h> {
    /// Map the whole of `file`.
    ///
    /// # Errors
    /// * `MemoryMapping` - the file is empty or the OS refuses the mapping
    pub(crate) fn new(file: &File, writable: bool) -> Result<Self> {
        let length = file
            .metadata()
            .map_err(|e| FileIoError::file_error("Failed to get file metadata", e))?
            .len();
        if length == 0 {
            return Err(FileIoError::memory_mapping("cannot map an empty file"));
        }

        let storage = if writable {
            let map = unsafe {
                MmapMut::map_mut(file).map_err(|e| {
                    FileIoError::memory_mapping(format!("Failed to map file read-write: {}", e))
                })?
            };
            MapStorage::ReadWrite(map)
        } else {
            let map = unsafe {
                Mmap::map(file).map_err(|e| {
                    FileIoError::memory_mapping(format!("Failed to map file: {}", e))
                })?
            };

            // Advise kernel about our access pattern on Unix systems
            #[cfg(unix)]
            {
                if let Err(e) = map.advise(memmap2::Advice::Sequential) {
                    // Non-fatal - log and continue
                    log::warn!("Failed to set mmap advice: {}", e);
                }
            }
            MapStorage::ReadOnly(map)
        };

        Ok(Self {
            storage,
            pos: 0,
            _handle: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.storage, MapStorage::ReadWrite(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match &self.storage {
            MapStorage::ReadOnly(map) => &map[..],
            MapStorage::ReadWrite(map) => &map[..],
        }
    }

    /// Mutable access to the mapped bytes; fails for read-only regions
    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8]> {
        match &mut self.storage {
            MapStorage::ReadWrite(map) => Ok(&mut map[..]),
            MapStorage::ReadOnly(_) => Err(FileIoError::memory_mapping(
                "region is mapped read-only",
            )),
        }
    }

    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Move the region's cursor; the result must lie within `[0, len]`.
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<usize> {
        let base = match origin {
            SeekOrigin::Start => 0i128,
            SeekOrigin::Current => self.pos as i128,
            SeekOrigin::End => self.len() as i128,
        };
        let target = base + offset as i128;
        if target < 0 || target > self.len() as i128 {
            return Err(FileIoError::InvalidOffset { position: target });
        }
        self.pos = target as usize;
        Ok(self.pos)
    }

    /// Up to `size` bytes from the cursor, or the rest of the region
    pub fn read(&mut self, size: Option<usize>) -> &[u8] {
        let start = self.pos;
        let end = match size {
            Some(size) => start.saturating_add(size).min(self.len()),
            None => self.len(),
        };
        self.pos = end;
        &self.as_bytes()[start..end]
    }

    /// Next line including its `\n`; `None` at the end of the region
    pub fn read_line(&mut self) -> Option<&[u8]> {
        let start = self.pos;
        let bytes = self.as_bytes();
        if start >= bytes.len() {
            return None;
        }
        let end = memchr::memchr(b'\n', &bytes[start..])
            .map(|offset| start + offset + 1)
            .unwrap_or(bytes.len());
        self.pos = end;
        Some(&self.as_bytes()[start..end])
    }

    /// Overwrite bytes at the cursor. A mapping cannot grow, so writing past
    /// its end is an error and leaves the region untouched.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let start = self.pos;
        let end = start + bytes.len();
        let length = self.len();
        let target = self.as_bytes_mut()?;
        if end > length {
            return Err(FileIoError::memory_mapping(format!(
                "write of {} bytes at {} exceeds mapped length {}",
                bytes.len(),
                start,
                length
            )));
        }
        target[start..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Flush modified pages to the file
    pub fn flush(&self) -> Result<()> {
        match &self.storage {
            MapStorage::ReadWrite(map) => map
                .flush()
                .map_err(|e| FileIoError::memory_mapping(format!("Failed to flush mapping: {}", e))),
            MapStorage::ReadOnly(_) => Ok(()),
        }
    }

    /// Flush and unmap
    pub fn close(self) -> Result<()> {
        self.flush()
    }
}
