//! Resource handles: one open file or stream with a cursor and an access mode.

use crate::error::{FileIoError, Result};
use crate::file_handler::channel::{Channel, Stream};
use crate::file_handler::compression::{self, CompressionType};
use crate::file_handler::encoding::{CharWidth, Encoding};
use crate::file_handler::mmap::MappedRegion;
use crate::file_handler::mode::AccessMode;
use std::fmt;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Reference point for [`Handle::seek`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
    End,
}

/// Content moved through a handle: text for text-mode handles, bytes for binary ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    Text(String),
    Bytes(Vec<u8>),
}

impl Data {
    pub fn is_empty(&self) -> bool {
        match self {
            Data::Text(text) => text.is_empty(),
            Data::Bytes(bytes) => bytes.is_empty(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Data::Text(text) => text.as_bytes(),
            Data::Bytes(bytes) => bytes,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Data::Text(text) => Some(text),
            Data::Bytes(_) => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Data::Text(text) => Some(text),
            Data::Bytes(_) => None,
        }
    }

    /// Raw bytes; text is returned as UTF-8
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Data::Text(text) => text.into_bytes(),
            Data::Bytes(bytes) => bytes,
        }
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Data::Text(text)
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Data::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Data::Bytes(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Data::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Data {
    fn from(bytes: &[u8; N]) -> Self {
        Data::Bytes(bytes.to_vec())
    }
}

/// How to open a resource: mode, text encoding and compression.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    mode: AccessMode,
    encoding: Option<Encoding>,
    compression: CompressionType,
    level: Option<u32>,
}

impl OpenOptions {
    pub fn new(mode: AccessMode) -> Self {
        Self {
            mode,
            encoding: None,
            compression: CompressionType::None,
            level: None,
        }
    }

    /// Text encoding; only valid for text modes. Defaults to UTF-8.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Codec level (gzip 0-9, zstd 1-22); codec default when unset
    pub fn compression_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    fn resolve_encoding(&self) -> Result<Option<Encoding>> {
        match (self.mode.is_text(), self.encoding) {
            (true, encoding) => Ok(Some(encoding.unwrap_or_default())),
            (false, None) => Ok(None),
            (false, Some(encoding)) => Err(FileIoError::invalid_argument(format!(
                "binary mode '{}' does not take an encoding (got {})",
                self.mode, encoding
            ))),
        }
    }

    /// Open `path`.
    ///
    /// # Errors
    /// * `NotFound` - the mode needs existing content and there is none
    /// * `AlreadyExists` - exclusive creation of an existing path
    /// * `PermissionDenied` - the caller lacks rights
    /// * `InvalidArgument` - an encoding was given for a binary mode
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Handle> {
        let path = path.as_ref();
        let encoding = self.resolve_encoding()?;

        let channel = if self.compression.is_compressed() {
            let stream = compression::open_stream(path, self.mode, self.compression, self.level)?;
            Channel::new(stream, 0, false)
        } else {
            let mut file = self
                .mode
                .to_open_options()
                .open(path)
                .map_err(|e| FileIoError::from_io(e, path))?;
            let pos = if self.mode.appends() {
                file.seek(SeekFrom::End(0))
                    .map_err(|e| FileIoError::from_io(e, path))?
            } else {
                0
            };
            Channel::new(Stream::Plain(file), pos, self.mode.appends())
        };

        log::debug!(
            "opened {} (mode={}, compression={})",
            path.display(),
            self.mode,
            self.compression.name()
        );

        Ok(Handle {
            info: HandleInfo {
                path: Some(path.to_path_buf()),
                mode: self.mode,
                encoding,
                compression: self.compression,
            },
            channel: Some(channel),
        })
    }
}

/// Everything about a handle except its stream
#[derive(Debug, Clone)]
struct HandleInfo {
    path: Option<PathBuf>,
    mode: AccessMode,
    encoding: Option<Encoding>,
    compression: CompressionType,
}

impl HandleInfo {
    fn display_path(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "<temporary>".to_string(),
        }
    }

    fn io_error(&self, err: std::io::Error) -> FileIoError {
        if self.compression.is_compressed()
            && matches!(
                err.kind(),
                std::io::ErrorKind::InvalidData | std::io::ErrorKind::InvalidInput
            )
        {
            return FileIoError::compression(format!(
                "corrupt {} stream in {}: {}",
                self.compression.name(),
                self.display_path(),
                err
            ));
        }
        match &self.path {
            Some(path) => FileIoError::from_io(err, path),
            None => FileIoError::file_error("I/O on temporary resource failed", err),
        }
    }

    fn require_readable(&self, operation: &'static str) -> Result<()> {
        if self.mode.readable() {
            Ok(())
        } else {
            Err(FileIoError::unsupported(operation, self.mode))
        }
    }

    fn require_writable(&self, operation: &'static str) -> Result<()> {
        if self.mode.writable() {
            Ok(())
        } else {
            Err(FileIoError::unsupported(operation, self.mode))
        }
    }
}

/// An open file or stream.
///
/// The handle owns its resource exclusively. It is released exactly once, by
/// [`Handle::close`] or when the handle is dropped; any operation after
/// `close` fails with [`FileIoError::ClosedHandle`].
pub struct Handle {
    info: HandleInfo,
    channel: Option<Channel>,
}

impl Handle {
    /// Open `path` under `mode`; text modes use `encoding` or UTF-8.
    pub fn open(
        path: impl AsRef<Path>,
        mode: AccessMode,
        encoding: Option<Encoding>,
    ) -> Result<Self> {
        let mut options = OpenOptions::new(mode);
        if let Some(encoding) = encoding {
            options = options.encoding(encoding);
        }
        options.open(path)
    }

    /// Create an anonymous resource that is removed when the handle is released.
    ///
    /// The mode must be an update mode (`w+`, `w+b`, ...): a temporary resource
    /// is only useful if it can be read back.
    pub fn temporary(mode: AccessMode, encoding: Option<Encoding>) -> Result<Self> {
        if !(mode.readable() && mode.writable()) {
            return Err(FileIoError::invalid_argument(format!(
                "temporary resources need an update mode, got '{}'",
                mode
            )));
        }
        let mut options = OpenOptions::new(mode);
        if let Some(encoding) = encoding {
            options = options.encoding(encoding);
        }
        let encoding = options.resolve_encoding()?;

        let file = tempfile::tempfile()
            .map_err(|e| FileIoError::file_error("Failed to create temporary file", e))?;
        log::debug!("opened temporary resource (mode={})", mode);

        Ok(Self {
            info: HandleInfo {
                path: None,
                mode,
                encoding,
                compression: CompressionType::None,
            },
            channel: Some(Channel::new(Stream::Plain(file), 0, mode.appends())),
        })
    }

    /// Path of the resource; `None` for temporary resources
    pub fn path(&self) -> Option<&Path> {
        self.info.path.as_deref()
    }

    pub fn mode(&self) -> AccessMode {
        self.info.mode
    }

    /// Text encoding; `None` for binary handles
    pub fn encoding(&self) -> Option<Encoding> {
        self.info.encoding
    }

    pub fn compression(&self) -> CompressionType {
        self.info.compression
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_none()
    }

    fn split(&mut self, operation: &'static str) -> Result<(&HandleInfo, &mut Channel)> {
        match self.channel.as_mut() {
            Some(channel) => Ok((&self.info, channel)),
            None => Err(FileIoError::closed(operation)),
        }
    }

    /// Read up to `size` units (characters for text, bytes for binary), or
    /// everything remaining when `size` is `None`.
    ///
    /// Returns empty data at end of stream.
    pub fn read(&mut self, size: Option<usize>) -> Result<Data> {
        let (info, channel) = self.split("read")?;
        info.require_readable("read")?;

        match (info.encoding, size) {
            (None, Some(size)) => channel
                .read_bytes(size)
                .map(Data::Bytes)
                .map_err(|e| info.io_error(e)),
            (None, None) => channel
                .read_to_end()
                .map(Data::Bytes)
                .map_err(|e| info.io_error(e)),
            (Some(encoding), Some(count)) => read_chars(info, channel, encoding, count).map(Data::Text),
            (Some(encoding), None) => {
                let bytes = channel.read_to_end().map_err(|e| info.io_error(e))?;
                encoding.decode(&bytes).map(Data::Text)
            }
        }
    }

    /// Read all remaining content of a text handle
    pub fn read_to_string(&mut self) -> Result<String> {
        match self.read(None)? {
            Data::Text(text) => Ok(text),
            Data::Bytes(_) => Err(FileIoError::unsupported("read_to_string", self.info.mode)),
        }
    }

    /// Read the next line including its terminator; `None` at end of stream.
    pub fn read_line(&mut self) -> Result<Option<Data>> {
        let (info, channel) = self.split("read_line")?;
        info.require_readable("read_line")?;

        let line = match info.encoding {
            None => {
                let bytes = channel
                    .read_line(1, |bytes| memchr::memchr(b'\n', bytes).map(|pos| pos + 1))
                    .map_err(|e| info.io_error(e))?;
                Data::Bytes(bytes)
            }
            Some(encoding) => {
                let bytes = channel
                    .read_line(encoding.unit(), |bytes| encoding.find_line_end(bytes))
                    .map_err(|e| info.io_error(e))?;
                Data::Text(encoding.decode(&bytes)?)
            }
        };

        Ok(if line.is_empty() { None } else { Some(line) })
    }

    /// Lazily iterate the remaining lines.
    ///
    /// The iterator shares this handle's cursor and is single-pass: lines it
    /// yields are consumed from the handle.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { handle: self }
    }

    /// Read all remaining lines
    pub fn read_lines(&mut self) -> Result<Vec<Data>> {
        self.lines().collect()
    }

    /// Write at the cursor and return the number of units written
    /// (characters for text, bytes for binary).
    ///
    /// Update handles overwrite existing bytes in place; append handles always
    /// write at the end of the resource.
    pub fn write(&mut self, content: impl Into<Data>) -> Result<usize> {
        let content = content.into();
        let (info, channel) = self.split("write")?;
        info.require_writable("write")?;

        let (bytes, units) = match (info.encoding, content) {
            (Some(encoding), Data::Text(text)) => {
                let units = text.chars().count();
                (encoding.encode(&text)?, units)
            }
            (None, Data::Bytes(bytes)) => {
                let units = bytes.len();
                (bytes, units)
            }
            (Some(_), Data::Bytes(_)) => {
                return Err(FileIoError::unsupported("write bytes", info.mode));
            }
            (None, Data::Text(_)) => {
                return Err(FileIoError::unsupported("write text", info.mode));
            }
        };

        channel.write(&bytes).map_err(|e| info.io_error(e))?;
        Ok(units)
    }

    /// Write each item in order; no separators are added
    pub fn write_lines<I, D>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = D>,
        D: Into<Data>,
    {
        for line in lines {
            self.write(line)?;
        }
        Ok(())
    }

    /// Reposition the cursor and return the new position.
    ///
    /// # Errors
    /// * `InvalidOffset` - the resulting position is negative, or past the end
    ///   of a handle that cannot write (for compressed readers, the end of the
    ///   decompressed stream); the cursor is left where it was
    /// * `Unsupported` - `End` on a compressed stream, or moving a compressed
    ///   writer backward
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<u64> {
        let (info, channel) = self.split("seek")?;
        let length = channel.len().map_err(|e| info.io_error(e))?;

        let base = match origin {
            SeekOrigin::Start => 0i128,
            SeekOrigin::Current => channel.position() as i128,
            SeekOrigin::End => match length {
                Some(length) => length as i128,
                None => return Err(FileIoError::unsupported("seek from end", info.mode)),
            },
        };
        let target = base + offset as i128;

        if target < 0 || target > u64::MAX as i128 {
            return Err(FileIoError::InvalidOffset { position: target });
        }
        if let Some(length) = length {
            if !info.mode.writable() && target > length as i128 {
                return Err(FileIoError::InvalidOffset { position: target });
            }
        }
        if channel.is_sequential_writer() && (target as u64) < channel.position() {
            return Err(FileIoError::unsupported("seek backward", info.mode));
        }

        let previous = channel.position();
        let reached = channel
            .seek_to(target as u64)
            .map_err(|e| info.io_error(e))?;

        // A compressed reader only learns its length by hitting end of stream
        if reached < target as u64 && !info.mode.writable() {
            channel.seek_to(previous).map_err(|e| info.io_error(e))?;
            return Err(FileIoError::InvalidOffset { position: target });
        }
        Ok(reached)
    }

    /// Move the cursor back to the start
    pub fn rewind(&mut self) -> Result<()> {
        self.seek(0, SeekOrigin::Start).map(drop)
    }

    /// Current cursor position in bytes of the (decompressed) stream
    pub fn tell(&self) -> Result<u64> {
        self.channel
            .as_ref()
            .map(Channel::position)
            .ok_or_else(|| FileIoError::closed("tell"))
    }

    /// Push buffered writes to the operating system
    pub fn flush(&mut self) -> Result<()> {
        let (info, channel) = self.split("flush")?;
        channel.flush().map_err(|e| info.io_error(e))
    }

    /// Map the resource into memory.
    ///
    /// The region borrows the handle, so it is released before the handle is
    /// used or closed again. Update handles map read-write; others read-only.
    pub fn map_view(&mut self) -> Result<MappedRegion<'_>> {
        let (info, channel) = self.split("map_view")?;
        info.require_readable("map_view")?;
        if !channel.is_plain() {
            return Err(FileIoError::unsupported("map compressed stream", info.mode));
        }

        let writable = info.mode.writable();
        let file = channel
            .plain_file()
            .map_err(|e| info.io_error(e))?
            .ok_or_else(|| FileIoError::unsupported("map compressed stream", info.mode))?;

        log::debug!("mapping {} (writable={})", info.display_path(), writable);
        MappedRegion::new(file, writable)
    }

    /// Release the resource. Closing an already closed handle is an error.
    pub fn close(&mut self) -> Result<()> {
        let channel = self.channel.take().ok_or_else(|| FileIoError::closed("close"))?;
        log::debug!("closing {}", self.info.display_path());
        channel.finish().map_err(|e| self.info.io_error(e))
    }
}

/// Read `count` characters, decoding only complete characters.
fn read_chars(
    info: &HandleInfo,
    channel: &mut Channel,
    encoding: Encoding,
    count: usize,
) -> Result<String> {
    let mut end = 0;
    let mut chars = 0;

    while chars < count {
        match encoding.char_width(&channel.buffered()[end..]) {
            CharWidth::Complete(width) => {
                end += width;
                chars += 1;
            }
            CharWidth::Invalid => {
                return Err(FileIoError::encoding(
                    encoding.name(),
                    format!("invalid byte sequence at position {}", channel.position() + end as u64),
                ));
            }
            CharWidth::Incomplete => {
                if !channel.fill().map_err(|e| info.io_error(e))? {
                    break;
                }
            }
        }
    }

    if chars < count && channel.buffered().len() > end {
        return Err(FileIoError::encoding(
            encoding.name(),
            "truncated character at end of stream",
        ));
    }

    let bytes = channel.consume(end);
    encoding.decode(&bytes)
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.finish() {
                log::warn!(
                    "implicit close of {} failed: {}",
                    self.info.display_path(),
                    e
                );
            }
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("path", &self.info.path)
            .field("mode", &self.info.mode.to_string())
            .field("encoding", &self.info.encoding)
            .field("compression", &self.info.compression)
            .field("position", &self.channel.as_ref().map(Channel::position))
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Forward-only iterator over the lines of a [`Handle`]
pub struct Lines<'h> {
    handle: &'h mut Handle,
}

impl Iterator for Lines<'_> {
    type Item = Result<Data>;

    fn next(&mut self) -> Option<Self::Item> {
        self.handle.read_line().transpose()
    }
}
