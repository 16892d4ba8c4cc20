//! Cursor bookkeeping over a backing stream.
//!
//! A [`Channel`] owns the stream behind one handle, the logical cursor, and a
//! read-ahead buffer used by line and character reads. For plain files the OS
//! position is always `pos + lookahead.len()`; anything that writes, seeks or
//! maps first gives the read-ahead back.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};

/// Bytes pulled from the stream per refill
const CHUNK_SIZE: usize = 8 * 1024;

/// Backing stream of a handle
pub(crate) enum Stream {
    /// Plain file (named or anonymous): readable, writable and seekable
    Plain(File),
    GzipReader(MultiGzDecoder<BufReader<File>>),
    GzipWriter(GzEncoder<File>),
    ZstdReader(zstd::stream::read::Decoder<'static, BufReader<File>>),
    ZstdWriter(zstd::stream::write::Encoder<'static, File>),
}

impl Stream {
    fn reader(&mut self) -> Option<&mut dyn Read> {
        match self {
            Self::Plain(file) => Some(file),
            Self::GzipReader(decoder) => Some(decoder),
            Self::ZstdReader(decoder) => Some(decoder),
            Self::GzipWriter(_) | Self::ZstdWriter(_) => None,
        }
    }

    fn writer(&mut self) -> Option<&mut dyn Write> {
        match self {
            Self::Plain(file) => Some(file),
            Self::GzipWriter(encoder) => Some(encoder),
            Self::ZstdWriter(encoder) => Some(encoder),
            Self::GzipReader(_) | Self::ZstdReader(_) => None,
        }
    }

    /// Start decompressing again from the first byte of the file
    fn restart(&mut self) -> io::Result<()> {
        match self {
            Self::GzipReader(decoder) => {
                let mut file = decoder.get_ref().get_ref().try_clone()?;
                file.seek(SeekFrom::Start(0))?;
                *decoder = MultiGzDecoder::new(BufReader::new(file));
            }
            Self::ZstdReader(decoder) => {
                let mut file = decoder.get_ref().get_ref().try_clone()?;
                file.seek(SeekFrom::Start(0))?;
                *decoder = zstd::stream::read::Decoder::with_buffer(BufReader::new(file))?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Flush and finalize; compressed writers emit their trailer here.
    fn finish(self) -> io::Result<()> {
        match self {
            Self::Plain(mut file) => file.flush(),
            Self::GzipWriter(encoder) => encoder.finish().map(drop),
            Self::ZstdWriter(encoder) => encoder.finish().map(drop),
            Self::GzipReader(_) | Self::ZstdReader(_) => Ok(()),
        }
    }
}

fn unsupported(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, what.to_string())
}

/// Logical cursor plus read-ahead over a [`Stream`]
pub(crate) struct Channel {
    stream: Stream,
    lookahead: Vec<u8>,
    pos: u64,
    append: bool,
}

impl Channel {
    pub(crate) fn new(stream: Stream, pos: u64, append: bool) -> Self {
        Self {
            stream,
            lookahead: Vec::new(),
            pos,
            append,
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.pos
    }

    pub(crate) fn is_plain(&self) -> bool {
        matches!(self.stream, Stream::Plain(_))
    }

    /// Writers that can only move forward (compressed encoders)
    pub(crate) fn is_sequential_writer(&self) -> bool {
        matches!(self.stream, Stream::GzipWriter(_) | Stream::ZstdWriter(_))
    }

    /// Length of the underlying resource, when it is knowable
    pub(crate) fn len(&self) -> io::Result<Option<u64>> {
        match &self.stream {
            Stream::Plain(file) => Ok(Some(file.metadata()?.len())),
            _ => Ok(None),
        }
    }

    /// Bytes read ahead but not yet consumed
    pub(crate) fn buffered(&self) -> &[u8] {
        &self.lookahead
    }

    /// Pull one more chunk into the read-ahead. Returns `false` at end of stream.
    pub(crate) fn fill(&mut self) -> io::Result<bool> {
        let reader = self
            .stream
            .reader()
            .ok_or_else(|| unsupported("stream is not readable"))?;
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => return Ok(false),
                Ok(n) => {
                    self.lookahead.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Take `n` buffered bytes, advancing the cursor
    pub(crate) fn consume(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.lookahead.len());
        self.pos += n as u64;
        self.lookahead.drain(..n).collect()
    }

    /// Read up to `limit` bytes; fewer only at end of stream.
    pub(crate) fn read_bytes(&mut self, limit: usize) -> io::Result<Vec<u8>> {
        while self.lookahead.len() < limit {
            if !self.fill()? {
                break;
            }
        }
        Ok(self.consume(limit))
    }

    /// Read everything up to end of stream
    pub(crate) fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        let mut data = std::mem::take(&mut self.lookahead);
        let reader = self
            .stream
            .reader()
            .ok_or_else(|| unsupported("stream is not readable"))?;
        reader.read_to_end(&mut data)?;
        self.pos += data.len() as u64;
        Ok(data)
    }

    /// Read through the end of the next line.
    ///
    /// `find_end` returns the exclusive end of the terminator within the slice
    /// it is given; slices always start on a `unit` boundary.
    pub(crate) fn read_line(
        &mut self,
        unit: usize,
        find_end: impl Fn(&[u8]) -> Option<usize>,
    ) -> io::Result<Vec<u8>> {
        let mut scanned = 0;
        loop {
            if let Some(end) = find_end(&self.lookahead[scanned..]) {
                return Ok(self.consume(scanned + end));
            }
            scanned = self.lookahead.len() - self.lookahead.len() % unit;
            if !self.fill()? {
                let rest = self.lookahead.len();
                return Ok(self.consume(rest));
            }
        }
    }

    /// Hand unconsumed read-ahead back to a plain file
    fn release_lookahead(&mut self) -> io::Result<()> {
        if let Stream::Plain(file) = &mut self.stream {
            if !self.lookahead.is_empty() {
                file.seek(SeekFrom::Start(self.pos))?;
                self.lookahead.clear();
            }
        }
        Ok(())
    }

    /// Write at the cursor (or at the end for append handles)
    pub(crate) fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.release_lookahead()?;
        match &mut self.stream {
            Stream::Plain(file) => {
                if self.append {
                    file.seek(SeekFrom::End(0))?;
                }
                file.write_all(bytes)?;
                self.pos = file.stream_position()?;
            }
            stream => {
                stream
                    .writer()
                    .ok_or_else(|| unsupported("stream is not writable"))?
                    .write_all(bytes)?;
                self.pos += bytes.len() as u64;
            }
        }
        Ok(())
    }

    /// Move the cursor to an absolute logical position.
    ///
    /// Compressed readers skip forward by decoding and restart for backward moves;
    /// they stop at end of stream, so the returned position may be short of
    /// `target`. Compressed writers only move forward, filling the gap with zeros
    /// one chunk at a time.
    pub(crate) fn seek_to(&mut self, target: u64) -> io::Result<u64> {
        if let Stream::Plain(file) = &mut self.stream {
            file.seek(SeekFrom::Start(target))?;
            self.lookahead.clear();
            self.pos = target;
            return Ok(target);
        }

        if self.is_sequential_writer() {
            if target < self.pos {
                return Err(unsupported("compressed writers cannot seek backward"));
            }
            let zeros = [0u8; CHUNK_SIZE];
            while self.pos < target {
                let step = (target - self.pos).min(CHUNK_SIZE as u64) as usize;
                self.write(&zeros[..step])?;
            }
            return Ok(self.pos);
        }

        if target < self.pos {
            self.stream.restart()?;
            self.lookahead.clear();
            self.pos = 0;
        }
        while self.pos < target {
            if self.lookahead.is_empty() && !self.fill()? {
                break;
            }
            let wanted = (target - self.pos).min(self.lookahead.len() as u64);
            self.consume(wanted as usize);
        }
        Ok(self.pos)
    }

    pub(crate) fn flush(&mut self) -> io::Result<()> {
        match self.stream.writer() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    /// The plain file behind this channel, synced so the file's content and
    /// position match the cursor. `None` for compressed streams.
    pub(crate) fn plain_file(&mut self) -> io::Result<Option<&File>> {
        self.release_lookahead()?;
        match &self.stream {
            Stream::Plain(file) => Ok(Some(file)),
            _ => Ok(None),
        }
    }

    /// Release the stream
    pub(crate) fn finish(self) -> io::Result<()> {
        self.stream.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn plain_channel(content: &[u8]) -> Channel {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(content).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        Channel::new(Stream::Plain(file), 0, false)
    }

    #[test]
    fn test_read_bytes_advances_cursor() {
        let mut channel = plain_channel(b"hello world");
        assert_eq!(channel.read_bytes(5).unwrap(), b"hello");
        assert_eq!(channel.position(), 5);
        assert_eq!(channel.read_to_end().unwrap(), b" world");
        assert_eq!(channel.position(), 11);
        assert!(channel.read_bytes(4).unwrap().is_empty());
    }

    #[test]
    fn test_read_line_keeps_terminator() {
        let mut channel = plain_channel(b"one\ntwo\nthree");
        let find = |bytes: &[u8]| memchr::memchr(b'\n', bytes).map(|p| p + 1);
        assert_eq!(channel.read_line(1, find).unwrap(), b"one\n");
        assert_eq!(channel.read_line(1, find).unwrap(), b"two\n");
        assert_eq!(channel.read_line(1, find).unwrap(), b"three");
        assert!(channel.read_line(1, find).unwrap().is_empty());
    }

    #[test]
    fn test_write_after_read_ahead_lands_at_cursor() {
        let mut channel = plain_channel(b"abcdefghij");
        let find = |bytes: &[u8]| memchr::memchr(b'\n', bytes).map(|p| p + 1);
        // Reads the whole file into the read-ahead buffer
        channel.read_bytes(2).unwrap();
        assert!(!channel.buffered().is_empty());

        channel.write(b"XY").unwrap();
        assert_eq!(channel.position(), 4);

        channel.seek_to(0).unwrap();
        assert_eq!(channel.read_line(1, find).unwrap(), b"abXYefghij");
    }

    #[test]
    fn test_long_line_spans_refills() {
        let mut content = vec![b'x'; CHUNK_SIZE * 3];
        content.push(b'\n');
        content.extend_from_slice(b"tail");
        let mut channel = plain_channel(&content);
        let find = |bytes: &[u8]| memchr::memchr(b'\n', bytes).map(|p| p + 1);

        let line = channel.read_line(1, find).unwrap();
        assert_eq!(line.len(), CHUNK_SIZE * 3 + 1);
        assert_eq!(channel.read_line(1, find).unwrap(), b"tail");
    }

    #[test]
    fn test_gzip_reader_seeks_both_ways() {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"0123456789").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut file = tempfile::tempfile().unwrap();
        file.write_all(&compressed).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        let stream = Stream::GzipReader(MultiGzDecoder::new(BufReader::new(file)));
        let mut channel = Channel::new(stream, 0, false);

        assert_eq!(channel.seek_to(6).unwrap(), 6);
        assert_eq!(channel.read_bytes(2).unwrap(), b"67");
        assert_eq!(channel.seek_to(1).unwrap(), 1);
        assert_eq!(channel.read_bytes(3).unwrap(), b"123");
        // Past the end stops at end of stream; the handle turns this into an error
        assert_eq!(channel.seek_to(100).unwrap(), 10);
        assert_eq!(channel.seek_to(4).unwrap(), 4);
        assert_eq!(channel.read_bytes(1).unwrap(), b"4");
    }

    #[test]
    fn test_gzip_writer_fills_large_gap_in_chunks() {
        let file = tempfile::tempfile().unwrap();
        let reopen = file.try_clone().unwrap();
        let stream = Stream::GzipWriter(GzEncoder::new(file, flate2::Compression::fast()));
        let mut channel = Channel::new(stream, 0, false);

        channel.write(b"head").unwrap();
        let target = (CHUNK_SIZE * 3 + 17) as u64;
        assert_eq!(channel.seek_to(target).unwrap(), target);
        assert_eq!(channel.position(), target);
        channel.write(b"tail").unwrap();
        channel.finish().unwrap();

        let mut reopen = reopen;
        reopen.seek(SeekFrom::Start(0)).unwrap();
        let mut decoded = Vec::new();
        MultiGzDecoder::new(reopen).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded.len(), CHUNK_SIZE * 3 + 21);
        assert_eq!(&decoded[..4], b"head");
        assert!(decoded[4..target as usize].iter().all(|&b| b == 0));
        assert_eq!(&decoded[target as usize..], b"tail");
    }
}
