// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! Byte streams backing message bodies and uploaded files.
//!
//! A [`Stream`] owns one [`Resource`] until it is detached or closed. Its
//! capabilities are derived from the open mode once, when it is created.

use std::{
    fs::{File, OpenOptions},
    io::{self, Cursor, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::{debug, trace};

use crate::{
    Error,
    Result,
};

/// The mode given to text and byte payloads.
const MEMORY_MODE: &str = "w+b";

/// The underlying I/O resource of a stream.
#[derive(Debug)]
pub enum Resource {
    Memory(Cursor<Vec<u8>>),
    File(File),
}

impl Read for Resource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.read(buf),
            Self::File(file) => file.read(buf),
        }
    }
}

impl Write for Resource {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Memory(cursor) => cursor.write(buf),
            Self::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Memory(cursor) => cursor.flush(),
            Self::File(file) => file.flush(),
        }
    }
}

impl Seek for Resource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Memory(cursor) => cursor.seek(pos),
            Self::File(file) => file.seek(pos),
        }
    }
}

/// An `fopen`-style mode, e.g. `"r"`, `"w+b"` or `"a+"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenMode {
    text: String,
    pub readable: bool,
    pub writable: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub create_new: bool,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Result<OpenMode> {
        let base: String = mode.chars().filter(|c| !matches!(c, 'b' | 't')).collect();

        let mut open_mode = OpenMode {
            text: mode.to_owned(),
            readable: false,
            writable: false,
            append: false,
            truncate: false,
            create: false,
            create_new: false,
        };

        let plus = base.ends_with('+');
        match base.trim_end_matches('+') {
            _ if base.matches('+').count() > 1 => return Err(invalid_mode(mode)),
            "r" => {
                open_mode.readable = true;
                open_mode.writable = plus;
            }
            "w" => {
                open_mode.writable = true;
                open_mode.readable = plus;
                open_mode.truncate = true;
                open_mode.create = true;
            }
            "a" => {
                open_mode.writable = true;
                open_mode.readable = plus;
                open_mode.append = true;
                open_mode.create = true;
            }
            "x" => {
                open_mode.writable = true;
                open_mode.readable = plus;
                open_mode.create_new = true;
            }
            "c" => {
                open_mode.writable = true;
                open_mode.readable = plus;
                open_mode.create = true;
            }
            _ => return Err(invalid_mode(mode)),
        }

        Ok(open_mode)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn to_open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.readable)
            .write(self.writable && !self.append)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        options
    }
}

fn invalid_mode(mode: &str) -> Error {
    debug!(mode, "rejected stream mode");
    Error::invalid_argument("mode", format!("unknown stream mode {mode:?}"))
}

/// What [`Stream::metadata`] reports about an attached stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamMetadata {
    pub mode: String,
    pub seekable: bool,

    /// The path of a file-backed stream.
    pub locator: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Stream {
    resource: Option<Resource>,
    mode: String,
    path: Option<PathBuf>,
    size: Option<u64>,
    readable: bool,
    writable: bool,
    seekable: bool,
    append: bool,
}

impl Stream {
    /// An empty, readable, writable and seekable in-memory stream.
    #[must_use]
    pub fn empty() -> Stream {
        Stream::from_bytes(Vec::new())
    }

    /// An in-memory stream holding the payload, positioned at its start.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Stream {
        let bytes = bytes.into();
        Stream {
            size: Some(bytes.len() as u64),
            resource: Some(Resource::Memory(Cursor::new(bytes))),
            mode: MEMORY_MODE.to_owned(),
            path: None,
            readable: true,
            writable: true,
            seekable: true,
            append: false,
        }
    }

    #[must_use]
    pub fn from_text(text: &str) -> Stream {
        Stream::from_bytes(text.as_bytes())
    }

    /// Opens the file at `path` with an `fopen`-style mode.
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Stream> {
        let path = path.as_ref();
        let open_mode = OpenMode::parse(mode)?;

        let file = open_mode.to_open_options().open(path).map_err(|error| {
            debug!(path = %path.display(), mode, %error, "unable to open stream");
            Error::Runtime(error)
        })?;

        Ok(Stream::attach(Resource::File(file), &open_mode, Some(path.to_path_buf())))
    }

    /// Wraps an already opened resource, e.g. one taken from
    /// [`Stream::detach`].
    pub fn from_resource(resource: Resource, mode: &str) -> Result<Stream> {
        let open_mode = OpenMode::parse(mode)?;
        Ok(Stream::attach(resource, &open_mode, None))
    }

    /// Wraps an opened file. The path, when known, is used for metadata and
    /// to re-stat the file size.
    pub fn from_file(file: File, mode: &str, path: Option<PathBuf>) -> Result<Stream> {
        let open_mode = OpenMode::parse(mode)?;
        Ok(Stream::attach(Resource::File(file), &open_mode, path))
    }

    fn attach(mut resource: Resource, mode: &OpenMode, path: Option<PathBuf>) -> Stream {
        let seekable = resource.stream_position().is_ok();
        Stream {
            resource: Some(resource),
            mode: mode.as_str().to_owned(),
            path,
            size: None,
            readable: mode.readable,
            writable: mode.writable,
            seekable,
            append: mode.append,
        }
    }

    #[must_use]
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    #[must_use]
    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.resource.is_none()
    }

    /// Reads up to `length` bytes. Fewer bytes are returned when the stream
    /// has fewer left.
    pub fn read(&mut self, length: usize) -> Result<Vec<u8>> {
        let resource = self.resource_for(self.readable, "read from")?;
        if length == 0 {
            return Ok(Vec::new());
        }

        let limit = u64::try_from(length).unwrap_or(u64::MAX);
        let mut buffer = Vec::new();
        Read::take(resource, limit).read_to_end(&mut buffer).map_err(|error| {
            debug!(%error, "unable to read from stream");
            Error::unreachable(format!("unable to read from stream: {error}"))
        })?;

        Ok(buffer)
    }

    /// Reads the remainder of the stream.
    pub fn contents(&mut self) -> Result<Vec<u8>> {
        let resource = self.resource_for(self.readable, "read from")?;

        let mut buffer = Vec::new();
        resource.read_to_end(&mut buffer).map_err(|error| {
            debug!(%error, "unable to read stream contents");
            Error::unreachable(format!("unable to read stream contents: {error}"))
        })?;

        Ok(buffer)
    }

    /// Reads the whole stream, from the start when it is seekable.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        if self.seekable {
            self.rewind()?;
        }

        self.contents()
    }

    /// Writes all bytes and returns how many were written.
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let append = self.append;
        let resource = self.resource_for(self.writable, "write to")?;

        let result = if append {
            resource.seek(SeekFrom::End(0)).and_then(|_| resource.write_all(bytes))
        } else {
            resource.write_all(bytes)
        };

        result.map_err(|error| {
            debug!(%error, "unable to write to stream");
            Error::unreachable(format!("unable to write to stream: {error}"))
        })?;

        self.size = None;
        Ok(bytes.len())
    }

    pub fn seek(&mut self, position: SeekFrom) -> Result<u64> {
        let resource = self.resource_for(self.seekable, "seek in")?;
        resource.seek(position).map_err(|error| {
            debug!(?position, %error, "unable to seek in stream");
            Error::Runtime(error)
        })
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// The current position of the stream.
    pub fn tell(&mut self) -> Result<u64> {
        let resource = self.resource_for(true, "tell")?;
        Ok(resource.stream_position()?)
    }

    /// Whether the position is at (or beyond) the end of the stream.
    pub fn eof(&mut self) -> Result<bool> {
        let position = self.tell()?;
        Ok(self.size().is_some_and(|size| position >= size))
    }

    /// The size in bytes, or `None` if it can't be determined. The size of a
    /// file is taken from a fresh `stat` and cached until the next write.
    pub fn size(&mut self) -> Option<u64> {
        if let Some(size) = self.size {
            return Some(size);
        }

        let size = match self.resource.as_ref()? {
            Resource::Memory(cursor) => Some(cursor.get_ref().len() as u64),
            Resource::File(file) => {
                let metadata = match &self.path {
                    Some(path) => std::fs::metadata(path),
                    None => file.metadata(),
                };
                trace!(path = ?self.path, "re-stat stream size");
                metadata.ok().map(|metadata| metadata.len())
            }
        };

        self.size = size;
        size
    }

    /// `None` when the stream is detached.
    #[must_use]
    pub fn metadata(&self) -> Option<StreamMetadata> {
        self.resource.as_ref()?;

        Some(StreamMetadata {
            mode: self.mode.clone(),
            seekable: self.seekable,
            locator: self.path.clone(),
        })
    }

    /// Releases the resource. Closing twice has no effect.
    pub fn close(&mut self) {
        if let Some(resource) = self.detach() {
            trace!("closing stream");
            drop(resource);
        }
    }

    /// Separates the resource from this stream, leaving the stream unusable.
    /// Returns `None` when already detached.
    pub fn detach(&mut self) -> Option<Resource> {
        let resource = self.resource.take()?;
        trace!(path = ?self.path, "detaching stream");

        self.size = None;
        self.path = None;
        self.readable = false;
        self.writable = false;
        self.seekable = false;
        self.append = false;
        Some(resource)
    }

    fn resource_for(&mut self, capable: bool, action: &str) -> Result<&mut Resource> {
        let Some(resource) = self.resource.as_mut() else {
            debug!(action, "stream is detached");
            return Err(Error::unreachable(format!("unable to {action} a detached stream")));
        };

        if !capable {
            debug!(action, "stream lacks capability");
            return Err(Error::unreachable(format!("unable to {action} the stream in mode {:?}", self.mode)));
        }

        Ok(resource)
    }
}

impl Default for Stream {
    fn default() -> Self {
        Stream::empty()
    }
}

impl From<&str> for Stream {
    fn from(text: &str) -> Self {
        Stream::from_text(text)
    }
}

impl From<String> for Stream {
    fn from(text: String) -> Self {
        Stream::from_bytes(text.into_bytes())
    }
}

impl From<Vec<u8>> for Stream {
    fn from(bytes: Vec<u8>) -> Self {
        Stream::from_bytes(bytes)
    }
}

impl From<&[u8]> for Stream {
    fn from(bytes: &[u8]) -> Self {
        Stream::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use rstest::rstest;

    #[test]
    fn test_text_payload_starts_at_zero() {
        let mut stream = Stream::from_text("hello world");
        assert_eq!(stream.tell().unwrap(), 0);
        assert_eq!(stream.size(), Some(11));
        assert!(stream.is_readable() && stream.is_writable() && stream.is_seekable());

        assert_eq!(stream.read(5).unwrap(), b"hello");
        assert_eq!(stream.read(0).unwrap(), b"");
        assert_eq!(stream.read(100).unwrap(), b" world");
        assert!(stream.eof().unwrap());
    }

    #[test]
    fn test_read_more_than_available() {
        let mut stream = Stream::from_text("abc");
        assert_eq!(stream.read(usize::MAX).unwrap(), b"abc");
        assert_eq!(stream.read(usize::MAX).unwrap(), b"");

        stream.rewind().unwrap();
        assert_eq!(stream.read(usize::MAX >> 1).unwrap(), b"abc");
    }

    #[test]
    fn test_write_invalidates_size() {
        let mut stream = Stream::empty();
        assert_eq!(stream.size(), Some(0));
        assert_eq!(stream.write(b"abc").unwrap(), 3);
        assert_eq!(stream.size(), Some(3));
        assert_eq!(stream.read_all().unwrap(), b"abc");
    }

    #[test]
    fn test_seek_and_contents() {
        let mut stream = Stream::from_text("0123456789");
        assert_eq!(stream.seek(SeekFrom::Start(4)).unwrap(), 4);
        assert_eq!(stream.contents().unwrap(), b"456789");
        assert_eq!(stream.seek(SeekFrom::End(-2)).unwrap(), 8);
        assert_eq!(stream.contents().unwrap(), b"89");
        stream.rewind().unwrap();
        assert!(!stream.eof().unwrap());
    }

    #[test]
    fn test_seek_before_start_is_runtime_error() {
        let mut stream = Stream::from_text("abc");
        assert_eq!(stream.seek(SeekFrom::Current(-10)).unwrap_err().kind(), ErrorKind::Runtime);
    }

    #[test]
    fn test_close_makes_stream_unreachable() {
        let mut stream = Stream::from_text("abc");
        stream.close();
        stream.close();

        assert_eq!(stream.read(1).unwrap_err().kind(), ErrorKind::UnreachableResource);
        assert_eq!(stream.write(b"x").unwrap_err().kind(), ErrorKind::UnreachableResource);
        assert_eq!(stream.seek(SeekFrom::Start(0)).unwrap_err().kind(), ErrorKind::UnreachableResource);
        assert_eq!(stream.tell().unwrap_err().kind(), ErrorKind::UnreachableResource);
        assert_eq!(stream.eof().unwrap_err().kind(), ErrorKind::UnreachableResource);
        assert_eq!(stream.size(), None);
        assert_eq!(stream.metadata(), None);
    }

    #[test]
    fn test_detach_transfers_resource() {
        let mut stream = Stream::from_text("abc");
        let resource = stream.detach().unwrap();
        assert!(stream.detach().is_none());
        assert!(stream.is_detached());
        assert!(!stream.is_readable() && !stream.is_writable() && !stream.is_seekable());

        let mut reattached = Stream::from_resource(resource, "r").unwrap();
        assert!(!reattached.is_writable());
        reattached.rewind().unwrap();
        assert_eq!(reattached.read(3).unwrap(), b"abc");
    }

    #[test]
    fn test_capabilities_follow_mode() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("body.txt");
        std::fs::write(&path, "payload").unwrap();

        let mut stream = Stream::open(&path, "r").unwrap();
        assert_eq!(stream.write(b"x").unwrap_err().kind(), ErrorKind::UnreachableResource);
        assert_eq!(stream.read(3).unwrap(), b"pay");

        let mut stream = Stream::open(&path, "a").unwrap();
        assert_eq!(stream.read(1).unwrap_err().kind(), ErrorKind::UnreachableResource);
        stream.write(b"!").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "payload!");
    }

    #[test]
    fn test_file_size_is_restated() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("grow.bin");

        let mut stream = Stream::open(&path, "w+b").unwrap();
        assert_eq!(stream.size(), Some(0));
        stream.write(b"12345").unwrap();
        assert_eq!(stream.size(), Some(5));

        let metadata = stream.metadata().unwrap();
        assert_eq!(metadata.mode, "w+b");
        assert!(metadata.seekable);
        assert_eq!(metadata.locator.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_open_missing_file() {
        let directory = tempfile::tempdir().unwrap();
        let error = Stream::open(directory.path().join("missing"), "r").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Runtime);
    }

    #[rstest]
    #[case("r", true, false)]
    #[case("rb", true, false)]
    #[case("r+", true, true)]
    #[case("w", false, true)]
    #[case("w+b", true, true)]
    #[case("a+", true, true)]
    #[case("x", false, true)]
    #[case("c+t", true, true)]
    fn test_open_mode(#[case] mode: &str, #[case] readable: bool, #[case] writable: bool) {
        let mode = OpenMode::parse(mode).unwrap();
        assert_eq!((mode.readable, mode.writable), (readable, writable));
    }

    #[rstest]
    #[case("")]
    #[case("q")]
    #[case("r++")]
    #[case("rw")]
    fn test_open_mode_invalid(#[case] mode: &str) {
        assert_eq!(OpenMode::parse(mode).unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}
