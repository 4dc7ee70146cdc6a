//! Byte streams backing message bodies and uploaded files.
//!
//! A [`Stream`] is a readable, writable and/or seekable sequence of bytes with
//! size and position metadata. Its capabilities come from two places:
//!
//! - **The open mode**: `"r"` streams cannot be written, `"w"` streams cannot be read
//!   (see [`OpenMode`])
//! - **The backend**: in-memory buffers and files can seek, plain readers and
//!   writers cannot
//!
//! Every operation that needs a missing capability fails with
//! [`Error::Transport`](crate::Error::Transport), as do failures of the backend itself.
//!
//! `Stream` is a handle: clones refer to the same underlying resource, the way
//! successive versions of one message refer to the same body. Use
//! [`Stream::ptr_eq`] to check whether two handles share a resource.
//!
//! # Examples
//!
//! ```rust
//! use http_message_kit::Stream;
//! use std::io::SeekFrom;
//!
//! let stream = Stream::temp();
//! stream.write(b"Hello, world!")?;
//! stream.seek(SeekFrom::Start(7))?;
//! assert_eq!(stream.read(5)?, "world");
//! assert_eq!(stream.size(), Some(13));
//! # Ok::<(), http_message_kit::Error>(())
//! ```
mod convert;
mod mode;

pub use mode::OpenMode;

use core::fmt::{self, Debug};
use core::pin::Pin;
use core::task::{Context, Poll};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use bytestr::ByteStr;
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Number of bytes moved per step when a stream is copied or polled as an HTTP body.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// The resource a [`Stream`] reads from and writes to.
///
/// Returned by [`Stream::detach`], which hands the resource over to the caller.
pub enum Backend {
    /// A growable in-memory buffer.
    Memory(Cursor<Vec<u8>>),
    /// A file opened from the filesystem.
    File(File),
    /// A read-only, non-seekable source such as a pipe or socket.
    Reader(Box<dyn Read + Send>),
    /// A write-only, non-seekable sink.
    Writer(Box<dyn Write + Send>),
}

impl Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

impl Backend {
    fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "MEMORY",
            Self::File(_) => "STDIO",
            Self::Reader(_) => "READER",
            Self::Writer(_) => "WRITER",
        }
    }

    fn is_seekable(&self) -> bool {
        matches!(self, Self::Memory(_) | Self::File(_))
    }

    fn reader(&mut self) -> Option<&mut dyn Read> {
        match self {
            Self::Memory(cursor) => Some(cursor as &mut dyn Read),
            Self::File(file) => Some(file as &mut dyn Read),
            Self::Reader(reader) => Some(reader as &mut dyn Read),
            Self::Writer(_) => None,
        }
    }

    fn writer(&mut self) -> Option<&mut dyn Write> {
        match self {
            Self::Memory(cursor) => Some(cursor as &mut dyn Write),
            Self::File(file) => Some(file as &mut dyn Write),
            Self::Reader(_) => None,
            Self::Writer(writer) => Some(writer as &mut dyn Write),
        }
    }

    fn seeker(&mut self) -> Option<&mut dyn Seek> {
        match self {
            Self::Memory(cursor) => Some(cursor as &mut dyn Seek),
            Self::File(file) => Some(file as &mut dyn Seek),
            Self::Reader(_) | Self::Writer(_) => None,
        }
    }

    fn measure(&self) -> Option<u64> {
        match self {
            Self::Memory(cursor) => Some(cursor.get_ref().len() as u64),
            Self::File(file) => file.metadata().ok().map(|metadata| metadata.len()),
            Self::Reader(_) | Self::Writer(_) => None,
        }
    }
}

struct Inner {
    // `None` once the stream was closed or detached.
    backend: Option<Backend>,
    mode: OpenMode,
    uri: Option<PathBuf>,
    size: Option<u64>,
    eof: bool,
    // Only tracked for backends that cannot report their own position.
    position: u64,
}

impl Inner {
    fn backend(&mut self) -> Result<&mut Backend> {
        self.backend
            .as_mut()
            .ok_or_else(|| Error::unsupported("stream is detached"))
    }
}

/// A readable, writable and/or seekable byte stream.
#[derive(Clone)]
pub struct Stream {
    inner: Arc<Mutex<Inner>>,
}

impl Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Stream")
            .field("backend", &state.backend)
            .field("mode", &state.mode.as_str())
            .field("uri", &state.uri)
            .finish()
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::temp()
    }
}

impl Stream {
    fn with_backend(backend: Backend, mode: OpenMode, uri: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                backend: Some(backend),
                mode,
                uri,
                size: None,
                eof: false,
                position: 0,
            })),
        }
    }

    /// Creates an empty, readable and writable in-memory stream.
    ///
    /// This is the body every message starts with.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::Stream;
    ///
    /// let stream = Stream::temp();
    /// assert_eq!(stream.size(), Some(0));
    /// assert!(stream.is_readable() && stream.is_writable() && stream.is_seekable());
    /// ```
    pub fn temp() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// Creates an in-memory stream holding `data`, positioned at the start.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::Stream;
    ///
    /// let stream = Stream::from_bytes("payload");
    /// assert_eq!(stream.contents()?, "payload");
    /// # Ok::<(), http_message_kit::Error>(())
    /// ```
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        Self::with_backend(
            Backend::Memory(Cursor::new(data.to_vec())),
            OpenMode::READ_WRITE,
            None,
        )
    }

    /// Opens a file with an `fopen`-style mode string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unknown mode and
    /// [`Error::Transport`] if the file cannot be opened.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use http_message_kit::Stream;
    ///
    /// let stream = Stream::open("/tmp/upload.bin", "rb")?;
    /// assert!(!stream.is_writable());
    /// # Ok::<(), http_message_kit::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let mode: OpenMode = mode.parse()?;
        Self::open_with(path.as_ref(), mode)
    }

    pub(crate) fn open_with(path: &Path, mode: OpenMode) -> Result<Self> {
        let file = mode.open_options().open(path).map_err(|error| {
            log::debug!("failed to open {} with mode {mode}: {error}", path.display());
            Error::Transport(error)
        })?;
        log::debug!("opened {} with mode {mode}", path.display());
        Ok(Self::with_backend(
            Backend::File(file),
            mode,
            Some(path.to_path_buf()),
        ))
    }

    /// Wraps a read-only, non-seekable source.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::with_backend(Backend::Reader(Box::new(reader)), OpenMode::READ, None)
    }

    /// Wraps a write-only, non-seekable sink.
    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        Self::with_backend(Backend::Writer(Box::new(writer)), OpenMode::WRITE, None)
    }

    // A panic while holding the lock leaves the stream state consistent, so
    // poisoning is ignored.
    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Path of the file backing this stream, if any.
    pub(crate) fn path(&self) -> Option<PathBuf> {
        self.state().uri.clone()
    }

    /// Returns `true` if both handles refer to the same underlying resource.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    /// Returns `true` if the stream can be read.
    pub fn is_readable(&self) -> bool {
        let state = self.state();
        state.backend.is_some() && state.mode.is_readable()
    }

    /// Returns `true` if the stream can be written.
    pub fn is_writable(&self) -> bool {
        let state = self.state();
        state.backend.is_some() && state.mode.is_writable()
    }

    /// Returns `true` if the stream supports [`seek`](Stream::seek).
    pub fn is_seekable(&self) -> bool {
        self.state()
            .backend
            .as_ref()
            .is_some_and(Backend::is_seekable)
    }

    /// Returns `true` if the stream was closed or detached.
    pub fn is_detached(&self) -> bool {
        self.state().backend.is_none()
    }

    /// Reads up to `max` bytes from the current position.
    ///
    /// An empty result with `max > 0` means the end of the stream was reached,
    /// after which [`eof`](Stream::eof) reports `true`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the stream is not readable or the read fails.
    pub fn read(&self, max: usize) -> Result<Bytes> {
        let mut state = self.state();
        if !state.mode.is_readable() {
            return Err(Error::unsupported("stream is not readable"));
        }
        let backend = state.backend()?;
        let reader = backend
            .reader()
            .ok_or_else(|| Error::unsupported("stream is not readable"))?;

        let mut buf = vec![0; max];
        let read = reader.read(&mut buf)?;
        buf.truncate(read);

        let exhausted = match backend {
            Backend::Memory(cursor) => cursor.position() >= cursor.get_ref().len() as u64,
            _ => false,
        };
        state.position += read as u64;
        if (read == 0 && max > 0) || exhausted {
            state.eof = true;
        }
        Ok(Bytes::from(buf))
    }

    /// Writes `data` at the current position and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the stream is not writable or the write fails.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut state = self.state();
        if !state.mode.is_writable() {
            return Err(Error::unsupported("stream is not writable"));
        }
        let writer = state
            .backend()?
            .writer()
            .ok_or_else(|| Error::unsupported("stream is not writable"))?;

        let written = writer.write(data)?;
        state.position += written as u64;
        state.size = None;
        Ok(written)
    }

    /// Moves the position, returning the new offset from the start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the stream is not seekable or the seek fails.
    pub fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let mut state = self.state();
        let seeker = state
            .backend()?
            .seeker()
            .ok_or_else(|| Error::unsupported("stream is not seekable"))?;

        let offset = seeker.seek(pos)?;
        state.position = offset;
        state.eof = false;
        Ok(offset)
    }

    /// Seeks back to the start of the stream.
    pub fn rewind(&self) -> Result<()> {
        self.seek(SeekFrom::Start(0)).map(drop)
    }

    /// Returns the current position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the stream is detached.
    pub fn tell(&self) -> Result<u64> {
        let mut state = self.state();
        let position = state.position;
        match state.backend()?.seeker() {
            Some(seeker) => Ok(seeker.stream_position()?),
            None => Ok(position),
        }
    }

    /// Returns `true` once a read hit the end of the stream, or if it is detached.
    pub fn eof(&self) -> bool {
        let state = self.state();
        state.backend.is_none() || state.eof
    }

    /// Returns the total size in bytes, if it can be determined.
    ///
    /// The size is cached until the next write.
    pub fn size(&self) -> Option<u64> {
        let mut state = self.state();
        if state.size.is_none() {
            state.size = state.backend.as_ref().and_then(Backend::measure);
        }
        state.size
    }

    /// Returns the stream metadata.
    ///
    /// Known keys are `mode`, `seekable`, `eof`, `stream_type` and, for files, `uri`.
    /// A detached stream has no metadata.
    pub fn metadata(&self) -> Map<String, Value> {
        let state = self.state();
        let Some(backend) = &state.backend else {
            return Map::new();
        };

        let mut metadata = Map::new();
        metadata.insert("mode".into(), state.mode.as_str().into());
        metadata.insert("seekable".into(), backend.is_seekable().into());
        metadata.insert("eof".into(), state.eof.into());
        metadata.insert("stream_type".into(), backend.kind().into());
        if let Some(uri) = &state.uri {
            metadata.insert("uri".into(), uri.display().to_string().into());
        }
        metadata
    }

    /// Returns one metadata entry, see [`metadata`](Stream::metadata).
    pub fn metadata_value(&self, key: &str) -> Option<Value> {
        self.metadata().remove(key)
    }

    /// Reads everything from the current position to the end.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the stream is not readable or a read fails.
    pub fn contents(&self) -> Result<Bytes> {
        let mut state = self.state();
        if !state.mode.is_readable() {
            return Err(Error::unsupported("stream is not readable"));
        }
        let reader = state
            .backend()?
            .reader()
            .ok_or_else(|| Error::unsupported("stream is not readable"))?;

        let mut buf = Vec::new();
        let read = reader.read_to_end(&mut buf)?;
        state.position += read as u64;
        state.eof = true;
        Ok(Bytes::from(buf))
    }

    /// Reads the whole stream as UTF-8 text, rewinding first when possible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if reading fails or the data is not valid UTF-8.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::Stream;
    ///
    /// let stream = Stream::from_bytes("Hello");
    /// stream.read(5)?;
    /// assert_eq!(stream.read_to_string()?.as_str(), "Hello");
    /// # Ok::<(), http_message_kit::Error>(())
    /// ```
    pub fn read_to_string(&self) -> Result<ByteStr> {
        if self.is_seekable() {
            self.rewind()?;
        }
        ByteStr::from_utf8(self.contents()?)
            .map_err(|error| Error::Transport(io::Error::new(io::ErrorKind::InvalidData, error)))
    }

    /// Closes the stream, releasing the underlying resource.
    ///
    /// Writers are flushed first. Closing an already detached stream does nothing.
    pub fn close(&self) -> Result<()> {
        match self.detach() {
            Some(Backend::Writer(mut writer)) => Ok(writer.flush()?),
            _ => Ok(()),
        }
    }

    /// Separates the underlying resource from the stream and returns it.
    ///
    /// The stream is unusable afterwards; every handle sharing it observes the detach.
    pub fn detach(&self) -> Option<Backend> {
        let mut state = self.state();
        state.size = None;
        state.uri = None;
        state.backend.take()
    }
}

impl http_body::Body for Stream {
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<core::result::Result<http_body::Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(match self.read(CHUNK_SIZE) {
            Ok(data) if data.is_empty() => None,
            Ok(data) => Some(Ok(http_body::Frame::data(data))),
            Err(error) => Some(Err(error)),
        })
    }

    fn is_end_stream(&self) -> bool {
        self.eof()
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match (self.size(), self.tell()) {
            (Some(size), Ok(position)) => {
                http_body::SizeHint::with_exact(size.saturating_sub(position))
            }
            _ => http_body::SizeHint::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body::Body as _;
    use std::task::Waker;

    #[test]
    fn memory_stream_round_trip() {
        let stream = Stream::temp();
        assert_eq!(stream.write(b"abcdef").unwrap(), 6);
        assert_eq!(stream.tell().unwrap(), 6);
        assert_eq!(stream.size(), Some(6));

        stream.rewind().unwrap();
        assert_eq!(stream.read(4).unwrap(), "abcd");
        assert!(!stream.eof());
        assert_eq!(stream.read(4).unwrap(), "ef");
        assert!(stream.eof());

        stream.seek(SeekFrom::End(-3)).unwrap();
        assert!(!stream.eof());
        assert_eq!(stream.contents().unwrap(), "def");
    }

    #[test]
    fn size_cache_is_invalidated_by_writes() {
        let stream = Stream::from_bytes("abc");
        assert_eq!(stream.size(), Some(3));
        stream.seek(SeekFrom::End(0)).unwrap();
        stream.write(b"de").unwrap();
        assert_eq!(stream.size(), Some(5));
    }

    #[test]
    fn reader_cannot_write_or_seek() {
        let stream = Stream::from_reader(&b"pipe data"[..]);
        assert!(stream.is_readable());
        assert!(!stream.is_writable());
        assert!(!stream.is_seekable());
        assert_eq!(stream.size(), None);

        assert!(stream.write(b"x").unwrap_err().is_transport());
        assert!(stream.seek(SeekFrom::Start(0)).unwrap_err().is_transport());

        assert_eq!(stream.read(4).unwrap(), "pipe");
        assert_eq!(stream.tell().unwrap(), 4);
    }

    #[test]
    fn writer_cannot_read() {
        let stream = Stream::from_writer(Vec::<u8>::new());
        assert!(stream.read(1).unwrap_err().is_transport());
        assert_eq!(stream.write(b"ok").unwrap(), 2);
        assert_eq!(stream.tell().unwrap(), 2);
    }

    #[test]
    fn detach_disables_every_handle() {
        let stream = Stream::from_bytes("data");
        let other = stream.clone();
        assert!(Stream::ptr_eq(&stream, &other));

        let backend = stream.detach();
        assert!(matches!(backend, Some(Backend::Memory(_))));
        assert!(other.is_detached());
        assert!(other.eof());
        assert!(!other.is_readable());
        assert!(other.read(1).unwrap_err().is_transport());
        assert!(other.metadata().is_empty());
        assert!(stream.detach().is_none());
    }

    #[test]
    fn metadata_describes_backend() {
        let stream = Stream::temp();
        assert_eq!(stream.metadata_value("mode"), Some(Value::from("r+b")));
        assert_eq!(stream.metadata_value("seekable"), Some(Value::from(true)));
        assert_eq!(stream.metadata_value("stream_type"), Some(Value::from("MEMORY")));
        assert_eq!(stream.metadata_value("uri"), None);
    }

    #[test]
    fn files_honor_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.txt");

        let writer = Stream::open(&path, "w").unwrap();
        assert!(!writer.is_readable());
        writer.write(b"file body").unwrap();
        writer.close().unwrap();

        let reader = Stream::open(&path, "r").unwrap();
        assert_eq!(reader.size(), Some(9));
        assert!(reader.write(b"x").unwrap_err().is_transport());
        assert_eq!(reader.read_to_string().unwrap().as_str(), "file body");
        assert_eq!(
            reader.metadata_value("uri"),
            Some(Value::from(path.display().to_string()))
        );

        assert!(matches!(
            Stream::open(&path, "z"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(Stream::open(dir.path().join("missing"), "r")
            .unwrap_err()
            .is_transport());
    }

    #[test]
    fn polls_as_http_body() {
        let mut stream = Stream::from_bytes(vec![7u8; CHUNK_SIZE + 10]);
        assert_eq!(stream.size_hint().exact(), Some(CHUNK_SIZE as u64 + 10));

        let mut cx = Context::from_waker(Waker::noop());
        let mut total = 0;
        while let Poll::Ready(Some(frame)) = Pin::new(&mut stream).poll_frame(&mut cx) {
            total += frame.unwrap().into_data().unwrap().len();
        }
        assert_eq!(total, CHUNK_SIZE + 10);
        assert!(stream.is_end_stream());
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let stream = Stream::from_bytes(vec![0xFF, 0xFE]);
        assert!(stream.read_to_string().unwrap_err().is_transport());
    }
}
