//! Uploaded files and the normalization of raw upload descriptors.
//!
//! A server hands over multipart uploads as a table of parallel arrays: one
//! array each for temporary paths, sizes, error codes, client file names and
//! client media types, nested as deep as the form field names. [`normalize_files`]
//! turns that table into a tree of [`UploadedFile`] handles with the same shape
//! as the form fields.
//!
//! An [`UploadedFile`] can be moved exactly once. Clones of a handle share the
//! moved state, so every message version that carries the handle sees the move.
mod normalize;

pub use normalize::{normalize_files, UploadTree};

use core::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::stream::{OpenMode, CHUNK_SIZE};
use crate::{Error, Result, Stream};

/// The outcome of an upload, as reported by the server.
///
/// The numeric codes are the ones servers conventionally report; `5` is unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum UploadErrorCode {
    /// The upload succeeded.
    #[default]
    Ok,
    /// The file exceeds the server's configured maximum size.
    IniSize,
    /// The file exceeds the maximum size declared by the form.
    FormSize,
    /// The file was only partially uploaded.
    Partial,
    /// No file was uploaded.
    NoFile,
    /// The server has no temporary directory.
    NoTmpDir,
    /// The file could not be written to disk.
    CantWrite,
    /// A server extension stopped the upload.
    Extension,
}

impl UploadErrorCode {
    /// Returns the numeric code.
    pub const fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::IniSize => 1,
            Self::FormSize => 2,
            Self::Partial => 3,
            Self::NoFile => 4,
            Self::NoTmpDir => 6,
            Self::CantWrite => 7,
            Self::Extension => 8,
        }
    }

    /// Returns `true` for [`UploadErrorCode::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns a human readable description.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Ok => "the file was uploaded successfully",
            Self::IniSize => "the file exceeds the server's maximum upload size",
            Self::FormSize => "the file exceeds the maximum size declared by the form",
            Self::Partial => "the file was only partially uploaded",
            Self::NoFile => "no file was uploaded",
            Self::NoTmpDir => "missing a temporary folder",
            Self::CantWrite => "failed to write the file to disk",
            Self::Extension => "a server extension stopped the upload",
        }
    }
}

impl fmt::Display for UploadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl TryFrom<i64> for UploadErrorCode {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self> {
        Ok(match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            other => {
                return Err(Error::invalid_argument(format!(
                    "unknown upload error code {other}"
                )))
            }
        })
    }
}

/// A file received through an upload.
///
/// The client file name and media type are whatever the client sent; never trust
/// them for anything security relevant.
///
/// # Examples
///
/// ```rust
/// use http_message_kit::{Error, Stream, UploadErrorCode, UploadedFile};
///
/// let dir = std::env::temp_dir().join("http-message-kit-doc");
/// std::fs::create_dir_all(&dir).unwrap();
///
/// let file = UploadedFile::new(
///     Stream::from_bytes("avatar bytes"),
///     Some(12),
///     UploadErrorCode::Ok,
///     Some("me.png".into()),
///     Some("image/png".into()),
/// );
/// let copy = file.clone();
///
/// file.move_to(dir.join("avatar.png"))?;
/// assert!(copy.is_moved());
/// assert!(matches!(copy.stream(), Err(Error::AlreadyMoved)));
/// # Ok::<(), Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct UploadedFile {
    stream: Option<Stream>,
    size: Option<u64>,
    error: UploadErrorCode,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    moved: Arc<AtomicBool>,
}

impl UploadedFile {
    /// Creates a handle over an already opened stream.
    pub fn new(
        stream: Stream,
        size: Option<u64>,
        error: UploadErrorCode,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Self {
        let mut file = Self::failed(size, error, client_filename, client_media_type);
        file.stream = Some(stream);
        file
    }

    /// Creates a handle for a temporary file on disk.
    ///
    /// The file is opened read-only, and only if `error` is [`UploadErrorCode::Ok`];
    /// a failed upload has nothing to open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the file cannot be opened.
    pub fn from_path(
        path: impl AsRef<Path>,
        size: Option<u64>,
        error: UploadErrorCode,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Result<Self> {
        if !error.is_ok() {
            return Ok(Self::failed(size, error, client_filename, client_media_type));
        }
        let stream = Stream::open_with(path.as_ref(), OpenMode::READ)?;
        Ok(Self::new(
            stream,
            size,
            error,
            client_filename,
            client_media_type,
        ))
    }

    pub(crate) fn failed(
        size: Option<u64>,
        error: UploadErrorCode,
        client_filename: Option<String>,
        client_media_type: Option<String>,
    ) -> Self {
        Self {
            stream: None,
            size,
            error,
            client_filename,
            client_media_type,
            moved: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the stream of the uploaded content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyMoved`] after a successful [`move_to`](UploadedFile::move_to)
    /// and [`Error::Upload`] if the upload failed.
    pub fn stream(&self) -> Result<&Stream> {
        if self.is_moved() {
            return Err(Error::AlreadyMoved);
        }
        self.source()
    }

    fn source(&self) -> Result<&Stream> {
        match &self.stream {
            Some(stream) if self.error.is_ok() => Ok(stream),
            _ => Err(Error::Upload(self.error)),
        }
    }

    /// Copies the uploaded content to `target` and marks the handle as moved.
    ///
    /// The source is rewound first when it is seekable, then copied in chunks of
    /// [`CHUNK_SIZE`] bytes until its end or a short write.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `target` is empty or is the file being moved
    /// - [`Error::AlreadyMoved`] if the handle, or a clone of it, was moved before
    /// - [`Error::Upload`] if the upload failed
    /// - [`Error::Transport`] if the target cannot be opened or written; the handle
    ///   stays unmoved in that case
    pub fn move_to(&self, target: impl AsRef<Path>) -> Result<()> {
        let target = target.as_ref();
        if target.as_os_str().is_empty() {
            return Err(Error::invalid_argument("target path cannot be empty"));
        }
        if self.is_moved() {
            return Err(Error::AlreadyMoved);
        }
        let source = self.source()?;

        if self
            .moved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyMoved);
        }

        match copy_to(source, target) {
            Ok(copied) => {
                log::debug!("moved uploaded file to {} ({copied} bytes)", target.display());
                Ok(())
            }
            Err(error) => {
                self.moved.store(false, Ordering::Release);
                Err(error)
            }
        }
    }

    /// Returns the size declared by the server, if known.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Returns the upload outcome.
    pub fn error(&self) -> UploadErrorCode {
        self.error
    }

    /// Returns the file name sent by the client.
    pub fn client_filename(&self) -> Option<&str> {
        self.client_filename.as_deref()
    }

    /// Returns the media type sent by the client.
    pub fn client_media_type(&self) -> Option<&str> {
        self.client_media_type.as_deref()
    }

    /// Parses the media type sent by the client.
    #[cfg(feature = "mime")]
    pub fn client_mime(&self) -> Option<mime::Mime> {
        self.client_media_type()?.parse().ok()
    }

    /// Returns `true` once the file was moved through this handle or a clone of it.
    pub fn is_moved(&self) -> bool {
        self.moved.load(Ordering::Acquire)
    }
}

fn copy_to(source: &Stream, target: &Path) -> Result<u64> {
    if source.path().is_some_and(|path| same_file(&path, target)) {
        return Err(Error::invalid_argument(format!(
            "cannot move uploaded file onto itself: {}",
            target.display()
        )));
    }
    if source.is_seekable() {
        source.rewind()?;
    }
    let destination = Stream::open_with(target, OpenMode::WRITE)?;
    let copied = copy_chunks(source, &destination, target)?;
    destination.close()?;
    Ok(copied)
}

// A target that does not exist yet cannot be the source.
fn same_file(source: &Path, target: &Path) -> bool {
    if source == target {
        return true;
    }
    match (std::fs::canonicalize(source), std::fs::canonicalize(target)) {
        (Ok(source), Ok(target)) => source == target,
        _ => false,
    }
}

fn copy_chunks(source: &Stream, destination: &Stream, target: &Path) -> Result<u64> {
    let mut copied = 0;
    while !source.eof() {
        let chunk = source.read(CHUNK_SIZE)?;
        if chunk.is_empty() {
            break;
        }
        let written = destination.write(&chunk)?;
        copied += written as u64;
        if written < chunk.len() {
            log::warn!(
                "short write moving upload to {}: {written} of {} bytes",
                target.display(),
                chunk.len()
            );
            break;
        }
    }
    Ok(copied)
}
