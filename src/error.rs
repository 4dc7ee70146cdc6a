//! Error types and utilities.
//!
//! Every fallible operation in this crate returns [`Result`], whose error type is the
//! single [`Error`] enum. The variants mirror the ways a message can be misused:
//!
//! - [`Error::InvalidArgument`] - malformed input to a constructor or `with_*` method
//! - [`Error::InvalidHeader`] - a header name or value that is not legal on the wire
//! - [`Error::AlreadyMoved`] - an uploaded file was used after it was moved
//! - [`Error::Upload`] - the stream of a failed upload was requested
//! - [`Error::Transport`] - the underlying stream could not be read, written or seeked
//!
//! Errors also carry the HTTP status an application would most likely answer with,
//! see [`Error::status`].
//!
//! # Examples
//!
//! ```rust
//! use http_message_kit::{Error, Message, HttpMessage, StatusCode};
//!
//! let err = Message::new().with_header("bad header", "value").unwrap_err();
//! assert!(matches!(err, Error::InvalidHeader(_)));
//! assert_eq!(err.status(), StatusCode::BAD_REQUEST);
//! ```
use std::io;

use http::StatusCode;

use crate::upload::UploadErrorCode;

/// The error type of every operation in this crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed input to a constructor or `with_*` method.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A header name or value failed the RFC 7230 legality check.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The uploaded file has already been moved.
    #[error("uploaded file has already been moved")]
    AlreadyMoved,
    /// The upload failed on the client or server side, so there is no stream to use.
    #[error("cannot access uploaded file: {0}")]
    Upload(UploadErrorCode),
    /// The underlying stream reported a failure or lacks the requested capability.
    #[error("stream transport failure: {0}")]
    Transport(#[from] io::Error),
}

/// A specialized Result type for message operations.
pub type Result<T> = core::result::Result<T, Error>;

impl From<core::convert::Infallible> for Error {
    fn from(never: core::convert::Infallible) -> Self {
        match never {}
    }
}

impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_header(msg: impl Into<String>) -> Self {
        Self::InvalidHeader(msg.into())
    }

    pub(crate) fn unsupported(msg: &'static str) -> Self {
        Self::Transport(io::Error::new(io::ErrorKind::Unsupported, msg))
    }

    /// Returns the HTTP status code an application would answer this error with.
    ///
    /// Input errors map to `400 Bad Request`; everything else is a server-side
    /// failure and maps to `500 Internal Server Error`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::{Error, StatusCode};
    ///
    /// assert_eq!(Error::AlreadyMoved.status(), StatusCode::INTERNAL_SERVER_ERROR);
    /// ```
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidArgument(_) | Self::InvalidHeader(_) | Self::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::AlreadyMoved | Self::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` if this error came from the underlying stream.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
