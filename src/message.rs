//! The immutable message model shared by requests and responses.
//!
//! A [`Message`] is a protocol version, a [`Headers`] bag and a body [`Stream`].
//! Every "mutation" is copy-on-write: the `with_*` methods of [`HttpMessage`]
//! never touch the receiver, they return a new value with one field replaced.
//!
//! [`HttpMessage`] is implemented by every level of the message hierarchy
//! ([`Message`], [`Request`](crate::Request), [`ServerRequest`](crate::ServerRequest)
//! and [`Response`](crate::Response)), so header and body operations return the
//! same type they were called on.
//!
//! # Examples
//!
//! ```rust
//! use http_message_kit::{HttpMessage, Message, ProtocolVersion};
//!
//! let original = Message::new();
//! let updated = original
//!     .with_protocol_version("2")?
//!     .with_header("Cache-Control", "no-store")?;
//!
//! assert_eq!(original.protocol_version(), ProtocolVersion::HTTP_11);
//! assert!(!original.has_header("cache-control"));
//! assert_eq!(updated.protocol_version().as_str(), "2");
//! assert_eq!(updated.header_line("CACHE-CONTROL"), "no-store");
//! # Ok::<(), http_message_kit::Error>(())
//! ```
use core::fmt;
use core::str::FromStr;

use crate::headers::{Headers, IntoHeaderValues, Validated};
use crate::{Error, Result, Stream};

/// The `Content-Type` every new message starts with.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// A supported HTTP protocol version.
///
/// The accepted spellings are `"1.0"`, `"1.1"`, `"2.0"` and `"2"`; the spelling is
/// kept as given, so `"2"` and `"2.0"` are distinct values that both denote HTTP/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolVersion(&'static str);

impl ProtocolVersion {
    /// HTTP/1.0
    pub const HTTP_10: Self = Self("1.0");
    /// HTTP/1.1, the default.
    pub const HTTP_11: Self = Self("1.1");
    /// HTTP/2, spelled `2.0`.
    pub const HTTP_20: Self = Self("2.0");
    /// HTTP/2, spelled `2`.
    pub const HTTP_2: Self = Self("2");

    /// Returns the version string, e.g. `"1.1"`.
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Default for ProtocolVersion {
    fn default() -> Self {
        Self::HTTP_11
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(version: &str) -> Result<Self> {
        [Self::HTTP_10, Self::HTTP_11, Self::HTTP_20, Self::HTTP_2]
            .into_iter()
            .find(|known| known.0 == version)
            .ok_or_else(|| {
                Error::invalid_argument(format!("unsupported HTTP protocol version {version:?}"))
            })
    }
}

impl TryFrom<&str> for ProtocolVersion {
    type Error = Error;

    fn try_from(version: &str) -> Result<Self> {
        version.parse()
    }
}

impl From<ProtocolVersion> for http::Version {
    fn from(version: ProtocolVersion) -> Self {
        match version.0 {
            "1.0" => http::Version::HTTP_10,
            "1.1" => http::Version::HTTP_11,
            _ => http::Version::HTTP_2,
        }
    }
}

impl TryFrom<http::Version> for ProtocolVersion {
    type Error = Error;

    fn try_from(version: http::Version) -> Result<Self> {
        match version {
            http::Version::HTTP_10 => Ok(Self::HTTP_10),
            http::Version::HTTP_11 => Ok(Self::HTTP_11),
            http::Version::HTTP_2 => Ok(Self::HTTP_2),
            other => Err(Error::invalid_argument(format!(
                "unsupported HTTP protocol version {other:?}"
            ))),
        }
    }
}

/// Protocol version, headers and body.
///
/// # Examples
///
/// ```rust
/// use http_message_kit::{HttpMessage, Message};
///
/// let message = Message::new();
/// assert_eq!(message.header_line("content-type"), "text/html; charset=utf-8");
/// assert_eq!(message.body().size(), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct Message {
    pub(crate) version: ProtocolVersion,
    pub(crate) headers: Headers,
    pub(crate) body: Stream,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    /// Creates an HTTP/1.1 message with the default `Content-Type` and an empty body.
    pub fn new() -> Self {
        let mut headers = Headers::new();
        headers.set(
            Validated::new("Content-Type", DEFAULT_CONTENT_TYPE)
                .unwrap_or_else(|_| unreachable!("default content type is a legal header")),
        );
        Self::from_parts(ProtocolVersion::default(), headers, Stream::temp())
    }

    /// Assembles a message from already validated parts.
    pub fn from_parts(version: ProtocolVersion, headers: Headers, body: Stream) -> Self {
        Self {
            version,
            headers,
            body,
        }
    }
}

pub(crate) mod sealed {
    use super::Message;

    pub trait Composed {
        fn message(&self) -> &Message;
        fn message_mut(&mut self) -> &mut Message;
    }
}

impl sealed::Composed for Message {
    fn message(&self) -> &Message {
        self
    }

    fn message_mut(&mut self) -> &mut Message {
        self
    }
}

impl HttpMessage for Message {}

/// Protocol version, header and body operations shared by every message type.
///
/// All `with_*` methods are copy-on-write. Validation always happens before the
/// copy is made, so a failing call leaves nothing half-applied.
pub trait HttpMessage: sealed::Composed + Clone {
    /// Returns the HTTP protocol version.
    fn protocol_version(&self) -> ProtocolVersion {
        self.message().version
    }

    /// Returns a copy using the given protocol version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the version is not one of `1.0`, `1.1`, `2.0`, `2`.
    fn with_protocol_version<V>(&self, version: V) -> Result<Self>
    where
        V: TryInto<ProtocolVersion>,
        Error: From<V::Error>,
    {
        let version = version.try_into()?;
        let mut next = self.clone();
        next.message_mut().version = version;
        Ok(next)
    }

    /// Returns all headers in emission order.
    fn headers(&self) -> &Headers {
        &self.message().headers
    }

    /// Returns `true` if the header exists, ignoring case.
    fn has_header(&self, name: &str) -> bool {
        self.headers().contains(name)
    }

    /// Returns the values of a header, or an empty slice if it is absent.
    fn header(&self, name: &str) -> &[String] {
        self.headers().get(name)
    }

    /// Returns the values of a header joined with `", "`, or an empty string.
    fn header_line(&self, name: &str) -> String {
        self.headers().get_line(name)
    }

    /// Returns a copy where `name` is set to `value`, replacing any existing values.
    ///
    /// The stored name keeps the casing given here. Values are trimmed of
    /// surrounding spaces and tabs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name is not an RFC 7230 token, a value
    /// contains a bare CR/LF or a byte outside the allowed range, or no value is given.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::{Error, HttpMessage, Message};
    ///
    /// let message = Message::new().with_header("x-request-id", "42")?;
    /// assert_eq!(message.header("X-Request-Id"), ["42"]);
    ///
    /// let err = message.with_header("X-Request-Id", "bad\r\nvalue").unwrap_err();
    /// assert!(matches!(err, Error::InvalidHeader(_)));
    /// # Ok::<(), Error>(())
    /// ```
    fn with_header(&self, name: &str, value: impl IntoHeaderValues) -> Result<Self> {
        let header = Validated::new(name, value)?;
        let mut next = self.clone();
        next.message_mut().headers.set(header);
        Ok(next)
    }

    /// Returns a copy with `value` appended to the existing values of `name`.
    ///
    /// Behaves like [`with_header`](HttpMessage::with_header) if the header is absent;
    /// otherwise the entry keeps its stored casing and position.
    ///
    /// # Errors
    ///
    /// Same as [`with_header`](HttpMessage::with_header).
    fn with_added_header(&self, name: &str, value: impl IntoHeaderValues) -> Result<Self> {
        let header = Validated::new(name, value)?;
        let mut next = self.clone();
        next.message_mut().headers.append(header);
        Ok(next)
    }

    /// Returns a copy without the header, or an unchanged copy if it is absent.
    fn without_header(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.message_mut().headers.remove(name);
        next
    }

    /// Returns the body stream.
    fn body(&self) -> &Stream {
        &self.message().body
    }

    /// Returns a copy with a different body.
    ///
    /// Passing a handle to the current body yields an unchanged copy.
    fn with_body(&self, body: Stream) -> Self {
        let mut next = self.clone();
        if !Stream::ptr_eq(&next.message().body, &body) {
            next.message_mut().body = body;
        }
        next
    }

    /// Parses the `Content-Type` header as a MIME type.
    #[cfg(feature = "mime")]
    fn mime(&self) -> Option<mime::Mime> {
        self.header("Content-Type").first()?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn new_message_defaults() {
        let message = Message::new();
        assert_eq!(message.protocol_version(), ProtocolVersion::HTTP_11);
        assert_eq!(message.headers().len(), 1);
        assert_eq!(message.header("content-type"), [DEFAULT_CONTENT_TYPE]);
        assert_eq!(message.body().size(), Some(0));
    }

    #[rstest]
    #[case("1.0")]
    #[case("1.1")]
    #[case("2.0")]
    #[case("2")]
    fn accepts_known_versions(#[case] version: &str) {
        let message = Message::new().with_protocol_version(version).unwrap();
        assert_eq!(message.protocol_version().as_str(), version);
    }

    #[rstest]
    #[case("0.9")]
    #[case("3")]
    #[case("HTTP/1.1")]
    #[case("")]
    fn rejects_unknown_versions(#[case] version: &str) {
        assert!(matches!(
            Message::new().with_protocol_version(version),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn typed_versions_are_accepted() {
        let message = Message::new()
            .with_protocol_version(ProtocolVersion::HTTP_20)
            .unwrap();
        assert_eq!(http::Version::from(message.protocol_version()), http::Version::HTTP_2);
    }

    #[rstest]
    #[case("X-Foo", "x-foo")]
    #[case("x-foo", "X-FOO")]
    #[case("X-FOO", "X-Foo")]
    fn header_names_ignore_case(#[case] written: &str, #[case] read: &str) {
        let message = Message::new().with_header(written, "v").unwrap();
        assert!(message.has_header(read));
        assert_eq!(message.header(read), ["v"]);
    }

    #[test]
    fn with_header_leaves_receiver_untouched() {
        let original = Message::new().with_header("Accept", "text/html").unwrap();
        let replaced = original.with_header("accept", "*/*").unwrap();

        assert_eq!(original.header("Accept"), ["text/html"]);
        assert_eq!(replaced.header("Accept"), ["*/*"]);
        assert_eq!(replaced.headers().stored_name("ACCEPT"), Some("accept"));
    }

    #[test]
    fn failed_validation_changes_nothing() {
        let original = Message::new().with_header("X-Keep", "kept").unwrap();
        assert!(original.with_header("X-Keep", ["fine", "bad\nvalue"]).is_err());
        assert!(original.with_added_header("X-Keep", "bad\r\nvalue").is_err());
        assert_eq!(original.header("x-keep"), ["kept"]);
    }

    #[test]
    fn added_header_appends() {
        let message = Message::new()
            .with_added_header("Accept-Encoding", "gzip")
            .unwrap()
            .with_added_header("accept-encoding", ["br", "zstd"])
            .unwrap();
        assert_eq!(message.header("ACCEPT-ENCODING"), ["gzip", "br", "zstd"]);
        assert_eq!(
            message.headers().stored_name("accept-encoding"),
            Some("Accept-Encoding")
        );
    }

    #[test]
    fn without_header_is_a_no_op_when_absent() {
        let message = Message::new();
        let same = message.without_header("X-Missing");
        assert_eq!(same.headers(), message.headers());

        let removed = message.without_header("CONTENT-TYPE");
        assert!(!removed.has_header("content-type"));
        assert!(message.has_header("content-type"));
    }

    #[test]
    fn with_body_replaces_or_short_circuits() {
        let message = Message::new();
        let same = message.with_body(message.body().clone());
        assert!(Stream::ptr_eq(same.body(), message.body()));

        let replaced = message.with_body(Stream::from_bytes("new"));
        assert!(!Stream::ptr_eq(replaced.body(), message.body()));
        assert_eq!(replaced.body().contents().unwrap(), "new");
        assert_eq!(message.body().size(), Some(0));
    }

    #[cfg(feature = "mime")]
    #[test]
    fn parses_content_type() {
        let message = Message::new()
            .with_header("Content-Type", "application/json; charset=utf-8")
            .unwrap();
        let mime = message.mime().unwrap();
        assert_eq!(mime.type_(), mime::APPLICATION);
        assert_eq!(mime.subtype(), mime::JSON);
    }
}
