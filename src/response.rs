//! HTTP response values.
//!
//! A [`Response`] is a [`Message`] plus a status code and a reason phrase. The
//! phrase is either set explicitly or falls back to the canonical phrase of the code.
//!
//! # Examples
//!
//! ```rust
//! use http_message_kit::{HttpMessage, Response, StatusCode};
//!
//! let response = Response::text("created")
//!     .with_status(201, None)?
//!     .with_header("Location", "/items/7")?;
//!
//! assert_eq!(response.status(), StatusCode::CREATED);
//! assert_eq!(response.reason_phrase(), "Created");
//! assert_eq!(response.header_line("content-type"), "text/plain; charset=utf-8");
//! # Ok::<(), http_message_kit::Error>(())
//! ```
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::headers::{Headers, Validated};
use crate::{Error, HttpMessage, Message, ProtocolVersion, Result, Stream};

/// An HTTP response: status, reason phrase, headers, body and protocol version.
#[derive(Debug, Clone)]
pub struct Response {
    pub(crate) message: Message,
    status: StatusCode,
    reason: Option<String>,
}

impl_message!(Response => message);

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl Response {
    /// Creates a response with the given status, the default headers and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            message: Message::new(),
            status,
            reason: None,
        }
    }

    /// Creates a `200 OK` response with a plain-text body.
    pub fn text(body: impl Into<String>) -> Self {
        let mut response = Self::default();
        response.set_content_type("text/plain; charset=utf-8");
        response.message.body = Stream::from_bytes(body.into());
        response
    }

    /// Creates a `200 OK` response with `value` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `value` cannot be serialized.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::{HttpMessage, Response};
    ///
    /// let response = Response::json(&serde_json::json!({ "id": 7 }))?;
    /// assert_eq!(response.header_line("Content-Type"), "application/json");
    /// assert_eq!(response.body().read_to_string()?.as_str(), r#"{"id":7}"#);
    /// # Ok::<(), http_message_kit::Error>(())
    /// ```
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self> {
        let data = serde_json::to_vec(value)
            .map_err(|error| Error::invalid_argument(format!("cannot serialize body: {error}")))?;
        let mut response = Self::default();
        response.set_content_type("application/json");
        response.message.body = Stream::from_bytes(Bytes::from(data));
        Ok(response)
    }

    fn set_content_type(&mut self, value: &'static str) {
        self.message.headers.set(
            Validated::new("Content-Type", value)
                .unwrap_or_else(|_| unreachable!("static content types are legal headers")),
        );
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the custom reason phrase, or the canonical one for the status code.
    ///
    /// Codes without a canonical phrase yield an empty string.
    pub fn reason_phrase(&self) -> &str {
        match &self.reason {
            Some(reason) => reason,
            None => self.status.canonical_reason().unwrap_or_default(),
        }
    }

    /// Returns a copy with another status code and, optionally, a custom reason phrase.
    ///
    /// `None` or an empty phrase selects the canonical phrase of the code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the code is outside `100..=599` or the
    /// phrase contains CR or LF.
    pub fn with_status(&self, code: u16, reason: Option<&str>) -> Result<Self> {
        if !(100..=599).contains(&code) {
            return Err(Error::invalid_argument(format!(
                "status code {code} is outside 100..=599"
            )));
        }
        let status = StatusCode::from_u16(code)
            .map_err(|error| Error::invalid_argument(format!("{code}: {error}")))?;
        let reason = reason.filter(|reason| !reason.is_empty());
        if reason.is_some_and(|reason| reason.contains(['\r', '\n'])) {
            return Err(Error::invalid_argument(
                "reason phrase cannot contain CR or LF",
            ));
        }

        let mut next = self.clone();
        next.status = status;
        next.reason = reason.map(str::to_owned);
        Ok(next)
    }
}

impl TryFrom<Response> for http::Response<Stream> {
    type Error = Error;

    fn try_from(response: Response) -> Result<Self> {
        let headers = HeaderMap::try_from(response.headers())?;
        let mut converted = http::Response::new(response.message.body);
        *converted.status_mut() = response.status;
        *converted.version_mut() = response.message.version.into();
        *converted.headers_mut() = headers;
        Ok(converted)
    }
}

impl TryFrom<http::Response<Stream>> for Response {
    type Error = Error;

    fn try_from(response: http::Response<Stream>) -> Result<Self> {
        let (parts, body) = response.into_parts();
        let version = ProtocolVersion::try_from(parts.version)?;
        let headers = Headers::try_from(&parts.headers)?;
        Ok(Self {
            message: Message::from_parts(version, headers, body),
            status: parts.status,
            reason: None,
        })
    }
}
