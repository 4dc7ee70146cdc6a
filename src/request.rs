//! Outgoing HTTP request values.
//!
//! A [`Request`] is a [`Message`] plus a method, a target [`Uri`] and an optional
//! request-target override. Like every message type it is immutable: the `with_*`
//! methods return a modified copy.
//!
//! # Examples
//!
//! ```rust
//! use http_message_kit::{HttpMessage, Method, Request};
//!
//! let request = Request::new("get", "http://example.com:8080/users?page=2")?;
//! assert_eq!(request.method(), Method::GET);
//! assert_eq!(request.request_target(), "/users?page=2");
//!
//! // The Host header is derived from the URI and emitted first.
//! assert_eq!(request.headers().iter().next().unwrap().0, "Host");
//! assert_eq!(request.header_line("host"), "example.com:8080");
//! # Ok::<(), http_message_kit::Error>(())
//! ```
use core::fmt::Display;

use http::{HeaderMap, Method, Uri};

use crate::headers::{Headers, Validated};
use crate::{Error, HttpMessage, Message, ProtocolVersion, Result, Stream};

/// The request methods a [`Request`] accepts.
pub const METHODS: [&str; 8] = [
    "GET", "POST", "PUT", "DELETE", "OPTIONS", "PATCH", "HEAD", "CONNECT",
];

/// An HTTP request: method, target URI, headers, body and protocol version.
///
/// Header and body operations come from [`HttpMessage`].
#[derive(Debug, Clone)]
pub struct Request {
    pub(crate) message: Message,
    method: Method,
    uri: Uri,
    request_target: Option<String>,
}

impl_message!(Request => message);

pub(crate) fn parse_method(method: &str) -> Result<Method> {
    let upper = method.to_ascii_uppercase();
    if !METHODS.contains(&upper.as_str()) {
        return Err(Error::invalid_argument(format!(
            "unsupported HTTP method {method:?}"
        )));
    }
    Method::from_bytes(upper.as_bytes())
        .map_err(|error| Error::invalid_argument(format!("{method:?}: {error}")))
}

pub(crate) fn parse_uri<U>(uri: U) -> Result<Uri>
where
    U: TryInto<Uri>,
    U::Error: Display,
{
    uri.try_into()
        .map_err(|error| Error::invalid_argument(format!("invalid URI: {error}")))
}

/// `host[:port]` of a URI, with the port only when it is written out.
fn host_header(uri: &Uri) -> Result<Option<Validated>> {
    let Some(host) = uri.host().filter(|host| !host.is_empty()) else {
        return Ok(None);
    };
    let value = match uri.port_u16() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    Validated::new("Host", value).map(Some)
}

impl Request {
    /// Creates a request with the default message parts and an empty body.
    ///
    /// The method is matched case-insensitively and stored uppercase. If the URI
    /// carries a host, a `Host` header is inserted first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unsupported method or an unparsable URI.
    pub fn new<U>(method: &str, uri: U) -> Result<Self>
    where
        U: TryInto<Uri>,
        U::Error: Display,
    {
        let method = parse_method(method)?;
        Self::from_parts(Message::new(), method, parse_uri(uri)?)
    }

    /// Creates a `GET` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unparsable URI.
    pub fn get<U>(uri: U) -> Result<Self>
    where
        U: TryInto<Uri>,
        U::Error: Display,
    {
        Self::from_parts(Message::new(), Method::GET, parse_uri(uri)?)
    }

    /// Creates a `POST` request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unparsable URI.
    pub fn post<U>(uri: U) -> Result<Self>
    where
        U: TryInto<Uri>,
        U::Error: Display,
    {
        Self::from_parts(Message::new(), Method::POST, parse_uri(uri)?)
    }

    pub(crate) fn from_parts(mut message: Message, method: Method, uri: Uri) -> Result<Self> {
        if !message.headers.contains("Host") {
            if let Some(host) = host_header(&uri)? {
                message.headers.set_first(host);
            }
        }
        Ok(Self {
            message,
            method,
            uri,
            request_target: None,
        })
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns a copy using another method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless the uppercased method is one of [`METHODS`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::{Error, Method, Request};
    ///
    /// let request = Request::get("/")?.with_method("patch")?;
    /// assert_eq!(request.method(), Method::PATCH);
    /// assert!(matches!(request.with_method("TRACE"), Err(Error::InvalidArgument(_))));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn with_method(&self, method: &str) -> Result<Self> {
        let method = parse_method(method)?;
        let mut next = self.clone();
        next.method = method;
        Ok(next)
    }

    /// Returns the target URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns a copy targeting another URI.
    ///
    /// Unless `preserve_host` is set and the request already has a non-empty `Host`,
    /// a URI with a host replaces the `Host` header and moves it to the front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the URI host cannot be used as a header value.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Result<Self> {
        if uri == self.uri {
            return Ok(self.clone());
        }

        let keep_host = preserve_host && !self.header_line("Host").is_empty();
        let host = if keep_host { None } else { host_header(&uri)? };

        let mut next = self.clone();
        next.uri = uri;
        if let Some(host) = host {
            next.message.headers.set_first(host);
        }
        Ok(next)
    }

    /// Returns the request target, e.g. `/search?q=rust`.
    ///
    /// An explicit override wins; otherwise the target is the URI path (`/` when
    /// empty) followed by `?query` when the query is non-empty.
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.request_target {
            return target.clone();
        }
        let path = match self.uri.path() {
            "" => "/",
            path => path,
        };
        match self.uri.query().filter(|query| !query.is_empty()) {
            Some(query) => format!("{path}?{query}"),
            None => path.to_owned(),
        }
    }

    /// Returns a copy with an explicit request target such as `*` or an absolute URI.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the target contains whitespace.
    pub fn with_request_target(&self, target: &str) -> Result<Self> {
        if target.chars().any(|c| c.is_ascii_whitespace()) {
            return Err(Error::invalid_argument(
                "request target cannot contain whitespace",
            ));
        }
        let mut next = self.clone();
        next.request_target = Some(target.to_owned());
        Ok(next)
    }
}

impl TryFrom<Request> for http::Request<Stream> {
    type Error = Error;

    fn try_from(request: Request) -> Result<Self> {
        let headers = HeaderMap::try_from(request.headers())?;
        let mut converted = http::Request::new(request.message.body);
        *converted.method_mut() = request.method;
        *converted.uri_mut() = request.uri;
        *converted.version_mut() = request.message.version.into();
        *converted.headers_mut() = headers;
        Ok(converted)
    }
}

impl TryFrom<http::Request<Stream>> for Request {
    type Error = Error;

    /// Imports an `http` request. The method must be one of [`METHODS`].
    fn try_from(request: http::Request<Stream>) -> Result<Self> {
        let (parts, body) = request.into_parts();
        let method = parse_method(parts.method.as_str())?;
        let version = ProtocolVersion::try_from(parts.version)?;
        let headers = Headers::try_from(&parts.headers)?;
        Self::from_parts(Message::from_parts(version, headers, body), method, parts.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("get", Method::GET)]
    #[case("Post", Method::POST)]
    #[case("options", Method::OPTIONS)]
    #[case("CONNECT", Method::CONNECT)]
    fn methods_are_uppercased(#[case] given: &str, #[case] expected: Method) {
        let request = Request::get("/").unwrap().with_method(given).unwrap();
        assert_eq!(request.method(), expected);
    }

    #[rstest]
    #[case("TRACE")]
    #[case("FETCH")]
    #[case("")]
    fn unknown_methods_are_rejected(#[case] method: &str) {
        assert!(matches!(
            Request::new(method, "/"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn host_comes_first_with_explicit_port() {
        let request = Request::get("/")
            .unwrap()
            .with_header("Accept", "*/*")
            .unwrap()
            .with_uri(Uri::from_static("http://example.com:8080/path"), false)
            .unwrap();

        let names: Vec<_> = request.headers().iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["Host", "Content-Type", "Accept"]);
        assert_eq!(request.header("host"), ["example.com:8080"]);
    }

    #[test]
    fn default_port_is_not_written() {
        let request = Request::get("https://example.com/").unwrap();
        assert_eq!(request.header_line("Host"), "example.com");
    }

    #[test]
    fn preserve_host_keeps_existing_header() {
        let request = Request::get("http://old.example/").unwrap();
        let moved = request
            .with_uri(Uri::from_static("http://new.example/"), true)
            .unwrap();
        assert_eq!(moved.header_line("Host"), "old.example");
        assert_eq!(moved.uri().host(), Some("new.example"));

        let replaced = request
            .with_uri(Uri::from_static("http://new.example/"), false)
            .unwrap();
        assert_eq!(replaced.header_line("Host"), "new.example");
    }

    #[test]
    fn preserve_host_without_host_header_still_sets_it() {
        let request = Request::get("/").unwrap();
        assert!(!request.has_header("Host"));
        let moved = request
            .with_uri(Uri::from_static("http://example.com/"), true)
            .unwrap();
        assert_eq!(moved.header_line("Host"), "example.com");
    }

    #[test]
    fn same_uri_short_circuits() {
        let request = Request::get("http://example.com/")
            .unwrap()
            .with_header("Host", "override.example")
            .unwrap();
        let same = request.with_uri(request.uri().clone(), false).unwrap();
        assert_eq!(same.header_line("Host"), "override.example");
    }

    #[test]
    fn explicit_host_header_is_kept_on_import() {
        let mut http_request = http::Request::new(Stream::temp());
        *http_request.uri_mut() = Uri::from_static("http://uri.example/");
        http_request
            .headers_mut()
            .insert(http::header::HOST, "header.example".parse().unwrap());

        let request = Request::try_from(http_request).unwrap();
        assert_eq!(request.header_line("host"), "header.example");
    }

    #[rstest]
    #[case("http://example.com", "/")]
    #[case("/search?q=rust", "/search?q=rust")]
    #[case("/search?", "/search")]
    #[case("http://example.com/a/b", "/a/b")]
    fn derives_request_target(#[case] uri: &str, #[case] target: &str) {
        assert_eq!(Request::get(uri).unwrap().request_target(), target);
    }

    #[test]
    fn request_target_override() {
        let request = Request::new("OPTIONS", "/").unwrap();
        let star = request.with_request_target("*").unwrap();
        assert_eq!(star.request_target(), "*");
        assert_eq!(request.request_target(), "/");

        assert!(matches!(
            request.with_request_target("/a b"),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn converts_into_http_request() {
        let request = Request::new("put", "http://example.com/items/1")
            .unwrap()
            .with_protocol_version("2")
            .unwrap()
            .with_body(Stream::from_bytes("payload"));

        let converted = http::Request::<Stream>::try_from(request).unwrap();
        assert_eq!(converted.method(), Method::PUT);
        assert_eq!(converted.version(), http::Version::HTTP_2);
        assert_eq!(converted.headers()["host"], "example.com");
        assert_eq!(converted.body().contents().unwrap(), "payload");
    }
}
