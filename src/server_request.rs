//! Incoming, server-side HTTP requests.
//!
//! A [`ServerRequest`] is a [`Request`] plus everything a server learns about the
//! request beyond the wire message: server parameters, cookies, query parameters,
//! uploaded files, the parsed body and application attributes.
//!
//! Nothing is read from the process environment. The server hands every input to
//! the [`Builder`], which validates and normalizes them once:
//!
//! ```rust
//! use http_message_kit::{HttpMessage, ServerRequest};
//!
//! let request = ServerRequest::builder()
//!     .method("post")
//!     .uri("https://example.com/profile?tab=security")
//!     .header("Cookie", "session=abc123; theme=dark")
//!     .server_param("REMOTE_ADDR", "203.0.113.7")
//!     .build()?;
//!
//! assert_eq!(request.query_params()["tab"], "security");
//! assert_eq!(request.server_params()["REMOTE_ADDR"], "203.0.113.7");
//! # #[cfg(feature = "cookie")]
//! assert_eq!(request.cookie_params()["session"], "abc123");
//! assert_eq!(request.header_line("host"), "example.com");
//! # Ok::<(), http_message_kit::Error>(())
//! ```
use core::any::Any;
use core::fmt::{self, Display};
use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, Uri};
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::headers::{Headers, IntoHeaderValues, Validated};
use crate::message::DEFAULT_CONTENT_TYPE;
use crate::request::{parse_method, parse_uri};
use crate::query;
use crate::upload::{normalize_files, UploadTree};
use crate::{Error, Message, ProtocolVersion, Request, Result, Stream};

/// String parameters: server parameters and cookies.
pub type Params = HashMap<String, String>;

/// Query parameters, nested the way bracketed names describe.
///
/// Values are strings, lists of values or maps of values.
pub type QueryParams = Map<String, Value>;

/// The normalized upload tree, one entry per form field in submitted order.
pub type UploadedFiles = IndexMap<String, UploadTree>;

type Attribute = Arc<dyn Any + Send + Sync>;

/// A request as seen by a server.
///
/// Header, body and protocol operations come from [`HttpMessage`](crate::HttpMessage); method, URI and
/// request target are available through [`request`](ServerRequest::request) and the
/// forwarding `with_*` methods.
#[derive(Clone)]
pub struct ServerRequest {
    request: Request,
    server_params: Params,
    cookie_params: Params,
    query_params: QueryParams,
    uploaded_files: UploadedFiles,
    parsed_body: Option<Value>,
    attributes: HashMap<String, Attribute>,
}

impl_message!(ServerRequest => request.message);

impl fmt::Debug for ServerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attributes: Vec<_> = self.attributes.keys().collect();
        attributes.sort();
        f.debug_struct("ServerRequest")
            .field("request", &self.request)
            .field("server_params", &self.server_params)
            .field("cookie_params", &self.cookie_params)
            .field("query_params", &self.query_params)
            .field("uploaded_files", &self.uploaded_files)
            .field("parsed_body", &self.parsed_body)
            .field("attributes", &attributes)
            .finish()
    }
}

/// Checks that a parsed body is absent, an object, or a list of objects and lists.
fn validate_parsed_body(body: Option<Value>) -> Result<Option<Value>> {
    match body {
        None | Some(Value::Null) => Ok(None),
        Some(body @ Value::Object(_)) => Ok(Some(body)),
        Some(Value::Array(items))
            if items
                .iter()
                .all(|item| matches!(item, Value::Object(_) | Value::Array(_))) =>
        {
            Ok(Some(Value::Array(items)))
        }
        Some(other) => Err(Error::invalid_argument(format!(
            "parsed body must be an object or a list of structures, got {}",
            kind(&other)
        ))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list of scalars",
        Value::Object(_) => "an object",
    }
}

fn parse_query(uri: &Uri) -> Result<QueryParams> {
    uri.query().map_or_else(|| Ok(QueryParams::new()), query::parse)
}

#[cfg(feature = "cookie")]
fn parse_cookies(headers: &Headers) -> Params {
    headers
        .get("Cookie")
        .iter()
        .flat_map(|line| cookie::Cookie::split_parse(line.as_str()))
        .filter_map(|cookie| cookie.ok())
        .map(|cookie| (cookie.name().to_owned(), cookie.value().to_owned()))
        .collect()
}

#[cfg(not(feature = "cookie"))]
fn parse_cookies(_headers: &Headers) -> Params {
    Params::new()
}

impl ServerRequest {
    /// Creates a [`Builder`] for a `GET /` request.
    pub fn builder() -> Builder {
        Builder::new()
    }

    /// Creates a server request from a method and URI, with no server-side inputs.
    ///
    /// # Errors
    ///
    /// Same as [`Request::new`].
    pub fn new<U>(method: &str, uri: U) -> Result<Self>
    where
        U: TryInto<Uri>,
        U::Error: Display,
    {
        Self::builder().method(method).uri(uri).build()
    }

    /// Returns the underlying request: method, URI and request target.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    /// Returns the target URI.
    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    /// Returns the request target, see [`Request::request_target`].
    pub fn request_target(&self) -> String {
        self.request.request_target()
    }

    /// Returns a copy using another method, see [`Request::with_method`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unsupported method.
    pub fn with_method(&self, method: &str) -> Result<Self> {
        Ok(self.with_request(self.request.with_method(method)?))
    }

    /// Returns a copy targeting another URI, see [`Request::with_uri`].
    ///
    /// Query parameters are not re-parsed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the URI host cannot be used as a header value.
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Result<Self> {
        Ok(self.with_request(self.request.with_uri(uri, preserve_host)?))
    }

    /// Returns a copy with an explicit request target, see [`Request::with_request_target`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the target contains whitespace.
    pub fn with_request_target(&self, target: &str) -> Result<Self> {
        Ok(self.with_request(self.request.with_request_target(target)?))
    }

    fn with_request(&self, request: Request) -> Self {
        let mut next = self.clone();
        next.request = request;
        next
    }

    /// Returns the server parameters captured at construction.
    pub fn server_params(&self) -> &Params {
        &self.server_params
    }

    /// Returns the cookies.
    pub fn cookie_params(&self) -> &Params {
        &self.cookie_params
    }

    /// Returns a copy with all cookies replaced. The `Cookie` header is left untouched.
    pub fn with_cookie_params(&self, cookies: Params) -> Self {
        let mut next = self.clone();
        next.cookie_params = cookies;
        next
    }

    /// Returns the query parameters.
    ///
    /// Every value of the query is kept: a repeated name gives a list, and bracketed
    /// names such as `ids[]` or `filter[kind]` give lists and maps.
    ///
    /// ```rust
    /// use http_message_kit::ServerRequest;
    /// use serde_json::json;
    ///
    /// let request = ServerRequest::new("GET", "/search?tag=a&tag=b&ids[]=1&ids[]=2")?;
    /// assert_eq!(request.query_params()["tag"], json!(["a", "b"]));
    /// assert_eq!(request.query_params()["ids"], json!(["1", "2"]));
    /// # Ok::<(), http_message_kit::Error>(())
    /// ```
    pub fn query_params(&self) -> &QueryParams {
        &self.query_params
    }

    /// Returns a copy with all query parameters replaced. The URI is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::{QueryParams, ServerRequest};
    ///
    /// let request = ServerRequest::new("GET", "/search?q=old")?;
    /// let replaced = request.with_query_params(QueryParams::from_iter([(
    ///     "q".to_owned(),
    ///     "new".into(),
    /// )]));
    ///
    /// assert_eq!(replaced.query_params()["q"], "new");
    /// assert_eq!(request.query_params()["q"], "old");
    /// assert_eq!(replaced.uri().query(), Some("q=old"));
    /// # Ok::<(), http_message_kit::Error>(())
    /// ```
    pub fn with_query_params(&self, query: QueryParams) -> Self {
        let mut next = self.clone();
        next.query_params = query;
        next
    }

    /// Returns the normalized uploaded files.
    pub fn uploaded_files(&self) -> &UploadedFiles {
        &self.uploaded_files
    }

    /// Returns a copy with another upload tree.
    pub fn with_uploaded_files(&self, files: UploadedFiles) -> Self {
        let mut next = self.clone();
        next.uploaded_files = files;
        next
    }

    /// Returns the parsed body, if any.
    pub fn parsed_body(&self) -> Option<&Value> {
        self.parsed_body.as_ref()
    }

    /// Returns a copy with another parsed body. `None` and `null` clear it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] unless the body is an object or a list whose
    /// items are all objects or lists.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::{Error, ServerRequest};
    /// use serde_json::json;
    ///
    /// let request = ServerRequest::new("POST", "/")?;
    /// let parsed = request.with_parsed_body(Some(json!({ "name": "Ferris" })))?;
    /// assert_eq!(parsed.parsed_body().unwrap()["name"], "Ferris");
    ///
    /// let err = request.with_parsed_body(Some(json!("scalar"))).unwrap_err();
    /// assert!(matches!(err, Error::InvalidArgument(_)));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn with_parsed_body(&self, body: Option<Value>) -> Result<Self> {
        let body = validate_parsed_body(body)?;
        let mut next = self.clone();
        next.parsed_body = body;
        Ok(next)
    }

    /// Serializes `value` and uses it as the parsed body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `value` cannot be serialized or does not
    /// serialize to an acceptable structure.
    pub fn with_parsed_body_from<T: Serialize + ?Sized>(&self, value: &T) -> Result<Self> {
        let body = serde_json::to_value(value)
            .map_err(|error| Error::invalid_argument(format!("cannot serialize body: {error}")))?;
        self.with_parsed_body(Some(body))
    }

    /// Deserializes the parsed body into `T`. Returns `Ok(None)` if there is no parsed body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the body does not match `T`.
    pub fn parsed_body_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.parsed_body
            .as_ref()
            .map(|body| {
                T::deserialize(body)
                    .map_err(|error| Error::invalid_argument(format!("unexpected body: {error}")))
            })
            .transpose()
    }

    /// Returns the attribute `name` if it exists and has type `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use http_message_kit::ServerRequest;
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct UserId(u64);
    ///
    /// let request = ServerRequest::new("GET", "/")?.with_attribute("user", UserId(7));
    /// assert_eq!(request.attribute::<UserId>("user"), Some(&UserId(7)));
    /// assert_eq!(request.attribute::<String>("user"), None);
    /// # Ok::<(), http_message_kit::Error>(())
    /// ```
    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.attributes.get(name)?.downcast_ref()
    }

    /// Returns the attribute `name`, or `default` if it is absent or has another type.
    pub fn attribute_or<'a, T: Any + Send + Sync>(&'a self, name: &str, default: &'a T) -> &'a T {
        self.attribute(name).unwrap_or(default)
    }

    /// Returns the names of all attributes, in no particular order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Returns a copy where attribute `name` is set to `value`.
    pub fn with_attribute<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) -> Self {
        let mut next = self.clone();
        next.attributes.insert(name.into(), Arc::new(value));
        next
    }

    /// Returns a copy without attribute `name`, or an unchanged copy if it is absent.
    pub fn without_attribute(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.attributes.remove(name);
        next
    }
}

struct Parts {
    method: Method,
    uri: Uri,
    version: ProtocolVersion,
    headers: Headers,
    body: Stream,
    server_params: Params,
    cookie_params: Option<Params>,
    query_params: Option<QueryParams>,
    raw_files: Option<Value>,
    uploaded_files: UploadedFiles,
    parsed_body: Option<Value>,
}

/// Assembles a [`ServerRequest`] from the inputs a server collected.
///
/// Setters never fail; the first invalid input is reported by [`build`](Builder::build).
#[derive(Debug)]
pub struct Builder {
    inner: Result<Parts>,
}

impl fmt::Debug for Parts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parts")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// Creates a builder for a `GET /` request over HTTP/1.1 with an empty body.
    pub fn new() -> Self {
        Self {
            inner: Ok(Parts {
                method: Method::GET,
                uri: Uri::from_static("/"),
                version: ProtocolVersion::default(),
                headers: Headers::new(),
                body: Stream::temp(),
                server_params: Params::new(),
                cookie_params: None,
                query_params: None,
                raw_files: None,
                uploaded_files: UploadedFiles::new(),
                parsed_body: None,
            }),
        }
    }

    fn and_then(self, apply: impl FnOnce(Parts) -> Result<Parts>) -> Self {
        Self {
            inner: self.inner.and_then(apply),
        }
    }

    /// Sets the method, matched case-insensitively.
    pub fn method(self, method: &str) -> Self {
        self.and_then(|mut parts| {
            parts.method = parse_method(method)?;
            Ok(parts)
        })
    }

    /// Sets the target URI. Query parameters are parsed from it unless given explicitly.
    pub fn uri<U>(self, uri: U) -> Self
    where
        U: TryInto<Uri>,
        U::Error: Display,
    {
        self.and_then(|mut parts| {
            parts.uri = parse_uri(uri)?;
            Ok(parts)
        })
    }

    /// Sets the protocol version.
    pub fn protocol_version(self, version: &str) -> Self {
        self.and_then(|mut parts| {
            parts.version = version.parse()?;
            Ok(parts)
        })
    }

    /// Adds a header as received, appending to earlier values of the same name.
    pub fn header(self, name: &str, value: impl IntoHeaderValues) -> Self {
        self.and_then(|mut parts| {
            parts.headers.append(Validated::new(name, value)?);
            Ok(parts)
        })
    }

    /// Sets the body stream.
    pub fn body(self, body: impl Into<Stream>) -> Self {
        self.and_then(|mut parts| {
            parts.body = body.into();
            Ok(parts)
        })
    }

    /// Adds one server parameter.
    pub fn server_param(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.and_then(|mut parts| {
            parts.server_params.insert(name.into(), value.into());
            Ok(parts)
        })
    }

    /// Replaces all server parameters.
    pub fn server_params(self, params: Params) -> Self {
        self.and_then(|mut parts| {
            parts.server_params = params;
            Ok(parts)
        })
    }

    /// Sets the cookies explicitly instead of parsing the `Cookie` header.
    pub fn cookie_params(self, cookies: Params) -> Self {
        self.and_then(|mut parts| {
            parts.cookie_params = Some(cookies);
            Ok(parts)
        })
    }

    /// Sets the query parameters explicitly instead of parsing the URI.
    pub fn query_params(self, query: QueryParams) -> Self {
        self.and_then(|mut parts| {
            parts.query_params = Some(query);
            Ok(parts)
        })
    }

    /// Sets the raw upload table, normalized by [`build`](Builder::build).
    ///
    /// See [`normalize_files`] for the expected layout. Normalized fields are merged
    /// over any tree given to [`uploaded_files`](Builder::uploaded_files).
    pub fn raw_files(self, files: Value) -> Self {
        self.and_then(|mut parts| {
            parts.raw_files = Some(files);
            Ok(parts)
        })
    }

    /// Sets an already normalized upload tree.
    pub fn uploaded_files(self, files: UploadedFiles) -> Self {
        self.and_then(|mut parts| {
            parts.uploaded_files = files;
            Ok(parts)
        })
    }

    /// Sets the parsed body.
    pub fn parsed_body(self, body: Value) -> Self {
        self.and_then(|mut parts| {
            parts.parsed_body = validate_parsed_body(Some(body))?;
            Ok(parts)
        })
    }

    /// Validates all inputs and assembles the request.
    ///
    /// Without an explicit `Content-Type` header the default one is added. A `Host`
    /// header is derived from the URI when none was given.
    ///
    /// # Errors
    ///
    /// Returns the first error of any setter, [`Error::InvalidArgument`] for a malformed
    /// query string or upload table, and [`Error::Transport`] if an uploaded temporary
    /// file cannot be opened.
    pub fn build(self) -> Result<ServerRequest> {
        let mut parts = self.inner?;

        if !parts.headers.contains("Content-Type") {
            parts
                .headers
                .set(Validated::new("Content-Type", DEFAULT_CONTENT_TYPE)?);
        }
        let query_params = match parts.query_params {
            Some(query) => query,
            None => parse_query(&parts.uri)?,
        };
        let cookie_params = parts
            .cookie_params
            .unwrap_or_else(|| parse_cookies(&parts.headers));
        let mut uploaded_files = parts.uploaded_files;
        if let Some(raw) = &parts.raw_files {
            uploaded_files.extend(normalize_files(raw)?);
        }

        let message = Message::from_parts(parts.version, parts.headers, parts.body);
        Ok(ServerRequest {
            request: Request::from_parts(message, parts.method, parts.uri)?,
            server_params: parts.server_params,
            cookie_params,
            query_params,
            uploaded_files,
            parsed_body: parts.parsed_body,
            attributes: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HttpMessage;
    use serde::Deserialize;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn builder_defaults() {
        let request = ServerRequest::builder().build().unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.request_target(), "/");
        assert_eq!(request.header_line("Content-Type"), DEFAULT_CONTENT_TYPE);
        assert!(request.query_params().is_empty());
        assert!(request.cookie_params().is_empty());
        assert!(request.uploaded_files().is_empty());
        assert!(request.parsed_body().is_none());
    }

    #[test]
    fn builder_reports_first_error() {
        let result = ServerRequest::builder()
            .method("TRACE")
            .header("bad name", "v")
            .build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = ServerRequest::builder().header("X-Ok", "bad\nvalue").build();
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn host_header_goes_first() {
        let request = ServerRequest::builder()
            .uri("http://example.com:8080/")
            .header("Accept", "*/*")
            .build()
            .unwrap();
        let first = request.headers().iter().next().unwrap();
        assert_eq!(first, ("Host", &["example.com:8080".to_owned()][..]));
    }

    #[test]
    fn explicit_content_type_wins() {
        let request = ServerRequest::builder()
            .header("content-type", "multipart/form-data; boundary=x")
            .build()
            .unwrap();
        assert_eq!(request.header("Content-Type"), ["multipart/form-data; boundary=x"]);
    }

    #[test]
    fn query_params_replacement_returns_the_copy() {
        let request = ServerRequest::new("GET", "/items?page=2&sort=asc&page=3").unwrap();
        assert_eq!(request.query_params()["page"], json!(["2", "3"]));
        assert_eq!(request.query_params()["sort"], "asc");

        let replaced =
            request.with_query_params(QueryParams::from_iter([("page".into(), json!("9"))]));
        assert_eq!(replaced.query_params().len(), 1);
        assert_eq!(request.query_params().len(), 2);
        assert_eq!(replaced.uri(), request.uri());
    }

    #[test]
    fn explicit_query_params_skip_parsing() {
        let request = ServerRequest::builder()
            .uri("/?a=1")
            .query_params(QueryParams::from_iter([("b".into(), json!("2"))]))
            .build()
            .unwrap();
        assert!(!request.query_params().contains_key("a"));
        assert_eq!(request.query_params()["b"], "2");
    }

    #[test]
    fn query_keeps_repeated_and_bracketed_values() {
        let request =
            ServerRequest::new("GET", "/search?tag=a&tag=b&ids[]=1&ids[]=2&f[x]=3").unwrap();
        assert_eq!(request.query_params()["tag"], json!(["a", "b"]));
        assert_eq!(request.query_params()["ids"], json!(["1", "2"]));
        assert_eq!(request.query_params()["f"], json!({ "x": "3" }));
        assert_eq!(request.query_params().len(), 3);
    }

    #[cfg(feature = "cookie")]
    #[test]
    fn cookies_default_to_the_cookie_header() {
        let request = ServerRequest::builder()
            .header("Cookie", "a=1; b=two")
            .header("cookie", "c=3")
            .build()
            .unwrap();
        assert_eq!(request.cookie_params().len(), 3);
        assert_eq!(request.cookie_params()["b"], "two");

        let replaced = request.with_cookie_params(Params::new());
        assert!(replaced.cookie_params().is_empty());
        assert_eq!(replaced.header_line("cookie"), "a=1; b=two, c=3");
        assert_eq!(request.cookie_params().len(), 3);
    }

    #[test]
    fn explicit_cookies_win() {
        let request = ServerRequest::builder()
            .header("Cookie", "a=1")
            .cookie_params(Params::from([("z".into(), "26".into())]))
            .build()
            .unwrap();
        assert_eq!(request.cookie_params().len(), 1);
        assert_eq!(request.cookie_params()["z"], "26");
    }

    #[test]
    fn raw_files_are_normalized_at_build() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"upload").unwrap();
        let path = tmp.path().to_str().unwrap().to_owned();

        let request = ServerRequest::builder()
            .method("POST")
            .raw_files(json!({
                "doc": { "tmp_name": path, "size": 6, "error": 0, "name": "a.txt", "type": "text/plain" }
            }))
            .build()
            .unwrap();

        let doc = request.uploaded_files()["doc"].as_file().unwrap();
        assert_eq!(doc.client_filename(), Some("a.txt"));
        assert_eq!(doc.stream().unwrap().contents().unwrap(), "upload");
    }

    #[test]
    fn malformed_raw_files_fail_the_build() {
        let result = ServerRequest::builder()
            .raw_files(json!({ "doc": { "size": 1 } }))
            .build();
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn uploaded_files_share_moved_state_across_versions() {
        let dir = tempfile::tempdir().unwrap();
        let file = crate::UploadedFile::new(
            Stream::from_bytes("x"),
            Some(1),
            crate::UploadErrorCode::Ok,
            None,
            None,
        );
        let request = ServerRequest::new("POST", "/")
            .unwrap()
            .with_uploaded_files(UploadedFiles::from([("f".into(), file.into())]));
        let later = request.with_attribute("seen", true);

        later.uploaded_files()["f"]
            .as_file()
            .unwrap()
            .move_to(dir.path().join("f"))
            .unwrap();
        assert!(request.uploaded_files()["f"].as_file().unwrap().is_moved());
    }

    #[test]
    fn parsed_body_shapes() {
        let request = ServerRequest::new("POST", "/").unwrap();

        for accepted in [json!({}), json!({ "a": 1 }), json!([]), json!([{ "a": 1 }, [1, 2]])] {
            let parsed = request.with_parsed_body(Some(accepted.clone())).unwrap();
            assert_eq!(parsed.parsed_body(), Some(&accepted));
        }
        for rejected in [json!(1), json!("text"), json!(true), json!([1, 2]), json!([{}, 3])] {
            assert!(matches!(
                request.with_parsed_body(Some(rejected)),
                Err(Error::InvalidArgument(_))
            ));
        }

        let cleared = request
            .with_parsed_body(Some(json!({ "a": 1 })))
            .unwrap()
            .with_parsed_body(Some(Value::Null))
            .unwrap();
        assert!(cleared.parsed_body().is_none());
    }

    #[test]
    fn typed_parsed_body() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Login {
            user: String,
            remember: bool,
        }

        let request = ServerRequest::new("POST", "/login").unwrap();
        assert_eq!(request.parsed_body_as::<Login>().unwrap(), None);

        let login = Login {
            user: "ferris".into(),
            remember: true,
        };
        let parsed = request.with_parsed_body_from(&login).unwrap();
        assert_eq!(parsed.parsed_body_as::<Login>().unwrap(), Some(login));
        assert!(parsed.parsed_body_as::<Vec<u8>>().is_err());
        assert!(request.with_parsed_body_from("plain").is_err());
    }

    #[test]
    fn attributes_are_copy_on_write() {
        let request = ServerRequest::new("GET", "/").unwrap();
        let tagged = request
            .with_attribute("route", "users.show".to_string())
            .with_attribute("id", 42u32);

        assert_eq!(tagged.attribute::<u32>("id"), Some(&42));
        assert_eq!(tagged.attribute::<String>("route").map(String::as_str), Some("users.show"));
        assert_eq!(request.attribute::<u32>("id"), None);
        assert_eq!(*tagged.attribute_or("missing", &7u32), 7);

        let mut names: Vec<_> = tagged.attribute_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["id", "route"]);

        let untagged = tagged.without_attribute("id");
        assert_eq!(untagged.attribute::<u32>("id"), None);
        assert_eq!(tagged.attribute::<u32>("id"), Some(&42));
        assert_eq!(untagged.without_attribute("nope").attribute_names().count(), 1);
    }

    #[test]
    fn request_level_changes_keep_server_state() {
        let request = ServerRequest::builder()
            .uri("/a?x=1")
            .server_param("SERVER_NAME", "localhost")
            .build()
            .unwrap()
            .with_attribute("k", 1u8);

        let moved = request
            .with_method("put")
            .unwrap()
            .with_uri(Uri::from_static("http://example.com/b"), false)
            .unwrap()
            .with_request_target("*")
            .unwrap();
        assert_eq!(moved.method(), Method::PUT);
        assert_eq!(moved.header_line("Host"), "example.com");
        assert_eq!(moved.request_target(), "*");
        assert_eq!(moved.query_params()["x"], "1");
        assert_eq!(moved.server_params()["SERVER_NAME"], "localhost");
        assert_eq!(moved.attribute::<u8>("k"), Some(&1));
        assert_eq!(request.method(), Method::GET);
    }
}
