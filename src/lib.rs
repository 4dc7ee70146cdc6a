#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]
//! Immutable HTTP message values and upload normalization.
//!
//! This crate models HTTP requests and responses as immutable values. Every
//! "mutation" is a `with_*` method that leaves the receiver untouched and returns
//! a modified copy, so a message can be handed around freely and each layer of an
//! application can derive its own version of it.
//!
//! # Features
//!
//! - **Copy-on-write messages** - [`Message`], [`Request`], [`ServerRequest`] and [`Response`]
//!   share their header and body operations through the [`HttpMessage`] trait
//! - **Validated headers** - names and values are checked against RFC 7230 before any copy
//!   is made, lookups ignore case and storage keeps it
//! - **Byte streams** - [`Stream`] bodies over memory, files, readers and writers, usable
//!   as an [`http_body::Body`]
//! - **Upload normalization** - [`normalize_files`] turns a server's parallel-array upload
//!   table into a tree of one-shot [`UploadedFile`] handles
//! - **`http` interop** - conversions to and from `http::Request`, `http::Response` and
//!   `http::HeaderMap`
//!
//! # Optional Features
//!
//! - `cookie` - parse the `Cookie` header into cookie parameters (enabled by default)
//! - `mime` - typed media types for `Content-Type` and uploads (enabled by default)
//!
//! # Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade and never installs
//! a logger itself.
//!
//! # Examples
//!
//! ## Deriving Requests
//!
//! ```rust
//! use http_message_kit::{HttpMessage, Request, Uri};
//!
//! let base = Request::get("http://api.example.com/users")?
//!     .with_header("Accept", "application/json")?;
//!
//! let next_page = base
//!     .with_uri(Uri::from_static("http://api.example.com/users?page=2"), false)?
//!     .with_added_header("accept", "text/plain")?;
//!
//! assert_eq!(base.request_target(), "/users");
//! assert_eq!(next_page.request_target(), "/users?page=2");
//! assert_eq!(next_page.header("Accept"), ["application/json", "text/plain"]);
//! assert_eq!(base.header("Accept"), ["application/json"]);
//! # Ok::<(), http_message_kit::Error>(())
//! ```
//!
//! ## Handling Uploads
//!
//! ```rust
//! use http_message_kit::ServerRequest;
//! use serde_json::json;
//!
//! let request = ServerRequest::builder()
//!     .method("POST")
//!     .uri("/profile")
//!     .raw_files(json!({
//!         "photos": {
//!             "tmp_name": [null, null],
//!             "size": [0, 0],
//!             "error": [4, 4],
//!             "name": ["", ""],
//!             "type": ["", ""],
//!         }
//!     }))
//!     .build()?;
//!
//! let photos = request.uploaded_files()["photos"].as_list().unwrap();
//! assert_eq!(photos.len(), 2);
//! assert!(photos.iter().all(|photo| !photo.as_file().unwrap().error().is_ok()));
//! # Ok::<(), http_message_kit::Error>(())
//! ```

#[macro_use]
mod macros;

pub mod error;
pub use error::{Error, Result};

mod headers;
pub use headers::{Headers, IntoHeaderValues};

mod message;
pub use message::{HttpMessage, Message, ProtocolVersion, DEFAULT_CONTENT_TYPE};

mod request;
pub use request::{Request, METHODS};

mod response;
pub use response::Response;

mod query;

mod server_request;
pub use server_request::{
    Builder as ServerRequestBuilder, Params, QueryParams, ServerRequest, UploadedFiles,
};

pub mod stream;
pub use stream::{OpenMode, Stream};

mod upload;
pub use upload::{normalize_files, UploadErrorCode, UploadTree, UploadedFile};

#[cfg(feature = "cookie")]
pub use cookie;

#[cfg(feature = "mime")]
pub use mime;

pub use http::{Method, StatusCode, Uri};
