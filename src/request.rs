//! Incoming HTTP request type.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, ORIGIN};
use http::{HeaderMap, Uri};

use crate::method::Method;

/// An incoming HTTP request.
///
/// Built by the server from a hyper request, or directly in tests:
///
/// ```rust
/// use junction::{Method, Request};
///
/// let req = Request::new(Method::Get, "/users/42?verbose=1")
///     .with_header("origin", "https://good.example");
/// assert_eq!(req.path(), "/users/42");
/// assert_eq!(req.origin(), "https://good.example");
/// ```
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    uri: String,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// A URI that does not parse as a request target gets an empty path,
    /// which no route matches.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let path = uri.parse::<Uri>().map(|parsed| path_of(&parsed)).unwrap_or_default();
        Self { method, uri, path, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub(crate) fn from_parts(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self { method, path: path_of(&uri), uri: uri.to_string(), headers, body }
    }

    /// Appends a header. Names or values that are not valid HTTP are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> Method { self.method }
    pub fn uri(&self) -> &str { &self.uri }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The path component of the URI, `/` when the target has none.
    pub fn path(&self) -> &str { &self.path }

    /// Case-insensitive header lookup. Non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The declared `Origin`, or `""` when the client sent none.
    pub fn origin(&self) -> &str {
        self.headers.get(ORIGIN).and_then(|v| v.to_str().ok()).unwrap_or("")
    }
}

fn path_of(uri: &Uri) -> String {
    match uri.path() {
        "" => "/".to_owned(),
        path => path.to_owned(),
    }
}
