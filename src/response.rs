//! Outgoing HTTP response type.
//!
//! A [`Response`] travels through the whole middleware chain by value: every
//! middleware and the terminal handler receives it, may change it, and hands
//! it back. The setters therefore consume and return `self` so they chain.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;
use serde::Serialize;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// An outgoing HTTP response.
///
/// ```rust
/// use junction::Response;
/// use http::StatusCode;
/// use serde_json::json;
///
/// let res = Response::new()
///     .with_status(StatusCode::CREATED)
///     .with_json(json!({"id": "42"}));
/// assert_eq!(res.status(), StatusCode::CREATED);
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `200 OK`, no headers, empty body.
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Sets a JSON body and `content-type: application/json`.
    pub fn with_json(self, body: serde_json::Value) -> Self {
        self.with_body(JSON, body.to_string())
    }

    /// Serializes any [`Serialize`] value as the JSON body.
    pub fn try_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(body)?;
        Ok(self.with_body(JSON, bytes))
    }

    /// Sets a plain-text body.
    pub fn with_text(self, body: impl Into<String>) -> Self {
        self.with_body(TEXT, body.into())
    }

    /// Inserts a header, replacing any previous value under the same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    fn with_body(mut self, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.body = body.into();
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Converts into the `http` type hyper writes to the wire.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_empty_ok() {
        let res = Response::new();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().is_empty());
        assert!(res.headers().is_empty());
    }

    #[test]
    fn json_sets_content_type_and_body() {
        let res = Response::new().with_json(json!({"id": "42"}));
        assert_eq!(res.header("Content-Type"), Some("application/json"));
        assert_eq!(res.body(), br#"{"id":"42"}"#);
    }

    #[test]
    fn try_json_serializes_structs() {
        #[derive(Serialize)]
        struct User<'a> {
            name: &'a str,
        }
        let res = Response::new().try_json(&User { name: "alice" }).unwrap();
        assert_eq!(res.body(), br#"{"name":"alice"}"#);
    }

    #[test]
    fn into_inner_keeps_status_and_headers() {
        let res = Response::new()
            .with_status(StatusCode::NO_CONTENT)
            .with_header(HeaderName::from_static("x-trace"), HeaderValue::from_static("1"))
            .into_inner();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers()["x-trace"], "1");
    }
}
