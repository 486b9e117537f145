//! Origin allow-list.
//!
//! The policy maps an origin to the methods it may use. The key `*` matches
//! any origin, including a request that sent no `Origin` header at all.

use std::collections::{HashMap, HashSet};

use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue,
    ORIGIN,
};
use serde::Deserialize;

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

/// Value of `Access-Control-Allow-Methods`: every routable method.
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS, HEAD, TRACE, CONNECT, PRI";

/// Value of `Access-Control-Allow-Headers`.
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

const ANY_ORIGIN: &str = "*";

/// Which origins may use which methods.
///
/// Deserializes from `{ "https://app.example": ["GET", "POST"], "*": ["GET"] }`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CorsPolicy {
    origins: HashMap<String, HashSet<Method>>,
}

impl CorsPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows `origin` to use `methods`, adding to anything already allowed.
    pub fn allow(mut self, origin: impl Into<String>, methods: impl IntoIterator<Item = Method>) -> Self {
        self.origins.entry(origin.into()).or_default().extend(methods);
        self
    }

    /// An empty policy disables origin checks entirely.
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn allows(&self, origin: &str, method: Method) -> bool {
        self.origins
            .iter()
            .any(|(allowed, methods)| (allowed == ANY_ORIGIN || allowed == origin) && methods.contains(&method))
    }

    /// Checks the request against the policy and, when it passes, attaches
    /// the CORS headers to `res`.
    pub(crate) fn apply(&self, req: &Request, res: Response) -> Result<Response, Error> {
        let origin = req.origin();
        if !self.allows(origin, req.method()) {
            return Err(Error::OriginNotAllowed { origin: origin.to_owned(), method: req.method() });
        }
        let echoed = req.headers().get(ORIGIN).cloned().unwrap_or_else(|| HeaderValue::from_static(""));
        Ok(res
            .with_header(ACCESS_CONTROL_ALLOW_ORIGIN, echoed)
            .with_header(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS))
            .with_header(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS)))
    }
}
