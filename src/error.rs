//! Error types.
//!
//! Dispatch-time failures never escape the [`Dispatcher`](crate::Dispatcher):
//! every variant of [`Error`] knows which status it maps to and how to render
//! itself as a JSON body. Registration-time failures ([`RegistrationError`])
//! are local to one controller and only ever logged.

use std::fmt;

use http::StatusCode;
use serde_json::json;
use thiserror::Error;

use crate::method::Method;
use crate::response::Response;

/// A boxed error used as the source of a [`HandlerError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The wire string did not name a routable [`Method`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown HTTP method `{0}`")]
pub struct UnknownMethod(pub String);

/// The dependency graph could not be completed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Nothing registered in the container knows how to build this type.
    #[error("type `{ty}` is not registered in the container")]
    UnresolvableType { ty: &'static str },

    /// A primitive constructor parameter had neither a bound value nor a default.
    #[error("cannot resolve parameter `{param}` of `{ty}`")]
    UnresolvableParameter { ty: &'static str, param: String },

    /// The type depends on itself, directly or transitively.
    #[error("circular dependency: {chain}")]
    CircularDependency { chain: String },
}

/// A controller descriptor could not be turned into routes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("controller `{ty}` cannot be resolved by the container")]
    UnresolvableController { ty: &'static str },

    #[error("middleware `{ty}` cannot be resolved by the container")]
    UnresolvableMiddleware { ty: &'static str },

    #[error("invalid path template `{template}`: {reason}")]
    InvalidTemplate { template: String, reason: String },
}

/// A failure raised by a middleware or a terminal handler.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    /// Wraps an arbitrary error, keeping its `Display` text as the message.
    pub fn from_error(err: impl Into<BoxError>) -> Self {
        let source = err.into();
        Self { message: source.to_string(), source: Some(source) }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::from_error(e)
    }
}

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Handler(#[from] HandlerError),

    #[error("no route matches {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error("origin `{origin}` may not use {method}")]
    OriginNotAllowed { origin: String, method: Method },

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The HTTP status this failure is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::OriginNotAllowed { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the failure as a structured JSON response.
    ///
    /// Only the `Display` text of a 500 reaches the client, never a
    /// source chain or backtrace.
    pub fn into_response(self, response: Response) -> Response {
        let status = self.status();
        let body = match status {
            StatusCode::NOT_FOUND => json!({
                "error": "Not Found",
                "message": "No route matches the provided URI",
            }),
            StatusCode::FORBIDDEN => json!({
                "error": "Forbidden",
                "message": "Origin or method not allowed",
            }),
            _ => json!({
                "error": "Internal Server Error",
                "message": self.to_string(),
            }),
        };
        response.with_status(status).with_json(body)
    }
}

/// Renders a resolution chain as `A -> B -> A`.
pub(crate) struct Chain<'a>(pub &'a [&'static str]);

impl fmt::Display for Chain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            f.write_str(ty)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(res: &Response) -> serde_json::Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[test]
    fn not_found_renders_documented_body() {
        let err = Error::RouteNotFound { method: Method::Get, path: "/x".into() };
        let res = err.into_response(Response::new());
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body(&res),
            json!({"error": "Not Found", "message": "No route matches the provided URI"})
        );
    }

    #[test]
    fn handler_failure_exposes_message_only() {
        let io = std::io::Error::other("disk on fire");
        let err: Error = HandlerError::from_error(io).into();
        let res = err.into_response(Response::new());
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&res)["message"], "disk on fire");
    }

    #[test]
    fn resolve_failure_is_internal_error() {
        let err: Error = ResolveError::UnresolvableType { ty: "app::Repo" }.into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "type `app::Repo` is not registered in the container");
    }

    #[test]
    fn chain_joins_with_arrows() {
        assert_eq!(Chain(&["A", "B", "A"]).to_string(), "A -> B -> A");
    }
}
