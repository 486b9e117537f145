//! Request dispatch.
//!
//! [`Dispatcher::dispatch`] is the single entry point per request:
//!
//! 1. strip the configured base path from the request path;
//! 2. check the origin policy and attach CORS headers (403 on rejection);
//! 3. find the first matching route for the method (404 if none);
//! 4. run the route's middleware chain around its action.
//!
//! Whatever fails along the way, including a panicking handler, comes back
//! as a response. Nothing escapes `dispatch`.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::config::DispatcherConfig;
use crate::container::Container;
use crate::cors::CorsPolicy;
use crate::error::{Error, HandlerError};
use crate::handler::HandlerResult;
use crate::middleware;
use crate::request::Request;
use crate::response::Response;
use crate::router::RouteTable;

/// Routes requests through a fixed route table.
///
/// Owns the routes (read-only from here on) and shares the container with
/// every request. Wrap it in an `Arc` to serve requests concurrently.
pub struct Dispatcher {
    routes: RouteTable,
    container: Arc<Container>,
    base_path: Option<String>,
    cors: CorsPolicy,
}

impl Dispatcher {
    pub fn new(config: DispatcherConfig, routes: RouteTable, container: impl Into<Arc<Container>>) -> Self {
        Self {
            base_path: config.base_path(),
            cors: config.allowed_origins,
            routes,
            container: container.into(),
        }
    }

    pub fn routes(&self) -> &RouteTable { &self.routes }
    pub fn container(&self) -> &Arc<Container> { &self.container }

    /// Routes one request and produces one response.
    pub async fn dispatch(&self, req: Request, res: Response) -> Response {
        let res = if self.cors.is_empty() {
            res
        } else {
            match self.cors.apply(&req, res.clone()) {
                Ok(res) => res,
                Err(e) => return self.reject(e, res),
            }
        };

        let outcome = AssertUnwindSafe(self.route(req, res.clone())).catch_unwind().await;
        match outcome {
            Ok(Ok(res)) => res,
            Ok(Err(e)) => self.reject(e, res),
            Err(panic) => self.reject(HandlerError::new(panic_message(&*panic)).into(), res),
        }
    }

    async fn route(&self, req: Request, res: Response) -> HandlerResult {
        let method = req.method();
        let path = self.strip_base(req.path()).to_owned();

        let (route, params) = self
            .routes
            .find(method, &path)
            .ok_or_else(|| Error::RouteNotFound { method, path: path.clone() })?;
        debug!(%method, %path, route = route.path(), handler = ?route.target(), "route matched");

        let terminal = route.target().bind(Arc::clone(&self.container), params);
        let chain = middleware::compose(&self.container, route.middlewares(), terminal);
        chain(req, res).await
    }

    fn strip_base<'p>(&self, path: &'p str) -> &'p str {
        let Some(base) = self.base_path.as_deref() else {
            return path;
        };
        match path.strip_prefix(base) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }

    fn reject(&self, err: Error, res: Response) -> Response {
        match &err {
            Error::RouteNotFound { method, path } => debug!(%method, %path, "no route"),
            Error::OriginNotAllowed { origin, method } => warn!(%origin, %method, "origin rejected"),
            other => error!(error = %other, "dispatch failed"),
        }
        err.into_response(res)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
