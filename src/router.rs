//! Route table.
//!
//! One ordered route list per HTTP method. Lookup walks the list in
//! declaration order and the first template that matches wins, so a literal
//! route declared before a parameterized one shadows it and vice versa.
//!
//! The table is filled during startup and then moved into the
//! [`Dispatcher`](crate::Dispatcher), which only ever reads it.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::RegistrationError;
use crate::handler::HandlerTarget;
use crate::method::Method;
use crate::middleware::MiddlewareRef;
use crate::path::{Params, PathMatcher};

/// One (method, path template) binding to a handler and its middleware chain.
#[derive(Clone, Debug)]
pub struct Route {
    method: Method,
    matcher: PathMatcher,
    target: HandlerTarget,
    middlewares: Vec<MiddlewareRef>,
}

impl Route {
    /// Normalizes and compiles `path`.
    pub fn new(
        method: Method,
        path: &str,
        target: HandlerTarget,
        middlewares: Vec<MiddlewareRef>,
    ) -> Result<Self, RegistrationError> {
        let matcher = PathMatcher::compile(&normalize(path))?;
        Ok(Self { method, matcher, target, middlewares })
    }

    pub fn method(&self) -> Method { self.method }

    /// The normalized template, e.g. `/users/{id}`.
    pub fn path(&self) -> &str { self.matcher.template() }

    pub fn target(&self) -> &HandlerTarget { &self.target }

    /// Class-level entries first, then method-level ones.
    pub fn middlewares(&self) -> &[MiddlewareRef] { &self.middlewares }

    pub fn matcher(&self) -> &PathMatcher { &self.matcher }
}

/// All registered routes, keyed by HTTP method.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<Route>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Registers a route.
    ///
    /// A route already registered under the same method and normalized path
    /// is replaced in place and keeps its position in the lookup order.
    pub fn add(
        &mut self,
        method: Method,
        path: &str,
        target: HandlerTarget,
        middlewares: Vec<MiddlewareRef>,
    ) -> Result<&mut Self, RegistrationError> {
        self.insert(Route::new(method, path, target, middlewares)?);
        Ok(self)
    }

    pub(crate) fn insert(&mut self, route: Route) {
        let routes = self.routes.entry(route.method).or_default();
        match routes.iter().position(|r| r.path() == route.path()) {
            Some(i) => {
                warn!(
                    method = %route.method,
                    path = route.path(),
                    previous = ?routes[i].target,
                    handler = ?route.target,
                    "route replaced"
                );
                routes[i] = route;
            }
            None => {
                debug!(method = %route.method, path = route.path(), handler = ?route.target, "route added");
                routes.push(route);
            }
        }
    }

    /// Routes registered for `method`, in lookup order.
    pub fn routes(&self, method: Method) -> &[Route] {
        self.routes.get(&method).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every route, grouped by method in [`Method::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        Method::ALL.into_iter().flat_map(|m| self.routes(m))
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First route for `method` whose template matches `path`.
    pub fn find(&self, method: Method, path: &str) -> Option<(&Route, Params)> {
        self.routes(method)
            .iter()
            .find_map(|route| route.matcher.matches(path).map(|params| (route, params)))
    }
}

/// Trims surrounding slashes and re-roots the path at a single `/`.
pub fn normalize(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}
