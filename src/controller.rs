//! Declarative controller descriptors and their registration.
//!
//! A [`ControllerDescriptor`] lists a controller's routes as plain data: an
//! optional route-group prefix, controller-wide middleware, and one entry per
//! action with its verb, path and route-level middleware.
//! [`RouteRegistrar`] turns descriptors into [`RouteTable`] entries.
//!
//! ```rust
//! use std::sync::Arc;
//! use junction::{Container, ControllerDescriptor, HandlerResult, Params, Request,
//!                Response, RouteRegistrar, RouteTable};
//! use serde_json::json;
//!
//! struct Users;
//!
//! impl Users {
//!     async fn show(self: Arc<Self>, _req: Request, res: Response, params: Params) -> HandlerResult {
//!         Ok(res.with_json(json!({ "id": params.get(0) })))
//!     }
//! }
//!
//! let container = Container::new();
//! container.set(Users);
//!
//! let mut routes = RouteTable::new();
//! RouteRegistrar::new(&mut routes, &container)
//!     .register(ControllerDescriptor::<Users>::new().group("/users").get("/{id}", "show", Users::show));
//!
//! assert_eq!(routes.len(), 1);
//! ```

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{error, info};

use crate::container::Container;
use crate::error::RegistrationError;
use crate::handler::{HandlerResult, HandlerTarget};
use crate::method::Method;
use crate::middleware::{Middleware, MiddlewareRef};
use crate::path::Params;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Route, RouteTable};

struct RouteDescriptor {
    method: Method,
    path: String,
    target: HandlerTarget,
    middlewares: Vec<MiddlewareRef>,
}

/// Route declarations for controller type `C`.
pub struct ControllerDescriptor<C> {
    prefix: Option<String>,
    middlewares: Vec<MiddlewareRef>,
    routes: Vec<RouteDescriptor>,
    _controller: PhantomData<fn() -> C>,
}

impl<C: Send + Sync + 'static> ControllerDescriptor<C> {
    pub fn new() -> Self {
        Self { prefix: None, middlewares: Vec::new(), routes: Vec::new(), _controller: PhantomData }
    }

    /// Prefixes every route path of this controller.
    pub fn group(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Adds controller-wide middleware. Runs before any route-level middleware.
    pub fn middleware<M: Middleware>(mut self) -> Self {
        self.middlewares.push(MiddlewareRef::of::<M>());
        self
    }

    /// Declares a route with no route-level middleware.
    pub fn route<F, Fut>(self, method: Method, path: &str, name: &'static str, action: F) -> Self
    where
        F: Fn(Arc<C>, Request, Response, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route_with(method, path, name, action, Vec::new())
    }

    /// Declares a route whose chain adds `middlewares` after the controller-wide ones.
    pub fn route_with<F, Fut>(
        mut self,
        method: Method,
        path: &str,
        name: &'static str,
        action: F,
        middlewares: impl IntoIterator<Item = MiddlewareRef>,
    ) -> Self
    where
        F: Fn(Arc<C>, Request, Response, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.routes.push(RouteDescriptor {
            method,
            path: path.to_owned(),
            target: HandlerTarget::new(name, action),
            middlewares: middlewares.into_iter().collect(),
        });
        self
    }
}

macro_rules! verb_shorthands {
    ($($fn_name:ident => $method:ident),* $(,)?) => {
        impl<C: Send + Sync + 'static> ControllerDescriptor<C> {
            $(
                #[doc = concat!("Declares a `", stringify!($method), "` route.")]
                pub fn $fn_name<F, Fut>(self, path: &str, name: &'static str, action: F) -> Self
                where
                    F: Fn(Arc<C>, Request, Response, Params) -> Fut + Send + Sync + 'static,
                    Fut: Future<Output = HandlerResult> + Send + 'static,
                {
                    self.route(Method::$method, path, name, action)
                }
            )*
        }
    };
}

verb_shorthands! {
    get => Get,
    post => Post,
    put => Put,
    delete => Delete,
    patch => Patch,
    options => Options,
    head => Head,
    trace => Trace,
    connect => Connect,
    pri => Pri,
}

impl<C: Send + Sync + 'static> Default for ControllerDescriptor<C> {
    fn default() -> Self { Self::new() }
}

/// Writes controller descriptors into a [`RouteTable`].
///
/// Each controller is validated as a whole before any of its routes is
/// added: the controller and every middleware must be known to the
/// container, and every template must compile. A controller that fails is
/// logged and skipped; the others still register.
pub struct RouteRegistrar<'a> {
    table: &'a mut RouteTable,
    container: &'a Container,
    prefix: String,
}

impl<'a> RouteRegistrar<'a> {
    pub fn new(table: &'a mut RouteTable, container: &'a Container) -> Self {
        Self { table, container, prefix: String::new() }
    }

    /// Sets an outer prefix that every controller's group nests under.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Registers a controller, logging and skipping it on failure.
    pub fn register<C: Send + Sync + 'static>(&mut self, controller: ControllerDescriptor<C>) -> &mut Self {
        let name = std::any::type_name::<C>();
        if let Err(e) = self.try_register(controller) {
            error!(controller = name, error = %e, "controller skipped");
        }
        self
    }

    /// Registers a controller, returning how many routes it added.
    pub fn try_register<C: Send + Sync + 'static>(
        &mut self,
        controller: ControllerDescriptor<C>,
    ) -> Result<usize, RegistrationError> {
        let previous = self.prefix.clone();
        if let Some(group) = &controller.prefix {
            self.prefix.push_str(group);
        }
        let routes = self.build(controller);
        self.prefix = previous;

        let routes = routes?;
        let count = routes.len();
        for route in routes {
            self.table.insert(route);
        }
        info!(controller = std::any::type_name::<C>(), routes = count, "controller registered");
        Ok(count)
    }

    fn build<C: Send + Sync + 'static>(&self, controller: ControllerDescriptor<C>) -> Result<Vec<Route>, RegistrationError> {
        if !self.container.contains::<C>() {
            return Err(RegistrationError::UnresolvableController { ty: std::any::type_name::<C>() });
        }

        let ControllerDescriptor { middlewares: shared, routes, .. } = controller;
        routes
            .into_iter()
            .map(|route| {
                let middlewares: Vec<_> = shared.iter().cloned().chain(route.middlewares).collect();
                if let Some(missing) = middlewares.iter().find(|m| !self.container.contains_id(m.id())) {
                    return Err(RegistrationError::UnresolvableMiddleware { ty: missing.name() });
                }
                let path = format!("{}{}", self.prefix, route.path);
                Route::new(route.method, &path, route.target, middlewares)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Next;
    use async_trait::async_trait;

    struct Users;
    struct Posts;

    impl Users {
        async fn index(self: Arc<Self>, _: Request, res: Response, _: Params) -> HandlerResult { Ok(res) }
        async fn show(self: Arc<Self>, _: Request, res: Response, _: Params) -> HandlerResult { Ok(res) }
    }

    impl Posts {
        async fn index(self: Arc<Self>, _: Request, res: Response, _: Params) -> HandlerResult { Ok(res) }
    }

    struct Auth;
    struct Audit;

    #[async_trait]
    impl Middleware for Auth {
        async fn handle(&self, req: Request, res: Response, next: Next) -> HandlerResult { next(req, res).await }
    }

    #[async_trait]
    impl Middleware for Audit {
        async fn handle(&self, req: Request, res: Response, next: Next) -> HandlerResult { next(req, res).await }
    }

    fn container() -> Container {
        let c = Container::new();
        c.set(Users);
        c.set(Posts);
        c.set(Auth);
        c.set(Audit);
        c
    }

    #[test]
    fn group_prefix_is_prepended_and_restored() {
        let c = container();
        let mut table = RouteTable::new();
        RouteRegistrar::new(&mut table, &c)
            .register(ControllerDescriptor::<Users>::new().group("/users").get("/", "index", Users::index).get("/{id}", "show", Users::show))
            .register(ControllerDescriptor::<Posts>::new().get("/posts", "index", Posts::index));

        let paths: Vec<_> = table.iter().map(Route::path).collect();
        assert_eq!(paths, ["/users", "/users/{id}", "/posts"]);
    }

    #[test]
    fn every_method_has_a_shorthand() {
        let c = container();
        let mut table = RouteTable::new();
        RouteRegistrar::new(&mut table, &c).register(
            ControllerDescriptor::<Users>::new()
                .get("/r", "index", Users::index)
                .post("/r", "index", Users::index)
                .put("/r", "index", Users::index)
                .delete("/r", "index", Users::index)
                .patch("/r", "index", Users::index)
                .options("/r", "index", Users::index)
                .head("/r", "index", Users::index)
                .trace("/r", "index", Users::index)
                .connect("/r", "index", Users::index)
                .pri("/r", "index", Users::index),
        );

        let methods: Vec<_> = table.iter().map(Route::method).collect();
        assert_eq!(methods, Method::ALL);
    }

    #[test]
    fn outer_prefix_nests_groups() {
        let c = container();
        let mut table = RouteTable::new();
        RouteRegistrar::new(&mut table, &c)
            .with_prefix("/api")
            .register(ControllerDescriptor::<Users>::new().group("/users").get("/{id}", "show", Users::show))
            .register(ControllerDescriptor::<Posts>::new().get("/posts", "index", Posts::index));

        let paths: Vec<_> = table.iter().map(Route::path).collect();
        assert_eq!(paths, ["/api/users/{id}", "/api/posts"]);
    }

    #[test]
    fn class_middleware_precede_method_middleware() {
        let c = container();
        let mut table = RouteTable::new();
        RouteRegistrar::new(&mut table, &c).register(
            ControllerDescriptor::<Users>::new()
                .middleware::<Auth>()
                .route_with(Method::Delete, "/users/{id}", "show", Users::show, [MiddlewareRef::of::<Audit>(), MiddlewareRef::of::<Auth>()]),
        );

        let route = &table.routes(Method::Delete)[0];
        let names: Vec<_> = route.middlewares().iter().map(MiddlewareRef::name).collect();
        assert_eq!(
            names,
            [std::any::type_name::<Auth>(), std::any::type_name::<Audit>(), std::any::type_name::<Auth>()]
        );
    }

    #[test]
    fn unknown_controller_is_skipped_without_blocking_others() {
        let c = Container::new();
        c.set(Posts);
        let mut table = RouteTable::new();
        let mut registrar = RouteRegistrar::new(&mut table, &c);

        let err = registrar
            .try_register(ControllerDescriptor::<Users>::new().get("/users", "index", Users::index))
            .unwrap_err();
        assert_eq!(err, RegistrationError::UnresolvableController { ty: std::any::type_name::<Users>() });

        registrar.register(ControllerDescriptor::<Posts>::new().get("/posts", "index", Posts::index));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn one_bad_route_skips_the_whole_controller() {
        let c = container();
        let mut table = RouteTable::new();
        let result = RouteRegistrar::new(&mut table, &c).try_register(
            ControllerDescriptor::<Users>::new()
                .get("/users", "index", Users::index)
                .get("/users/{id", "show", Users::show),
        );
        assert!(matches!(result, Err(RegistrationError::InvalidTemplate { .. })));
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_middleware_is_a_registration_error() {
        struct Ghost;

        #[async_trait]
        impl Middleware for Ghost {
            async fn handle(&self, req: Request, res: Response, next: Next) -> HandlerResult { next(req, res).await }
        }

        let c = container();
        let mut table = RouteTable::new();
        let result = RouteRegistrar::new(&mut table, &c)
            .try_register(ControllerDescriptor::<Users>::new().middleware::<Ghost>().get("/users", "index", Users::index));
        assert_eq!(result, Err(RegistrationError::UnresolvableMiddleware { ty: std::any::type_name::<Ghost>() }));
    }

    #[test]
    fn prefix_is_restored_after_a_failure() {
        let c = Container::new();
        c.set(Posts);
        let mut table = RouteTable::new();
        let mut registrar = RouteRegistrar::new(&mut table, &c);
        registrar
            .register(ControllerDescriptor::<Users>::new().group("/users").get("/", "index", Users::index))
            .register(ControllerDescriptor::<Posts>::new().get("/posts", "index", Posts::index));
        assert_eq!(table.routes(Method::Get)[0].path(), "/posts");
    }
}
