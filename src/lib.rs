//! # junction
//!
//! Request routing and dispatch for HTTP services. A method and path are
//! matched to a controller action, which runs inside the route's middleware.
//! Controllers and their dependencies come from a constructor-injection
//! container.
//!
//! ## The pieces
//!
//! - [`Container`] builds singletons from explicitly declared dependencies
//!   and caches them for the life of the process.
//! - [`PathMatcher`] compiles `/users/{id}` style templates and extracts
//!   [`Params`] in template order.
//! - [`RouteTable`] keeps routes per method; the first declared match wins.
//! - [`middleware::compose`] wraps an action in its middleware, onion style.
//! - [`ControllerDescriptor`] and [`RouteRegistrar`] declare routes as data
//!   and write them into the table.
//! - [`Dispatcher`] ties it together and turns every failure into a response.
//! - [`Server`] serves a dispatcher over HTTP/1.1 and HTTP/2.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use junction::{Container, ControllerDescriptor, Dispatcher, DispatcherConfig,
//!                HandlerResult, Params, Request, Response, RouteRegistrar, RouteTable, Server};
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
//! #[tokio::main]
//! async fn main() -> Result<(), junction::Error> {
//!     let mut container = Container::new();
//!     container.register_with(|_| Ok(Users));
//!
//!     let mut routes = RouteTable::new();
//!     RouteRegistrar::new(&mut routes, &container)
//!         .register(ControllerDescriptor::<Users>::new().group("/users").get("/{id}", "show", Users::show));
//!
//!     let dispatcher = Dispatcher::new(DispatcherConfig::new(), routes, container);
//!     Server::bind("0.0.0.0:3000")?.serve(dispatcher).await
//! }
//! ```

mod config;
mod container;
mod controller;
mod cors;
mod dispatcher;
mod error;
mod handler;
mod method;
mod path;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use config::DispatcherConfig;
pub use container::{Container, Deps, Injectable};
pub use controller::{ControllerDescriptor, RouteRegistrar};
pub use cors::{ALLOW_HEADERS, ALLOW_METHODS, CorsPolicy};
pub use dispatcher::Dispatcher;
pub use error::{BoxError, Error, HandlerError, RegistrationError, ResolveError, UnknownMethod};
pub use handler::{BoxFuture, HandlerResult, HandlerTarget};
pub use method::Method;
pub use middleware::{Middleware, MiddlewareRef, Next};
pub use path::{Params, PathMatcher};
pub use request::Request;
pub use response::Response;
pub use router::{Route, RouteTable, normalize};
pub use server::Server;
