//! Controller actions and their type erasure.
//!
//! # How actions are stored
//!
//! A route table holds actions of *different* controllers and signatures, so
//! each action is erased behind one uniform function when it is registered:
//!
//! ```text
//! async fn show(self: Arc<Self>, req, res, params) -> HandlerResult   ← user writes this
//!        ↓ ControllerDescriptor::get("/{id}", "show", Users::show)
//! HandlerTarget::new::<Users, _, _>("show", Users::show)
//!        ↓  stored as Arc<dyn Fn(&Container, Request, Response, Params) -> BoxFuture>
//! target.invoke(&container, req, res, params)  at request time
//!        ↓
//! container.resolve::<Users>()  then  Users::show(users, req, res, params)
//! ```
//!
//! The controller is resolved through the [`Container`] on every invocation;
//! after the first request that is a cache hit returning the shared singleton.

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::container::Container;
use crate::error::Error;
use crate::middleware::Next;
use crate::path::Params;
use crate::request::Request;
use crate::response::Response;

/// A heap-allocated, type-erased future.
///
/// `Send` lets tokio move the future across worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What every middleware and action produces.
pub type HandlerResult = Result<Response, Error>;

type Invoke = Arc<dyn Fn(&Container, Request, Response, Params) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// The terminal handler of a route: one action on one controller type.
#[derive(Clone)]
pub struct HandlerTarget {
    controller_name: &'static str,
    action: &'static str,
    invoke: Invoke,
}

impl HandlerTarget {
    /// Erases `action`, an async function taking the resolved controller
    /// followed by `(request, response, params)`.
    ///
    /// `name` identifies the action in logs and route listings.
    pub fn new<C, F, Fut>(name: &'static str, action: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(Arc<C>, Request, Response, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let invoke: Invoke = Arc::new(
            move |container: &Container, req: Request, res: Response, params: Params| -> BoxFuture<'static, HandlerResult> {
                match container.resolve::<C>() {
                    Ok(controller) => Box::pin(action(controller, req, res, params)),
                    Err(e) => Box::pin(async move { Err(e.into()) }),
                }
            },
        );
        Self {
            controller_name: type_name::<C>(),
            action: name,
            invoke,
        }
    }

    pub fn controller_name(&self) -> &'static str { self.controller_name }
    pub fn action(&self) -> &'static str { self.action }

    /// Resolves the controller and runs the action.
    pub fn invoke(&self, container: &Container, req: Request, res: Response, params: Params) -> BoxFuture<'static, HandlerResult> {
        (self.invoke)(container, req, res, params)
    }

    /// Binds container and path parameters, producing the innermost link
    /// of a middleware chain.
    pub(crate) fn bind(&self, container: Arc<Container>, params: Params) -> Next {
        let target = self.clone();
        Arc::new(move |req: Request, res: Response| target.invoke(&container, req, res, params.clone()))
    }
}

impl fmt::Debug for HandlerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.controller_name, self.action)
    }
}
