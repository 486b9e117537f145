//! Middleware layer.
//!
//! Middleware wraps the terminal handler of a route, typically for
//! authentication or request logging.
//!
//! A route's middleware runs in declaration order on the way in and in
//! reverse order on the way out:
//!
//! ```text
//! A before ─► B before ─► handler ─► B after ─► A after
//! ```
//!
//! A middleware short-circuits by returning without calling `next`.
//!
//! ```rust
//! use junction::middleware::{Middleware, Next};
//! use junction::{HandlerResult, Request, Response};
//! use http::StatusCode;
//! use serde_json::json;
//!
//! struct RequireToken;
//!
//! #[async_trait::async_trait]
//! impl Middleware for RequireToken {
//!     async fn handle(&self, req: Request, res: Response, next: Next) -> HandlerResult {
//!         if req.header("authorization").is_none() {
//!             return Ok(res.with_status(StatusCode::UNAUTHORIZED)
//!                 .with_json(json!({"error": "Unauthorized"})));
//!         }
//!         next(req, res).await
//!     }
//! }
//! ```

use std::any::{TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::container::Container;
use crate::error::ResolveError;
use crate::handler::{BoxFuture, HandlerResult};
use crate::request::Request;
use crate::response::Response;

/// The rest of the chain, as seen from one middleware.
pub type Next = Arc<dyn Fn(Request, Response) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// One unit of request/response processing.
///
/// Middleware instances are resolved through the [`Container`], so they are
/// singletons and may declare their own dependencies via
/// [`Injectable`](crate::Injectable).
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, req: Request, res: Response, next: Next) -> HandlerResult;
}

type ResolveFn = fn(&Container) -> Result<Arc<dyn Middleware>, ResolveError>;

/// Names a middleware type in a route's chain.
#[derive(Clone)]
pub struct MiddlewareRef {
    id: TypeId,
    name: &'static str,
    resolve: ResolveFn,
}

impl MiddlewareRef {
    pub fn of<M: Middleware>() -> Self {
        Self {
            id: TypeId::of::<M>(),
            name: type_name::<M>(),
            resolve: |container: &Container| container.resolve::<M>().map(|m| m as Arc<dyn Middleware>),
        }
    }

    pub fn name(&self) -> &'static str { self.name }

    pub(crate) fn id(&self) -> TypeId { self.id }

    fn resolve(&self, container: &Container) -> Result<Arc<dyn Middleware>, ResolveError> {
        (self.resolve)(container)
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl PartialEq for MiddlewareRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Wraps `terminal` in `middlewares`, outermost first.
///
/// The chain is built right to left: the last middleware wraps the terminal
/// handler, the one before it wraps that, and so on. Each middleware is
/// resolved when its link is invoked, not when the chain is built, and runs
/// once per occurrence in the list.
pub fn compose(container: &Arc<Container>, middlewares: &[MiddlewareRef], terminal: Next) -> Next {
    middlewares.iter().rev().fold(terminal, |next, middleware| {
        let middleware = middleware.clone();
        let container = Arc::clone(container);
        let link: Next = Arc::new(move |req: Request, res: Response| -> BoxFuture<'static, HandlerResult> {
            let next = Arc::clone(&next);
            match middleware.resolve(&container) {
                Ok(instance) => Box::pin(async move { instance.handle(req, res, next).await }),
                Err(e) => Box::pin(async move { Err(e.into()) }),
            }
        });
        link
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use crate::error::{Error, HandlerError};
    use http::StatusCode;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Trace(Mutex<Vec<String>>);

    impl Trace {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    macro_rules! logging_middleware {
        ($name:ident) => {
            struct $name(Arc<Trace>);

            #[async_trait]
            impl Middleware for $name {
                async fn handle(&self, req: Request, res: Response, next: Next) -> HandlerResult {
                    self.0.push(concat!(stringify!($name), "_enter"));
                    let res = next(req, res).await;
                    self.0.push(concat!(stringify!($name), "_exit"));
                    res
                }
            }
        };
    }

    logging_middleware!(A);
    logging_middleware!(B);

    struct Gate;

    #[async_trait]
    impl Middleware for Gate {
        async fn handle(&self, _req: Request, res: Response, _next: Next) -> HandlerResult {
            Ok(res.with_status(StatusCode::UNAUTHORIZED))
        }
    }

    struct Explode;

    #[async_trait]
    impl Middleware for Explode {
        async fn handle(&self, _req: Request, _res: Response, _next: Next) -> HandlerResult {
            Err(HandlerError::new("middleware failed").into())
        }
    }

    fn setup() -> (Arc<Container>, Arc<Trace>) {
        let trace = Arc::new(Trace::default());
        let container = Container::new();
        container.set(A(Arc::clone(&trace)));
        container.set(B(Arc::clone(&trace)));
        container.set(Gate);
        container.set(Explode);
        (Arc::new(container), trace)
    }

    fn terminal(trace: &Arc<Trace>) -> Next {
        let trace = Arc::clone(trace);
        Arc::new(move |_req: Request, res: Response| -> BoxFuture<'static, HandlerResult> {
            let trace = Arc::clone(&trace);
            Box::pin(async move {
                trace.push("handler");
                Ok(res.with_status(StatusCode::ACCEPTED))
            })
        })
    }

    fn request() -> Request {
        Request::new(Method::Get, "/")
    }

    #[tokio::test]
    async fn runs_as_an_onion() {
        let (container, trace) = setup();
        let chain = compose(&container, &[MiddlewareRef::of::<A>(), MiddlewareRef::of::<B>()], terminal(&trace));

        let res = chain(request(), Response::new()).await.unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert_eq!(trace.entries(), ["A_enter", "B_enter", "handler", "B_exit", "A_exit"]);
    }

    #[tokio::test]
    async fn empty_chain_is_the_terminal() {
        let (container, trace) = setup();
        let chain = compose(&container, &[], terminal(&trace));
        chain(request(), Response::new()).await.unwrap();
        assert_eq!(trace.entries(), ["handler"]);
    }

    #[tokio::test]
    async fn duplicates_run_once_per_occurrence() {
        let (container, trace) = setup();
        let chain = compose(&container, &[MiddlewareRef::of::<A>(), MiddlewareRef::of::<A>()], terminal(&trace));
        chain(request(), Response::new()).await.unwrap();
        assert_eq!(trace.entries(), ["A_enter", "A_enter", "handler", "A_exit", "A_exit"]);
    }

    #[tokio::test]
    async fn short_circuit_skips_the_rest() {
        let (container, trace) = setup();
        let chain = compose(
            &container,
            &[MiddlewareRef::of::<A>(), MiddlewareRef::of::<Gate>(), MiddlewareRef::of::<B>()],
            terminal(&trace),
        );
        let res = chain(request(), Response::new()).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(trace.entries(), ["A_enter", "A_exit"]);
    }

    #[tokio::test]
    async fn errors_propagate_outward() {
        let (container, trace) = setup();
        let chain = compose(&container, &[MiddlewareRef::of::<A>(), MiddlewareRef::of::<Explode>()], terminal(&trace));
        let err = chain(request(), Response::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "middleware failed");
        assert_eq!(trace.entries(), ["A_enter", "A_exit"]);
    }

    struct Unregistered;

    #[async_trait]
    impl Middleware for Unregistered {
        async fn handle(&self, req: Request, res: Response, next: Next) -> HandlerResult {
            next(req, res).await
        }
    }

    #[tokio::test]
    async fn unresolvable_middleware_fails_at_invocation() {
        let (container, trace) = setup();
        let chain = compose(&container, &[MiddlewareRef::of::<Unregistered>()], terminal(&trace));
        let err = chain(request(), Response::new()).await.unwrap_err();
        assert!(matches!(err, Error::Resolve(ResolveError::UnresolvableType { .. })));
        assert!(trace.entries().is_empty());
    }
}
