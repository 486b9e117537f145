//! hyper transport around a [`Dispatcher`].
//!
//! Each accepted socket becomes one task serving HTTP/1.1 or HTTP/2. Every
//! request on it is converted into a [`Request`] and dispatched, and the
//! [`Response`] is written back.
//!
//! Shutdown stops the accept loop first and then waits for the connection
//! tasks already running, so requests in flight are answered.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http::request::Parts;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

/// Serves a [`Dispatcher`] on one socket address.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Parses `addr`; nothing is bound until [`serve`](Self::serve).
    ///
    /// ```rust
    /// use junction::Server;
    /// assert!(Server::bind("127.0.0.1:8080").is_ok());
    /// assert!(Server::bind("localhost").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|_| Error::InvalidAddress(addr.to_owned()))?;
        Ok(Self { addr })
    }

    /// Serves until SIGTERM or Ctrl-C, then drains open connections.
    pub async fn serve(self, dispatcher: Dispatcher) -> Result<(), Error> {
        self.serve_with_shutdown(dispatcher, shutdown_signal()).await
    }

    /// Serves until `signal` resolves, then drains open connections.
    pub async fn serve_with_shutdown(
        self,
        dispatcher: Dispatcher,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let dispatcher = Arc::new(dispatcher);
        info!(addr = %listener.local_addr()?, routes = dispatcher.routes().len(), "listening");

        let mut connections = JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => break,

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(serve_connection(Arc::clone(&dispatcher), stream, peer));
                    }
                    Err(e) => error!("accept failed: {e}"),
                },

                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(open = connections.len(), "shutting down");
        while connections.join_next().await.is_some() {}
        info!("stopped");
        Ok(())
    }
}

async fn serve_connection(dispatcher: Arc<Dispatcher>, stream: TcpStream, peer: SocketAddr) {
    let service = hyper::service::service_fn(move |req: hyper::Request<Incoming>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { Ok::<_, std::convert::Infallible>(handle(&dispatcher, req).await) }
    });

    if let Err(e) = auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        error!(%peer, "connection closed with error: {e}");
    }
}

async fn handle(dispatcher: &Dispatcher, req: hyper::Request<Incoming>) -> http::Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!("request body unreadable: {e}");
            return Response::new().with_status(StatusCode::BAD_REQUEST).into_inner();
        }
    };

    match convert(parts, body) {
        Ok(req) => dispatcher.dispatch(req, Response::new()).await.into_inner(),
        Err(res) => res.into_inner(),
    }
}

/// Builds a [`Request`], or the response to send instead when the method is
/// not one a route can be declared for.
fn convert(parts: Parts, body: Bytes) -> Result<Request, Response> {
    match Method::try_from(&parts.method) {
        Ok(method) => Ok(Request::from_parts(method, parts.uri, parts.headers, body)),
        Err(e) => {
            debug!("{e}");
            Err(Response::new().with_status(StatusCode::METHOD_NOT_ALLOWED))
        }
    }
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("received Ctrl-C"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatcherConfig;
    use crate::container::Container;
    use crate::router::RouteTable;

    fn parts(method: &str, uri: &str) -> Parts {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header("origin", "https://a.example")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn convert_keeps_method_uri_and_headers() {
        let req = convert(parts("PATCH", "/users/1?x=y"), Bytes::from_static(b"{}")).unwrap();
        assert_eq!(req.method(), Method::Patch);
        assert_eq!(req.uri(), "/users/1?x=y");
        assert_eq!(req.origin(), "https://a.example");
        assert_eq!(req.body(), b"{}");
    }

    #[test]
    fn unroutable_method_is_405() {
        let res = convert(parts("BREW", "/pot"), Bytes::new()).unwrap_err();
        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn returns_once_signalled() {
        let dispatcher = Dispatcher::new(DispatcherConfig::new(), RouteTable::new(), Container::new());
        Server::bind("127.0.0.1:0")
            .unwrap()
            .serve_with_shutdown(dispatcher, async {})
            .await
            .unwrap();
    }
}
