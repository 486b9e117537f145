//! Minimal junction example: a users controller with an injected store,
//! a timing middleware, and an origin allow-list.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/users/42
//!   curl -X POST http://localhost:3000/api/users \
//!        -H 'origin: http://localhost:8080' \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"bob"}'
//!   curl -X DELETE -H 'origin: http://localhost:8080' http://localhost:3000/api/users/42
//!   curl -X DELETE -H 'origin: https://evil.example' http://localhost:3000/api/users/42   # 403

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use http::StatusCode;
use junction::{
    Container, ControllerDescriptor, Deps, Dispatcher, DispatcherConfig, HandlerError, HandlerResult, Injectable,
    Method, Middleware, Next, Params, Request, Response, ResolveError, RouteRegistrar, RouteTable, Server,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;

// In-memory store. `seed_name` comes from a bound value, or its default.
struct UserStore {
    users: RwLock<HashMap<String, String>>,
    // Ids are never reused, even after a delete.
    next_id: AtomicUsize,
}

impl Injectable for UserStore {
    fn inject(deps: &mut Deps<'_>) -> Result<Self, ResolveError> {
        let seed: String = deps.value("seed_name", Some("alice".to_owned()))?;
        Ok(Self {
            users: RwLock::new(HashMap::from([("42".to_owned(), seed)])),
            next_id: AtomicUsize::new(100),
        })
    }
}

impl UserStore {
    fn insert(&self, name: String) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        self.users.write().insert(id.clone(), name);
        id
    }
}

struct Users {
    store: Arc<UserStore>,
}

impl Injectable for Users {
    fn inject(deps: &mut Deps<'_>) -> Result<Self, ResolveError> {
        Ok(Self { store: deps.get()? })
    }
}

#[derive(Deserialize)]
struct CreateUser {
    name: String,
}

impl Users {
    // GET /api/users/{id}
    async fn show(self: Arc<Self>, _req: Request, res: Response, params: Params) -> HandlerResult {
        let id = params.get(0).unwrap_or_default();
        let Some(name) = self.store.users.read().get(id).cloned() else {
            return Ok(res.with_status(StatusCode::NOT_FOUND).with_json(json!({ "error": "no such user" })));
        };
        Ok(res.with_json(json!({ "id": id, "name": name })))
    }

    // POST /api/users
    async fn create(self: Arc<Self>, req: Request, res: Response, _: Params) -> HandlerResult {
        let input: CreateUser = serde_json::from_slice(req.body()).map_err(HandlerError::from)?;
        let id = self.store.insert(input.name.clone());
        Ok(res.with_status(StatusCode::CREATED).with_json(json!({ "id": id, "name": input.name })))
    }

    // DELETE /api/users/{id} → 204 No Content
    async fn delete(self: Arc<Self>, _req: Request, res: Response, params: Params) -> HandlerResult {
        self.store.users.write().remove(params.get(0).unwrap_or_default());
        Ok(res.with_status(StatusCode::NO_CONTENT))
    }
}

struct Timing;

#[async_trait]
impl Middleware for Timing {
    async fn handle(&self, req: Request, res: Response, next: Next) -> HandlerResult {
        let (method, path) = (req.method(), req.path().to_owned());
        let started = Instant::now();
        let res = next(req, res).await;
        tracing::info!(%method, %path, elapsed = ?started.elapsed(), "handled");
        res
    }
}

#[tokio::main]
async fn main() -> Result<(), junction::Error> {
    tracing_subscriber::fmt::init();

    let mut container = Container::new();
    container.register::<UserStore>().register::<Users>();
    container.set(Timing);

    let mut routes = RouteTable::new();
    RouteRegistrar::new(&mut routes, &container).register(
        ControllerDescriptor::<Users>::new()
            .group("/users")
            .middleware::<Timing>()
            .get("/{id}", "show", Users::show)
            .post("/", "create", Users::create)
            .delete("/{id}", "delete", Users::delete),
    );

    let config = DispatcherConfig::new()
        .with_base_path("/api")
        // Anyone may read; only the local frontend may write.
        .allow_origin("*", [Method::Get])
        .allow_origin("http://localhost:8080", Method::ALL);

    let dispatcher = Dispatcher::new(config, routes, container);
    Server::bind("0.0.0.0:3000")?.serve(dispatcher).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut container = Container::new();
        container.register::<UserStore>();
        let store = container.resolve::<UserStore>().unwrap();

        let first = store.insert("bob".into());
        store.users.write().remove(&first);
        let second = store.insert("carol".into());
        let third = store.insert("dave".into());

        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(store.users.read().get(&second).map(String::as_str), Some("carol"));
        assert_eq!(store.users.read().len(), 3);
    }
}
