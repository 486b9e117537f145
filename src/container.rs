//! Constructor-injection container.
//!
//! Every constructible type declares its dependencies up front, either by
//! implementing [`Injectable`] or through a factory passed to
//! [`Container::register_with`]. Both pull their parameters out of a
//! [`Deps`] resolver, so the dependency graph is walked explicitly and no
//! type introspection happens at runtime.
//!
//! Instances are singletons: the first resolution of a type builds it and
//! caches it, every later resolution returns the same `Arc`.
//!
//! ```rust
//! use std::sync::Arc;
//! use junction::{Container, Deps, Injectable, ResolveError};
//!
//! struct Db { url: String }
//! struct Repo { db: Arc<Db> }
//!
//! impl Injectable for Db {
//!     fn inject(deps: &mut Deps<'_>) -> Result<Self, ResolveError> {
//!         Ok(Self { url: deps.value("db_url", Some("sqlite::memory:".to_owned()))? })
//!     }
//! }
//!
//! impl Injectable for Repo {
//!     fn inject(deps: &mut Deps<'_>) -> Result<Self, ResolveError> {
//!         Ok(Self { db: deps.get()? })
//!     }
//! }
//!
//! let mut container = Container::new();
//! container.register::<Db>().register::<Repo>();
//!
//! let repo = container.resolve::<Repo>().unwrap();
//! assert!(Arc::ptr_eq(&repo.db, &container.resolve::<Db>().unwrap()));
//! ```

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{Chain, ResolveError};

type Instance = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&mut Deps<'_>) -> Result<Instance, ResolveError> + Send + Sync>;

/// A type the container can construct by itself.
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Builds the instance, pulling each constructor parameter from `deps`.
    fn inject(deps: &mut Deps<'_>) -> Result<Self, ResolveError>;
}

/// Registry of factories and the singleton instances they produced.
///
/// Factories and bound values are registered through `&mut self` during
/// startup. Once the container is shared (usually inside an `Arc` held by
/// the [`Dispatcher`](crate::Dispatcher)) only resolution and [`set`](Self::set)
/// remain available, both safe under concurrent use.
pub struct Container {
    factories: HashMap<TypeId, Factory>,
    values: HashMap<String, Instance>,
    instances: RwLock<HashMap<TypeId, Instance>>,
    // One lock per type serializes its first construction. Locks are only
    // taken along dependency edges, so an acyclic graph cannot deadlock.
    building: Mutex<HashMap<TypeId, Arc<Mutex<()>>>>,
}

impl Container {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            values: HashMap::new(),
            instances: RwLock::new(HashMap::new()),
            building: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `T` as constructible through its [`Injectable`] impl.
    pub fn register<T: Injectable>(&mut self) -> &mut Self {
        self.register_with(T::inject)
    }

    /// Registers `T` with an explicit factory.
    pub fn register_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Deps<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        let erased: Factory =
            Arc::new(move |deps: &mut Deps<'_>| factory(deps).map(|t| Arc::new(t) as Instance));
        if self.factories.insert(TypeId::of::<T>(), erased).is_some() {
            debug!(ty = type_name::<T>(), "factory replaced");
        }
        self
    }

    /// Binds a named primitive parameter. Takes precedence over the default
    /// a factory declares for that name.
    pub fn bind_value<V: Clone + Send + Sync + 'static>(&mut self, name: impl Into<String>, value: V) -> &mut Self {
        self.values.insert(name.into(), Arc::new(value));
        self
    }

    /// Pre-seeds the registry with an externally constructed instance.
    ///
    /// Later resolutions of `T` return this instance and never run a factory.
    pub fn set<T: Send + Sync + 'static>(&self, instance: T) {
        self.set_arc(Arc::new(instance));
    }

    /// Like [`set`](Self::set), for an instance that is already shared.
    pub fn set_arc<T: Send + Sync + 'static>(&self, instance: Arc<T>) {
        self.instances.write().insert(TypeId::of::<T>(), instance);
    }

    /// Resolves `T`, building it and its dependencies on first use.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        Deps::new(self).get()
    }

    /// Whether `T` has either a cached instance or a factory.
    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_id(TypeId::of::<T>())
    }

    pub(crate) fn contains_id(&self, id: TypeId) -> bool {
        self.factories.contains_key(&id) || self.instances.read().contains_key(&id)
    }

    fn cached(&self, id: TypeId) -> Option<Instance> {
        self.instances.read().get(&id).cloned()
    }

    fn build_lock(&self, id: TypeId) -> Arc<Mutex<()>> {
        Arc::clone(self.building.lock().entry(id).or_default())
    }

    fn instance(&self, id: TypeId, ty: &'static str, deps: &mut Deps<'_>) -> Result<Instance, ResolveError> {
        if let Some(instance) = self.cached(id) {
            return Ok(instance);
        }
        if deps.stack.iter().any(|(t, _)| *t == id) {
            let mut chain: Vec<_> = deps.stack.iter().map(|(_, name)| *name).collect();
            chain.push(ty);
            return Err(ResolveError::CircularDependency { chain: Chain(&chain).to_string() });
        }

        let lock = self.build_lock(id);
        let _building = lock.lock();
        // Another thread may have finished building while we waited.
        if let Some(instance) = self.cached(id) {
            return Ok(instance);
        }
        let factory = self
            .factories
            .get(&id)
            .cloned()
            .ok_or(ResolveError::UnresolvableType { ty })?;

        deps.stack.push((id, ty));
        let built = factory(deps);
        deps.stack.pop();
        let built = built?;

        debug!(ty, "instance constructed");
        let mut instances = self.instances.write();
        Ok(Arc::clone(instances.entry(id).or_insert(built)))
    }
}

impl Default for Container {
    fn default() -> Self { Self::new() }
}

/// Resolver handed to factories while a type is being constructed.
///
/// Tracks the chain of types currently under construction so a type that
/// depends on itself fails with [`ResolveError::CircularDependency`]
/// instead of recursing forever.
pub struct Deps<'c> {
    container: &'c Container,
    stack: Vec<(TypeId, &'static str)>,
}

impl<'c> Deps<'c> {
    fn new(container: &'c Container) -> Self {
        Self { container, stack: Vec::new() }
    }

    /// Resolves a service dependency.
    pub fn get<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ResolveError> {
        let ty = type_name::<T>();
        let container = self.container;
        container
            .instance(TypeId::of::<T>(), ty, self)?
            .downcast::<T>()
            .map_err(|_| ResolveError::UnresolvableType { ty })
    }

    /// Resolves a primitive parameter: the value bound under `name`, else
    /// `default`, else [`ResolveError::UnresolvableParameter`].
    ///
    /// A value bound under `name` with a type other than `V` is an error,
    /// not a reason to fall back to the default.
    pub fn value<V: Clone + Send + Sync + 'static>(&self, name: &str, default: Option<V>) -> Result<V, ResolveError> {
        let unresolvable = || ResolveError::UnresolvableParameter { ty: self.current(), param: name.to_owned() };
        match self.container.values.get(name) {
            Some(bound) => bound.downcast_ref::<V>().cloned().ok_or_else(unresolvable),
            None => default.ok_or_else(unresolvable),
        }
    }

    fn current(&self) -> &'static str {
        self.stack.last().map_or("<root>", |&(_, ty)| ty)
    }
}
