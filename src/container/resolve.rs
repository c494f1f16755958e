//! Dependency-ordered resolution.

use std::any::Any;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::{synthesized, Container, Instance, LifecycleContext, Synthesized};
use crate::error::ResolutionError;
use crate::internal::order;
use crate::internal::sync_map::FastMap;
use crate::key::key_of;
use crate::lifetime::Lifetime;
use crate::registration::{AnyArc, ServiceEntry};

impl Container {
    /// Resolves `S` by its type-derived key.
    ///
    /// Without a context the background context is used, so `Scoped`
    /// services then behave like singletons of the background context.
    ///
    /// # Errors
    ///
    /// See [`resolve_any`](Self::resolve_any).
    pub fn resolve<S: ?Sized + Send + Sync + 'static>(
        &self,
        context: Option<&LifecycleContext>,
    ) -> Result<Arc<S>, ResolutionError> {
        self.resolve_with_key::<S>(&key_of::<S>(), context)
    }

    /// Resolves the registration under `key` and casts it to `S`.
    pub fn resolve_with_key<S: ?Sized + Send + Sync + 'static>(
        &self,
        key: &str,
        context: Option<&LifecycleContext>,
    ) -> Result<Arc<S>, ResolutionError> {
        let value = self.resolve_any(key, context)?;
        value
            .downcast_ref::<Arc<S>>()
            .cloned()
            .ok_or_else(|| ResolutionError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<S>(),
            })
    }

    /// Resolves `S`, panicking if resolution fails.
    ///
    /// # Panics
    ///
    /// Panics with the resolution error message. Prefer
    /// [`resolve`](Self::resolve) wherever the failure can be handled.
    pub fn resolve_required<S: ?Sized + Send + Sync + 'static>(&self, context: Option<&LifecycleContext>) -> Arc<S> {
        match self.resolve::<S>(context) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Resolves the registration under `key` into its stored handle.
    ///
    /// The dependency order of `key` is computed on first use and cached.
    /// Each service in the order is then built once: dependencies first,
    /// reusing cached singletons (background context) and scoped instances
    /// (the given context), and invoking factories otherwise. No partial
    /// result is returned on failure.
    ///
    /// A factory must not resolve its own `Singleton` or `Scoped` service
    /// through an injected [`Container`]; the entry lock it would wait on is
    /// already held by the same thread.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::BlankKey`] for an empty key
    /// - [`ResolutionError::NotRegistered`] when `key` has no registration
    /// - [`ResolutionError::DependencyNotRegistered`] for a missing transitive dependency
    /// - [`ResolutionError::CircularDependency`] when the graph loops; no factory runs
    /// - [`ResolutionError::TypeMismatch`] when a factory, cache or dependency yields the wrong type
    /// - [`ResolutionError::Lifecycle`] when the caching context is closed or closing; the
    ///   factory is not invoked
    pub fn resolve_any(&self, key: &str, context: Option<&LifecycleContext>) -> Result<AnyArc, ResolutionError> {
        if key.trim().is_empty() {
            return Err(ResolutionError::BlankKey);
        }

        let background = self.background_context();
        let context = context.unwrap_or(&background);

        if key == key_of::<Container>() {
            return Ok(Arc::new(Arc::new(self.clone())) as AnyArc);
        }
        if key == key_of::<LifecycleContext>() {
            return Ok(Arc::new(Arc::new(context.clone())) as AnyArc);
        }

        let plan = self.plan(key)?;
        debug!(service = key, steps = plan.len(), context = %context.id(), "resolving service");

        let mut resolved: FastMap<Arc<str>, AnyArc> = FastMap::default();
        let mut last = None;
        for entry in &plan {
            let value = self.instantiate(entry, &resolved, context, &background)?;
            resolved.insert(Arc::clone(&entry.key), Arc::clone(&value));
            last = Some(value);
        }

        last.ok_or_else(|| ResolutionError::NotRegistered { key: key.to_string() })
    }

    /// Entries to build for `key`, dependencies first.
    fn plan(&self, key: &str) -> Result<Vec<Arc<ServiceEntry>>, ResolutionError> {
        let registry = self.inner.registry.read();
        let root = registry
            .get(key)
            .cloned()
            .ok_or_else(|| ResolutionError::NotRegistered { key: key.to_string() })?;

        let order = root
            .order
            .get_or_try_init(|| order::dependency_order(&registry, key).map(Arc::from))?;

        order
            .iter()
            .map(|step| {
                registry
                    .get(step)
                    .cloned()
                    .ok_or_else(|| ResolutionError::DependencyNotRegistered {
                        service: key.to_string(),
                        dependency: step.to_string(),
                    })
            })
            .collect()
    }

    fn instantiate(
        &self,
        entry: &ServiceEntry,
        resolved: &FastMap<Arc<str>, AnyArc>,
        context: &LifecycleContext,
        background: &LifecycleContext,
    ) -> Result<AnyArc, ResolutionError> {
        let cache = match entry.lifetime {
            Lifetime::Transient => return self.invoke(entry, resolved, context),
            Lifetime::Singleton => background,
            Lifetime::Scoped => context,
        };

        let _guard = entry.instantiation.lock();
        if let Some(instance) = cache.get_instance(&entry.key) {
            trace!(service = %entry.key, lifetime = %entry.lifetime, "cache hit");
            return checked(entry, Arc::clone(instance.value()));
        }
        cache.ensure_open()?;

        let value = self.invoke(entry, resolved, context)?;
        cache.set_instance(
            &entry.key,
            Instance::from_parts(Arc::clone(&value), entry.service_type, entry.factory.listener()),
        )?;
        debug!(service = %entry.key, lifetime = %entry.lifetime, context = %cache.id(), "instance cached");
        Ok(value)
    }

    fn invoke(
        &self,
        entry: &ServiceEntry,
        resolved: &FastMap<Arc<str>, AnyArc>,
        context: &LifecycleContext,
    ) -> Result<AnyArc, ResolutionError> {
        let mut args: SmallVec<[AnyArc; 4]> = SmallVec::new();
        for parameter in entry.factory.parameters() {
            let arg = match synthesized(parameter) {
                Some(Synthesized::Container) => Arc::new(Arc::new(self.clone())) as AnyArc,
                Some(Synthesized::Context) => Arc::new(Arc::new(context.clone())) as AnyArc,
                None => resolved.get(parameter.name()).cloned().ok_or_else(|| {
                    ResolutionError::DependencyNotResolved {
                        service: entry.key.to_string(),
                        dependency: parameter.name().to_string(),
                    }
                })?,
            };
            args.push(arg);
        }

        let value = entry.factory.call(&args).map_err(|err| ResolutionError::TypeMismatch {
            key: entry
                .factory
                .parameters()
                .get(err.index)
                .map_or_else(|| entry.key.to_string(), |parameter| parameter.name().to_string()),
            expected: err.expected,
        })?;
        checked(entry, value)
    }
}

/// Verifies a handle holds the entry's declared type.
fn checked(entry: &ServiceEntry, value: AnyArc) -> Result<AnyArc, ResolutionError> {
    let concrete: &dyn Any = &*value;
    if concrete.type_id() == entry.service_type.handle_id() {
        Ok(value)
    } else {
        Err(ResolutionError::TypeMismatch {
            key: entry.key.to_string(),
            expected: entry.service_type.name(),
        })
    }
}
