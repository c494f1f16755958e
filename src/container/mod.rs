//! The container: registry, lifecycle contexts and shutdown coordination.

mod context;
mod resolve;

use std::fmt;
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancellation::{self, CancellationToken};
use crate::config::ContainerConfig;
use crate::descriptors::ServiceDescriptor;
use crate::error::{
    LifecycleError, MismatchedDependency, MissingDependency, RegistrationError, ShutdownError, ValidationError,
};
use crate::internal::semaphore::Semaphore;
use crate::internal::sync_map::{FastMap, SyncMap};
use crate::key::{key_of, ServiceType};
use crate::lifetime::Lifetime;
use crate::registration::{ErasedFactory, ServiceEntry};
use crate::traits::factory::Factory;
use crate::traits::listener::LifecycleListener;

pub use context::{ContextState, Instance, LifecycleContext};

/// Parameter types the container supplies itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Synthesized {
    Container,
    Context,
}

pub(crate) fn synthesized(service_type: &ServiceType) -> Option<Synthesized> {
    if service_type.is::<Container>() {
        Some(Synthesized::Container)
    } else if service_type.is::<LifecycleContext>() {
        Some(Synthesized::Context)
    } else {
        None
    }
}

/// Dependency injection container.
///
/// Holds the registry of service factories, the background lifecycle
/// context backing singletons, and every scoped context created through
/// [`new_context`](Self::new_context). `Container` is a cheap handle:
/// clones share one registry and one set of contexts, while separately
/// constructed containers are fully independent.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Container, Lifetime};
/// use std::sync::Arc;
///
/// struct Repository;
/// struct Service { repo: Arc<Repository> }
///
/// let container = Container::new();
/// container.register::<Repository, _, _>(Lifetime::Singleton, || Repository).unwrap();
/// container
///     .register::<Service, _, _>(Lifetime::Transient, |repo: Arc<Repository>| Service { repo })
///     .unwrap();
/// container.validate().unwrap();
///
/// let a = container.resolve::<Service>(None).unwrap();
/// let b = container.resolve::<Service>(None).unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// assert!(Arc::ptr_eq(&a.repo, &b.repo));
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

struct ContainerInner {
    registry: SyncMap<Arc<str>, Arc<ServiceEntry>>,
    contexts: RwLock<Contexts>,
    config: ContainerConfig,
}

struct Contexts {
    background: LifecycleContext,
    scoped: FastMap<Uuid, LifecycleContext>,
}

impl Container {
    /// Creates an empty container with process-wide default configuration.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Creates an empty container with explicit shutdown and teardown bounds.
    pub fn with_config(config: ContainerConfig) -> Self {
        let background = LifecycleContext::with_teardown_concurrency(config.teardown_concurrency());
        debug!(background = %background.id(), "container created");
        Self {
            inner: Arc::new(ContainerInner {
                registry: SyncMap::new(),
                contexts: RwLock::new(Contexts {
                    background,
                    scoped: FastMap::default(),
                }),
                config,
            }),
        }
    }

    /// Configuration this container was built with.
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// Registers a factory for `S` under its type-derived key.
    ///
    /// Instances registered here never receive teardown callbacks, even when
    /// `S` implements [`LifecycleListener`]; use
    /// [`register_listener`](Self::register_listener) for those.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistrationError::Duplicate`] when `S` is already
    /// registered; the existing registration is left intact.
    pub fn register<S, Args, F>(&self, lifetime: Lifetime, factory: F) -> Result<(), RegistrationError>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S, Args>,
    {
        self.register_with_key::<S, Args, F>(&key_of::<S>(), lifetime, factory)
    }

    /// Registers a factory for `S` under an explicit key.
    ///
    /// Explicit keys let the same type be bound more than once. Keyed
    /// registrations are only reachable through
    /// [`resolve_with_key`](Self::resolve_with_key); factory parameters
    /// always resolve by type.
    pub fn register_with_key<S, Args, F>(&self, key: &str, lifetime: Lifetime, factory: F) -> Result<(), RegistrationError>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S, Args>,
    {
        self.register_erased(
            ServiceType::of::<S>(),
            key,
            lifetime,
            ErasedFactory::from_factory::<S, Args, F>(factory),
        )
    }

    /// Registers a service whose cached instances receive teardown callbacks.
    pub fn register_listener<S, Args, F>(&self, lifetime: Lifetime, factory: F) -> Result<(), RegistrationError>
    where
        S: ?Sized + LifecycleListener + 'static,
        F: Factory<S, Args>,
    {
        self.register_listener_with_key::<S, Args, F>(&key_of::<S>(), lifetime, factory)
    }

    /// Registers a listener service under an explicit key.
    pub fn register_listener_with_key<S, Args, F>(
        &self,
        key: &str,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<(), RegistrationError>
    where
        S: ?Sized + LifecycleListener + 'static,
        F: Factory<S, Args>,
    {
        self.register_erased(
            ServiceType::of::<S>(),
            key,
            lifetime,
            ErasedFactory::from_factory::<S, Args, F>(factory).listening::<S>(),
        )
    }

    /// Registers a type-erased factory.
    ///
    /// Every other `register*` method funnels through here. The key must be
    /// non-blank, the factory's declared output must be `service_type`, and
    /// the key must be free. The factory is never invoked.
    pub fn register_erased(
        &self,
        service_type: ServiceType,
        key: &str,
        lifetime: Lifetime,
        factory: ErasedFactory,
    ) -> Result<(), RegistrationError> {
        if key.trim().is_empty() {
            return Err(RegistrationError::BlankKey);
        }
        if synthesized(&service_type).is_some() {
            return Err(RegistrationError::Reserved {
                type_name: service_type.name(),
            });
        }
        if factory.output() != service_type {
            return Err(RegistrationError::ReturnTypeMismatch {
                key: key.to_string(),
                expected: service_type.name(),
                actual: factory.output().name(),
            });
        }

        let key: Arc<str> = Arc::from(key);
        let entry = ServiceEntry::new(Arc::clone(&key), service_type, lifetime, factory);
        if !self.inner.registry.insert_if_absent(Arc::clone(&key), Arc::new(entry)) {
            return Err(RegistrationError::Duplicate { key: key.to_string() });
        }

        debug!(service = %key, lifetime = %lifetime, "service registered");
        Ok(())
    }

    /// Returns true when a registration exists under `key`.
    pub fn is_registered(&self, key: &str) -> bool {
        self.inner.registry.contains_key(key)
    }

    /// Checks that every declared dependency has a registration of the
    /// expected type.
    ///
    /// Parameters the container synthesizes are ignored. All unregistered
    /// and mistyped edges are collected, sorted by service key. No factory
    /// is invoked.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let registry = self.inner.registry.read();
        let mut missing = Vec::new();
        let mut mismatched = Vec::new();

        for entry in registry.values() {
            for dependency in entry.dependencies() {
                match registry.get(dependency.name()) {
                    None => missing.push(MissingDependency {
                        service: entry.key.to_string(),
                        dependency: dependency.name().to_string(),
                    }),
                    Some(found) if found.service_type != *dependency => mismatched.push(MismatchedDependency {
                        service: entry.key.to_string(),
                        dependency: dependency.name().to_string(),
                        expected: dependency.name(),
                        registered: found.service_type.name(),
                    }),
                    Some(_) => {}
                }
            }
        }

        if missing.is_empty() && mismatched.is_empty() {
            return Ok(());
        }
        missing.sort();
        missing.dedup();
        mismatched.sort();
        mismatched.dedup();
        Err(ValidationError { missing, mismatched })
    }

    /// Describes every registration, sorted by key.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let mut descriptors: Vec<ServiceDescriptor> = self
            .inner
            .registry
            .read()
            .values()
            .map(|entry| ServiceDescriptor::from_entry(entry))
            .collect();
        descriptors.sort_by(|a, b| a.key.cmp(&b.key));
        descriptors
    }

    /// The context caching singletons and serving context-less resolution.
    pub fn background_context(&self) -> LifecycleContext {
        self.inner.contexts.read().background.clone()
    }

    /// Creates and tracks a new scoped lifecycle context.
    pub fn new_context(&self) -> LifecycleContext {
        let context = LifecycleContext::with_teardown_concurrency(self.inner.config.teardown_concurrency());
        self.inner.contexts.write().scoped.insert(context.id(), context.clone());
        context
    }

    /// Number of live scoped contexts, not counting the background context.
    pub fn context_count(&self) -> usize {
        self.inner.contexts.read().scoped.len()
    }

    /// Stops tracking `context` and shuts it down.
    ///
    /// An already closed context is simply forgotten.
    ///
    /// # Errors
    ///
    /// Refuses the background context. Teardown failures come back as
    /// [`LifecycleError::Shutdown`] tagged with the context id.
    pub fn remove_context(&self, context: &LifecycleContext) -> Result<(), LifecycleError> {
        {
            let mut contexts = self.inner.contexts.write();
            if contexts.background.id() == context.id() {
                return Err(LifecycleError::BackgroundContext);
            }
            contexts.scoped.remove(&context.id());
        }

        if context.is_closed() {
            return Ok(());
        }

        let errors = context.shutdown(None);
        if errors.is_empty() {
            debug!(context = %context.id(), "lifecycle context removed");
            Ok(())
        } else {
            Err(LifecycleError::Shutdown {
                id: context.id(),
                errors,
            })
        }
    }

    /// Shuts down every live context, the background context included.
    ///
    /// Contexts are shut down on worker threads, at most
    /// [`ContainerConfig::shutdown_concurrency`] at a time, and all errors are
    /// collected. Unless cancellation was observed, the container then
    /// installs a fresh background context and forgets the contexts it shut
    /// down, so it stays usable. A token already cancelled on entry yields a
    /// single error and no teardown.
    pub fn shutdown(&self, token: Option<&CancellationToken>) -> Vec<ShutdownError> {
        if let Err(err) = cancellation::check(token) {
            warn!("container shutdown cancelled before start");
            return vec![err.into()];
        }

        let (background, scoped) = {
            let contexts = self.inner.contexts.read();
            let scoped: Vec<LifecycleContext> = contexts.scoped.values().cloned().collect();
            (contexts.background.clone(), scoped)
        };
        info!(contexts = scoped.len() + 1, "shutting down container");

        let semaphore = Semaphore::new(self.inner.config.shutdown_concurrency());
        let errors = Mutex::new(Vec::new());
        let mut cancelled = false;

        thread::scope(|scope| {
            for context in std::iter::once(&background).chain(scoped.iter()) {
                let permit = semaphore.acquire();
                if let Err(err) = cancellation::check(token) {
                    warn!("container shutdown cancelled, skipping remaining contexts");
                    errors.lock().push(ShutdownError::from(err));
                    cancelled = true;
                    break;
                }

                let errors = &errors;
                scope.spawn(move || {
                    let _permit = permit;
                    let failures = context.shutdown(token);
                    if !failures.is_empty() {
                        errors.lock().extend(failures);
                    }
                });
            }
        });

        if !cancelled && cancellation::check(token).is_ok() {
            let mut contexts = self.inner.contexts.write();
            contexts.background = LifecycleContext::with_teardown_concurrency(self.inner.config.teardown_concurrency());
            for context in &scoped {
                contexts.scoped.remove(&context.id());
            }
        }

        let errors = errors.into_inner();
        info!(errors = errors.len(), "container shutdown finished");
        errors
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contexts = self.inner.contexts.read();
        f.debug_struct("Container")
            .field("services", &self.inner.registry.len())
            .field("background", &contexts.background.id())
            .field("contexts", &contexts.scoped.len())
            .field("config", &self.inner.config)
            .finish()
    }
}
