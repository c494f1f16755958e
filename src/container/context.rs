//! Lifecycle contexts: scoped instance caches with concurrent teardown.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cancellation::{self, CancellationToken};
use crate::config::ContainerConfig;
use crate::error::{LifecycleError, ShutdownError};
use crate::internal::semaphore::Semaphore;
use crate::internal::sync_map::SyncMap;
use crate::internal::teardown;
use crate::key::ServiceType;
use crate::registration::AnyArc;
use crate::traits::listener::{listener_cast, LifecycleListener, ListenerCast};

/// Phase of a lifecycle context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Accepts lookups and insertions.
    Open,
    /// A shutdown is walking the cache; insertions fail.
    Closing,
    /// Shut down; lookups find nothing and insertions fail.
    Closed,
}

impl ContextState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ContextState::Open,
            1 => ContextState::Closing,
            _ => ContextState::Closed,
        }
    }
}

/// A cached service instance.
///
/// Holds the type-erased handle, its service type and, for listener
/// registrations, the capability used to run its teardown hook.
#[derive(Clone)]
pub struct Instance {
    value: AnyArc,
    service_type: ServiceType,
    listener: Option<ListenerCast>,
}

impl Instance {
    /// Wraps a handle with no teardown capability.
    pub fn new<S: ?Sized + Send + Sync + 'static>(value: Arc<S>) -> Self {
        Self {
            value: Arc::new(value),
            service_type: ServiceType::of::<S>(),
            listener: None,
        }
    }

    /// Wraps a handle whose teardown hook runs when its context shuts down.
    pub fn listening<S: ?Sized + LifecycleListener + 'static>(value: Arc<S>) -> Self {
        Self {
            value: Arc::new(value),
            service_type: ServiceType::of::<S>(),
            listener: Some(listener_cast::<S>),
        }
    }

    pub(crate) fn from_parts(value: AnyArc, service_type: ServiceType, listener: Option<ListenerCast>) -> Self {
        Self {
            value,
            service_type,
            listener,
        }
    }

    /// The stored handle, an `Arc<S>` behind `dyn Any`.
    pub fn value(&self) -> &AnyArc {
        &self.value
    }

    /// Declared service type of the handle.
    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    /// Recovers the typed handle.
    pub fn downcast<S: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<S>> {
        self.value.downcast_ref::<Arc<S>>().cloned()
    }

    /// Returns true when a teardown hook runs for this instance.
    pub fn is_listener(&self) -> bool {
        self.listener.is_some()
    }

    fn listener(&self) -> Option<Arc<dyn LifecycleListener>> {
        self.listener.and_then(|cast| cast(&self.value))
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("service_type", &self.service_type)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// A scope boundary for `Scoped` services and the unit of teardown.
///
/// Contexts are cheap handles; clones share the same cache. The container's
/// background context caches singletons, and every context made with
/// [`Container::new_context`](crate::Container::new_context) caches its own
/// scoped instances.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Container, Instance};
/// use std::sync::Arc;
///
/// let container = Container::new();
/// let context = container.new_context();
///
/// context.set_instance("greeting", Instance::new(Arc::new("hello".to_string()))).unwrap();
/// let cached = context.get_instance("greeting").unwrap();
/// assert_eq!(*cached.downcast::<String>().unwrap(), "hello");
///
/// assert!(context.shutdown(None).is_empty());
/// assert!(context.is_closed());
/// assert!(context.get_instance("greeting").is_none());
/// ```
#[derive(Clone)]
pub struct LifecycleContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: Uuid,
    instances: SyncMap<Arc<str>, Instance>,
    state: AtomicU8,
    teardown_concurrency: usize,
}

impl LifecycleContext {
    /// Creates a detached context using the process-wide teardown bound.
    pub fn new() -> Self {
        Self::with_teardown_concurrency(ContainerConfig::default().teardown_concurrency())
    }

    pub(crate) fn with_teardown_concurrency(teardown_concurrency: usize) -> Self {
        let context = Self {
            inner: Arc::new(ContextInner {
                id: Uuid::new_v4(),
                instances: SyncMap::new(),
                state: AtomicU8::new(ContextState::Open as u8),
                teardown_concurrency: teardown_concurrency.max(1),
            }),
        };
        debug!(context = %context.id(), "lifecycle context created");
        context
    }

    /// Unique id of this context, used in log fields and errors.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Current phase of the context.
    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Fails unless the context is [`ContextState::Open`].
    pub(crate) fn ensure_open(&self) -> Result<(), LifecycleError> {
        if self.state() == ContextState::Open {
            Ok(())
        } else {
            Err(LifecycleError::Closed { id: self.id() })
        }
    }

    /// Returns true once a shutdown has completed without cancellation.
    pub fn is_closed(&self) -> bool {
        self.state() == ContextState::Closed
    }

    /// Bound on teardown hooks running at once during [`shutdown`](Self::shutdown).
    pub fn teardown_concurrency(&self) -> usize {
        self.inner.teardown_concurrency
    }

    /// Looks up a cached instance.
    ///
    /// Returns `None` for blank keys and for every key once the context is
    /// closed.
    pub fn get_instance(&self, key: &str) -> Option<Instance> {
        if key.trim().is_empty() || self.is_closed() {
            return None;
        }
        self.inner.instances.get(key)
    }

    /// Caches an instance, replacing any previous one under `key`.
    ///
    /// # Errors
    ///
    /// Fails for a blank key, and with [`LifecycleError::Closed`] once a
    /// shutdown has begun, since the shutdown would never see the instance.
    pub fn set_instance(&self, key: &str, instance: Instance) -> Result<(), LifecycleError> {
        if key.trim().is_empty() {
            return Err(LifecycleError::BlankKey);
        }
        self.ensure_open()?;
        self.inner.instances.insert(Arc::from(key), instance);
        Ok(())
    }

    /// Returns true when [`get_instance`](Self::get_instance) would find `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.get_instance(key).is_some()
    }

    /// Number of cached instances, including any kept after failed teardown.
    pub fn len(&self) -> usize {
        self.inner.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.instances.is_empty()
    }

    /// Keys still held by the cache, sorted.
    ///
    /// After a shutdown these are the instances whose teardown failed or
    /// was skipped; they stay until a later shutdown succeeds for them.
    pub fn retained_instances(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.instances.keys().iter().map(|k| k.to_string()).collect();
        keys.sort();
        keys
    }

    /// Looks up a cached instance regardless of the context state.
    ///
    /// Unlike [`get_instance`](Self::get_instance) this still answers after
    /// the context has closed, so instances whose teardown failed remain
    /// reachable.
    pub fn retained_instance(&self, key: &str) -> Option<Instance> {
        self.inner.instances.get(key)
    }

    /// Tears down every cached instance.
    ///
    /// Instances without the listener capability are dropped at once.
    /// Listener hooks run on worker threads, at most
    /// [`teardown_concurrency`](Self::teardown_concurrency) at a time; a hook
    /// that succeeds has its instance removed, one that fails or panics
    /// leaves its instance cached and contributes an error. Every worker is
    /// joined before this returns.
    ///
    /// The token is checked on entry and before each instance is handled. On
    /// entry a cancelled token returns a single error and touches nothing.
    /// Later, the remaining hooks are skipped and one error is recorded. The
    /// context is marked closed only when no cancellation was observed.
    pub fn shutdown(&self, token: Option<&CancellationToken>) -> Vec<ShutdownError> {
        if let Err(err) = cancellation::check(token) {
            warn!(context = %self.id(), "shutdown cancelled before start");
            return vec![err.into()];
        }

        self.inner.state.store(ContextState::Closing as u8, Ordering::Release);
        let snapshot = self.inner.instances.snapshot();
        debug!(context = %self.id(), instances = snapshot.len(), "shutting down lifecycle context");

        let semaphore = Semaphore::new(self.inner.teardown_concurrency);
        let errors = Mutex::new(Vec::new());
        let mut cancelled = false;

        thread::scope(|scope| {
            for (key, instance) in snapshot {
                let listener = instance.listener();
                let permit = listener.as_ref().map(|_| semaphore.acquire());

                if let Err(err) = cancellation::check(token) {
                    warn!(context = %self.id(), "shutdown cancelled, skipping remaining teardown");
                    errors.lock().push(ShutdownError::from(err));
                    cancelled = true;
                    break;
                }

                let (Some(listener), Some(permit)) = (listener, permit) else {
                    self.inner.instances.remove(&*key);
                    continue;
                };

                let errors = &errors;
                scope.spawn(move || {
                    let _permit = permit;
                    match teardown::end_lifecycle(&key, listener.as_ref(), token) {
                        Ok(()) => {
                            self.inner.instances.remove(&*key);
                            debug!(context = %self.id(), service = %key, "instance torn down");
                        }
                        Err(err) => {
                            warn!(context = %self.id(), service = %key, error = %err, "teardown failed, instance retained");
                            errors.lock().push(ShutdownError::from(err));
                        }
                    }
                });
            }
        });

        if !cancelled && cancellation::check(token).is_err() {
            cancelled = true;
        }
        let next = if cancelled { ContextState::Open } else { ContextState::Closed };
        self.inner.state.store(next as u8, Ordering::Release);

        errors.into_inner()
    }
}

impl Default for LifecycleContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for LifecycleContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for LifecycleContext {}

impl fmt::Debug for LifecycleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleContext")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("instances", &self.inner.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, TeardownError};
    use std::sync::atomic::AtomicUsize;

    struct Counting {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl LifecycleListener for Counting {
        fn end_lifecycle(&self, _token: Option<&CancellationToken>) -> Result<(), BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("still busy".into())
            } else {
                Ok(())
            }
        }
    }

    fn counting(calls: &Arc<AtomicUsize>, fail: bool) -> Instance {
        Instance::listening(Arc::new(Counting { calls: Arc::clone(calls), fail }))
    }

    #[test]
    fn test_blank_keys() {
        let context = LifecycleContext::new();
        assert!(matches!(
            context.set_instance("  ", Instance::new(Arc::new(1u8))),
            Err(LifecycleError::BlankKey)
        ));
        assert!(context.get_instance("").is_none());
    }

    #[test]
    fn test_set_overwrites() {
        let context = LifecycleContext::new();
        context.set_instance("n", Instance::new(Arc::new(1u8))).unwrap();
        context.set_instance("n", Instance::new(Arc::new(2u8))).unwrap();

        assert_eq!(context.len(), 1);
        assert_eq!(*context.get_instance("n").unwrap().downcast::<u8>().unwrap(), 2);
    }

    #[test]
    fn test_shutdown_removes_plain_and_torn_down_instances() {
        let calls = Arc::new(AtomicUsize::new(0));
        let context = LifecycleContext::with_teardown_concurrency(2);
        context.set_instance("plain", Instance::new(Arc::new(()))).unwrap();
        for i in 0..5 {
            context.set_instance(&format!("hook-{i}"), counting(&calls, false)).unwrap();
        }

        let errors = context.shutdown(None);

        assert!(errors.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert!(context.is_empty());
        assert_eq!(context.state(), ContextState::Closed);
        assert!(matches!(
            context.set_instance("late", Instance::new(Arc::new(()))),
            Err(LifecycleError::Closed { .. })
        ));
    }

    #[test]
    fn test_failed_teardown_is_retained_and_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let context = LifecycleContext::new();
        context.set_instance("ok", counting(&calls, false)).unwrap();
        context.set_instance("stuck", counting(&calls, true)).unwrap();

        let errors = context.shutdown(None);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ShutdownError::Teardown(TeardownError::Failed { key, .. }) if key == "stuck"
        ));
        assert_eq!(context.retained_instances(), vec!["stuck".to_string()]);
        assert!(context.get_instance("stuck").is_none());
        assert!(context.retained_instance("stuck").is_some());

        // A second shutdown only processes what is left.
        let errors = context.shutdown(None);
        assert_eq!(errors.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    struct Inserting {
        context: LifecycleContext,
        rejected: Arc<AtomicUsize>,
    }

    impl LifecycleListener for Inserting {
        fn end_lifecycle(&self, _token: Option<&CancellationToken>) -> Result<(), BoxError> {
            assert_eq!(self.context.state(), ContextState::Closing);
            if let Err(LifecycleError::Closed { .. }) = self.context.set_instance("late", Instance::new(Arc::new(()))) {
                self.rejected.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[test]
    fn test_insert_while_closing_is_rejected() {
        let rejected = Arc::new(AtomicUsize::new(0));
        let context = LifecycleContext::new();
        let hook = Inserting {
            context: context.clone(),
            rejected: Arc::clone(&rejected),
        };
        context.set_instance("hook", Instance::listening(Arc::new(hook))).unwrap();

        assert!(context.shutdown(None).is_empty());
        assert_eq!(rejected.load(Ordering::SeqCst), 1);
        assert!(context.is_closed());
        assert!(context.retained_instances().is_empty());
    }

    #[test]
    fn test_cancelled_before_start_leaves_context_open() {
        let calls = Arc::new(AtomicUsize::new(0));
        let context = LifecycleContext::new();
        context.set_instance("hook", counting(&calls, false)).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let errors = context.shutdown(Some(&token));

        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(context.state(), ContextState::Open);
        assert!(context.contains("hook"));
    }
}
