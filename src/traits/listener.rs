//! Teardown capability for cached instances.

use std::sync::Arc;

use crate::cancellation::CancellationToken;
use crate::error::BoxError;
use crate::registration::AnyArc;

/// Trait for instances that run teardown logic when their context shuts down.
///
/// Register a service with [`Container::register_listener`] to have
/// `end_lifecycle` called once when the lifecycle context caching it shuts
/// down. Instances of services registered without the capability are
/// dropped from the cache with no callback.
///
/// A returned error, or a panic, leaves the instance in the cache and is
/// reported in the shutdown's error list.
///
/// # Examples
///
/// ```
/// use ferrous_lifecycle::{BoxError, CancellationToken, Container, Lifetime, LifecycleListener};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Pool {
///     open: AtomicBool,
/// }
///
/// impl LifecycleListener for Pool {
///     fn end_lifecycle(&self, _token: Option<&CancellationToken>) -> Result<(), BoxError> {
///         self.open.store(false, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container
///     .register_listener::<Pool, _, _>(Lifetime::Singleton, || Pool { open: AtomicBool::new(true) })
///     .unwrap();
///
/// let pool = container.resolve::<Pool>(None).unwrap();
/// assert!(container.shutdown(None).is_empty());
/// assert!(!pool.open.load(Ordering::SeqCst));
/// ```
///
/// [`Container::register_listener`]: crate::Container::register_listener
pub trait LifecycleListener: Send + Sync {
    /// Runs teardown. The token is the one passed to the shutdown call.
    fn end_lifecycle(&self, token: Option<&CancellationToken>) -> Result<(), BoxError>;
}

impl<T: ?Sized + LifecycleListener> LifecycleListener for Arc<T> {
    fn end_lifecycle(&self, token: Option<&CancellationToken>) -> Result<(), BoxError> {
        (**self).end_lifecycle(token)
    }
}

/// Recovers the listener view of a stored handle.
pub(crate) type ListenerCast = fn(&AnyArc) -> Option<Arc<dyn LifecycleListener>>;

/// Capability query for handles stored as `Arc<S>`.
pub(crate) fn listener_cast<S>(value: &AnyArc) -> Option<Arc<dyn LifecycleListener>>
where
    S: ?Sized + LifecycleListener + 'static,
{
    value
        .downcast_ref::<Arc<S>>()
        .map(|handle| Arc::new(Arc::clone(handle)) as Arc<dyn LifecycleListener>)
}
