//! Service registration types.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::error::ArgumentError;
use crate::key::ServiceType;
use crate::lifetime::Lifetime;
use crate::traits::factory::Factory;
use crate::traits::listener::{listener_cast, LifecycleListener, ListenerCast};

/// Type-erased handle as stored by the container.
///
/// A service `S` is always stored as an `Arc<S>` boxed once more behind
/// `Arc<dyn Any>`, so unsized services share one representation.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

type ErasedCall = dyn Fn(&[AnyArc]) -> Result<AnyArc, ArgumentError> + Send + Sync;

/// Factory with its parameter and output types erased.
///
/// Every typed registration is converted into this form. Build one by hand
/// with [`ErasedFactory::new`] to register services whose shape is only
/// known at runtime; the container still checks the declared output type
/// and the type of every value the call returns.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{AnyArc, Container, ErasedFactory, Lifetime, ServiceType};
/// use std::sync::Arc;
///
/// let factory = ErasedFactory::new(ServiceType::of::<u64>(), [], |_args: &[AnyArc]| {
///     Ok(Arc::new(Arc::new(7u64)) as AnyArc)
/// });
///
/// let container = Container::new();
/// container
///     .register_erased(ServiceType::of::<u64>(), "answer", Lifetime::Singleton, factory)
///     .unwrap();
///
/// let value = container.resolve_with_key::<u64>("answer", None).unwrap();
/// assert_eq!(*value, 7);
/// ```
#[derive(Clone)]
pub struct ErasedFactory {
    output: ServiceType,
    parameters: SmallVec<[ServiceType; 4]>,
    call: Arc<ErasedCall>,
    listener: Option<ListenerCast>,
}

impl ErasedFactory {
    /// Wraps a raw call producing `output` from `parameters`.
    ///
    /// The call receives one stored handle per parameter, in order, and
    /// must return the output stored as `Arc<Arc<S>>`.
    pub fn new<C>(output: ServiceType, parameters: impl IntoIterator<Item = ServiceType>, call: C) -> Self
    where
        C: Fn(&[AnyArc]) -> Result<AnyArc, ArgumentError> + Send + Sync + 'static,
    {
        Self {
            output,
            parameters: parameters.into_iter().collect(),
            call: Arc::new(call),
            listener: None,
        }
    }

    /// Erases a typed factory.
    pub fn from_factory<S, Args, F>(factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Factory<S, Args>,
    {
        let parameters = factory.parameters();
        Self {
            output: ServiceType::of::<S>(),
            parameters,
            call: Arc::new(move |args: &[AnyArc]| {
                factory.invoke(args).map(|value| Arc::new(value) as AnyArc)
            }),
            listener: None,
        }
    }

    /// Marks produced instances as listeners of type `S`.
    pub fn listening<S>(mut self) -> Self
    where
        S: ?Sized + LifecycleListener + 'static,
    {
        self.listener = Some(listener_cast::<S>);
        self
    }

    /// Declared output type.
    pub fn output(&self) -> ServiceType {
        self.output
    }

    /// Parameter types in call order.
    pub fn parameters(&self) -> &[ServiceType] {
        &self.parameters
    }

    pub fn is_listener(&self) -> bool {
        self.listener.is_some()
    }

    pub(crate) fn call(&self, args: &[AnyArc]) -> Result<AnyArc, ArgumentError> {
        (self.call)(args)
    }

    pub(crate) fn listener(&self) -> Option<ListenerCast> {
        self.listener
    }
}

impl fmt::Debug for ErasedFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedFactory")
            .field("output", &self.output)
            .field("parameters", &self.parameters)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// One registration in the container's registry.
///
/// Immutable once stored, apart from the memoized dependency order.
pub(crate) struct ServiceEntry {
    pub(crate) key: Arc<str>,
    pub(crate) service_type: ServiceType,
    pub(crate) lifetime: Lifetime,
    pub(crate) factory: ErasedFactory,
    /// Serializes instantiation of cached lifetimes.
    pub(crate) instantiation: Mutex<()>,
    /// Post-order plan ending with this entry, filled on first success.
    pub(crate) order: OnceCell<Arc<[Arc<str>]>>,
}

impl ServiceEntry {
    pub(crate) fn new(key: Arc<str>, service_type: ServiceType, lifetime: Lifetime, factory: ErasedFactory) -> Self {
        Self {
            key,
            service_type,
            lifetime,
            factory,
            instantiation: Mutex::new(()),
            order: OnceCell::new(),
        }
    }

    /// Parameters that must come from the registry.
    pub(crate) fn dependencies(&self) -> impl Iterator<Item = &ServiceType> + '_ {
        self.factory
            .parameters()
            .iter()
            .filter(|parameter| crate::container::synthesized(parameter).is_none())
    }
}

impl fmt::Debug for ServiceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceEntry")
            .field("key", &self.key)
            .field("lifetime", &self.lifetime)
            .field("factory", &self.factory)
            .finish()
    }
}
