//! Typed factories and injectable parameters.

use std::sync::Arc;

use smallvec::{smallvec, SmallVec};

use crate::container::{Container, LifecycleContext};
use crate::error::ArgumentError;
use crate::key::ServiceType;
use crate::registration::AnyArc;

/// A value a factory can take as a parameter.
///
/// `Arc<S>` injects the registered service `S`. [`Container`] and
/// [`LifecycleContext`] inject the resolving container and the active
/// context; they are supplied by the container and never registered.
pub trait Dependency: Sized + Send + 'static {
    /// The service type this parameter asks for.
    fn service_type() -> ServiceType;

    /// Recovers the parameter from a stored handle.
    fn extract(value: &AnyArc) -> Option<Self>;
}

impl<S: ?Sized + Send + Sync + 'static> Dependency for Arc<S> {
    fn service_type() -> ServiceType {
        ServiceType::of::<S>()
    }

    fn extract(value: &AnyArc) -> Option<Self> {
        value.downcast_ref::<Arc<S>>().cloned()
    }
}

impl Dependency for Container {
    fn service_type() -> ServiceType {
        ServiceType::of::<Container>()
    }

    fn extract(value: &AnyArc) -> Option<Self> {
        value
            .downcast_ref::<Arc<Container>>()
            .map(|container| Container::clone(container))
    }
}

impl Dependency for LifecycleContext {
    fn service_type() -> ServiceType {
        ServiceType::of::<LifecycleContext>()
    }

    fn extract(value: &AnyArc) -> Option<Self> {
        value
            .downcast_ref::<Arc<LifecycleContext>>()
            .map(|context| LifecycleContext::clone(context))
    }
}

/// A callable that builds a service of type `S` from injected parameters.
///
/// Implemented for every `Fn(A1, .., An) -> R` with up to eight
/// [`Dependency`] parameters, where `R` converts into `Arc<S>`. Returning
/// `S` itself, a `Box<S>` or an `Arc<S>` all work, which is how trait
/// object services are built:
///
/// ```rust
/// use ferrous_lifecycle::{Container, Lifetime};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
///
/// struct Fixed;
/// impl Clock for Fixed {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// struct Stamp(u64);
///
/// let container = Container::new();
/// container
///     .register::<dyn Clock, _, _>(Lifetime::Singleton, || Arc::new(Fixed) as Arc<dyn Clock>)
///     .unwrap();
/// container
///     .register::<Stamp, _, _>(Lifetime::Transient, |clock: Arc<dyn Clock>| Stamp(clock.now()))
///     .unwrap();
///
/// assert_eq!(container.resolve::<Stamp>(None).unwrap().0, 42);
/// ```
pub trait Factory<S: ?Sized, Args>: Send + Sync + 'static {
    /// Parameter types in call order.
    fn parameters(&self) -> SmallVec<[ServiceType; 4]>;

    /// Calls the factory with stored handles in parameter order.
    fn invoke(&self, args: &[AnyArc]) -> Result<Arc<S>, ArgumentError>;
}

macro_rules! impl_factory {
    ($($arg:ident),*) => {
        impl<S, F, R, $($arg,)*> Factory<S, ($($arg,)*)> for F
        where
            S: ?Sized + Send + Sync + 'static,
            F: Fn($($arg),*) -> R + Send + Sync + 'static,
            R: Into<Arc<S>>,
            $($arg: Dependency,)*
        {
            fn parameters(&self) -> SmallVec<[ServiceType; 4]> {
                smallvec![$(<$arg as Dependency>::service_type()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables, unused_assignments)]
            fn invoke(&self, args: &[AnyArc]) -> Result<Arc<S>, ArgumentError> {
                let mut index = 0usize;
                $(
                    let $arg = match args.get(index).and_then(<$arg as Dependency>::extract) {
                        Some(value) => value,
                        None => {
                            return Err(ArgumentError {
                                index,
                                expected: <$arg as Dependency>::service_type().name(),
                            })
                        }
                    };
                    index += 1;
                )*
                Ok((self)($($arg),*).into())
            }
        }
    };
}

impl_factory!();
impl_factory!(T1);
impl_factory!(T1, T2);
impl_factory!(T1, T2, T3);
impl_factory!(T1, T2, T3, T4);
impl_factory!(T1, T2, T3, T4, T5);
impl_factory!(T1, T2, T3, T4, T5, T6);
impl_factory!(T1, T2, T3, T4, T5, T6, T7);
impl_factory!(T1, T2, T3, T4, T5, T6, T7, T8);
