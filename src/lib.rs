//! # ferrous-lifecycle
//!
//! Dependency injection container with lifecycle contexts, dependency-ordered
//! resolution and concurrent, cancellable teardown.
//!
//! ## Features
//!
//! - **Typed factories**: plain closures whose `Arc<T>` parameters are injected
//! - **Three lifetimes**: Transient, Singleton and Scoped services
//! - **Dependency ordering**: every dependency is built before its dependents
//! - **Circular dependency detection**: cycles fail before any factory runs
//! - **Single-flight instantiation**: concurrent first requests build a service once
//! - **Lifecycle contexts**: scoped caches with bounded-parallel teardown hooks
//! - **Cancellation**: shutdowns stop scheduling work once a token fires
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_lifecycle::{Container, Lifetime};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container
//!     .register::<Database, _, _>(Lifetime::Singleton, || Database {
//!         url: "postgres://localhost".to_string(),
//!     })
//!     .unwrap();
//! container
//!     .register::<UserService, _, _>(Lifetime::Transient, |db: Arc<Database>| UserService { db })
//!     .unwrap();
//!
//! // Fail fast on missing registrations before anything is resolved
//! container.validate().unwrap();
//!
//! let users = container.resolve::<UserService>(None).unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Lifecycle Contexts
//!
//! ```rust
//! use ferrous_lifecycle::{BoxError, CancellationToken, Container, Lifetime, LifecycleListener};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! static CLOSED: AtomicUsize = AtomicUsize::new(0);
//!
//! struct Connection;
//!
//! impl LifecycleListener for Connection {
//!     fn end_lifecycle(&self, _token: Option<&CancellationToken>) -> Result<(), BoxError> {
//!         CLOSED.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! let container = Container::new();
//! container
//!     .register_listener::<Connection, _, _>(Lifetime::Scoped, || Connection)
//!     .unwrap();
//!
//! let request = container.new_context();
//! let a = container.resolve::<Connection>(Some(&request)).unwrap();
//! let b = container.resolve::<Connection>(Some(&request)).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! container.remove_context(&request).unwrap();
//! assert_eq!(CLOSED.load(Ordering::SeqCst), 1);
//! ```
//!
//! ## Injecting the Container
//!
//! Factories may take [`Container`] or [`LifecycleContext`] parameters. They
//! are supplied by the container itself and never need registering.
//!
//! ```rust
//! use ferrous_lifecycle::{Container, LifecycleContext, Lifetime};
//!
//! struct RequestInfo {
//!     context_id: String,
//! }
//!
//! let container = Container::new();
//! container
//!     .register::<RequestInfo, _, _>(Lifetime::Scoped, |ctx: LifecycleContext| RequestInfo {
//!         context_id: ctx.id().to_string(),
//!     })
//!     .unwrap();
//!
//! let ctx = container.new_context();
//! let info = container.resolve::<RequestInfo>(Some(&ctx)).unwrap();
//! assert_eq!(info.context_id, ctx.id().to_string());
//! ```

pub mod cancellation;
pub mod config;
pub mod container;
pub mod descriptors;
pub mod error;
pub mod key;
pub mod lifetime;
#[cfg(feature = "subscriber")]
pub mod logging;
pub mod registration;
pub mod traits;

pub(crate) mod internal;

pub use cancellation::{CancellationError, CancellationToken};
pub use config::ContainerConfig;
pub use container::{Container, ContextState, Instance, LifecycleContext};
pub use descriptors::ServiceDescriptor;
pub use error::{
    ArgumentError, BoxError, DiError, DiResult, LifecycleError, MismatchedDependency, MissingDependency,
    RegistrationError, ResolutionError, ShutdownError, TeardownError, ValidationError,
};
pub use key::{key_of, ServiceType};
pub use lifetime::Lifetime;
pub use registration::{AnyArc, ErasedFactory};
pub use traits::{Dependency, Factory, LifecycleListener};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_container_handles_share_state() {
        struct Shared;

        let container = Container::new();
        let handle = container.clone();
        handle.register::<Shared, _, _>(Lifetime::Singleton, || Shared).unwrap();

        let a = container.resolve::<Shared>(None).unwrap();
        let b = handle.resolve::<Shared>(None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_independent_containers() {
        struct Shared;

        let first = Container::new();
        let second = Container::new();
        first.register::<Shared, _, _>(Lifetime::Singleton, || Shared).unwrap();
        second.register::<Shared, _, _>(Lifetime::Singleton, || Shared).unwrap();

        let a = first.resolve::<Shared>(None).unwrap();
        let b = second.resolve::<Shared>(None).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
