//! Service lifetime definitions.

use std::fmt;

/// Service lifetimes controlling instance caching behavior
///
/// A lifetime is fixed at registration and decides which lifecycle context,
/// if any, caches the instances a factory produces.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Container, Lifetime};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Session { id: u32 }
///
/// let container = Container::new();
/// container
///     .register::<Database, _, _>(Lifetime::Singleton, || Database {
///         url: "postgres://localhost".to_string(),
///     })
///     .unwrap();
/// container
///     .register::<Session, _, _>(Lifetime::Scoped, || Session { id: 7 })
///     .unwrap();
///
/// // Singleton: same instance from every context
/// let c1 = container.new_context();
/// let c2 = container.new_context();
/// let db1 = container.resolve::<Database>(Some(&c1)).unwrap();
/// let db2 = container.resolve::<Database>(Some(&c2)).unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Scoped: same within a context, different across contexts
/// let s1a = container.resolve::<Session>(Some(&c1)).unwrap();
/// let s1b = container.resolve::<Session>(Some(&c1)).unwrap();
/// let s2 = container.resolve::<Session>(Some(&c2)).unwrap();
/// assert!(Arc::ptr_eq(&s1a, &s1b));
/// assert!(!Arc::ptr_eq(&s1a, &s2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// New instance per resolution, never cached
    ///
    /// The caller owns a transient instance exclusively from creation.
    /// Transient entries take no lock during resolution.
    Transient,
    /// Single instance per container, cached in the background context
    ///
    /// Singletons are created on first request and shared by every context
    /// and thread until the container shuts down. Concurrent first requests
    /// invoke the factory exactly once.
    Singleton,
    /// Single instance per lifecycle context
    ///
    /// Scoped services are cached in the context they were requested with.
    /// Resolving without a context uses the background context.
    Scoped,
}

impl Lifetime {
    /// Returns true when instances of this lifetime live in a context cache.
    pub fn is_cached(&self) -> bool {
        !matches!(self, Lifetime::Transient)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
        };
        f.write_str(name)
    }
}
