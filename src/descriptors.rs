//! Service descriptors for introspection and diagnostics.

use crate::lifetime::Lifetime;
use crate::registration::ServiceEntry;

/// Service descriptor for introspection and diagnostics
///
/// A snapshot of one registration: its key, declared type, lifetime and
/// the dependencies its factory asks for.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Container, Lifetime};
/// use std::sync::Arc;
///
/// struct Database;
/// struct Repository { db: Arc<Database> }
///
/// let container = Container::new();
/// container.register::<Database, _, _>(Lifetime::Singleton, || Database).unwrap();
/// container
///     .register_with_key::<Repository, _, _>("users", Lifetime::Scoped, |db: Arc<Database>| Repository { db })
///     .unwrap();
///
/// let descriptors = container.descriptors();
/// let users = descriptors.iter().find(|d| d.key == "users").unwrap();
/// assert!(users.is_keyed());
/// assert_eq!(users.lifetime, Lifetime::Scoped);
/// assert!(users.depends_on(std::any::type_name::<Database>()));
///
/// let singletons = descriptors.iter().filter(|d| d.lifetime == Lifetime::Singleton).count();
/// assert_eq!(singletons, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Registry key
    pub key: String,
    /// Declared service type name
    pub type_name: &'static str,
    /// Service lifetime
    pub lifetime: Lifetime,
    /// Factory parameter type names, in call order
    pub dependencies: Vec<&'static str>,
    /// Whether cached instances receive teardown callbacks
    pub listener: bool,
}

impl ServiceDescriptor {
    pub(crate) fn from_entry(entry: &ServiceEntry) -> Self {
        Self {
            key: entry.key.to_string(),
            type_name: entry.service_type.name(),
            lifetime: entry.lifetime,
            dependencies: entry.factory.parameters().iter().map(|p| p.name()).collect(),
            listener: entry.factory.is_listener(),
        }
    }

    /// True when registered under an explicit key rather than its type name.
    pub fn is_keyed(&self) -> bool {
        self.key != self.type_name
    }

    pub fn depends_on(&self, type_name: &str) -> bool {
        self.dependencies.iter().any(|d| *d == type_name)
    }
}
