//! Service identity derivation.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Runtime descriptor of a service type.
///
/// A `ServiceType` identifies the type `S` a registration produces, together
/// with the type of the handle the container stores for it (`Arc<S>`). It
/// works for unsized types too, so trait objects such as `dyn Logger` can be
/// registered and resolved like any concrete type.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::ServiceType;
///
/// trait Logger: Send + Sync {}
///
/// let concrete = ServiceType::of::<String>();
/// assert_eq!(concrete.name(), "alloc::string::String");
///
/// let object = ServiceType::of::<dyn Logger>();
/// assert!(object.name().contains("Logger"));
/// assert_ne!(concrete, object);
/// ```
#[derive(Clone, Copy)]
pub struct ServiceType {
    id: TypeId,
    handle: TypeId,
    name: &'static str,
}

impl ServiceType {
    /// Describes the service type `S`.
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            handle: TypeId::of::<Arc<S>>(),
            name: std::any::type_name::<S>(),
        }
    }

    /// The `TypeId` of the service type itself.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// The `TypeId` of the stored handle, `Arc<S>`.
    pub fn handle_id(&self) -> TypeId {
        self.handle
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true when this descriptor is `S`.
    pub fn is<S: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<S>()
    }

    /// The service identity derived from this type.
    pub fn key(&self) -> String {
        self.name.to_string()
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceType").field(&self.name).finish()
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Derives the service identity of `S`.
///
/// The identity is the fully qualified type name. It is stable for the life
/// of the process and is what every type-keyed registration is stored under.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::key_of;
///
/// assert_eq!(key_of::<u32>(), "u32");
/// assert_eq!(key_of::<String>(), "alloc::string::String");
/// ```
pub fn key_of<S: ?Sized + 'static>() -> String {
    ServiceType::of::<S>().key()
}
