//! Core traits for the dependency injection container.

pub(crate) mod factory;
pub(crate) mod listener;

pub use factory::{Dependency, Factory};
pub use listener::LifecycleListener;
