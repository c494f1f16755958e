//! Error types for the dependency injection container.

use thiserror::Error;
use uuid::Uuid;

pub use crate::cancellation::CancellationError;

/// Boxed error returned by lifecycle listeners.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned synchronously from registration.
///
/// Registration never invokes factories; every variant here is detected from
/// the key, the declared type and the registry contents alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// The service key was empty or whitespace
    #[error("Service key cannot be blank")]
    BlankKey,
    /// A registration already exists under this key
    #[error("Service `{key}` is already registered")]
    Duplicate { key: String },
    /// The factory produces a type other than the declared one
    #[error("Factory for `{key}` returns `{actual}`, expected `{expected}`")]
    ReturnTypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
    /// The type is synthesized by the container and cannot be registered
    #[error("Service type `{type_name}` is provided by the container and cannot be registered")]
    Reserved { type_name: &'static str },
}

/// Errors returned from resolution.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The requested key was empty or whitespace
    #[error("Service key cannot be blank")]
    BlankKey,
    /// Nothing is registered under the requested key
    #[error("Service `{key}` is not registered")]
    NotRegistered { key: String },
    /// A transitive dependency has no registration
    #[error("Dependency `{dependency}` of service `{service}` is not registered")]
    DependencyNotRegistered { service: String, dependency: String },
    /// The dependency graph of the requested service contains a cycle
    #[error("Circular dependency detected for `{service}`: {}", .path.join(" -> "))]
    CircularDependency { service: String, path: Vec<String> },
    /// A dependency value was unavailable when its dependent was built
    #[error("Dependency `{dependency}` was not resolved before service `{service}`")]
    DependencyNotResolved { service: String, dependency: String },
    /// A factory or cache produced a value of the wrong type
    #[error("Service `{key}` did not resolve to a value of type `{expected}`")]
    TypeMismatch { key: String, expected: &'static str },
    /// The lifecycle context rejected the resolved instance
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// A factory argument could not be recovered from its stored handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Argument {index} of type `{expected}` could not be extracted")]
pub struct ArgumentError {
    pub index: usize,
    pub expected: &'static str,
}

/// A single unresolved edge found by validation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MissingDependency {
    /// Key of the registration declaring the dependency
    pub service: String,
    /// Type name of the unregistered dependency
    pub dependency: String,
}

/// A dependency whose key is registered for a different type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MismatchedDependency {
    /// Key of the registration declaring the dependency
    pub service: String,
    /// Key the parameter resolves through
    pub dependency: String,
    /// Type the parameter expects
    pub expected: &'static str,
    /// Type actually registered under `dependency`
    pub registered: &'static str,
}

/// Aggregated report of registrations whose dependencies cannot be satisfied.
///
/// `missing` lists unregistered dependencies and `mismatched` lists keys
/// registered for another type. Both are sorted by service key, then by
/// dependency name. The message names the first offending dependency and
/// how many more follow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe_invalid(.missing, .mismatched))]
pub struct ValidationError {
    pub missing: Vec<MissingDependency>,
    pub mismatched: Vec<MismatchedDependency>,
}

fn describe_invalid(missing: &[MissingDependency], mismatched: &[MismatchedDependency]) -> String {
    let mut message = match (missing.first(), mismatched.first()) {
        (Some(first), _) => format!(
            "Dependency `{}` of service `{}` is not registered",
            first.dependency, first.service
        ),
        (None, Some(first)) => format!(
            "Dependency `{}` of service `{}` is registered as `{}`, expected `{}`",
            first.dependency, first.service, first.registered, first.expected
        ),
        (None, None) => return "Validation failed".to_string(),
    };

    let rest = missing.len() + mismatched.len() - 1;
    if rest > 0 {
        let label = if mismatched.is_empty() { "missing" } else { "invalid" };
        message.push_str(&format!(" ({rest} more {label})"));
    }
    message
}

/// A teardown hook failed for one cached instance.
#[derive(Debug, Error)]
pub enum TeardownError {
    /// The hook returned an error
    #[error("Teardown of `{key}` failed: {source}")]
    Failed {
        key: String,
        #[source]
        source: BoxError,
    },
    /// The hook panicked; the payload message is preserved
    #[error("Teardown of `{key}` panicked: {message}")]
    Panicked { key: String, message: String },
}

impl TeardownError {
    /// Key of the instance whose teardown failed.
    pub fn key(&self) -> &str {
        match self {
            TeardownError::Failed { key, .. } | TeardownError::Panicked { key, .. } => key,
        }
    }
}

/// One entry of the error list returned by a shutdown.
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error(transparent)]
    Teardown(#[from] TeardownError),
    #[error(transparent)]
    Cancelled(#[from] CancellationError),
}

impl ShutdownError {
    /// Returns true for the cancellation entry.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ShutdownError::Cancelled(_))
    }
}

/// Lifecycle context errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Instance key cannot be blank")]
    BlankKey,
    /// The context has been shut down
    #[error("Lifecycle context {id} is closed")]
    Closed { id: Uuid },
    /// The background context is owned by the container
    #[error("The background context cannot be removed")]
    BackgroundContext,
    /// Removing a context ran its shutdown, which reported errors
    #[error("Failed to shut down lifecycle context {id}: {}", describe_shutdown(.errors))]
    Shutdown { id: Uuid, errors: Vec<ShutdownError> },
}

fn describe_shutdown(errors: &[ShutdownError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Umbrella error for callers that handle every failure the same way.
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Container, DiError, DiResult, Lifetime};
///
/// struct Config;
///
/// fn boot(container: &Container) -> DiResult<()> {
///     container.register::<Config, _, _>(Lifetime::Singleton, || Config)?;
///     container.validate()?;
///     container.resolve::<Config>(None)?;
///     Ok(())
/// }
///
/// let container = Container::new();
/// assert!(boot(&container).is_ok());
/// assert!(matches!(boot(&container), Err(DiError::Registration(_))));
/// ```
#[derive(Debug, Error)]
pub enum DiError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
