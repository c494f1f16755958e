//! Container configuration.
//!
//! Concurrency limits for shutdown fan-out. Process-wide defaults come from
//! the environment and are read once, the first time a default
//! configuration is built.

use std::env;

use once_cell::sync::Lazy;
use tracing::warn;

/// Bound on concurrent teardown hooks within one lifecycle context.
pub const TEARDOWN_CONCURRENCY_ENV: &str = "FERROUS_LIFECYCLE_TEARDOWN_CONCURRENCY";

/// Bound on lifecycle contexts shut down concurrently by a container.
pub const SHUTDOWN_CONCURRENCY_ENV: &str = "FERROUS_LIFECYCLE_SHUTDOWN_CONCURRENCY";

/// Concurrency used when nothing else is configured.
pub const DEFAULT_CONCURRENCY: usize = 10;

static PROCESS_DEFAULTS: Lazy<ContainerConfig> = Lazy::new(ContainerConfig::from_env);

/// Configuration for a [`Container`](crate::Container).
///
/// # Examples
///
/// ```rust
/// use ferrous_lifecycle::{Container, ContainerConfig};
///
/// let config = ContainerConfig::new()
///     .with_shutdown_concurrency(4)
///     .with_teardown_concurrency(2);
/// let container = Container::with_config(config);
///
/// assert_eq!(container.config().shutdown_concurrency(), 4);
/// assert_eq!(container.new_context().teardown_concurrency(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerConfig {
    shutdown_concurrency: usize,
    teardown_concurrency: usize,
}

impl ContainerConfig {
    /// Built-in defaults, ignoring the environment.
    pub fn new() -> Self {
        Self {
            shutdown_concurrency: DEFAULT_CONCURRENCY,
            teardown_concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Reads both limits from the environment now.
    ///
    /// Unset, unparsable or zero values fall back to [`DEFAULT_CONCURRENCY`].
    pub fn from_env() -> Self {
        Self {
            shutdown_concurrency: concurrency_from_env(SHUTDOWN_CONCURRENCY_ENV),
            teardown_concurrency: concurrency_from_env(TEARDOWN_CONCURRENCY_ENV),
        }
    }

    /// Sets the container-wide shutdown bound. Zero is raised to one.
    pub fn with_shutdown_concurrency(mut self, limit: usize) -> Self {
        self.shutdown_concurrency = limit.max(1);
        self
    }

    /// Sets the per-context teardown bound. Zero is raised to one.
    pub fn with_teardown_concurrency(mut self, limit: usize) -> Self {
        self.teardown_concurrency = limit.max(1);
        self
    }

    pub fn shutdown_concurrency(&self) -> usize {
        self.shutdown_concurrency
    }

    pub fn teardown_concurrency(&self) -> usize {
        self.teardown_concurrency
    }
}

impl Default for ContainerConfig {
    /// Process-wide defaults, read from the environment on first use.
    fn default() -> Self {
        *PROCESS_DEFAULTS
    }
}

fn concurrency_from_env(var: &str) -> usize {
    match env::var(var) {
        Ok(raw) => parse_concurrency(&raw).unwrap_or_else(|| {
            warn!(variable = var, value = %raw, "ignoring invalid concurrency limit");
            DEFAULT_CONCURRENCY
        }),
        Err(_) => DEFAULT_CONCURRENCY,
    }
}

fn parse_concurrency(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok().filter(|limit| *limit > 0)
}
