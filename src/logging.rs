//! Env-driven `tracing` subscriber setup.
//!
//! The crate only emits `tracing` events; installing a subscriber is left to
//! the application. This module offers a one-call default for programs that
//! have no subscriber of their own.

use std::env;

use tracing_subscriber::EnvFilter;

use crate::error::BoxError;

/// Filter directive, e.g. `ferrous_lifecycle=trace`.
pub const LOG_ENV: &str = "FERROUS_LIFECYCLE_LOG";

/// Any truthy value switches the default level to `debug`.
pub const DEBUG_ENV: &str = "FERROUS_LIFECYCLE_DEBUG";

const DEFAULT_DIRECTIVE: &str = "error";

/// Installs a global fmt subscriber filtered from the environment.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_from_env() -> Result<(), BoxError> {
    let log = env::var(LOG_ENV).ok();
    let debug = env::var(DEBUG_ENV).ok();
    let directive = filter_directive(log.as_deref(), debug.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
}

/// Picks the filter directive: an explicit directive wins, then the debug
/// toggle, then `error`.
pub fn filter_directive(log: Option<&str>, debug: Option<&str>) -> String {
    if let Some(directive) = log.map(str::trim).filter(|d| !d.is_empty()) {
        return directive.to_string();
    }
    if debug.is_some_and(is_truthy) {
        return "debug".to_string();
    }
    DEFAULT_DIRECTIVE.to_string()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_directive_wins() {
        assert_eq!(filter_directive(Some("ferrous_lifecycle=trace"), Some("true")), "ferrous_lifecycle=trace");
    }

    #[test]
    fn test_debug_toggle() {
        assert_eq!(filter_directive(None, Some("TRUE")), "debug");
        assert_eq!(filter_directive(Some("  "), Some("1")), "debug");
        assert_eq!(filter_directive(None, Some("off")), "error");
    }

    #[test]
    fn test_default_is_error() {
        assert_eq!(filter_directive(None, None), "error");
    }
}
