//! Dependency order computation with cycle detection.

use std::collections::HashSet;
use std::sync::Arc;

use ahash::RandomState;

use crate::error::ResolutionError;
use crate::internal::sync_map::FastMap;
use crate::registration::ServiceEntry;

pub(crate) type Registry = FastMap<Arc<str>, Arc<ServiceEntry>>;

/// Computes the post-order resolution plan for `root`.
///
/// Dependencies come before dependents and the plan ends with `root`.
/// Shared sub-dependencies appear once. Parameters the container
/// synthesizes are skipped.
pub(crate) fn dependency_order(registry: &Registry, root: &str) -> Result<Vec<Arc<str>>, ResolutionError> {
    let mut walk = Walk {
        registry,
        visiting: Vec::new(),
        seen: HashSet::with_hasher(RandomState::new()),
        order: Vec::new(),
    };
    walk.visit(root, None)?;
    Ok(walk.order)
}

struct Walk<'a> {
    registry: &'a Registry,
    /// Current DFS path; doubles as the "currently visiting" set.
    visiting: Vec<Arc<str>>,
    seen: HashSet<Arc<str>, RandomState>,
    order: Vec<Arc<str>>,
}

impl Walk<'_> {
    fn visit(&mut self, key: &str, dependent: Option<&Arc<str>>) -> Result<(), ResolutionError> {
        if self.seen.contains(key) {
            return Ok(());
        }

        if let Some(start) = self.visiting.iter().position(|visiting| &**visiting == key) {
            let mut path: Vec<String> = self.visiting[start..].iter().map(|k| k.to_string()).collect();
            path.push(key.to_string());
            return Err(ResolutionError::CircularDependency {
                service: key.to_string(),
                path,
            });
        }

        let entry = match self.registry.get(key) {
            Some(entry) => Arc::clone(entry),
            None => {
                return Err(match dependent {
                    None => ResolutionError::NotRegistered { key: key.to_string() },
                    Some(dependent) => ResolutionError::DependencyNotRegistered {
                        service: dependent.to_string(),
                        dependency: key.to_string(),
                    },
                })
            }
        };

        self.visiting.push(Arc::clone(&entry.key));
        for dependency in entry.dependencies() {
            self.visit(dependency.name(), Some(&entry.key))?;
        }
        self.visiting.pop();

        self.seen.insert(Arc::clone(&entry.key));
        self.order.push(Arc::clone(&entry.key));
        Ok(())
    }
}
