//! Reader/writer guarded hash map.

use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use ahash::RandomState;
use parking_lot::{RwLock, RwLockReadGuard};

pub(crate) type FastMap<K, V> = HashMap<K, V, RandomState>;

/// A hash map shared between threads.
///
/// Lookups take the read lock; inserts and removals take the write lock.
/// Values are cloned out so no guard escapes a call, except through
/// [`SyncMap::read`] for callers that need a consistent multi-key view.
pub(crate) struct SyncMap<K, V> {
    inner: RwLock<FastMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> SyncMap<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::with_hasher(RandomState::new())),
        }
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().get(key).cloned()
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().contains_key(key)
    }

    /// Inserts or overwrites, returning the previous value.
    pub(crate) fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    /// Inserts only when the key is vacant. Returns false if it was taken.
    pub(crate) fn insert_if_absent(&self, key: K, value: V) -> bool {
        match self.inner.write().entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    pub(crate) fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.write().remove(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub(crate) fn snapshot(&self) -> Vec<(K, V)>
    where
        K: Clone,
    {
        self.inner
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub(crate) fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.inner.read().keys().cloned().collect()
    }

    /// Holds the read lock for a consistent view across several lookups.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, FastMap<K, V>> {
        self.inner.read()
    }
}

impl<K: Eq + Hash, V: Clone> Default for SyncMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
