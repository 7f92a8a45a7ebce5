//! Keyed registry of persistent sub-computations.

use std::collections::{BTreeMap, BTreeSet};

/// Result of one instance in one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned<R> {
    /// What the instance computed
    pub result: R,

    /// Whether the instance stays registered (and is offered to neighbours)
    pub alive: bool,
}

/// Registry mapping keys to persistent instance state.
///
/// An instance is created on the first round its key is referenced and is
/// removed in the first round the caller reports it not alive. Instances
/// still registered are run every round even if nobody references them.
#[derive(Debug, Clone)]
pub struct ReplicaSpawner<K, S> {
    instances: BTreeMap<K, S>,
}

impl<K: Ord + Clone, S: Default> Default for ReplicaSpawner<K, S> {
    fn default() -> Self {
        Self {
            instances: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, S: Default> ReplicaSpawner<K, S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `process` on the referenced keys plus every registered key.
    ///
    /// `process` returns the instance's result and whether it is alive.
    /// Results come back in ascending key order.
    pub fn run<R>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
        mut process: impl FnMut(&K, &mut S) -> (R, bool),
    ) -> BTreeMap<K, Spawned<R>> {
        let mut all: BTreeSet<K> = keys.into_iter().collect();
        all.extend(self.instances.keys().cloned());

        let mut results = BTreeMap::new();
        for key in all {
            let state = self.instances.entry(key.clone()).or_default();
            let (result, alive) = process(&key, state);
            if !alive {
                self.instances.remove(&key);
            }
            results.insert(key, Spawned { result, alive });
        }
        results
    }

    /// Registered keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.instances.keys()
    }

    /// Returns true if `key` has a registered instance.
    pub fn contains(&self, key: &K) -> bool {
        self.instances.contains_key(key)
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
