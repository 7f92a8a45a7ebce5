//! Neighbour exchange: explicit maps from neighbour id to value.
//!
//! Each strategy reads its own slot from the previous-round messages of the
//! current neighbours and folds them with an operator it supplies. Folds used
//! by the strategies are commutative, associative and idempotent, so the
//! result does not depend on delivery order or duplicate delivery.

use serde::de::DeserializeOwned;
use somewhere_env::{DeviceId, Substrate};
use std::collections::BTreeMap;
use tracing::warn;

/// One neighbour's value for a slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<T> {
    /// Sender's clock when the value was produced
    pub sent_at: f64,

    /// The decoded value
    pub value: T,
}

/// Values of one slot across the current neighbours (self excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood<T> {
    entries: BTreeMap<DeviceId, Neighbor<T>>,
}

impl<T> Default for Neighborhood<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<T: DeserializeOwned> Neighborhood<T> {
    /// Decodes `slot` from every inbox message that carries it.
    ///
    /// Malformed payloads are logged and skipped: one bad neighbour never
    /// fails the round.
    pub fn gather<S: Substrate>(substrate: &S, slot: &str) -> Self {
        let mut hood = Self::default();
        for envelope in substrate.inbox() {
            match envelope.message.decode::<T>(slot) {
                Some(Ok(value)) => hood.insert(envelope.from, envelope.sent_at, value),
                Some(Err(e)) => {
                    warn!(
                        device = %substrate.local_id(),
                        from = %envelope.from,
                        "Skipping neighbour payload: {}",
                        e
                    );
                }
                None => {}
            }
        }
        hood
    }
}

impl<T> Neighborhood<T> {
    /// Creates an empty neighbourhood.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a neighbour value, keeping the most recent per device.
    pub fn insert(&mut self, from: DeviceId, sent_at: f64, value: T) {
        match self.entries.get(&from) {
            Some(existing) if existing.sent_at > sent_at => {}
            _ => {
                self.entries.insert(from, Neighbor { sent_at, value });
            }
        }
    }

    /// Returns the value of one neighbour.
    pub fn get(&self, id: DeviceId) -> Option<&T> {
        self.entries.get(&id).map(|n| &n.value)
    }

    /// Iterates (neighbour, entry) pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, &Neighbor<T>)> {
        self.entries.iter()
    }

    /// Iterates the values in id order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values().map(|n| &n.value)
    }

    /// Folds the values with `op`, starting from `init`.
    pub fn fold<A>(&self, init: A, op: impl FnMut(A, &T) -> A) -> A {
        self.values().fold(init, op)
    }

    /// Number of neighbours that carried the slot.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no neighbour carried the slot.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
