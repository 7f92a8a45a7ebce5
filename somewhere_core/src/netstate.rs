//! Per-device view of the whole network, merged by gossip.

use serde::{Deserialize, Serialize};
use somewhere_env::DeviceId;
use std::collections::BTreeMap;

/// Latest known (timestamp, value) of one device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stamp {
    pub time: f64,
    pub value: bool,
}

impl Stamp {
    /// What an unseen device reads as.
    pub const UNSEEN: Stamp = Stamp {
        time: f64::NEG_INFINITY,
        value: false,
    };

    /// Lexicographic maximum on (time, value).
    pub fn max(self, other: Stamp) -> Stamp {
        if self.time > other.time {
            self
        } else if other.time > self.time {
            other
        } else {
            Stamp {
                time: self.time,
                value: self.value || other.value,
            }
        }
    }
}

/// Wire form of one entry: `[id, time, value]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WireEntry(pub DeviceId, pub f64, pub bool);

/// Map from every device heard of to its latest stamp.
///
/// Merging is a pointwise maximum, so it is commutative, associative and
/// idempotent: any gossip order converges to the same state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<WireEntry>", into = "Vec<WireEntry>")]
pub struct NetState {
    entries: BTreeMap<DeviceId, Stamp>,
}

impl NetState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the entry of one device.
    pub fn update(&mut self, id: DeviceId, time: f64, value: bool) {
        self.entries.insert(id, Stamp { time, value });
    }

    /// Stamp of a device (`Stamp::UNSEEN` if never heard of).
    pub fn get(&self, id: DeviceId) -> Stamp {
        self.entries.get(&id).copied().unwrap_or(Stamp::UNSEEN)
    }

    /// Pointwise maximum of two states.
    pub fn merge(mut self, other: &NetState) -> NetState {
        for (id, stamp) in &other.entries {
            let merged = self.get(*id).max(*stamp);
            self.entries.insert(*id, merged);
        }
        self
    }

    /// True if some device was true after `threshold`.
    pub fn value(&self, threshold: f64) -> bool {
        self.entries
            .values()
            .any(|s| s.time > threshold && s.value)
    }

    /// Number of devices known.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no device is known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<WireEntry>> for NetState {
    fn from(wire: Vec<WireEntry>) -> Self {
        let mut state = NetState::new();
        for WireEntry(id, time, value) in wire {
            let merged = state.get(id).max(Stamp { time, value });
            state.entries.insert(id, merged);
        }
        state
    }
}

impl From<NetState> for Vec<WireEntry> {
    fn from(state: NetState) -> Self {
        state
            .entries
            .into_iter()
            .map(|(id, s)| WireEntry(id, s.time, s.value))
            .collect()
    }
}
