//! Wave-based leader election.
//!
//! Finds the network-wide minimum key without knowing the network size or
//! diameter. Every device stamps its own key with a wave counter that grows
//! by one per round. Ballots are compared by key (lower wins), then by wave
//! (higher wins), which is a total order, so merging ballots is
//! commutative, associative and idempotent.
//!
//! A live leader keeps issuing fresh waves, and followers see the wave grow.
//! When the leader's key disappears (it left, or its key changed) the waves
//! stop. A follower whose ballot has not advanced for `patience` time units
//! tombstones that (key, wave) and never adopts it, or any older wave of the
//! same key, again. Stale copies bouncing between followers can therefore not
//! keep a dead key alive.
//!
//! # Phases
//!
//! ```text
//!   Collecting ──(better foreign ballot)──▶ Disseminating
//!       ▲                                         │
//!       └──(own key best / foreign wave stalled)──┘
//! ```

use crate::error::CoreError;
use crate::exchange::Neighborhood;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use somewhere_env::{DeviceId, Substrate};
use std::collections::BTreeMap;
use tracing::debug;

/// Key used by the knowledge-free strategy.
///
/// Field order gives the ordering: any triggered device (`not_triggered ==
/// false`) sorts before every non-triggered one, ties broken by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElectionKey {
    /// False while the device's local trigger is on
    pub not_triggered: bool,

    /// Device id (tie-break)
    pub id: DeviceId,
}

impl ElectionKey {
    /// Builds the key of a device for this round.
    pub fn new(triggered: bool, id: DeviceId) -> Self {
        Self {
            not_triggered: !triggered,
            id,
        }
    }
}

/// A key stamped with the wave it was issued in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot<K> {
    pub key: K,
    pub wave: u64,
}

impl<K: Ord> Ballot<K> {
    /// True if `self` is preferred over `other`.
    pub fn outranks(&self, other: &Self) -> bool {
        match self.key.cmp(&other.key) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Greater => false,
            std::cmp::Ordering::Equal => self.wave > other.wave,
        }
    }

    /// The preferred of two ballots.
    pub fn merge(self, other: Self) -> Self {
        if other.outranks(&self) {
            other
        } else {
            self
        }
    }
}

/// Observable state of the election on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionPhase {
    /// Own key is the best known; waves originate here
    Collecting,

    /// Relaying a foreign leader's waves
    Disseminating,
}

#[derive(Debug, Clone)]
struct Held<K> {
    ballot: Ballot<K>,
    progressed_at: f64,
}

/// Per-device election state.
#[derive(Debug, Clone)]
pub struct WaveElection<K> {
    /// Slot the ballots travel in
    slot: String,

    /// Own wave counter (one per round, never reset)
    wave: u64,

    /// Foreign ballot currently followed
    held: Option<Held<K>>,

    /// Highest dropped wave per key
    tombstones: BTreeMap<K, u64>,

    /// Stall time after which a followed ballot is dropped
    patience: f64,

    phase: ElectionPhase,

    leader: Option<K>,
}

impl<K> WaveElection<K>
where
    K: Ord + Clone + std::fmt::Debug + Serialize + DeserializeOwned,
{
    /// Creates the election state exchanging ballots under `slot`.
    pub fn new(slot: impl Into<String>, patience: f64) -> Self {
        Self {
            slot: slot.into(),
            wave: 0,
            held: None,
            tombstones: BTreeMap::new(),
            patience,
            phase: ElectionPhase::Collecting,
            leader: None,
        }
    }

    /// Runs one round over the substrate and returns the elected key.
    pub fn step<S: Substrate>(&mut self, substrate: &mut S, key: K) -> Result<K, CoreError> {
        let now = substrate.current_time();
        let hood: Neighborhood<Ballot<K>> = Neighborhood::gather(substrate, &self.slot);
        let ballot = self.elect(key, now, hood.values().cloned());
        substrate.put(&self.slot, &ballot)?;
        Ok(ballot.key)
    }

    /// Runs one round on already-decoded neighbour ballots.
    pub fn elect(
        &mut self,
        key: K,
        now: f64,
        received: impl IntoIterator<Item = Ballot<K>>,
    ) -> Ballot<K> {
        self.wave += 1;
        let own = Ballot {
            key,
            wave: self.wave,
        };

        let mut candidates: Vec<Ballot<K>> = received
            .into_iter()
            .filter(|b| b.key != own.key)
            .collect();
        if let Some(held) = &self.held {
            candidates.push(held.ballot.clone());
        }

        loop {
            let best = candidates
                .iter()
                .filter(|b| !self.is_tombstoned(b))
                .cloned()
                .fold(own.clone(), Ballot::merge);

            if best.key == own.key {
                self.held = None;
                self.phase = ElectionPhase::Collecting;
                self.leader = Some(own.key.clone());
                return own;
            }

            let progressed_at = match &self.held {
                Some(held) if held.ballot.key == best.key && best.wave <= held.ballot.wave => {
                    held.progressed_at
                }
                _ => now,
            };

            if now - progressed_at > self.patience {
                debug!(key = ?best.key, wave = best.wave, "Dropping stalled election wave");
                let entry = self.tombstones.entry(best.key.clone()).or_insert(best.wave);
                *entry = (*entry).max(best.wave);
                self.held = None;
                continue;
            }

            self.held = Some(Held {
                ballot: best.clone(),
                progressed_at,
            });
            self.phase = ElectionPhase::Disseminating;
            self.leader = Some(best.key.clone());
            return best;
        }
    }

    fn is_tombstoned(&self, ballot: &Ballot<K>) -> bool {
        self.tombstones
            .get(&ballot.key)
            .is_some_and(|dropped| ballot.wave <= *dropped)
    }

    /// Current phase.
    pub fn phase(&self) -> ElectionPhase {
        self.phase
    }

    /// Key elected in the latest round.
    pub fn leader(&self) -> Option<&K> {
        self.leader.as_ref()
    }

    /// Own wave counter.
    pub fn wave(&self) -> u64 {
        self.wave
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ballot(key: u64, wave: u64) -> Ballot<u64> {
        Ballot { key, wave }
    }

    #[test]
    fn test_triggered_key_outranks_all() {
        let triggered = ElectionKey::new(true, DeviceId(99));
        let idle = ElectionKey::new(false, DeviceId(0));
        assert!(triggered < idle);
        assert!(ElectionKey::new(false, DeviceId(1)) < ElectionKey::new(false, DeviceId(2)));
    }

    #[test]
    fn test_own_key_when_alone() {
        let mut election = WaveElection::new("e", 3.0);
        let b = election.elect(5u64, 1.0, []);

        assert_eq!(b, ballot(5, 1));
        assert_eq!(election.phase(), ElectionPhase::Collecting);
        assert_eq!(election.leader(), Some(&5));
    }

    #[test]
    fn test_follows_better_key() {
        let mut election = WaveElection::new("e", 3.0);
        let b = election.elect(5u64, 1.0, [ballot(2, 7), ballot(9, 100)]);

        assert_eq!(b, ballot(2, 7));
        assert_eq!(election.phase(), ElectionPhase::Disseminating);
    }

    #[test]
    fn test_drops_stalled_leader_and_never_readopts() {
        let mut election = WaveElection::new("e", 2.0);
        election.elect(5u64, 1.0, [ballot(2, 7)]);

        // Same wave keeps coming back: no progress
        for t in [2.0, 3.0] {
            assert_eq!(election.elect(5, t, [ballot(2, 7)]).key, 2);
        }
        // Stalled for more than the patience
        assert_eq!(election.elect(5, 4.0, [ballot(2, 7)]).key, 5);
        assert_eq!(election.phase(), ElectionPhase::Collecting);

        // An echo of the dropped wave is ignored
        assert_eq!(election.elect(5, 5.0, [ballot(2, 6)]).key, 5);

        // A fresh wave of the same key is accepted
        assert_eq!(election.elect(5, 6.0, [ballot(2, 8)]).key, 2);
    }

    #[test]
    fn test_progressing_leader_is_kept() {
        let mut election = WaveElection::new("e", 1.0);
        for (i, t) in (1..20).enumerate() {
            let b = election.elect(5u64, t as f64, [ballot(2, 10 + i as u64)]);
            assert_eq!(b.key, 2);
        }
    }

    proptest! {
        #[test]
        fn prop_ballot_merge_is_commutative_and_idempotent(
            a in (0u64..5, 0u64..5), b in (0u64..5, 0u64..5), c in (0u64..5, 0u64..5)
        ) {
            let (a, b, c) = (ballot(a.0, a.1), ballot(b.0, b.1), ballot(c.0, c.1));

            prop_assert_eq!(a.clone().merge(b.clone()), b.clone().merge(a.clone()));
            prop_assert_eq!(a.clone().merge(a.clone()), a.clone());
            prop_assert_eq!(
                a.clone().merge(b.clone()).merge(c.clone()),
                a.merge(b.merge(c))
            );
        }
    }
}
