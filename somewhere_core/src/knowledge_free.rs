//! Election-based strategy.
//!
//! Elects the minimum `ElectionKey` of the connected component. The key of a
//! triggered device beats every other key, so the leader's
//! `not_triggered` flag is false exactly when some reachable device is
//! triggered. Needs no diameter or speed bound; the price is election
//! latency and a ballot in every message.

use crate::config::SomewhereConfig;
use crate::election::{ElectionKey, ElectionPhase, WaveElection};
use crate::error::{ConfigError, CoreError};
use crate::strategy::{RoundInput, Somewhere, StrategyKind};
use somewhere_env::Substrate;

const BALLOT_SLOT: &str = "knowledge_free/ballot";

/// Election-based strategy state.
#[derive(Debug, Clone)]
pub struct KnowledgeFree {
    election: WaveElection<ElectionKey>,
}

impl KnowledgeFree {
    /// Creates the strategy; only the election patience is used.
    pub fn new(config: &SomewhereConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            election: WaveElection::new(BALLOT_SLOT, config.election_patience),
        })
    }

    /// Election phase after the latest round.
    pub fn phase(&self) -> ElectionPhase {
        self.election.phase()
    }

    /// Leader elected in the latest round.
    pub fn leader(&self) -> Option<&ElectionKey> {
        self.election.leader()
    }
}

impl Somewhere for KnowledgeFree {
    fn kind(&self) -> StrategyKind {
        StrategyKind::KnowledgeFree
    }

    fn evaluate<S: Substrate>(
        &mut self,
        substrate: &mut S,
        input: &RoundInput,
    ) -> Result<bool, CoreError> {
        let key = ElectionKey::new(input.trigger, substrate.local_id());
        let leader = self.election.step(substrate, key)?;
        Ok(!leader.not_triggered)
    }
}
