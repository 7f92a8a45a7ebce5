//! The common shape of every somewhere strategy.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use somewhere_env::Substrate;

/// Identifies a strategy in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Ground truth, no communication
    Oracle,

    /// Hop gradient below the diameter bound
    Baseline,

    /// Leader election on (not triggered, id)
    KnowledgeFree,

    /// Staggered replicas of "eventually in the past"
    Replicated,

    /// Full-provenance gossip
    Fastest,
}

impl StrategyKind {
    /// All strategies, in the order a device runs them.
    pub fn all() -> [StrategyKind; 5] {
        [
            StrategyKind::Oracle,
            StrategyKind::Baseline,
            StrategyKind::KnowledgeFree,
            StrategyKind::Replicated,
            StrategyKind::Fastest,
        ]
    }

    /// Returns the strategy name.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Oracle => "oracle",
            StrategyKind::Baseline => "baseline",
            StrategyKind::KnowledgeFree => "knowledge_free",
            StrategyKind::Replicated => "replicated",
            StrategyKind::Fastest => "fastest",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKind::all()
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("Unknown strategy: {}", s))
    }
}

/// External inputs of one round on one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundInput {
    /// Local trigger (event window open and this device is the origin)
    pub trigger: bool,

    /// Ground truth: event window open anywhere
    pub global: bool,
}

/// A strategy evaluating "has the event happened somewhere recently?".
///
/// Implementations own their state, read only their own slots of the
/// neighbours' messages, and write only their own slots.
pub trait Somewhere {
    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Runs one round and returns the strategy's belief.
    fn evaluate<S: Substrate>(
        &mut self,
        substrate: &mut S,
        input: &RoundInput,
    ) -> Result<bool, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_roundtrip() {
        for kind in StrategyKind::all() {
            assert_eq!(kind.name().parse::<StrategyKind>(), Ok(kind));
        }
        assert!("nowhere".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&StrategyKind::KnowledgeFree).unwrap();
        assert_eq!(json, "\"knowledge_free\"");
    }
}
