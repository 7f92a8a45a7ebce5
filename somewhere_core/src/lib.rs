//! Somewhere Core - Distributed Detection of Recent Events
//!
//! Every device answers one question each round: "has the event happened
//! somewhere in the network within the recent past?". This library provides
//! five strategies for it, sharing one round structure:
//! 1. **Oracle**: the ground truth, for scoring
//! 2. **Baseline**: hop-count gradient from the triggered devices
//! 3. **Knowledge-free**: leader election where triggered keys win
//! 4. **Replicated**: staggered replicas of "eventually in the past"
//! 5. **Fastest**: gossip of the latest known state of every device
//!
//! Strategies talk only through the `somewhere_env::Substrate` seam, and
//! `Device` runs all of them each round through a `Reporter` that scores
//! them against the oracle and measures their message cost.

pub mod baseline;
pub mod clock;
pub mod config;
pub mod device;
pub mod election;
pub mod error;
pub mod exchange;
pub mod fastest;
pub mod gradient;
pub mod knowledge_free;
pub mod netstate;
pub mod oracle;
pub mod past;
pub mod replicated;
pub mod reporter;
pub mod spawn;
pub mod strategy;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use config::SomewhereConfig;
pub use device::Device;
pub use error::{ConfigError, CoreError};
pub use reporter::{Reporter, RoundReport, StrategyRecord};
pub use strategy::{RoundInput, Somewhere, StrategyKind};
