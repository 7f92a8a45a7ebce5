//! Full-provenance gossip strategy.
//!
//! Every device gossips a `NetState` with the latest (time, trigger) of every
//! device it has heard of, and answers true if any of them was true within
//! the last `diameter / info_speed` time units. Fastest and most accurate of
//! the approximations; message size grows with the number of devices.

use crate::config::SomewhereConfig;
use crate::error::{ConfigError, CoreError};
use crate::exchange::Neighborhood;
use crate::netstate::NetState;
use crate::strategy::{RoundInput, Somewhere, StrategyKind};
use somewhere_env::Substrate;

const NETSTATE_SLOT: &str = "fastest/netstate";

/// Gossip strategy state.
#[derive(Debug, Clone)]
pub struct Fastest {
    /// Staleness window: diameter / info_speed
    window: f64,

    state: NetState,
}

impl Fastest {
    /// Creates the strategy from validated parameters.
    pub fn new(config: &SomewhereConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            window: config.window(),
            state: NetState::new(),
        })
    }

    /// State after the latest round.
    pub fn state(&self) -> &NetState {
        &self.state
    }
}

impl Somewhere for Fastest {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fastest
    }

    fn evaluate<S: Substrate>(
        &mut self,
        substrate: &mut S,
        input: &RoundInput,
    ) -> Result<bool, CoreError> {
        let now = substrate.current_time();
        let hood: Neighborhood<NetState> = Neighborhood::gather(substrate, NETSTATE_SLOT);

        let own = std::mem::take(&mut self.state);
        let mut merged = hood.fold(own, |acc, s| acc.merge(s));
        merged.update(substrate.local_id(), now, input.trigger);

        let value = merged.value(now - self.window);
        substrate.put(NETSTATE_SLOT, &merged)?;
        self.state = merged;
        Ok(value)
    }
}
