//! Gradient-threshold strategy.
//!
//! Keeps a hop gradient from the devices triggered this round and answers
//! true while the gradient is below the diameter bound. Information is
//! assumed to travel about one hop per round, so a gradient that has grown
//! past the diameter means the source is gone.

use crate::config::SomewhereConfig;
use crate::error::{ConfigError, CoreError};
use crate::gradient::HopGradient;
use crate::strategy::{RoundInput, Somewhere, StrategyKind};
use somewhere_env::Substrate;

const HOPS_SLOT: &str = "baseline/hops";

/// Gradient-threshold strategy state.
#[derive(Debug, Clone)]
pub struct Baseline {
    diameter: f64,
    gradient: HopGradient,
}

impl Baseline {
    /// Creates the strategy from validated parameters.
    pub fn new(config: &SomewhereConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            diameter: config.diameter,
            gradient: HopGradient::new(HOPS_SLOT),
        })
    }

    /// Hop distance computed in the latest round.
    pub fn distance(&self) -> f64 {
        self.gradient.distance()
    }
}

impl Somewhere for Baseline {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Baseline
    }

    fn evaluate<S: Substrate>(
        &mut self,
        substrate: &mut S,
        input: &RoundInput,
    ) -> Result<bool, CoreError> {
        let distance = self.gradient.step(substrate, input.trigger)?;
        Ok(distance < self.diameter)
    }
}
