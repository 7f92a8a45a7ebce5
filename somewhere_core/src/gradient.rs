//! Hop-count gradient.
//!
//! Distance in hops from the nearest device that is a source this round:
//! 0 at sources, otherwise 1 + the minimum previous distance among
//! neighbours, and +∞ when no neighbour knows a finite distance. The
//! device's own previous estimate is not part of the minimum, so a device
//! that loses all its neighbours jumps straight to +∞.

use crate::error::CoreError;
use crate::exchange::Neighborhood;
use somewhere_env::Substrate;

/// Wire form of a distance: `None` is unreachable.
pub type WireHops = Option<u32>;

/// Self-stabilising hop gradient over one slot.
#[derive(Debug, Clone)]
pub struct HopGradient {
    slot: String,
    distance: f64,
}

impl HopGradient {
    /// Creates a gradient exchanging its distance under `slot`.
    pub fn new(slot: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            distance: f64::INFINITY,
        }
    }

    /// Runs one round: reads neighbour distances, publishes and returns ours.
    pub fn step<S: Substrate>(
        &mut self,
        substrate: &mut S,
        source: bool,
    ) -> Result<f64, CoreError> {
        let hood: Neighborhood<WireHops> = Neighborhood::gather(substrate, &self.slot);
        self.distance = if source {
            0.0
        } else {
            relax(hood.values().copied())
        };
        substrate.put(&self.slot, &to_wire(self.distance))?;
        Ok(self.distance)
    }

    /// Distance computed in the latest round.
    pub fn distance(&self) -> f64 {
        self.distance
    }
}

/// 1 + the minimum of the finite neighbour distances, or +∞.
pub fn relax(neighbours: impl IntoIterator<Item = WireHops>) -> f64 {
    neighbours
        .into_iter()
        .flatten()
        .map(|h| h as f64 + 1.0)
        .fold(f64::INFINITY, f64::min)
}

fn to_wire(distance: f64) -> WireHops {
    if distance.is_finite() {
        Some(distance as u32)
    } else {
        None
    }
}
