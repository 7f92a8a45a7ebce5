//! SimulatedDevice - a `Device` placed in the simulated world.

use crate::mobility::RandomWalk;

use nalgebra::Vector2;
use somewhere_core::{ConfigError, Device, RoundInput, RoundReport, SomewhereConfig};
use somewhere_env::{DeviceId, RoundFrame};

/// A device running in the simulated world.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    /// The strategies of this device
    inner: Device,

    /// Position over time
    walk: RandomWalk,

    /// Time of the next round
    next_round: f64,

    /// Time the device joined
    joined_at: f64,
}

impl SimulatedDevice {
    /// Creates a simulated device whose first round is at `first_round`.
    pub fn new(
        id: DeviceId,
        config: &SomewhereConfig,
        walk: RandomWalk,
        joined_at: f64,
        first_round: f64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            inner: Device::new(id, config)?,
            walk,
            next_round: first_round,
            joined_at,
        })
    }

    pub fn id(&self) -> DeviceId {
        self.inner.id()
    }

    /// Runs one round on the frame the world built for this device.
    pub fn run_round(&mut self, frame: &mut RoundFrame, input: RoundInput) -> RoundReport {
        self.inner.round(frame, input)
    }

    /// Time of the next round.
    pub fn next_round(&self) -> f64 {
        self.next_round
    }

    /// Schedules the next round `interval` after the current one.
    pub fn reschedule(&mut self, interval: f64) {
        self.next_round += interval;
    }

    /// Time the device joined the world.
    pub fn joined_at(&self) -> f64 {
        self.joined_at
    }

    pub fn position(&self) -> &Vector2<f64> {
        self.walk.position()
    }

    pub fn walk_mut(&mut self) -> &mut RandomWalk {
        &mut self.walk
    }

    /// Report of the latest round, if the device ran yet.
    pub fn last_report(&self) -> Option<&RoundReport> {
        self.inner.last_report()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use somewhere_core::StrategyKind;

    #[test]
    fn test_round_and_reschedule() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let walk = RandomWalk::new(&mut rng, 10.0, 0.0, 0.0);
        let mut device =
            SimulatedDevice::new(DeviceId(2), &SomewhereConfig::default(), walk, 0.0, 0.5).unwrap();

        assert!(device.last_report().is_none());

        let mut frame = RoundFrame::new(DeviceId(2), 0.5, Vec::new());
        let report = device.run_round(&mut frame, RoundInput { trigger: true, global: true });
        assert!(report.value(StrategyKind::Baseline));
        assert!(device.last_report().is_some());

        assert_eq!(device.joined_at(), 0.0);
        device.reschedule(1.25);
        assert_eq!(device.next_round(), 1.75);
        assert_eq!(device.id(), DeviceId(2));
    }
}
