//! One device's complete program.

use crate::baseline::Baseline;
use crate::config::SomewhereConfig;
use crate::error::ConfigError;
use crate::fastest::Fastest;
use crate::knowledge_free::KnowledgeFree;
use crate::oracle::Oracle;
use crate::replicated::Replicated;
use crate::reporter::{Reporter, RoundReport};
use crate::strategy::RoundInput;
use somewhere_env::{DeviceId, Substrate};

/// All strategy states owned by one device.
///
/// Each round runs every strategy through the `Reporter`, oracle first.
/// The strategies write disjoint slots, so none can observe another.
#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    oracle: Oracle,
    baseline: Baseline,
    knowledge_free: KnowledgeFree,
    replicated: Replicated,
    fastest: Fastest,
    rounds: u64,
    last_report: Option<RoundReport>,
}

impl Device {
    /// Creates a device. Invalid parameters are rejected here, before any
    /// round runs.
    pub fn new(id: DeviceId, config: &SomewhereConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id,
            oracle: Oracle::new(),
            baseline: Baseline::new(config)?,
            knowledge_free: KnowledgeFree::new(config)?,
            replicated: Replicated::new(config)?,
            fastest: Fastest::new(config)?,
            rounds: 0,
            last_report: None,
        })
    }

    /// Runs one round on the given substrate.
    pub fn round<S: Substrate>(&mut self, substrate: &mut S, input: RoundInput) -> RoundReport {
        debug_assert_eq!(substrate.local_id(), self.id);

        let mut reporter = Reporter::new(substrate.current_time());
        reporter.report(substrate, &mut self.oracle, &input);
        reporter.report(substrate, &mut self.baseline, &input);
        reporter.report(substrate, &mut self.knowledge_free, &input);
        reporter.report(substrate, &mut self.replicated, &input);
        reporter.report(substrate, &mut self.fastest, &input);

        let report = reporter.finish();
        self.rounds += 1;
        self.last_report = Some(report.clone());
        report
    }

    /// Device id.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Rounds run so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Report of the latest round.
    pub fn last_report(&self) -> Option<&RoundReport> {
        self.last_report.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyKind;
    use crate::testing::Lockstep;

    #[test]
    fn test_rejects_invalid_config() {
        let config = SomewhereConfig::default().with_replicas(1);
        assert!(Device::new(DeviceId(0), &config).is_err());
    }

    #[test]
    fn test_single_device_matches_oracle() {
        let config = SomewhereConfig::default();
        let mut net = Lockstep::line(1);
        let mut device = Device::new(DeviceId(0), &config).unwrap();

        while net.time() < 300.0 {
            let t = net.time() + 1.0;
            let global = t > 100.0 && t < 200.0;
            let input = RoundInput { trigger: global, global };
            let report = net.round(|_, frame| device.round(frame, input)).remove(0);

            assert_eq!(report.value(StrategyKind::Oracle), global);
            let exact = [
                StrategyKind::Baseline,
                StrategyKind::Fastest,
                StrategyKind::KnowledgeFree,
            ];
            for kind in exact {
                let record = report.get(kind).unwrap();
                assert!(!record.error, "{} at t = {}", kind, t);
            }
            assert_eq!(report.get(StrategyKind::Oracle).unwrap().msg_size, 0);
        }
        assert_eq!(device.rounds(), 300);
    }

    #[test]
    fn test_strategies_use_disjoint_slots() {
        let config = SomewhereConfig::default();
        let mut net = Lockstep::line(2);
        let mut devices: Vec<Device> = (0..2)
            .map(|i| Device::new(DeviceId(i), &config).unwrap())
            .collect();

        let reports = net.round(|id, frame| {
            let report = devices[id.0 as usize].round(frame, RoundInput::default());
            assert_eq!(report.total_msg_size(), frame.msg_size());
            assert_eq!(frame.outbox().slots().count(), 5);
            report
        });
        for report in reports {
            for kind in StrategyKind::all() {
                assert!(report.get(kind).is_some());
            }
        }
    }
}
