//! Per-round instrumentation of the strategies.

use crate::strategy::{RoundInput, Somewhere, StrategyKind};
use serde::{Deserialize, Serialize};
use somewhere_env::Substrate;
use std::collections::BTreeMap;
use tracing::warn;

/// What one strategy produced in one round on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyRecord {
    /// The strategy's belief
    pub value: bool,

    /// Belief differs from the oracle's
    pub error: bool,

    /// Bytes the strategy added to the outbound message
    pub msg_size: usize,

    /// The strategy returned an error this round
    pub failed: bool,
}

/// All records of one device for one round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Time of the round
    pub time: f64,

    /// Records by strategy
    pub records: BTreeMap<StrategyKind, StrategyRecord>,
}

impl RoundReport {
    /// Record of one strategy, if it ran.
    pub fn get(&self, kind: StrategyKind) -> Option<&StrategyRecord> {
        self.records.get(&kind)
    }

    /// Value of one strategy (false if it did not run).
    pub fn value(&self, kind: StrategyKind) -> bool {
        self.get(kind).is_some_and(|r| r.value)
    }

    /// Total bytes sent this round.
    pub fn total_msg_size(&self) -> usize {
        self.records.values().map(|r| r.msg_size).sum()
    }
}

/// Runs strategies and measures them against the oracle.
///
/// The oracle should be reported first; until it is, records are scored
/// against the input's ground truth directly.
#[derive(Debug, Clone)]
pub struct Reporter {
    report: RoundReport,
}

impl Reporter {
    /// Starts the report of a round.
    pub fn new(time: f64) -> Self {
        Self {
            report: RoundReport {
                time,
                records: BTreeMap::new(),
            },
        }
    }

    /// Runs one strategy and records its value, error and message cost.
    ///
    /// A failing strategy is recorded as false and flagged; the caller
    /// carries on with the next strategy.
    pub fn report<S, F>(
        &mut self,
        substrate: &mut S,
        strategy: &mut F,
        input: &RoundInput,
    ) -> StrategyRecord
    where
        S: Substrate,
        F: Somewhere,
    {
        let kind = strategy.kind();
        let base = substrate.msg_size();
        let outcome = strategy.evaluate(substrate, input);
        let msg_size = substrate.msg_size().saturating_sub(base);

        let (value, failed) = match outcome {
            Ok(value) => (value, false),
            Err(e) => {
                warn!(
                    device = %substrate.local_id(),
                    strategy = %kind,
                    "Strategy failed this round: {}",
                    e
                );
                (false, true)
            }
        };

        let truth = self
            .report
            .get(StrategyKind::Oracle)
            .map(|r| r.value)
            .unwrap_or(input.global);
        let record = StrategyRecord {
            value,
            error: value != truth,
            msg_size,
            failed,
        };
        self.report.records.insert(kind, record);
        record
    }

    /// Finishes the round.
    pub fn finish(self) -> RoundReport {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use somewhere_env::{DeviceId, EnvError, RoundFrame};

    struct Constant(bool);

    impl Somewhere for Constant {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Baseline
        }

        fn evaluate<S: Substrate>(
            &mut self,
            substrate: &mut S,
            _input: &RoundInput,
        ) -> Result<bool, CoreError> {
            substrate.put("constant", &self.0)?;
            Ok(self.0)
        }
    }

    struct Broken;

    impl Somewhere for Broken {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Fastest
        }

        fn evaluate<S: Substrate>(
            &mut self,
            _substrate: &mut S,
            _input: &RoundInput,
        ) -> Result<bool, CoreError> {
            Err(EnvError::serialization("broken", "boom").into())
        }
    }

    #[test]
    fn test_records_error_against_oracle() {
        let mut frame = RoundFrame::new(DeviceId(0), 1.0, Vec::new());
        let mut reporter = Reporter::new(1.0);
        let input = RoundInput { trigger: false, global: true };

        reporter.report(&mut frame, &mut crate::oracle::Oracle::new(), &input);
        let record = reporter.report(&mut frame, &mut Constant(false), &input);

        assert!(record.error);
        assert!(!record.value);
        assert_eq!(record.msg_size, frame.msg_size());
        assert!(record.msg_size > 0);
    }

    #[test]
    fn test_failure_does_not_stop_round() {
        let mut frame = RoundFrame::new(DeviceId(0), 1.0, Vec::new());
        let mut reporter = Reporter::new(1.0);
        let input = RoundInput { trigger: true, global: true };

        let broken = reporter.report(&mut frame, &mut Broken, &input);
        let fine = reporter.report(&mut frame, &mut Constant(true), &input);

        assert!(broken.failed && broken.error && !broken.value);
        assert!(!fine.failed && !fine.error && fine.value);

        let report = reporter.finish();
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.total_msg_size(), fine.msg_size);
    }
}
