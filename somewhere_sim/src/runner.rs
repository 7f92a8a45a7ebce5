//! Scenario runner - executes the reference scenarios and checks them.

use crate::error::SimError;
use crate::exporter::{SimExport, SimRow};
use crate::scenarios::ScenarioId;
use crate::topology::Topology;
use crate::world::{DeliveryStats, SimConfig, SimWorld};

use serde::{Deserialize, Serialize};
use somewhere_core::{SomewhereConfig, StrategyKind};
use somewhere_env::{DeviceId, NetworkController};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Last time at which the event window is still open, sampled in checks.
const DETECTION_TIME: f64 = 199.0;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run (or the name of a custom run)
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all checks
    pub passed: bool,

    /// Device rounds executed
    pub total_rounds: u64,

    /// Final simulation time
    pub final_time: f64,

    /// Alive devices at the end
    pub final_device_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Configuration of the run
    pub config: SimConfig,

    /// Logged rows
    pub rows: Vec<SimRow>,
}

impl ScenarioResult {
    /// Converts the result into a JSON export.
    pub fn to_export(&self) -> SimExport {
        let mut export = SimExport::new(&self.scenario, &self.config);
        export.extend_rows(self.rows.iter().cloned());
        export.finalize(self.passed, self.failure_reason.clone());
        export
    }
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    pub delivery: DeliveryStats,

    /// Mean error per strategy over the rows after the event starts
    pub mean_error: BTreeMap<StrategyKind, f64>,

    /// Mean bytes per device and round, same rows
    pub mean_msg_size: BTreeMap<StrategyKind, f64>,
}

impl ScenarioMetrics {
    /// Averages the rows after `from`.
    pub fn from_rows(rows: &[SimRow], from: f64, delivery: DeliveryStats) -> Self {
        let selected: Vec<&SimRow> = rows.iter().filter(|r| r.time > from).collect();
        let mut metrics = Self {
            delivery,
            ..Self::default()
        };
        if selected.is_empty() {
            return metrics;
        }

        let n = selected.len() as f64;
        for kind in StrategyKind::all() {
            let error: f64 = selected.iter().map(|r| r.error(kind)).sum();
            let bytes: f64 = selected
                .iter()
                .map(|r| r.get(kind).map(|s| s.msg_size).unwrap_or(0.0))
                .sum();
            metrics.mean_error.insert(kind, error / n);
            metrics.mean_msg_size.insert(kind, bytes / n);
        }
        metrics
    }
}

/// Collects failed checks of one run.
#[derive(Debug, Default)]
struct Checks {
    failures: Vec<String>,
}

impl Checks {
    fn require(&mut self, ok: bool, what: impl FnOnce() -> String) {
        if !ok {
            self.failures.push(what());
        }
    }

    /// Checks every run must pass: the oracle is exact, no strategy fails,
    /// and everything is false once the event is long over.
    fn common(&mut self, rows: &[SimRow]) {
        for row in rows {
            self.require(row.error(StrategyKind::Oracle) == 0.0, || {
                format!("oracle error at t={}", row.time)
            });
            for (kind, stats) in &row.strategies {
                self.require(stats.failed == 0, || {
                    format!("{} failed on {} devices at t={}", kind, stats.failed, row.time)
                });
            }
        }

        match rows.last() {
            Some(last) => {
                for (kind, stats) in &last.strategies {
                    self.require(stats.value == 0.0, || {
                        format!(
                            "{} still true on {:.0}% of devices at t={}",
                            kind,
                            stats.value * 100.0,
                            last.time
                        )
                    });
                }
            }
            None => self.failures.push("no rows logged".to_string()),
        }
    }

    /// Strategies that must be true everywhere at `time`.
    fn all_true_at(&mut self, rows: &[SimRow], time: f64, kinds: &[StrategyKind]) {
        let Some(row) = rows.iter().find(|r| r.time == time) else {
            self.failures.push(format!("no row at t={}", time));
            return;
        };
        for kind in kinds {
            self.require(row.value(*kind) == 1.0, || {
                format!(
                    "{} true on {:.0}% of devices at t={}",
                    kind,
                    row.value(*kind) * 100.0,
                    time
                )
            });
        }
    }

    fn into_reason(self) -> Option<String> {
        if self.failures.is_empty() {
            None
        } else {
            Some(self.failures.join("; "))
        }
    }
}

/// Runs the reference scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let outcome = match scenario {
            ScenarioId::SingleDevice => self.run_single_device(),
            ScenarioId::Line => self.run_fixed(ScenarioId::Line, Topology::Line, 10),
            ScenarioId::Grid => self.run_fixed(ScenarioId::Grid, Topology::Grid { cols: 5 }, 25),
            ScenarioId::Partition => self.run_partition(),
            ScenarioId::Churn => self.run_churn(),
            ScenarioId::RandomWalk => self.run_random_walk(),
        };

        outcome.unwrap_or_else(|e| {
            warn!("Scenario {} could not run: {}", scenario.name(), e);
            ScenarioResult {
                scenario: scenario.name().to_string(),
                seed: self.seed,
                passed: false,
                total_rounds: 0,
                final_time: 0.0,
                final_device_count: 0,
                failure_reason: Some(e.to_string()),
                metrics: ScenarioMetrics::default(),
                config: SimConfig::default().with_seed(self.seed),
                rows: Vec::new(),
            }
        })
    }

    /// Runs an arbitrary configuration with the common checks only.
    pub fn run_config(&self, name: &str, config: SimConfig) -> Result<ScenarioResult, SimError> {
        let mut world = SimWorld::new(config)?;
        world.run();
        let mut checks = Checks::default();
        checks.common(world.rows());
        Ok(finish(name, world, checks))
    }

    /// Fixed synchronous network with hop-based information speed.
    fn fixed_config(&self, topology: Topology, devices: usize) -> SimConfig {
        let mut somewhere = SomewhereConfig::default().with_info_speed(1.0);
        // Bound strictly above the farthest hop distance
        if let Some(hops) = topology.hop_diameter(devices as u64) {
            somewhere = somewhere.with_diameter((hops + 1) as f64);
        }
        SimConfig::fixed(topology, devices)
            .with_seed(self.seed)
            .with_somewhere(somewhere)
    }

    /// Single device: every strategy must equal the oracle in every row.
    fn run_single_device(&self) -> Result<ScenarioResult, SimError> {
        info!("SingleDevice - isolated device against the oracle");

        let config = SimConfig::fixed(Topology::Line, 1).with_seed(self.seed);
        let mut world = SimWorld::new(config)?;
        world.run();

        let mut checks = Checks::default();
        checks.common(world.rows());
        for row in world.rows() {
            let exact = [
                StrategyKind::Baseline,
                StrategyKind::KnowledgeFree,
                StrategyKind::Fastest,
            ];
            for kind in exact {
                checks.require(row.error(kind) == 0.0, || {
                    format!("{} error at t={}", kind, row.time)
                });
            }
        }
        Ok(finish(ScenarioId::SingleDevice.name(), world, checks))
    }

    /// Line or grid: detection everywhere before the event ends.
    fn run_fixed(
        &self,
        scenario: ScenarioId,
        topology: Topology,
        devices: usize,
    ) -> Result<ScenarioResult, SimError> {
        info!("{} - {}", scenario.name(), scenario.description());

        let mut world = SimWorld::new(self.fixed_config(topology, devices))?;
        world.run();

        let mut checks = Checks::default();
        checks.common(world.rows());
        checks.all_true_at(
            world.rows(),
            DETECTION_TIME,
            &[
                StrategyKind::Baseline,
                StrategyKind::KnowledgeFree,
                StrategyKind::Replicated,
                StrategyKind::Fastest,
            ],
        );
        Ok(finish(scenario.name(), world, checks))
    }

    /// Partition: while split, only the origin's half knows.
    fn run_partition(&self) -> Result<ScenarioResult, SimError> {
        info!("Partition - line split while the event is on");

        let mut world = SimWorld::new(self.fixed_config(Topology::Line, 10))?;
        let left: Vec<DeviceId> = (0..5).map(DeviceId).collect();
        let right: Vec<DeviceId> = (5..10).map(DeviceId).collect();
        let mut checks = Checks::default();

        world.run_until(150.0);
        info!("  Creating network partition at t=150");
        world.network().partition(&left, &right);

        world.run_until(DETECTION_TIME);
        let knowledge_free = world.values(StrategyKind::KnowledgeFree);
        for (id, value) in &knowledge_free {
            let expected = left.contains(id);
            checks.require(*value == expected, || {
                format!("knowledge_free on {} is {} during partition", id, value)
            });
        }
        debug!(?knowledge_free, "Per-partition answers");

        world.run_until(250.0);
        info!("  Healing network partition at t=250");
        world.network().heal_all();

        world.run();
        checks.common(world.rows());
        Ok(finish(ScenarioId::Partition.name(), world, checks))
    }

    /// Churn: answers follow the devices that are actually there.
    fn run_churn(&self) -> Result<ScenarioResult, SimError> {
        info!("Churn - devices leave and join during the event");

        let mut world = SimWorld::new(self.fixed_config(Topology::Line, 10))?;
        let mut checks = Checks::default();

        world.run_until(130.0);
        for id in 7..10 {
            world.retire(DeviceId(id))?;
        }

        world.run_until(160.0);
        let joined = [world.spawn_device()?, world.spawn_device()?];
        checks.require(world.device_count() == 9, || {
            format!("{} devices after churn, expected 9", world.device_count())
        });

        world.run_until(DETECTION_TIME);
        for (id, value) in world.values(StrategyKind::KnowledgeFree) {
            // Joined devices are not linked to the origin's line segment
            let expected = !joined.contains(&id);
            checks.require(value == expected, || {
                format!("knowledge_free on {} is {} after churn", id, value)
            });
        }

        world.run();
        checks.common(world.rows());
        Ok(finish(ScenarioId::Churn.name(), world, checks))
    }

    /// Mobile spatial network with jittered rounds.
    fn run_random_walk(&self) -> Result<ScenarioResult, SimError> {
        info!("RandomWalk - mobile spatial network");

        let config = SimConfig::from_density(4.0, 10.0, 10.0, 10.0).with_seed(self.seed);
        let mut world = SimWorld::new(config)?;
        world.run();

        let mut checks = Checks::default();
        checks.common(world.rows());
        Ok(finish(ScenarioId::RandomWalk.name(), world, checks))
    }
}

/// Builds the result of a finished world.
fn finish(name: &str, mut world: SimWorld, checks: Checks) -> ScenarioResult {
    let rows = world.take_rows();
    let config = world.config().clone();
    let metrics = ScenarioMetrics::from_rows(&rows, config.true_time, world.delivery_stats());
    let failure_reason = checks.into_reason();
    let passed = failure_reason.is_none();

    info!(
        "{} {}: {} rounds, {} devices, {} messages delivered",
        if passed { "✓" } else { "✗" },
        name,
        world.rounds(),
        world.device_count(),
        metrics.delivery.delivered
    );

    ScenarioResult {
        scenario: name.to_string(),
        seed: config.seed,
        passed,
        total_rounds: world.rounds(),
        final_time: world.time(),
        final_device_count: world.device_count(),
        failure_reason,
        metrics,
        config,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exporter::StrategyStats;

    fn assert_passes(scenario: ScenarioId) {
        let result = ScenarioRunner::new(42).run(scenario);
        assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        assert_eq!(result.rows.len(), 301);
    }

    #[test]
    fn test_single_device() {
        assert_passes(ScenarioId::SingleDevice);
    }

    #[test]
    fn test_line() {
        assert_passes(ScenarioId::Line);
    }

    #[test]
    fn test_grid() {
        assert_passes(ScenarioId::Grid);
    }

    #[test]
    fn test_fixed_scenarios_bound_above_hop_diameter() {
        let line = ScenarioRunner::new(2).run(ScenarioId::Line);
        let grid = ScenarioRunner::new(2).run(ScenarioId::Grid);

        assert_eq!(line.config.somewhere.diameter, 10.0);
        assert_eq!(grid.config.somewhere.diameter, 5.0);
    }

    #[test]
    fn test_partition() {
        assert_passes(ScenarioId::Partition);
    }

    #[test]
    fn test_churn() {
        let result = ScenarioRunner::new(7).run(ScenarioId::Churn);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.final_device_count, 9);
    }

    #[test]
    fn test_random_walk_is_deterministic() {
        let a = ScenarioRunner::new(3).run(ScenarioId::RandomWalk);
        let b = ScenarioRunner::new(3).run(ScenarioId::RandomWalk);

        assert!(a.passed, "{:?}", a.failure_reason);
        assert_eq!(a.rows, b.rows);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_metrics_only_after_event() {
        let result = ScenarioRunner::new(1).run(ScenarioId::Line);
        let metrics = &result.metrics;

        assert_eq!(metrics.mean_error[&StrategyKind::Oracle], 0.0);
        assert_eq!(metrics.mean_msg_size[&StrategyKind::Oracle], 0.0);
        let bytes = &metrics.mean_msg_size;
        assert!(bytes[&StrategyKind::Fastest] > bytes[&StrategyKind::Baseline]);
    }

    #[test]
    fn test_metrics_exclude_row_at_event_start() {
        let row = |time: f64, error: f64| SimRow {
            time,
            devices: 1,
            strategies: BTreeMap::from([(
                StrategyKind::Baseline,
                StrategyStats {
                    error,
                    ..StrategyStats::default()
                },
            )]),
        };
        let rows = vec![row(99.0, 1.0), row(100.0, 1.0), row(101.0, 0.0), row(102.0, 0.5)];
        let metrics = ScenarioMetrics::from_rows(&rows, 100.0, DeliveryStats::default());

        assert_eq!(metrics.mean_error[&StrategyKind::Baseline], 0.25);
        assert_eq!(metrics.mean_error[&StrategyKind::Fastest], 0.0);
    }

    #[test]
    fn test_failed_checks_are_reported() {
        // With the event never closing, nothing is false at the end
        let config = SimConfig {
            false_time: 1000.0,
            end_time: 120.0,
            ..SimConfig::fixed(Topology::Line, 3)
        };
        let result = ScenarioRunner::new(1).run_config("open_event", config).unwrap();

        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("still true"));
    }

    #[test]
    fn test_export_carries_rows() {
        let result = ScenarioRunner::new(5).run(ScenarioId::SingleDevice);
        let export = result.to_export();

        assert_eq!(export.scenario, "single_device");
        assert_eq!(export.rows.len(), result.rows.len());
        assert_eq!(export.passed, result.passed);
    }
}
