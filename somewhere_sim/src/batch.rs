//! Batch parameter sweeps.
//!
//! One parameter varies at a time while the others stay at their default
//! of 10, for every seed of a range. Runs are independent, so they execute
//! concurrently on blocking worker threads; each run stays sequential and
//! deterministic.

use crate::error::SimError;
use crate::exporter::StrategyStats;
use crate::world::{SimConfig, SimWorld};

use serde::{Deserialize, Serialize};
use somewhere_core::StrategyKind;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Value of every swept parameter outside its own sweep.
pub const DEFAULT_VALUE: f64 = 10.0;

/// Parameters a batch can sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepParam {
    /// Movement speed, 0..=48 step 2
    Speed,
    /// Device density, 5..=29
    Dens,
    /// Hop size of the deployment, 1..=25
    Hops,
    /// Round timing deviation, 0..=48 step 2
    Tvar,
}

impl SweepParam {
    pub fn all() -> [SweepParam; 4] {
        [SweepParam::Speed, SweepParam::Dens, SweepParam::Hops, SweepParam::Tvar]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SweepParam::Speed => "speed",
            SweepParam::Dens => "dens",
            SweepParam::Hops => "hops",
            SweepParam::Tvar => "tvar",
        }
    }

    /// Values of the full sweep.
    pub fn values(&self) -> Vec<f64> {
        let (start, end, step) = match self {
            SweepParam::Speed | SweepParam::Tvar => (0, 48, 2),
            SweepParam::Dens => (5, 29, 1),
            SweepParam::Hops => (1, 25, 1),
        };
        (start..=end).step_by(step).map(f64::from).collect()
    }

    /// Deployment with this parameter at `value` and the others at default.
    pub fn config(&self, value: f64) -> SimConfig {
        let [mut hops, mut dens, mut speed, mut tvar] = [DEFAULT_VALUE; 4];
        match self {
            SweepParam::Speed => speed = value,
            SweepParam::Dens => dens = value,
            SweepParam::Hops => hops = value,
            SweepParam::Tvar => tvar = value,
        }
        SimConfig::from_density(hops, dens, speed, tvar)
    }
}

impl std::fmt::Display for SweepParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SweepParam {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SweepParam::all()
            .into_iter()
            .find(|p| p.name() == s.to_lowercase())
            .ok_or_else(|| format!("Unknown sweep parameter: {}", s))
    }
}

/// One run of a batch.
#[derive(Debug, Clone)]
pub struct BatchPoint {
    pub param: SweepParam,
    pub value: f64,
    pub config: SimConfig,
}

/// Outcome of one run: per-strategy means over the rows after the event starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub param: SweepParam,
    pub value: f64,
    pub seed: u64,
    pub devices: usize,
    pub strategies: BTreeMap<StrategyKind, StrategyStats>,
}

/// Results of one sweep value averaged over seeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub param: SweepParam,
    pub value: f64,
    pub runs: usize,
    pub strategies: BTreeMap<StrategyKind, StrategyStats>,
}

/// Which runs a batch is made of.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    seeds: Range<u64>,
    timing: Option<(f64, f64, f64)>,
}

impl BatchPlan {
    /// Plan over the given seeds with the reference event timing.
    pub fn new(seeds: Range<u64>) -> Self {
        Self { seeds, timing: None }
    }

    /// Overrides the event window and the end time of every run.
    pub fn with_timing(mut self, true_time: f64, false_time: f64, end_time: f64) -> Self {
        self.timing = Some((true_time, false_time, end_time));
        self
    }

    /// Runs sweeping `param` over `values`.
    pub fn points_for(&self, param: SweepParam, values: &[f64]) -> Vec<BatchPoint> {
        let mut points = Vec::new();
        for &value in values {
            for seed in self.seeds.clone() {
                let mut config = param.config(value).with_seed(seed);
                if let Some((true_time, false_time, end_time)) = self.timing {
                    config.true_time = true_time;
                    config.false_time = false_time;
                    config.end_time = end_time;
                }
                points.push(BatchPoint { param, value, config });
            }
        }
        points
    }

    /// Full sweeps of the given parameters.
    pub fn points(&self, params: &[SweepParam]) -> Vec<BatchPoint> {
        params
            .iter()
            .flat_map(|p| self.points_for(*p, &p.values()))
            .collect()
    }
}

/// Runs one point to completion.
pub fn run_point(point: BatchPoint) -> Result<BatchResult, SimError> {
    let seed = point.config.seed;
    let from = point.config.true_time;
    let mut world = SimWorld::new(point.config)?;
    let rows = world.run();

    let mut sums: BTreeMap<StrategyKind, StrategyStats> = BTreeMap::new();
    let mut n = 0usize;
    for row in rows.iter().filter(|r| r.time > from) {
        n += 1;
        for (kind, stats) in &row.strategies {
            add(sums.entry(*kind).or_default(), stats);
        }
    }
    scale(&mut sums, n);

    debug!(param = %point.param, value = point.value, seed, "Batch run finished");
    Ok(BatchResult {
        param: point.param,
        value: point.value,
        seed,
        devices: world.device_count(),
        strategies: sums,
    })
}

fn add(total: &mut StrategyStats, stats: &StrategyStats) {
    total.value += stats.value;
    total.error += stats.error;
    total.msg_size += stats.msg_size;
    total.failed += stats.failed;
}

fn scale(sums: &mut BTreeMap<StrategyKind, StrategyStats>, n: usize) {
    if n == 0 {
        return;
    }
    let n = n as f64;
    for stats in sums.values_mut() {
        stats.value /= n;
        stats.error /= n;
        stats.msg_size /= n;
    }
}

/// Runs every point, at most `parallelism` at a time.
///
/// Results come back sorted by parameter, value and seed, whatever order
/// the runs finished in.
pub async fn run_batch(
    points: Vec<BatchPoint>,
    parallelism: usize,
) -> Result<Vec<BatchResult>, SimError> {
    info!(runs = points.len(), parallelism, "Starting batch");

    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut tasks = JoinSet::new();
    for point in points {
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| SimError::invalid(format!("batch semaphore closed: {}", e)))?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                run_point(point)
            })
            .await?
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        results.push(joined??);
    }
    results.sort_by(|a, b| {
        a.param
            .cmp(&b.param)
            .then(a.value.total_cmp(&b.value))
            .then(a.seed.cmp(&b.seed))
    });

    info!(runs = results.len(), "Batch finished");
    Ok(results)
}

/// Averages results over seeds, per parameter value.
pub fn summarize(results: &[BatchResult]) -> Vec<BatchSummary> {
    let mut summaries: Vec<BatchSummary> = Vec::new();
    for result in results {
        let same = summaries
            .last()
            .is_some_and(|s| s.param == result.param && s.value == result.value);
        if !same {
            summaries.push(BatchSummary {
                param: result.param,
                value: result.value,
                runs: 0,
                strategies: BTreeMap::new(),
            });
        }
        let Some(summary) = summaries.last_mut() else {
            continue;
        };
        summary.runs += 1;
        for (kind, stats) in &result.strategies {
            add(summary.strategies.entry(*kind).or_default(), stats);
        }
    }
    for summary in &mut summaries {
        scale(&mut summary.strategies, summary.runs);
    }
    summaries
}

/// Complete batch export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchExport {
    pub summaries: Vec<BatchSummary>,
    pub runs: Vec<BatchResult>,
}

impl BatchExport {
    pub fn new(runs: Vec<BatchResult>) -> Self {
        Self {
            summaries: summarize(&runs),
            runs,
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_plan() -> Vec<BatchPoint> {
        BatchPlan::new(0..2)
            .with_timing(5.0, 10.0, 15.0)
            .points_for(SweepParam::Hops, &[2.0, 1.0])
    }

    #[test]
    fn test_sweep_values() {
        assert_eq!(SweepParam::Speed.values().len(), 25);
        assert_eq!(SweepParam::Dens.values().first(), Some(&5.0));
        assert_eq!(SweepParam::Hops.values().last(), Some(&25.0));
        assert_eq!(SweepParam::Tvar.values()[1], 2.0);
    }

    #[test]
    fn test_sweep_keeps_other_defaults() {
        let config = SweepParam::Speed.config(20.0);
        assert_eq!(config.speed, 20.0);
        assert_eq!(config.tvar, DEFAULT_VALUE);
        assert_eq!(config.somewhere.diameter, DEFAULT_VALUE);
    }

    #[test]
    fn test_plan_covers_values_and_seeds() {
        let points = small_plan();
        assert_eq!(points.len(), 4);
        assert!(points.iter().all(|p| p.config.end_time == 15.0));

        let full = BatchPlan::new(0..10).points(&SweepParam::all());
        assert_eq!(full.len(), 4 * 25 * 10);
    }

    #[tokio::test]
    async fn test_batch_is_sorted_and_deterministic() {
        let results = run_batch(small_plan(), 2).await.unwrap();
        let again = run_batch(small_plan(), 4).await.unwrap();

        assert_eq!(results, again);
        let order: Vec<(f64, u64)> = results.iter().map(|r| (r.value, r.seed)).collect();
        assert_eq!(order, vec![(1.0, 0), (1.0, 1), (2.0, 0), (2.0, 1)]);

        for result in &results {
            assert_eq!(result.strategies[&StrategyKind::Oracle].error, 0.0);
        }
    }

    #[tokio::test]
    async fn test_summaries_average_seeds() {
        let results = run_batch(small_plan(), 2).await.unwrap();
        let summaries = summarize(&results);

        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.runs == 2));

        let oracle = summaries[0].strategies[&StrategyKind::Oracle];
        let per_seed: f64 = results[..2]
            .iter()
            .map(|r| r.strategies[&StrategyKind::Oracle].value)
            .sum();
        assert!((oracle.value - per_seed / 2.0).abs() < 1e-12);
        assert!(oracle.value > 0.0 && oracle.value < 1.0);
        assert_eq!(oracle.error, 0.0);
    }

    #[test]
    fn test_param_parse() {
        assert_eq!("dens".parse::<SweepParam>(), Ok(SweepParam::Dens));
        assert!("height".parse::<SweepParam>().is_err());
    }
}
