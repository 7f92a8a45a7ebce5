//! Aggregated log rows and JSON export.
//!
//! A row is taken every log period: per strategy, the mean over alive
//! devices of the latest value, error flag and message bytes.

use crate::error::SimError;
use crate::world::SimConfig;

use serde::{Deserialize, Serialize};
use somewhere_core::{RoundReport, StrategyKind};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Means of one strategy over the devices of a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    /// Fraction of devices believing true
    pub value: f64,

    /// Fraction of devices disagreeing with the oracle
    pub error: f64,

    /// Mean bytes per device
    pub msg_size: f64,

    /// Devices whose strategy failed in their latest round
    #[serde(default, skip_serializing_if = "is_zero")]
    pub failed: u64,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// A single logged row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimRow {
    /// Simulation time of the row
    pub time: f64,

    /// Devices contributing to the row
    pub devices: usize,

    pub strategies: BTreeMap<StrategyKind, StrategyStats>,
}

impl SimRow {
    /// Aggregates the latest reports of the alive devices.
    pub fn aggregate<'a>(time: f64, reports: impl IntoIterator<Item = &'a RoundReport>) -> Self {
        let mut sums: BTreeMap<StrategyKind, StrategyStats> = BTreeMap::new();
        let mut devices = 0;

        for report in reports {
            devices += 1;
            for (kind, record) in &report.records {
                let stats = sums.entry(*kind).or_default();
                stats.value += f64::from(u8::from(record.value));
                stats.error += f64::from(u8::from(record.error));
                stats.msg_size += record.msg_size as f64;
                stats.failed += u64::from(record.failed);
            }
        }

        if devices > 0 {
            let n = devices as f64;
            for stats in sums.values_mut() {
                stats.value /= n;
                stats.error /= n;
                stats.msg_size /= n;
            }
        }

        Self {
            time,
            devices,
            strategies: sums,
        }
    }

    pub fn get(&self, kind: StrategyKind) -> Option<&StrategyStats> {
        self.strategies.get(&kind)
    }

    /// Mean value of a strategy (0 if absent).
    pub fn value(&self, kind: StrategyKind) -> f64 {
        self.get(kind).map(|s| s.value).unwrap_or(0.0)
    }

    /// Mean error of a strategy (0 if absent).
    pub fn error(&self, kind: StrategyKind) -> f64 {
        self.get(kind).map(|s| s.error).unwrap_or(0.0)
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Configuration of the run
    pub config: SimConfig,

    /// All rows
    pub rows: Vec<SimRow>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, config: &SimConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed: config.seed,
            config: config.clone(),
            rows: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds rows.
    pub fn extend_rows(&mut self, rows: impl IntoIterator<Item = SimRow>) {
        self.rows.extend(rows);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
