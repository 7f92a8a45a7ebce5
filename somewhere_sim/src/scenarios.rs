//! Reference scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScenarioId {
    /// One isolated device: every strategy must match the oracle
    SingleDevice,

    /// Ten devices on a line, event at one end
    Line,

    /// 5x5 grid, event in a corner
    Grid,

    /// Line cut in two halves while the event is on
    Partition,

    /// Devices leave and join while the event is on
    Churn,

    /// Spatial network of walking devices with jittered rounds
    RandomWalk,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SingleDevice,
            ScenarioId::Line,
            ScenarioId::Grid,
            ScenarioId::Partition,
            ScenarioId::Churn,
            ScenarioId::RandomWalk,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SingleDevice => "single_device",
            ScenarioId::Line => "line",
            ScenarioId::Grid => "grid",
            ScenarioId::Partition => "partition",
            ScenarioId::Churn => "churn",
            ScenarioId::RandomWalk => "random_walk",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SingleDevice => "Isolated device, event on (100, 200): matches the oracle",
            ScenarioId::Line => "10-device line: detection, then forgotten after the event",
            ScenarioId::Grid => "25-device grid: detection from a corner, then forgotten",
            ScenarioId::Partition => "Line split at t=150, healed at t=250: per-partition answers",
            ScenarioId::Churn => "3 devices leave at t=130, 2 isolated devices join at t=160",
            ScenarioId::RandomWalk => "Walking devices on spatial links with round jitter",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single_device" | "single" => Ok(ScenarioId::SingleDevice),
            "line" => Ok(ScenarioId::Line),
            "grid" => Ok(ScenarioId::Grid),
            "partition" => Ok(ScenarioId::Partition),
            "churn" => Ok(ScenarioId::Churn),
            "random_walk" | "randomwalk" => Ok(ScenarioId::RandomWalk),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
        }
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
