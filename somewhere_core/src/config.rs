//! Strategy parameters.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Parameters shared by the somewhere strategies.
///
/// Passed explicitly into every strategy; nothing reads ambient constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SomewhereConfig {
    /// Upper bound on the network diameter (hops)
    pub diameter: f64,

    /// Information propagation speed (hops per time unit)
    pub info_speed: f64,

    /// Number of concurrently alive replicas (>= 2)
    pub replicas: usize,

    /// Time a followed election wave may stall before it is dropped
    pub election_patience: f64,
}

impl Default for SomewhereConfig {
    fn default() -> Self {
        Self {
            diameter: 10.0,
            info_speed: 70.0,
            replicas: 3,
            election_patience: 3.0,
        }
    }
}

impl SomewhereConfig {
    /// Sets the diameter bound.
    pub fn with_diameter(mut self, diameter: f64) -> Self {
        self.diameter = diameter;
        self
    }

    /// Sets the information speed.
    pub fn with_info_speed(mut self, info_speed: f64) -> Self {
        self.info_speed = info_speed;
        self
    }

    /// Sets the replica count.
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Sets the election patience.
    pub fn with_election_patience(mut self, patience: f64) -> Self {
        self.election_patience = patience;
        self
    }

    /// Checks every parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.diameter.is_finite() && self.diameter > 0.0) {
            return Err(ConfigError::InvalidDiameter(self.diameter));
        }
        if !(self.info_speed.is_finite() && self.info_speed > 0.0) {
            return Err(ConfigError::InvalidInfoSpeed(self.info_speed));
        }
        if self.replicas < 2 {
            return Err(ConfigError::TooFewReplicas(self.replicas));
        }
        if !(self.election_patience.is_finite() && self.election_patience > 0.0) {
            return Err(ConfigError::InvalidPatience(self.election_patience));
        }
        Ok(())
    }

    /// Time window within which a true event still counts: diameter / info_speed.
    pub fn window(&self) -> f64 {
        self.diameter / self.info_speed
    }

    /// Interval between replica spawns: diameter / info_speed / (replicas - 1).
    pub fn replica_interval(&self) -> f64 {
        self.window() / (self.replicas - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SomewhereConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_single_replica() {
        let config = SomewhereConfig::default().with_replicas(1);
        assert_eq!(config.validate(), Err(ConfigError::TooFewReplicas(1)));
    }

    #[test]
    fn test_rejects_non_positive_speed_and_diameter() {
        let config = SomewhereConfig::default().with_info_speed(0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidInfoSpeed(0.0)));

        let config = SomewhereConfig::default().with_diameter(-3.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidDiameter(-3.0)));

        let config = SomewhereConfig::default().with_info_speed(f64::INFINITY);
        assert!(config.validate().is_err());

        let config = SomewhereConfig::default().with_election_patience(0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidPatience(0.0)));
    }

    #[test]
    fn test_replica_interval() {
        let config = SomewhereConfig::default()
            .with_diameter(10.0)
            .with_info_speed(70.0)
            .with_replicas(3);

        assert_relative_eq!(config.replica_interval(), 10.0 / 70.0 / 2.0);
        assert_relative_eq!(config.replica_interval(), 0.0714, epsilon = 1e-4);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SomewhereConfig = serde_json::from_str(r#"{"replicas": 5}"#).unwrap();
        assert_eq!(config.replicas, 5);
        assert_eq!(config.diameter, 10.0);
    }
}
