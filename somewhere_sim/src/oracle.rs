//! Ground truth of the simulated world.
//!
//! One event window `(true_time, false_time)`, open strictly between its
//! bounds. While it is open the event holds "somewhere"; only the origin
//! device is locally triggered.

use serde::{Deserialize, Serialize};
use somewhere_core::RoundInput;
use somewhere_env::DeviceId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub true_time: f64,
    pub false_time: f64,
    pub origin: DeviceId,
}

impl GroundTruth {
    pub fn new(true_time: f64, false_time: f64, origin: DeviceId) -> Self {
        Self {
            true_time,
            false_time,
            origin,
        }
    }

    /// Whether the event window is open at `time`.
    pub fn is_open(&self, time: f64) -> bool {
        time > self.true_time && time < self.false_time
    }

    /// Inputs of a round of `device` at `time`.
    pub fn input(&self, device: DeviceId, time: f64) -> RoundInput {
        let global = self.is_open(time);
        RoundInput {
            trigger: global && device == self.origin,
            global,
        }
    }
}
