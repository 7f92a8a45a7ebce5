//! Who can hear whom.
//!
//! Devices are linked either by distance (`Spatial`, the default) or by a
//! fixed graph over their ids, which keeps scenario outcomes independent of
//! mobility.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use somewhere_env::DeviceId;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Topology {
    /// Linked when within the communication radius
    #[default]
    Spatial,

    /// Path d0 - d1 - d2 - ...
    Line,

    /// Devices laid out row by row in `cols` columns, linked to their
    /// (up to 8) surrounding cells
    Grid { cols: u64 },

    /// Explicit undirected edges
    Edges { edges: Vec<(u64, u64)> },
}

impl Topology {
    /// Whether `a` and `b` are linked. Positions are only read by `Spatial`.
    pub fn linked(
        &self,
        a: DeviceId,
        b: DeviceId,
        pa: &Vector2<f64>,
        pb: &Vector2<f64>,
        comm_radius: f64,
    ) -> bool {
        if a == b {
            return false;
        }
        match self {
            Topology::Spatial => (pa - pb).norm() <= comm_radius,
            Topology::Line => a.0.abs_diff(b.0) == 1,
            Topology::Grid { cols } => {
                let cols = (*cols).max(1);
                let (ra, ca) = (a.0 / cols, a.0 % cols);
                let (rb, cb) = (b.0 / cols, b.0 % cols);
                ra.abs_diff(rb) <= 1 && ca.abs_diff(cb) <= 1
            }
            Topology::Edges { edges } => edges
                .iter()
                .any(|&(x, y)| (x, y) == (a.0, b.0) || (y, x) == (a.0, b.0)),
        }
    }

    /// Hop diameter of the fixed graph on `devices` devices, if known
    /// without positions.
    pub fn hop_diameter(&self, devices: u64) -> Option<u64> {
        match self {
            Topology::Line => Some(devices.saturating_sub(1)),
            Topology::Grid { cols } => {
                let cols = (*cols).max(1);
                let rows = devices.div_ceil(cols);
                Some(rows.max(cols.min(devices)).saturating_sub(1))
            }
            _ => None,
        }
    }
}
