//! Round timing of the devices.
//!
//! Devices start within the first time unit and then fire about once per
//! time unit, with Weibull-distributed intervals of mean 1 and standard
//! deviation `tvar / 100`.

use crate::error::SimError;
use rand::Rng;
use rand_distr::{Distribution, Weibull};
use statrs::function::gamma::gamma;

#[derive(Debug, Clone)]
pub enum RoundSchedule {
    /// Every device fires at t = 0, 1, 2, ...
    Synchronous,

    /// Uniform start in [0, 1], then Weibull intervals
    Jittered(Option<Weibull<f64>>),
}

impl RoundSchedule {
    /// Builds the schedule for a timing deviation of `tvar` percent.
    pub fn new(tvar: f64, synchronous: bool) -> Result<Self, SimError> {
        if synchronous {
            return Ok(Self::Synchronous);
        }
        if !tvar.is_finite() || tvar < 0.0 {
            return Err(SimError::invalid(format!(
                "tvar must be a non-negative number, got {}",
                tvar
            )));
        }
        if tvar == 0.0 {
            return Ok(Self::Jittered(None));
        }

        let (scale, shape) = weibull_parameters(1.0, tvar / 100.0);
        let weibull = Weibull::new(scale, shape)
            .map_err(|e| SimError::invalid(format!("Weibull({}, {}): {}", scale, shape, e)))?;
        Ok(Self::Jittered(Some(weibull)))
    }

    /// Time of a device's first round, joining at `now`.
    ///
    /// Synchronous devices joining after the start wait for the next whole
    /// time unit, so they never share a batch that already ran.
    pub fn first<R: Rng>(&self, rng: &mut R, now: f64) -> f64 {
        match self {
            Self::Synchronous if now <= 0.0 => 0.0,
            Self::Synchronous => now.floor() + 1.0,
            Self::Jittered(_) => now + rng.gen_range(0.0..=1.0),
        }
    }

    /// Time between two rounds of the same device.
    pub fn interval<R: Rng>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Synchronous | Self::Jittered(None) => 1.0,
            Self::Jittered(Some(weibull)) => weibull.sample(rng),
        }
    }
}

/// Weibull (scale, shape) with the given mean and standard deviation.
///
/// Shape from the Justus approximation `k = (sd / mean)^-1.086`, scale
/// from `mean = scale * Γ(1 + 1/k)`.
pub fn weibull_parameters(mean: f64, sd: f64) -> (f64, f64) {
    let shape = (sd / mean).powf(-1.086);
    let scale = mean / gamma(1.0 + 1.0 / shape);
    (scale, shape)
}
