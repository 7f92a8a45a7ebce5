//! Network-shared clock.
//!
//! Each device advances its previous clock by its own elapsed time, then
//! catches up with any neighbour that is ahead (their clock plus the age of
//! their message). On a synchronous network it equals local time.

use crate::error::CoreError;
use crate::exchange::Neighborhood;
use somewhere_env::Substrate;

/// Shared clock exchanged under one slot.
#[derive(Debug, Clone)]
pub struct SharedClock {
    slot: String,
    /// (local time, clock) of the latest round
    last: Option<(f64, f64)>,
}

impl SharedClock {
    /// Creates a clock exchanging its value under `slot`.
    pub fn new(slot: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            last: None,
        }
    }

    /// Runs one round and returns the clock.
    pub fn step<S: Substrate>(&mut self, substrate: &mut S) -> Result<f64, CoreError> {
        let now = substrate.current_time();
        let own = match self.last {
            Some((time, clock)) => clock + (now - time).max(0.0),
            None => now,
        };

        let hood: Neighborhood<f64> = Neighborhood::gather(substrate, &self.slot);
        let clock = hood
            .iter()
            .map(|(_, n)| n.value + (now - n.sent_at).max(0.0))
            .fold(own, f64::max);

        self.last = Some((now, clock));
        substrate.put(&self.slot, &clock)?;
        Ok(clock)
    }

    /// Clock value of the latest round.
    pub fn value(&self) -> Option<f64> {
        self.last.map(|(_, clock)| clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use somewhere_env::{DeviceId, Envelope, Message, RoundFrame};

    #[test]
    fn test_follows_local_time_when_alone() {
        let mut clock = SharedClock::new("c");
        for t in [0.0, 1.0, 2.5] {
            let mut frame = RoundFrame::new(DeviceId(0), t, Vec::new());
            assert_eq!(clock.step(&mut frame).unwrap(), t);
        }
    }

    #[test]
    fn test_catches_up_with_neighbour() {
        let mut clock = SharedClock::new("c");
        let mut frame = RoundFrame::new(DeviceId(0), 1.0, Vec::new());
        clock.step(&mut frame).unwrap();

        // Neighbour sent clock 10 at local time 1.5
        let mut msg = Message::new();
        msg.insert("c", Message::encode("c", &10.0f64).unwrap());
        let inbox = vec![Envelope::new(DeviceId(1), 1.5, msg)];
        let mut frame = RoundFrame::new(DeviceId(0), 2.0, inbox);

        assert_eq!(clock.step(&mut frame).unwrap(), 10.5);
        assert_eq!(clock.value(), Some(10.5));
    }
}
