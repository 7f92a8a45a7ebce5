//! Operator-replication strategy.
//!
//! "Eventually in the past" never forgets a truth. This strategy runs
//! staggered copies of it instead: a new generation starts every
//! `interval = diameter / info_speed / (replicas - 1)` of shared-clock time,
//! at most `replicas` generations are alive at once, and the answer comes
//! from the oldest alive one. Old generations retire, so a true answer is
//! remembered for roughly `interval * replicas` and no expiry timestamp has
//! to be broadcast.
//!
//! Generations are aggregate computations themselves: a device joins every
//! alive generation a neighbour reports, so the oldest generation visible
//! here may have been started elsewhere.

use crate::clock::SharedClock;
use crate::config::SomewhereConfig;
use crate::error::{ConfigError, CoreError};
use crate::exchange::Neighborhood;
use crate::past::PastEventually;
use crate::spawn::ReplicaSpawner;
use crate::strategy::{RoundInput, Somewhere, StrategyKind};
use serde::{Deserialize, Serialize};
use somewhere_env::Substrate;
use std::collections::BTreeMap;

const CLOCK_SLOT: &str = "replicated/clock";
const REPLICAS_SLOT: &str = "replicated/replicas";

/// One generation as reported to neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaStatus {
    pub generation: u64,
    pub value: bool,
    pub alive: bool,
}

/// Operator-replication strategy state.
#[derive(Debug, Clone)]
pub struct Replicated {
    /// Maximum concurrently alive generations
    replicas: usize,

    /// Shared-clock time between generations
    interval: f64,

    clock: SharedClock,

    spawner: ReplicaSpawner<u64, PastEventually>,

    /// Current generation index
    generation: u64,

    /// Generation the latest answer came from
    reported: Option<u64>,
}

impl Replicated {
    /// Creates the strategy. Rejects fewer than two replicas.
    pub fn new(config: &SomewhereConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            replicas: config.replicas,
            interval: config.replica_interval(),
            clock: SharedClock::new(CLOCK_SLOT),
            spawner: ReplicaSpawner::new(),
            generation: 0,
            reported: None,
        })
    }

    /// Generation index for a clock value.
    pub fn generation_at(&self, clock: f64) -> u64 {
        (clock.max(0.0) / self.interval).floor() as u64
    }

    /// Whether generation `g` is alive while `current` is the newest.
    pub fn is_alive(&self, g: u64, current: u64) -> bool {
        alive(g, current, self.replicas)
    }

    /// Interval between generations.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Current generation index.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation the latest answer came from.
    pub fn reported_generation(&self) -> Option<u64> {
        self.reported
    }

    /// Generations kept after the latest round, ascending.
    pub fn alive_generations(&self) -> Vec<u64> {
        self.spawner.keys().copied().collect()
    }
}

/// `g > current - replicas`, without underflow during cold start.
fn alive(g: u64, current: u64, replicas: usize) -> bool {
    g + replicas as u64 > current
}

impl Somewhere for Replicated {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Replicated
    }

    fn evaluate<S: Substrate>(
        &mut self,
        substrate: &mut S,
        input: &RoundInput,
    ) -> Result<bool, CoreError> {
        let clock = self.clock.step(substrate)?;
        let current = self.generation_at(clock);
        self.generation = current;

        let hood: Neighborhood<Vec<ReplicaStatus>> = Neighborhood::gather(substrate, REPLICAS_SLOT);
        let mut reported: BTreeMap<u64, bool> = BTreeMap::new();
        for status in hood.values().flatten().filter(|s| s.alive) {
            *reported.entry(status.generation).or_default() |= status.value;
        }

        let replicas = self.replicas;
        let keys = std::iter::once(current)
            .chain(reported.keys().copied().filter(|g| alive(*g, current, replicas)));
        let results = self.spawner.run(keys, |g, ep| {
            let value = ep.step(input.trigger, reported.get(g).copied());
            (value, alive(*g, current, replicas))
        });

        let statuses: Vec<ReplicaStatus> = results
            .iter()
            .map(|(g, r)| ReplicaStatus {
                generation: *g,
                value: r.result,
                alive: r.alive,
            })
            .collect();
        substrate.put(REPLICAS_SLOT, &statuses)?;

        // Results are ascending, so the first alive one is the oldest
        let oldest = results.iter().find(|(_, r)| r.alive);
        self.reported = oldest.map(|(g, _)| *g);
        Ok(oldest.map(|(_, r)| r.result).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Lockstep;
    use approx::assert_relative_eq;
    use somewhere_env::{DeviceId, Envelope, Message, RoundFrame};

    fn config(diameter: f64, info_speed: f64, replicas: usize) -> SomewhereConfig {
        SomewhereConfig::default()
            .with_diameter(diameter)
            .with_info_speed(info_speed)
            .with_replicas(replicas)
    }

    #[test]
    fn test_rejects_single_replica() {
        assert_eq!(
            Replicated::new(&config(10.0, 70.0, 1)).unwrap_err(),
            ConfigError::TooFewReplicas(1)
        );
    }

    #[test]
    fn test_interval_and_monotonic_generations() {
        let strategy = Replicated::new(&config(10.0, 70.0, 3)).unwrap();
        assert_relative_eq!(strategy.interval(), 10.0 / 70.0 / 2.0);

        let mut last = 0;
        for i in 0..200 {
            let g = strategy.generation_at(i as f64 * 0.37);
            assert!(g >= last);
            last = g;
        }
        assert_eq!(strategy.generation_at(1.0), 14);
    }

    #[test]
    fn test_reports_oldest_alive_generation() {
        let mut strategy = Replicated::new(&config(10.0, 1.0, 3)).unwrap();
        let mut net = Lockstep::line(1);

        // interval 5: at t = 1..=12 generations 0, 1, 2 appear
        for _ in 0..12 {
            net.round(|_, frame| strategy.evaluate(frame, &RoundInput::default()).unwrap());
            let alive = strategy.alive_generations();
            assert_eq!(strategy.reported_generation(), alive.first().copied());
            assert!(alive.len() <= 3);
        }
        assert_eq!(strategy.generation(), 2);
        assert_eq!(strategy.alive_generations(), vec![0, 1, 2]);

        // Generation 3 retires generation 0
        for _ in 0..3 {
            net.round(|_, frame| strategy.evaluate(frame, &RoundInput::default()).unwrap());
        }
        assert_eq!(strategy.generation(), 3);
        assert_eq!(strategy.alive_generations(), vec![1, 2, 3]);
        assert_eq!(strategy.reported_generation(), Some(1));
    }

    #[test]
    fn test_joins_older_neighbour_generation() {
        let mut strategy = Replicated::new(&config(10.0, 1.0, 3)).unwrap();

        let statuses = vec![
            ReplicaStatus { generation: 3, value: true, alive: true },
            ReplicaStatus { generation: 1, value: true, alive: false },
        ];
        let mut msg = Message::new();
        msg.insert(REPLICAS_SLOT, Message::encode(REPLICAS_SLOT, &statuses).unwrap());
        let inbox = vec![Envelope::new(DeviceId(1), 20.0, msg)];

        // Clock 20 -> generation 4; neighbour's generation 3 is alive, 1 is not
        let mut frame = RoundFrame::new(DeviceId(0), 20.0, inbox);
        let value = strategy.evaluate(&mut frame, &RoundInput::default()).unwrap();

        assert!(value);
        assert_eq!(strategy.reported_generation(), Some(3));
        assert_eq!(strategy.alive_generations(), vec![3, 4]);
    }

    #[test]
    fn test_detection_spreads_along_line_and_expires() {
        // interval 5, three replicas, shared clock equal to local time.
        // The origin triggers once at t = 20; device i hears of it i rounds
        // later through the generations alive then, and everyone forgets
        // once generation 4 retires at t = 35.
        let config = config(10.0, 1.0, 3);
        let n = 6;
        let mut net = Lockstep::line(n);
        let mut devices: Vec<Replicated> =
            (0..n).map(|_| Replicated::new(&config).unwrap()).collect();

        for _ in 0..45 {
            let t = net.time() + 1.0;
            let values = net.round(|id, frame| {
                let trigger = id.0 == 0 && t == 20.0;
                let input = RoundInput { trigger, global: trigger };
                devices[id.0 as usize].evaluate(frame, &input).unwrap()
            });

            for (i, value) in values.into_iter().enumerate() {
                let expected = t >= 20.0 + i as f64 && t < 35.0;
                assert_eq!(value, expected, "device {} at t = {}", i, t);
            }
        }

        // Clocks agree, so every device retired the same generations
        for device in &devices {
            assert_eq!(device.generation(), 9);
            assert_eq!(device.alive_generations(), vec![7, 8, 9]);
        }
    }

    #[test]
    fn test_memory_is_bounded() {
        // interval 5, three replicas: a truth is forgotten once every
        // generation alive when it happened has retired
        let mut strategy = Replicated::new(&config(10.0, 1.0, 3)).unwrap();
        let mut net = Lockstep::line(1);
        let mut history = Vec::new();

        for _ in 0..60 {
            let trigger = net.time() + 1.0 == 20.0;
            let values = net.round(|_, frame| {
                let input = RoundInput { trigger, global: trigger };
                strategy.evaluate(frame, &input).unwrap()
            });
            history.push((net.time(), values[0]));
        }

        for (t, value) in history {
            // Generation 4 starts at t = 20, alive until generation 7 (t = 35)
            let expected = (20.0..35.0).contains(&t);
            assert_eq!(value, expected, "t = {}", t);
        }
    }
}
