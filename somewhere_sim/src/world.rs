//! SimWorld - the simulation harness container.

use crate::agent::SimulatedDevice;
use crate::context::{SimContext, Stream};
use crate::error::SimError;
use crate::exporter::SimRow;
use crate::mobility::RandomWalk;
use crate::network::SimNetworkController;
use crate::oracle::GroundTruth;
use crate::schedule::RoundSchedule;
use crate::topology::Topology;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use somewhere_core::{SomewhereConfig, StrategyKind};
use somewhere_env::{DeviceId, Envelope, RoundFrame};
use std::collections::BTreeMap;
use tracing::debug;

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of devices spawned at time 0
    pub devices: usize,

    /// Side of the square deployment area
    pub side: f64,

    /// Communication radius (spatial topology)
    pub comm_radius: f64,

    /// Movement speed of the devices
    pub speed: f64,

    /// Standard deviation of round intervals, in percent of the mean
    pub tvar: f64,

    /// Event window opens after this time
    pub true_time: f64,

    /// Event window closes at this time
    pub false_time: f64,

    /// Last simulated time
    pub end_time: f64,

    /// Messages older than this are not delivered
    pub retain: f64,

    /// Time between logged rows
    pub log_period: f64,

    /// The only device triggered by the event
    pub origin: DeviceId,

    /// Fire every device at t = 0, 1, 2, ...
    pub synchronous: bool,

    /// Default loss rate of every link
    pub link_loss: f64,

    pub topology: Topology,

    /// Strategy parameters
    pub somewhere: SomewhereConfig,
}

/// Communication radius of the reference deployment.
pub const COMM_RADIUS: f64 = 100.0;

impl Default for SimConfig {
    fn default() -> Self {
        Self::from_density(10.0, 10.0, 10.0, 10.0)
    }
}

impl SimConfig {
    /// Derives a spatial deployment from its hop size and density.
    ///
    /// `side = hops * comm / √2 + ½` and
    /// `devices = dens * side² / (π * comm²) + ½`, truncated; the diameter
    /// bound is set to `hops`.
    pub fn from_density(hops: f64, dens: f64, speed: f64, tvar: f64) -> Self {
        let side = (hops * COMM_RADIUS / std::f64::consts::SQRT_2 + 0.5).floor();
        let coverage = std::f64::consts::PI * COMM_RADIUS * COMM_RADIUS;
        let devices = (dens * side * side / coverage + 0.5).floor().max(0.0) as usize;

        Self {
            seed: 42,
            devices,
            side,
            comm_radius: COMM_RADIUS,
            speed,
            tvar,
            true_time: 100.0,
            false_time: 200.0,
            end_time: 300.0,
            retain: 3.0,
            log_period: 1.0,
            origin: DeviceId(0),
            synchronous: false,
            link_loss: 0.0,
            topology: Topology::Spatial,
            somewhere: SomewhereConfig::default().with_diameter(hops),
        }
    }

    /// A synchronous fixed-topology network of `devices` devices.
    pub fn fixed(topology: Topology, devices: usize) -> Self {
        Self {
            devices,
            topology,
            synchronous: true,
            speed: 0.0,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_somewhere(mut self, somewhere: SomewhereConfig) -> Self {
        self.somewhere = somewhere;
        self
    }

    pub fn with_end_time(mut self, end_time: f64) -> Self {
        self.end_time = end_time;
        self
    }

    /// Checks the parameters, strategy ones included.
    pub fn validate(&self) -> Result<(), SimError> {
        self.somewhere.validate()?;

        let positive = [
            ("log_period", self.log_period),
            ("retain", self.retain),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::invalid(format!("{} must be positive, got {}", name, value)));
            }
        }
        let non_negative = [
            ("side", self.side),
            ("comm_radius", self.comm_radius),
            ("speed", self.speed),
            ("end_time", self.end_time),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(SimError::invalid(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.link_loss) {
            return Err(SimError::invalid(format!(
                "link_loss must be in [0, 1], got {}",
                self.link_loss
            )));
        }
        Ok(())
    }
}

/// Delivery counters of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStats {
    pub delivered: u64,

    /// Dropped by link loss
    pub lost: u64,

    /// Blocked by a partition
    pub blocked: u64,

    /// Older than the retain time
    pub expired: u64,
}

/// The SimWorld - container for the entire simulation.
pub struct SimWorld {
    config: SimConfig,

    /// Virtual clock
    context: SimContext,

    schedule: RoundSchedule,

    truth: GroundTruth,

    /// Network controller for fault injection
    network: SimNetworkController,

    devices: BTreeMap<DeviceId, SimulatedDevice>,

    /// Latest committed message of every device
    board: BTreeMap<DeviceId, Envelope>,

    schedule_rng: ChaCha8Rng,
    mobility_rng: ChaCha8Rng,
    link_rng: ChaCha8Rng,

    next_id: u64,

    /// Index of the next row to log
    next_log: u64,

    rows: Vec<SimRow>,

    /// Device rounds run so far
    rounds: u64,

    stats: DeliveryStats,
}

impl SimWorld {
    /// Creates a new SimWorld and spawns the initial devices.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;

        let context = SimContext::new(config.seed);
        let schedule = RoundSchedule::new(config.tvar, config.synchronous)?;
        let truth = GroundTruth::new(config.true_time, config.false_time, config.origin);

        let mut world = Self {
            schedule_rng: context.rng(Stream::Schedule),
            mobility_rng: context.rng(Stream::Mobility),
            link_rng: context.rng(Stream::Links),
            context,
            schedule,
            truth,
            network: SimNetworkController::new(),
            devices: BTreeMap::new(),
            board: BTreeMap::new(),
            next_id: 0,
            next_log: 0,
            rows: Vec::new(),
            rounds: 0,
            stats: DeliveryStats::default(),
            config,
        };

        for _ in 0..world.config.devices {
            world.spawn_device()?;
        }
        debug!(
            devices = world.devices.len(),
            seed = world.config.seed,
            "Simulation world created"
        );
        Ok(world)
    }

    /// Adds a device; it joins at the current time.
    pub fn spawn_device(&mut self) -> Result<DeviceId, SimError> {
        let id = DeviceId(self.next_id);
        let now = self.context.now();
        let walk = RandomWalk::new(
            &mut self.mobility_rng,
            self.config.side,
            self.config.speed,
            now,
        );
        let first = self.schedule.first(&mut self.schedule_rng, now);

        let device = SimulatedDevice::new(id, &self.config.somewhere, walk, now, first)?;
        self.devices.insert(id, device);
        self.next_id += 1;
        debug!(device = %id, first_round = first, "Device joined");
        Ok(id)
    }

    /// Removes a device and its last message; neighbours are not notified.
    pub fn retire(&mut self, id: DeviceId) -> Result<(), SimError> {
        let device = self.devices.remove(&id).ok_or(SimError::UnknownDevice(id))?;
        self.board.remove(&id);
        let now = self.context.now();
        debug!(device = %id, time = now, lifetime = now - device.joined_at(), "Device retired");
        Ok(())
    }

    /// Time of the earliest pending round.
    pub fn next_round_time(&self) -> Option<f64> {
        self.devices
            .values()
            .map(SimulatedDevice::next_round)
            .min_by(f64::total_cmp)
    }

    /// Runs the next batch of rounds (every device firing at the earliest
    /// pending time). Returns false once no round is left before the end.
    pub fn step(&mut self) -> bool {
        let time = match self.next_round_time() {
            Some(t) if t <= self.config.end_time => t,
            _ => {
                self.log_until(|t, end| t <= end);
                return false;
            }
        };

        self.log_until(|t, _| t < time);
        self.context.advance_to(time);
        for device in self.devices.values_mut() {
            device.walk_mut().advance_to(&mut self.mobility_rng, time);
        }

        let batch: Vec<DeviceId> = self
            .devices
            .values()
            .filter(|d| d.next_round() == time)
            .map(SimulatedDevice::id)
            .collect();

        // Outboxes are committed only after the whole batch ran
        let mut pending = Vec::with_capacity(batch.len());
        for id in batch {
            let inbox = self.inbox_for(id, time);
            let input = self.truth.input(id, time);
            let interval = self.schedule.interval(&mut self.schedule_rng);

            if let Some(device) = self.devices.get_mut(&id) {
                let mut frame = RoundFrame::new(id, time, inbox);
                device.run_round(&mut frame, input);
                device.reschedule(interval);
                pending.push((id, frame.into_envelope()));
                self.rounds += 1;
            }
        }
        self.board.extend(pending);
        true
    }

    /// Runs every batch up to and including `time`.
    pub fn run_until(&mut self, time: f64) {
        while self.next_round_time().is_some_and(|t| t <= time) {
            if !self.step() {
                break;
            }
        }
    }

    /// Runs to the end and returns the logged rows.
    pub fn run(&mut self) -> &[SimRow] {
        while self.step() {}
        &self.rows
    }

    /// Messages `to` receives in a round at `time`.
    fn inbox_for(&mut self, to: DeviceId, time: f64) -> Vec<Envelope> {
        let Some(receiver) = self.devices.get(&to) else {
            return Vec::new();
        };
        let here = *receiver.position();

        let mut inbox = Vec::new();
        for (from, envelope) in &self.board {
            let Some(sender) = self.devices.get(from) else {
                continue;
            };
            let linked = self.config.topology.linked(
                *from,
                to,
                sender.position(),
                &here,
                self.config.comm_radius,
            );
            if *from == to || !linked {
                continue;
            }
            if time - envelope.sent_at > self.config.retain {
                self.stats.expired += 1;
                continue;
            }
            if !self.network.can_communicate(*from, to) {
                self.stats.blocked += 1;
                continue;
            }
            let loss = self.network.loss(*from, to).unwrap_or(self.config.link_loss);
            if loss > 0.0 && self.link_rng.gen::<f64>() < loss {
                self.stats.lost += 1;
                continue;
            }
            self.stats.delivered += 1;
            inbox.push(envelope.clone());
        }
        inbox
    }

    /// Logs every pending row whose time satisfies `due(row_time, end_time)`.
    fn log_until(&mut self, due: impl Fn(f64, f64) -> bool) {
        loop {
            let t = self.next_log as f64 * self.config.log_period;
            if t > self.config.end_time || !due(t, self.config.end_time) {
                break;
            }
            let reports = self.devices.values().filter_map(SimulatedDevice::last_report);
            let row = SimRow::aggregate(t, reports);
            self.rows.push(row);
            self.next_log += 1;
        }
    }

    /// Latest value of one strategy on every device that ran.
    pub fn values(&self, kind: StrategyKind) -> BTreeMap<DeviceId, bool> {
        self.devices
            .iter()
            .filter_map(|(id, d)| d.last_report().map(|r| (*id, r.value(kind))))
            .collect()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Network controller for fault injection.
    pub fn network(&self) -> &SimNetworkController {
        &self.network
    }

    pub fn rows(&self) -> &[SimRow] {
        &self.rows
    }

    pub fn take_rows(&mut self) -> Vec<SimRow> {
        std::mem::take(&mut self.rows)
    }

    pub fn device(&self, id: DeviceId) -> Option<&SimulatedDevice> {
        self.devices.get(&id)
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.context.now()
    }

    /// Device rounds run so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Returns the number of alive devices.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn delivery_stats(&self) -> DeliveryStats {
        self.stats
    }
}
