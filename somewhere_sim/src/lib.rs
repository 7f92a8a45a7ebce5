//! Somewhere Deterministic Simulator
//!
//! This crate plays the network around the somewhere strategies: a
//! controlled environment where every device runs `somewhere_core::Device`
//! and everything else is simulated deterministically.
//!
//! # Core Principle: Seeded Rounds
//!
//! All sources of non-determinism are controlled:
//! - **Time**: a virtual clock jumps from one batch of rounds to the next
//! - **Network**: neighbours by distance or fixed graph, with partitions,
//!   link loss and message expiry
//! - **Randomness**: every stream derived from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (virtual clock) + RoundSchedule           │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │       │                        │                            │
//! │  ┌────▼────┐              ┌────▼────┐                       │
//! │  │ Device  │◄── board ───►│ Device  │     ...               │
//! │  │   #0    │  (Topology,  │   #1    │                       │
//! │  └─────────┘   faults)    └─────────┘                       │
//! │       ▲                        ▲                            │
//! │  ┌────┴────────────────────────┴────┐                       │
//! │  │          GroundTruth              │                       │
//! │  │       (event window)              │                       │
//! │  └───────────────────────────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use somewhere_sim::{SimWorld, SimConfig};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     devices: 20,
//!     ..Default::default()
//! };
//!
//! let mut world = SimWorld::new(config)?;
//! for row in world.run() {
//!     println!("{:?}", row);
//! }
//! ```

mod agent;
mod context;
mod error;
mod exporter;
mod mobility;
mod network;
mod oracle;
mod runner;
mod schedule;
mod topology;
mod world;
pub mod batch;
pub mod scenarios;

pub use agent::SimulatedDevice;
pub use context::{SimContext, Stream};
pub use error::SimError;
pub use exporter::{SimExport, SimRow, StrategyStats};
pub use mobility::RandomWalk;
pub use network::SimNetworkController;
pub use oracle::GroundTruth;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use schedule::RoundSchedule;
pub use topology::Topology;
pub use world::{DeliveryStats, SimConfig, SimWorld};
