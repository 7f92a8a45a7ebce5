//! Somewhere Network Substrate Layer
//!
//! This crate provides the "Sans-IO" seam between the somewhere strategies
//! and whatever delivers their messages: the deterministic simulator in
//! `somewhere_sim`, or any other round-based network.
//!
//! # Core Concept: Rounds over Slots
//!
//! Each round a device sees:
//! - The current time
//! - The messages its current neighbours sent in their previous round
//! - An outbound message it fills in, one named slot per strategy
//!
//! Messages cross devices only as bytes, so no state is ever shared between
//! devices. A running byte counter lets callers attribute message cost to
//! whatever ran between two readings.
//!
//! # Example
//!
//! ```ignore
//! use somewhere_env::{RoundFrame, Substrate, DeviceId};
//!
//! let mut frame = RoundFrame::new(DeviceId(0), 1.0, inbox);
//! let before = frame.msg_size();
//! frame.put("baseline/hops", &Some(0u32))?;
//! let cost = frame.msg_size() - before;
//! ```

mod error;
mod frame;
mod network;
mod types;

pub use error::EnvError;
pub use frame::RoundFrame;
pub use network::{NetworkController, Substrate};
pub use types::{DeviceId, Envelope, Message};
