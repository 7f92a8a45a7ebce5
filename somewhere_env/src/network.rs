//! Substrate abstraction for somewhere devices.

use crate::error::EnvError;
use crate::types::{DeviceId, Envelope, Message};
use serde::Serialize;

/// Abstraction for one device's view of the network during one round.
///
/// # Implementations
///
/// - **Standalone**: [`crate::RoundFrame`], an owned inbox/outbox pair
/// - **Simulation**: `somewhere_sim::SimWorld` builds one frame per firing device
///
/// # Round Flow
///
/// ```text
/// round r-1                  substrate                    round r
///   |-- publish(slot) --------->|                            |
///   |                           |-- [neighbours, retain] --->|
///   |                           |                            |-- inbox() -> envelopes
/// ```
///
/// The inbox only ever holds messages committed before the current round
/// started, so a device never observes same-round peer state.
pub trait Substrate {
    /// Returns this device's ID.
    fn local_id(&self) -> DeviceId;

    /// Returns the current time on this device.
    fn current_time(&self) -> f64;

    /// Previous-round messages of the current neighbours (self excluded).
    fn inbox(&self) -> &[Envelope];

    /// Writes a slot of the outbound message.
    fn publish(&mut self, slot: &str, payload: Vec<u8>);

    /// Returns the running count of bytes published this round.
    ///
    /// Never decreases within a round.
    fn msg_size(&self) -> usize;

    /// Serializes a value into a slot of the outbound message.
    fn put<T: Serialize>(&mut self, slot: &str, value: &T) -> Result<(), EnvError>
    where
        Self: Sized,
    {
        let payload = Message::encode(slot, value)?;
        self.publish(slot, payload);
        Ok(())
    }
}

/// Fault injection for simulated networks.
///
/// Allows injecting partitions and lossy links.
pub trait NetworkController {
    /// Creates a network partition between two device sets.
    fn partition(&self, group_a: &[DeviceId], group_b: &[DeviceId]);

    /// Heals all partitions.
    fn heal_all(&self);

    /// Sets message loss probability for a link (0.0 - 1.0).
    fn set_link_loss(&self, from: DeviceId, to: DeviceId, loss_rate: f64);
}
