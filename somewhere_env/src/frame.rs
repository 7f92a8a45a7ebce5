//! Owned per-round substrate.

use crate::network::Substrate;
use crate::types::{DeviceId, Envelope, Message};

/// A single round of a single device: inbox in, outbox out.
///
/// The inbox is a value copy of the neighbours' messages, so the frame
/// owns everything it touches.
#[derive(Debug, Clone)]
pub struct RoundFrame {
    /// The device running this round
    local_id: DeviceId,

    /// Time of this round
    now: f64,

    /// Neighbour messages from their previous rounds
    inbox: Vec<Envelope>,

    /// Outbound message being built
    outbox: Message,

    /// Bytes written so far (monotonic)
    written: usize,
}

impl RoundFrame {
    /// Creates a frame for a round.
    ///
    /// Envelopes sent by `local_id` itself are dropped from the inbox.
    pub fn new(local_id: DeviceId, now: f64, inbox: Vec<Envelope>) -> Self {
        let inbox = inbox.into_iter().filter(|e| e.from != local_id).collect();
        Self {
            local_id,
            now,
            inbox,
            outbox: Message::new(),
            written: 0,
        }
    }

    /// Consumes the frame, returning the outbound envelope.
    pub fn into_envelope(self) -> Envelope {
        Envelope::new(self.local_id, self.now, self.outbox)
    }

    /// Returns the outbound message built so far.
    pub fn outbox(&self) -> &Message {
        &self.outbox
    }
}

impl Substrate for RoundFrame {
    fn local_id(&self) -> DeviceId {
        self.local_id
    }

    fn current_time(&self) -> f64 {
        self.now
    }

    fn inbox(&self) -> &[Envelope] {
        &self.inbox
    }

    fn publish(&mut self, slot: &str, payload: Vec<u8>) {
        self.written += self.outbox.insert(slot, payload);
    }

    fn msg_size(&self) -> usize {
        self.written
    }
}
