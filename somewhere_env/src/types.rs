//! Common types for the somewhere substrate.

use crate::error::EnvError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a device.
///
/// Ordered, because the knowledge-free election breaks ties by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "d{}", self.0)
    }
}

/// The outbound message of one device for one round.
///
/// Each strategy owns one or more named slots. Payloads are opaque bytes
/// that only the owning strategy knows how to decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    slots: BTreeMap<String, Vec<u8>>,
}

impl Message {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores raw bytes under a slot, returning the number of bytes added.
    ///
    /// Writing a slot twice replaces the payload; the cost of both writes
    /// is still counted by the frame's byte counter.
    pub fn insert(&mut self, slot: &str, payload: Vec<u8>) -> usize {
        let cost = slot.len() + payload.len();
        self.slots.insert(slot.to_string(), payload);
        cost
    }

    /// Returns the raw bytes of a slot.
    pub fn get(&self, slot: &str) -> Option<&[u8]> {
        self.slots.get(slot).map(|p| p.as_slice())
    }

    /// Decodes a slot. `None` if the slot is absent.
    pub fn decode<T: DeserializeOwned>(&self, slot: &str) -> Option<Result<T, EnvError>> {
        self.get(slot).map(|bytes| {
            serde_json::from_slice(bytes).map_err(|e| EnvError::serialization(slot, e))
        })
    }

    /// Encodes a value as a slot payload.
    pub fn encode<T: Serialize>(slot: &str, value: &T) -> Result<Vec<u8>, EnvError> {
        serde_json::to_vec(value).map_err(|e| EnvError::serialization(slot, e))
    }

    /// Returns the total size in bytes (slot names included).
    pub fn size(&self) -> usize {
        self.slots.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Returns true if no slot has been written.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates slot names.
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(|k| k.as_str())
    }
}

/// A message as delivered to a neighbour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sending device
    pub from: DeviceId,

    /// Sender's clock when the message was produced
    pub sent_at: f64,

    /// The message content (a value copy)
    pub message: Message,
}

impl Envelope {
    /// Creates a new envelope.
    pub fn new(from: DeviceId, sent_at: f64, message: Message) -> Self {
        Self {
            from,
            sent_at,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_roundtrip_slot() {
        let mut msg = Message::new();
        let payload = Message::encode("fastest/netstate", &vec![1u64, 2, 3]).unwrap();
        let cost = msg.insert("fastest/netstate", payload);

        assert_eq!(cost, msg.size());
        let decoded: Vec<u64> = msg.decode("fastest/netstate").unwrap().unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
        assert!(msg.decode::<Vec<u64>>("missing").is_none());
    }

    #[test]
    fn test_message_decode_wrong_type() {
        let mut msg = Message::new();
        msg.insert("slot", b"\"text\"".to_vec());

        let result = msg.decode::<u64>("slot").unwrap();
        assert!(matches!(result, Err(EnvError::SerializationError { .. })));
    }

    #[test]
    fn test_device_id_ordering() {
        assert!(DeviceId(0) < DeviceId(1));
        assert_eq!(DeviceId(7).to_string(), "d7");
    }
}
