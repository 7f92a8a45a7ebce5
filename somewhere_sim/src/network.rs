//! Fault injection for the simulated network.

use somewhere_env::{DeviceId, NetworkController};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Network controller for fault injection.
///
/// Cloning shares the underlying state, so a scenario can keep a handle
/// while the world consults it on every delivery.
#[derive(Debug, Clone, Default)]
pub struct SimNetworkController {
    /// Per-link message loss rate (0.0 - 1.0)
    link_loss: Arc<Mutex<HashMap<(DeviceId, DeviceId), f64>>>,

    /// Active partitions (devices that cannot communicate)
    partitions: Arc<Mutex<Vec<(Vec<DeviceId>, Vec<DeviceId>)>>>,
}

/// Locks a mutex, recovering the data of a poisoned one.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimNetworkController {
    /// Creates a new network controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks if two devices can communicate (not partitioned).
    pub fn can_communicate(&self, from: DeviceId, to: DeviceId) -> bool {
        let partitions = lock(&self.partitions);

        for (group_a, group_b) in partitions.iter() {
            let from_in_a = group_a.contains(&from);
            let from_in_b = group_b.contains(&from);
            let to_in_a = group_a.contains(&to);
            let to_in_b = group_b.contains(&to);

            // Partitioned if one is in A and other in B (or vice versa)
            if (from_in_a && to_in_b) || (from_in_b && to_in_a) {
                return false;
            }
        }

        true
    }

    /// Loss rate of a link, if one was set.
    pub fn loss(&self, from: DeviceId, to: DeviceId) -> Option<f64> {
        lock(&self.link_loss).get(&(from, to)).copied()
    }

    /// Number of active partitions.
    pub fn partition_count(&self) -> usize {
        lock(&self.partitions).len()
    }
}

impl NetworkController for SimNetworkController {
    fn partition(&self, group_a: &[DeviceId], group_b: &[DeviceId]) {
        lock(&self.partitions).push((group_a.to_vec(), group_b.to_vec()));
    }

    fn heal_all(&self) {
        lock(&self.partitions).clear();
    }

    fn set_link_loss(&self, from: DeviceId, to: DeviceId, loss_rate: f64) {
        lock(&self.link_loss).insert((from, to), loss_rate.clamp(0.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_controller_partition() {
        let controller = SimNetworkController::new();

        let a = DeviceId(1);
        let b = DeviceId(2);
        let c = DeviceId(3);

        // Initially all can communicate
        assert!(controller.can_communicate(a, b));
        assert!(controller.can_communicate(a, c));
        assert!(controller.can_communicate(b, c));

        // Partition: {a} vs {b, c}
        controller.partition(&[a], &[b, c]);

        assert!(!controller.can_communicate(a, b));
        assert!(!controller.can_communicate(c, a));
        assert!(controller.can_communicate(b, c));

        controller.heal_all();
        assert!(controller.can_communicate(a, b));
        assert_eq!(controller.partition_count(), 0);
    }

    #[test]
    fn test_link_loss_is_directed_and_clamped() {
        let controller = SimNetworkController::new();
        let a = DeviceId(1);
        let b = DeviceId(2);

        assert_eq!(controller.loss(a, b), None);

        controller.set_link_loss(a, b, 1.5);
        assert_eq!(controller.loss(a, b), Some(1.0));

        // Reverse direction is separate
        assert_eq!(controller.loss(b, a), None);
    }

    #[test]
    fn test_clones_share_state() {
        let controller = SimNetworkController::new();
        let handle = controller.clone();

        handle.partition(&[DeviceId(0)], &[DeviceId(1)]);
        assert!(!controller.can_communicate(DeviceId(0), DeviceId(1)));
    }
}
