//! "Eventually in the past" operator.

/// True once the flag has been true here or at any device whose past
/// reached this one through messages.
///
/// The value is `flag || previous || any neighbour's previous value`, so a
/// single true spreads through the network and is never forgotten. Callers
/// bound its memory by replacing instances (see `Replicated`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PastEventually {
    value: bool,
}

impl PastEventually {
    /// Creates a fresh instance (false).
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs one round.
    pub fn step(&mut self, flag: bool, neighbours: impl IntoIterator<Item = bool>) -> bool {
        self.value = flag || self.value || neighbours.into_iter().any(|v| v);
        self.value
    }

    /// Value after the latest round.
    pub fn value(&self) -> bool {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latches_local_truth() {
        let mut ep = PastEventually::new();
        assert!(!ep.step(false, []));
        assert!(ep.step(true, []));
        assert!(ep.step(false, []));
        assert!(ep.value());
    }

    #[test]
    fn test_adopts_neighbour_truth() {
        let mut ep = PastEventually::new();
        assert!(!ep.step(false, [false, false]));
        assert!(ep.step(false, [false, true]));
    }
}
