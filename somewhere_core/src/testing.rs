//! Lockstep network for unit tests: fixed graph, every device fires at
//! t = 1, 2, 3, ... and reads its neighbours' messages from the round before.

use somewhere_env::{DeviceId, Envelope, RoundFrame};
use std::collections::BTreeMap;

pub(crate) struct Lockstep {
    adjacency: BTreeMap<u64, Vec<u64>>,
    board: BTreeMap<u64, Envelope>,
    time: f64,
}

impl Lockstep {
    /// Undirected graph on devices 0..n with the given edges.
    pub fn new(n: u64, edges: &[(u64, u64)]) -> Self {
        let mut adjacency: BTreeMap<u64, Vec<u64>> = (0..n).map(|i| (i, Vec::new())).collect();
        for &(a, b) in edges {
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
        }
        Self {
            adjacency,
            board: BTreeMap::new(),
            time: 0.0,
        }
    }

    /// Path 0 - 1 - ... - (n-1).
    pub fn line(n: u64) -> Self {
        let edges: Vec<_> = (1..n).map(|i| (i - 1, i)).collect();
        Self::new(n, &edges)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Runs one synchronous round; `f` evaluates a device on its frame.
    pub fn round<T>(&mut self, mut f: impl FnMut(DeviceId, &mut RoundFrame) -> T) -> Vec<T> {
        self.time += 1.0;
        let mut outputs = Vec::new();
        let mut next = BTreeMap::new();
        for (id, neighbours) in &self.adjacency {
            let inbox = neighbours
                .iter()
                .filter_map(|n| self.board.get(n).cloned())
                .collect();
            let mut frame = RoundFrame::new(DeviceId(*id), self.time, inbox);
            outputs.push(f(DeviceId(*id), &mut frame));
            next.insert(*id, frame.into_envelope());
        }
        self.board = next;
        outputs
    }
}
