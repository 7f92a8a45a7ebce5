//! Ground-truth strategy.

use crate::error::CoreError;
use crate::strategy::{RoundInput, Somewhere, StrategyKind};
use somewhere_env::Substrate;

/// Returns the externally supplied truth unchanged.
///
/// Sends nothing; it exists so the others can be scored against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl Oracle {
    /// Creates the oracle.
    pub fn new() -> Self {
        Self
    }
}

impl Somewhere for Oracle {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Oracle
    }

    fn evaluate<S: Substrate>(
        &mut self,
        _substrate: &mut S,
        input: &RoundInput,
    ) -> Result<bool, CoreError> {
        Ok(input.global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use somewhere_env::{DeviceId, RoundFrame};

    #[test]
    fn test_identity_and_silence() {
        let mut oracle = Oracle::new();
        for global in [false, true] {
            let mut frame = RoundFrame::new(DeviceId(3), 1.0, Vec::new());
            let input = RoundInput { trigger: false, global };

            assert_eq!(oracle.evaluate(&mut frame, &input).unwrap(), global);
            assert_eq!(frame.msg_size(), 0);
        }
    }
}
