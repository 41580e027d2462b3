//! Round-robin selection policy.
//!
//! The simplest strategy: cycles through servers in id order, ignoring load
//! and latency. Provides good fairness on homogeneous pools and serves as the
//! baseline every other policy is measured against.

use crate::traits::*;
use rand::RngCore;

/// Round-robin selector.
pub struct RoundRobin {
    /// Index of the last server we selected (None on first call).
    last_index: Option<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self { last_index: None }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for RoundRobin {
    fn select(
        &mut self,
        _task: &TaskInfo,
        servers: &[ServerSnapshot],
        _clock: &dyn Clock,
        _rng: &mut dyn RngCore,
    ) -> Selection {
        let n = servers.len();
        let start = match self.last_index {
            Some(last) => (last + 1) % n,
            None => 0,
        };
        self.last_index = Some(start);

        // Preference order continues the rotation so replicated dispatches
        // also spread around the ring.
        let ranked: Vec<usize> = (0..n).map(|k| (start + k) % n).collect();
        Selection {
            ranked,
            scores: None,
        }
    }

    fn name(&self) -> &str {
        "round_robin"
    }
}
