//! Expected-delay selection policy.
//!
//! Ranks servers by an expected-delay score combining the client's pending
//! request count against each server with its historical latency estimate.
//! This is the classic adaptive replica-selection heuristic: servers that are
//! both lightly loaded and historically fast sort first.

use crate::traits::*;
use rand::RngCore;

/// Expected-delay selector. Score for server `s` is
/// `(1 + pending_s) * ewma_latency_s`; lowest score wins.
pub struct ExpectedDelay;

impl ExpectedDelay {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExpectedDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for ExpectedDelay {
    fn select(
        &mut self,
        _task: &TaskInfo,
        servers: &[ServerSnapshot],
        _clock: &dyn Clock,
        _rng: &mut dyn RngCore,
    ) -> Selection {
        let (ranked, scores) =
            rank_by(servers, |s| (1.0 + s.pending as f64) * s.ewma_latency);
        Selection {
            ranked,
            scores: Some(scores),
        }
    }

    fn name(&self) -> &str {
        "expected_delay"
    }
}
