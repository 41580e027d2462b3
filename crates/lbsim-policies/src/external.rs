//! Externally-injected selection policy.
//!
//! Bridges the simulator to an outside decision maker — typically a learned
//! routing policy. The callback receives a serializable [`PolicySnapshot`]
//! and returns a server index. The call happens synchronously inside the
//! client's dispatch turn: however expensive the backing computation is, it
//! cannot observe or advance virtual time.

use crate::traits::*;
use rand::{Rng, RngCore};
use serde::Serialize;

/// Everything an external decision maker sees for one selection.
#[derive(Debug, Clone, Serialize)]
pub struct PolicySnapshot {
    /// Virtual time of the decision, in seconds.
    pub now: f64,
    pub task: TaskInfo,
    pub servers: Vec<ServerSnapshot>,
    /// A uniform draw from the exploration stream, for epsilon-greedy style
    /// decisions on the far side of the boundary.
    pub exploration_hint: f64,
}

/// Decision callback: maps a snapshot to the index of the chosen server.
pub type DecisionFn = dyn FnMut(&PolicySnapshot) -> usize + Send + Sync;

/// A policy backed by an external decision function.
pub struct ExternalPolicy {
    name: String,
    decide: Box<DecisionFn>,
}

impl ExternalPolicy {
    pub fn new(name: impl Into<String>, decide: Box<DecisionFn>) -> Self {
        Self {
            name: name.into(),
            decide,
        }
    }
}

impl SelectionPolicy for ExternalPolicy {
    fn select(
        &mut self,
        task: &TaskInfo,
        servers: &[ServerSnapshot],
        clock: &dyn Clock,
        rng: &mut dyn RngCore,
    ) -> Selection {
        let snapshot = PolicySnapshot {
            now: clock.now(),
            task: task.clone(),
            servers: servers.to_vec(),
            exploration_hint: rng.gen::<f64>(),
        };
        let chosen = (self.decide)(&snapshot);
        assert!(
            chosen < servers.len(),
            "external policy '{}' returned server index {} out of range 0..{}",
            self.name,
            chosen,
            servers.len()
        );

        // Fill the rest of the ranking in id order so replicated dispatches
        // still have deterministic fallbacks.
        let mut ranked = Vec::with_capacity(servers.len());
        ranked.push(chosen);
        ranked.extend((0..servers.len()).filter(|&i| i != chosen));
        Selection {
            ranked,
            scores: None,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
