//! Selection policy trait definitions.
//!
//! All selection policies implement the [`SelectionPolicy`] trait, which
//! receives task information and per-server snapshots to rank the servers a
//! client should dispatch to.

use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Read-only snapshot of one server's state, provided to selection policies.
///
/// This is the policy crate's view of a server — a blend of client-local
/// knowledge (requests this client has in flight against the server, its
/// latency estimate) and server-side truth (queue length, admitted count).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSnapshot {
    pub id: usize,
    /// Requests the selecting client has dispatched to this server and not
    /// yet seen answered.
    pub pending: u32,
    /// Tasks waiting in the server's admission queue.
    pub queue_length: u32,
    /// Tasks currently holding a concurrency slot on the server.
    pub outstanding: u32,
    /// Exponentially weighted average of response times observed by the
    /// selecting client, in seconds.
    pub ewma_latency: f64,
}

/// Information about the task being dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: u64,
    /// Virtual time at which the task was created, in seconds.
    pub created_at: f64,
}

/// Virtual simulation clock interface for policies.
pub trait Clock {
    /// Current virtual time in seconds.
    fn now(&self) -> f64;
}

/// Result of a selection: servers in preference order, best first.
///
/// The client takes the first `replication_factor` entries. Policies that
/// compute a numeric rank may expose it through `scores` (indexed by server
/// id) for monitoring and offline analysis.
#[derive(Debug, Clone)]
pub struct Selection {
    pub ranked: Vec<usize>,
    pub scores: Option<Vec<f64>>,
}

impl Selection {
    /// A selection with a single preferred server and no scores.
    pub fn single(index: usize) -> Self {
        Self {
            ranked: vec![index],
            scores: None,
        }
    }
}

/// The core selection policy trait.
///
/// Implement this trait to create custom load balancing strategies. The
/// client calls [`select`](SelectionPolicy::select) once per task, inside the
/// dispatch turn; the call must return synchronously — it is a plain function
/// call within the current event turn and cannot suspend the simulation.
pub trait SelectionPolicy: Send + Sync {
    /// Rank the candidate servers for one task, best first.
    ///
    /// `rng` is the simulation's exploration stream; policies that randomize
    /// must draw from it (and only it) so runs stay reproducible.
    fn select(
        &mut self,
        task: &TaskInfo,
        servers: &[ServerSnapshot],
        clock: &dyn Clock,
        rng: &mut dyn RngCore,
    ) -> Selection;

    /// Human-readable name for reports.
    fn name(&self) -> &str;
}

/// Rank server indices ascending by a score function, ties broken by id.
pub fn rank_by<F>(servers: &[ServerSnapshot], mut score: F) -> (Vec<usize>, Vec<f64>)
where
    F: FnMut(&ServerSnapshot) -> f64,
{
    let scores: Vec<f64> = servers.iter().map(&mut score).collect();
    let mut order: Vec<usize> = (0..servers.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
    (order, scores)
}
