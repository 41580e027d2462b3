//! Simulated servers with bounded concurrency and stochastic service times.
//!
//! Each [`Server`] models a resource-constrained service point: up to
//! `capacity` tasks hold a slot at once, the rest wait in a FIFO admission
//! queue. Admission draws a service duration from the configured
//! [`ServiceTimeModel`]; a time-varying scenario may shift the mean between
//! admissions without disturbing tasks already in service.

use crate::monitor::Monitor;
use rand::Rng;
use rand_distr::{Distribution, Exp, Pareto};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Shape parameter for the Pareto service-time model.
pub const PARETO_ALPHA: f64 = 1.1;

/// Family of the per-task service duration distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTimeModel {
    /// Exponential with rate `1 / mean`.
    Exponential,
    /// Pareto with shape [`PARETO_ALPHA`], scaled so the distribution mean
    /// equals the configured mean: `scale = mean · (α − 1) / α`.
    Pareto,
    /// Always exactly the configured mean.
    Constant,
}

impl ServiceTimeModel {
    /// Draw one service duration (seconds) with the given mean.
    pub fn sample<R: Rng + ?Sized>(&self, mean: f64, rng: &mut R) -> f64 {
        match self {
            ServiceTimeModel::Exponential => {
                let exp = Exp::new(1.0 / mean).expect("service time validated positive");
                exp.sample(rng)
            }
            ServiceTimeModel::Pareto => {
                let scale = mean * (PARETO_ALPHA - 1.0) / PARETO_ALPHA;
                let pareto =
                    Pareto::new(scale, PARETO_ALPHA).expect("service time validated positive");
                pareto.sample(rng)
            }
            ServiceTimeModel::Constant => mean,
        }
    }
}

/// A task waiting in a server's admission queue.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub task_id: u64,
    pub shadow: bool,
    pub enqueue_us: u64,
}

/// A resource-constrained service point.
#[derive(Debug)]
pub struct Server {
    pub id: usize,
    capacity: u32,
    outstanding: u32,
    /// Current mean service time (seconds). Mutated by the time-varying
    /// drift process; only future admissions see the change.
    pub service_time: f64,
    /// The configured mean the drift process anchors to.
    pub base_service_time: f64,
    model: ServiceTimeModel,
    queue: VecDeque<QueuedTask>,
    /// Per-task time spent waiting for a slot (seconds).
    pub wait_monitor: Monitor,
    /// Per-task service duration drawn at admission (seconds).
    pub act_monitor: Monitor,
    /// Tasks whose service has finished.
    pub total_served: u64,
}

impl Server {
    /// Create a server.
    ///
    /// # Panics
    ///
    /// Panics on non-positive capacity; the configuration layer rejects this
    /// before construction is ever attempted.
    pub fn new(id: usize, capacity: u32, service_time: f64, model: ServiceTimeModel) -> Self {
        assert!(capacity >= 1, "server {id}: capacity must be >= 1");
        Self {
            id,
            capacity,
            outstanding: 0,
            service_time,
            base_service_time: service_time,
            model,
            queue: VecDeque::new(),
            wait_monitor: Monitor::new(format!("WaitMon{id}")),
            act_monitor: Monitor::new(format!("ActMon{id}")),
            total_served: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Tasks currently holding a concurrency slot.
    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    /// Whether a new arrival can be admitted immediately.
    pub fn has_slot(&self) -> bool {
        self.outstanding < self.capacity
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn enqueue(&mut self, queued: QueuedTask) {
        self.queue.push_back(queued);
    }

    pub fn dequeue(&mut self) -> Option<QueuedTask> {
        self.queue.pop_front()
    }

    /// Admit a task: take a slot, draw its service duration, and record the
    /// wait and activity samples. Returns the drawn duration in seconds.
    ///
    /// # Panics
    ///
    /// Panics if admission would exceed capacity; that is a scheduler defect,
    /// not load, and silently clamping it would corrupt the run.
    pub fn begin_service<R: Rng + ?Sized>(
        &mut self,
        waited_secs: f64,
        now_secs: f64,
        rng: &mut R,
    ) -> f64 {
        self.outstanding += 1;
        assert!(
            self.outstanding <= self.capacity,
            "server {}: outstanding {} exceeds capacity {}",
            self.id,
            self.outstanding,
            self.capacity,
        );
        let duration = self.model.sample(self.service_time, rng);
        self.wait_monitor.record(waited_secs, now_secs);
        self.act_monitor.record(duration, now_secs);
        duration
    }

    /// Release the slot held by a finished task.
    pub fn finish_service(&mut self) {
        assert!(
            self.outstanding > 0,
            "server {}: finish_service with no task in service",
            self.id,
        );
        self.outstanding -= 1;
        self.total_served += 1;
    }
}
