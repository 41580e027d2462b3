//! Request-originating clients: server selection, shadow reads, and
//! CUBIC-style backpressure.
//!
//! A [`Client`] owns its rate-control state and its view of the server pool
//! (per-server in-flight counts and latency estimates); the servers
//! themselves are shared, read-only references identified by index. The
//! sending window follows an additive-increase/multiplicative-decrease
//! schedule on the CUBIC growth curve; when backpressure is enabled and the
//! outstanding count reaches the window, new tasks wait in a FIFO queue
//! instead of being sent.

use crate::clock::us_to_secs;
use crate::monitor::Monitor;
use lbsim_policies::SelectionPolicy;
use std::collections::VecDeque;

/// Weight given to the previous estimate when folding in a new latency
/// observation.
const EWMA_DECAY: f64 = 0.9;

/// CUBIC congestion window over the client's in-flight request budget.
///
/// On a timeout the window shrinks multiplicatively (`w ← max(floor, w·β)`);
/// on success it climbs back along `w(t) = C·(t − K)³ + w_max` with
/// `K = ∛(w_max·(1 − β)/C)`, capped at `smax`. `hysteresis` is the minimum
/// spacing in seconds between consecutive window changes.
#[derive(Debug, Clone)]
pub struct CubicWindow {
    c: f64,
    smax: f64,
    beta: f64,
    floor: f64,
    hysteresis: f64,
    window: f64,
    w_max: f64,
    last_decrease_us: u64,
    last_change_us: u64,
}

impl CubicWindow {
    pub fn new(c: f64, smax: f64, beta: f64, floor: f64, hysteresis: f64) -> Self {
        let initial = floor.max(1.0).min(smax);
        Self {
            c,
            smax,
            beta,
            floor,
            hysteresis,
            window: initial,
            w_max: initial,
            last_decrease_us: 0,
            last_change_us: 0,
        }
    }

    pub fn window(&self) -> f64 {
        self.window
    }

    fn gated(&self, now_us: u64) -> bool {
        self.last_change_us != 0
            && us_to_secs(now_us - self.last_change_us) < self.hysteresis
    }

    /// A response arrived within its deadline: grow along the cubic curve.
    pub fn on_success(&mut self, now_us: u64) {
        if self.gated(now_us) {
            return;
        }
        let t = us_to_secs(now_us.saturating_sub(self.last_decrease_us));
        let k = (self.w_max * (1.0 - self.beta) / self.c).cbrt();
        let target = (self.c * (t - k).powi(3) + self.w_max).clamp(self.floor, self.smax);
        if target > self.window {
            self.window = target;
            self.last_change_us = now_us;
        }
    }

    /// A response deadline expired: back off multiplicatively.
    pub fn on_timeout(&mut self, now_us: u64) {
        if self.gated(now_us) {
            return;
        }
        self.w_max = self.window;
        self.window = (self.window * self.beta).max(self.floor);
        self.last_decrease_us = now_us;
        self.last_change_us = now_us;
    }
}

/// A request originator with a replaceable selection policy.
pub struct Client {
    pub id: usize,
    pub policy: Box<dyn SelectionPolicy>,
    /// Relative share of workload traffic directed at this client.
    pub demand_weight: f64,
    pub replication_factor: usize,
    pub backpressure: bool,
    pub shadow_read_ratio: f64,
    /// Deadline (seconds) after which an unanswered dispatch counts as a
    /// timeout for rate control. None disables timeout-driven decreases.
    pub response_deadline: Option<f64>,
    /// Trailing window (seconds) over which the receive rate is measured.
    pub rate_interval: f64,
    /// Requests in flight per server, indexed by server id.
    pending: Vec<u32>,
    /// EWMA of observed response times per server, seconds. Zero until the
    /// first observation.
    ewma_latency: Vec<f64>,
    /// Primary (non-shadow) tasks dispatched and not yet answered.
    outstanding: u32,
    pub window: CubicWindow,
    /// Tasks suspended by backpressure, FIFO.
    pub waiting: VecDeque<u64>,
    recent_receives: VecDeque<u64>,
    pub pending_monitor: Monitor,
    pub rate_monitor: Monitor,
    pub token_monitor: Monitor,
    pub receive_rate_monitor: Monitor,
    pub ed_score_monitor: Monitor,
}

impl Client {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: usize,
        num_servers: usize,
        policy: Box<dyn SelectionPolicy>,
        demand_weight: f64,
        replication_factor: usize,
        backpressure: bool,
        shadow_read_ratio: f64,
        response_deadline: Option<f64>,
        rate_interval: f64,
        window: CubicWindow,
    ) -> Self {
        Self {
            id,
            policy,
            demand_weight,
            replication_factor,
            backpressure,
            shadow_read_ratio,
            response_deadline,
            rate_interval,
            pending: vec![0; num_servers],
            ewma_latency: vec![0.0; num_servers],
            outstanding: 0,
            window,
            waiting: VecDeque::new(),
            recent_receives: VecDeque::new(),
            pending_monitor: Monitor::new(format!("PendingRequests{id}")),
            rate_monitor: Monitor::new(format!("Rate{id}")),
            token_monitor: Monitor::new(format!("Tokens{id}")),
            receive_rate_monitor: Monitor::new(format!("ReceiveRate{id}")),
            ed_score_monitor: Monitor::new(format!("EdScore{id}")),
        }
    }

    pub fn pending(&self, server_id: usize) -> u32 {
        self.pending[server_id]
    }

    pub fn ewma_latency(&self, server_id: usize) -> f64 {
        self.ewma_latency[server_id]
    }

    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    /// Whether a new task may be dispatched now. Without backpressure the
    /// answer is always yes; with it, the outstanding count must sit below
    /// the whole part of the current window.
    pub fn has_send_budget(&self) -> bool {
        !self.backpressure || (self.outstanding as f64) < self.window.window().floor()
    }

    /// Bookkeeping for a primary dispatch to `servers`.
    pub fn note_dispatch(&mut self, servers: &[usize], now_secs: f64) {
        self.outstanding += 1;
        for &s in servers {
            self.pending[s] += 1;
        }
        self.pending_monitor.record(self.outstanding as f64, now_secs);
        self.token_monitor.record(
            self.window.window() - self.outstanding as f64,
            now_secs,
        );
    }

    /// Fold a latency observation into the per-server estimate. Called for
    /// primary and shadow responses alike — freshness is the whole point of
    /// the shadow read.
    pub fn observe_latency(&mut self, server_id: usize, latency_secs: f64) {
        let prior = self.ewma_latency[server_id];
        self.ewma_latency[server_id] = if prior == 0.0 {
            latency_secs
        } else {
            EWMA_DECAY * prior + (1.0 - EWMA_DECAY) * latency_secs
        };
    }

    /// Bookkeeping for a primary response: release the pending slot and
    /// refresh the receive-rate series.
    pub fn note_receive(&mut self, server_id: usize, now_us: u64, now_secs: f64) {
        assert!(
            self.outstanding > 0 && self.pending[server_id] > 0,
            "client {}: response without a matching dispatch (server {})",
            self.id,
            server_id,
        );
        self.outstanding -= 1;
        self.pending[server_id] -= 1;
        self.pending_monitor.record(self.outstanding as f64, now_secs);

        let horizon = now_us.saturating_sub(crate::clock::secs_to_us(self.rate_interval));
        self.recent_receives.push_back(now_us);
        while self.recent_receives.front().is_some_and(|&t| t < horizon) {
            self.recent_receives.pop_front();
        }
        self.receive_rate_monitor.record(
            self.recent_receives.len() as f64 / self.rate_interval,
            now_secs,
        );
    }

    /// Release the pending slot of a losing replica whose response never
    /// travels back to the client.
    pub fn note_replica_settled(&mut self, server_id: usize) {
        assert!(
            self.pending[server_id] > 0,
            "client {}: replica settled without a matching dispatch (server {})",
            self.id,
            server_id,
        );
        self.pending[server_id] -= 1;
    }
}
