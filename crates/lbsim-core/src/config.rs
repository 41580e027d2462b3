//! TOML configuration parsing for lbsim.
//!
//! Defines the complete configuration schema for simulation runs — server
//! pool, client pool, network latency model, workload shape — and validates
//! every parameter combination before a run is constructed. Anything out of
//! range fails here, never mid-run.

use crate::server::ServiceTimeModel;
use crate::workload::ArrivalModel;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub simulation: SimulationSection,
    pub servers: ServersSection,
    #[serde(default)]
    pub clients: ClientsSection,
    #[serde(default)]
    pub network: NetworkSection,
    pub workload: WorkloadSection,
}

/// General simulation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Human-readable name for this run.
    #[serde(default = "default_sim_name")]
    pub name: String,
    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Virtual-time horizon of the run, in seconds.
    #[serde(default = "default_duration")]
    pub duration_secs: f64,
}

fn default_sim_name() -> String {
    "experiment".to_string()
}

fn default_seed() -> u64 {
    42
}

fn default_duration() -> f64 {
    500.0
}

/// How the server pool's service times are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Every server gets the configured service time.
    Base,
    /// Server `i` gets `(i + 1) · service_time`.
    MultipleServiceTimes,
    /// A fraction of servers is slowed; the remaining capacity is
    /// redistributed so the pool's total service rate is preserved.
    Heterogeneous,
    /// Service times drift over time via a periodic per-server process.
    TimeVarying,
}

/// Server pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServersSection {
    /// Number of servers.
    pub count: usize,
    /// Concurrency slots per server.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Mean service time in seconds.
    #[serde(default = "default_service_time")]
    pub service_time: f64,
    /// Family of the service time distribution.
    #[serde(default = "default_service_time_model")]
    pub service_time_model: ServiceTimeModel,
    #[serde(default = "default_scenario")]
    pub scenario: Scenario,
    /// Heterogeneous: fraction of servers that are slow.
    #[serde(default)]
    pub slow_server_fraction: f64,
    /// Heterogeneous: rate multiplier applied to the slow servers.
    #[serde(default)]
    pub slow_server_slowness: f64,
    /// Time-varying: seconds between service-time flips.
    #[serde(default)]
    pub interval_param: f64,
    /// Time-varying: slowdown divisor applied on a flip.
    #[serde(default)]
    pub time_varying_drift: f64,
}

fn default_concurrency() -> u32 {
    1
}

fn default_service_time() -> f64 {
    1.0
}

fn default_service_time_model() -> ServiceTimeModel {
    ServiceTimeModel::Exponential
}

fn default_scenario() -> Scenario {
    Scenario::Base
}

/// Client pool configuration, including the CUBIC rate-control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientsSection {
    #[serde(default = "default_client_count")]
    pub count: usize,
    /// Name of the selection policy; must be registered.
    #[serde(default = "default_selection_strategy")]
    pub selection_strategy: String,
    /// Servers to fan each task out to.
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,
    /// Suspend new tasks once the in-flight budget is exhausted.
    #[serde(default)]
    pub backpressure: bool,
    /// Probability of an auxiliary dispatch to a non-selected server.
    #[serde(default = "default_shadow_read_ratio")]
    pub shadow_read_ratio: f64,
    /// Trailing window (seconds) for receive-rate measurement.
    #[serde(default = "default_rate_interval")]
    pub rate_interval: f64,
    #[serde(default = "default_cubic_c")]
    pub cubic_c: f64,
    #[serde(default = "default_cubic_smax")]
    pub cubic_smax: f64,
    #[serde(default = "default_cubic_beta")]
    pub cubic_beta: f64,
    /// Lower bound the window never drops below.
    #[serde(default = "default_window_floor")]
    pub window_floor: f64,
    /// Minimum spacing (seconds) between window changes.
    #[serde(default = "default_hysteresis_factor")]
    pub hysteresis_factor: f64,
    /// Seconds after which an unanswered dispatch counts as a timeout.
    #[serde(default)]
    pub response_deadline: Option<f64>,
    /// Share of total demand concentrated on the heavy clients.
    #[serde(default)]
    pub demand_skew: f64,
    /// Fraction of clients that are heavy.
    #[serde(default)]
    pub high_demand_fraction: f64,
}

fn default_client_count() -> usize {
    1
}

fn default_selection_strategy() -> String {
    "expected_delay".to_string()
}

fn default_replication_factor() -> usize {
    1
}

fn default_shadow_read_ratio() -> f64 {
    0.1
}

fn default_rate_interval() -> f64 {
    10.0
}

fn default_cubic_c() -> f64 {
    0.000004
}

fn default_cubic_smax() -> f64 {
    10.0
}

fn default_cubic_beta() -> f64 {
    0.2
}

fn default_window_floor() -> f64 {
    1.0
}

fn default_hysteresis_factor() -> f64 {
    2.0
}

impl Default for ClientsSection {
    fn default() -> Self {
        Self {
            count: default_client_count(),
            selection_strategy: default_selection_strategy(),
            replication_factor: default_replication_factor(),
            backpressure: false,
            shadow_read_ratio: default_shadow_read_ratio(),
            rate_interval: default_rate_interval(),
            cubic_c: default_cubic_c(),
            cubic_smax: default_cubic_smax(),
            cubic_beta: default_cubic_beta(),
            window_floor: default_window_floor(),
            hysteresis_factor: default_hysteresis_factor(),
            response_deadline: None,
            demand_skew: 0.0,
            high_demand_fraction: 0.0,
        }
    }
}

/// Network latency model: each hop costs `base + Normal(mu, sigma)` seconds,
/// clamped at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSection {
    #[serde(default = "default_latency_base")]
    pub latency_base: f64,
    #[serde(default = "default_latency_mu")]
    pub latency_mu: f64,
    #[serde(default)]
    pub latency_sigma: f64,
}

fn default_latency_base() -> f64 {
    0.960
}

fn default_latency_mu() -> f64 {
    0.040
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            latency_base: default_latency_base(),
            latency_mu: default_latency_mu(),
            latency_sigma: 0.0,
        }
    }
}

/// Workload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadSection {
    #[serde(default = "default_arrival_model")]
    pub model: ArrivalModel,
    /// Total tasks across all generators.
    #[serde(default = "default_num_requests")]
    pub num_requests: u64,
    /// Number of workload generator processes splitting the request budget.
    #[serde(default = "default_generators")]
    pub generators: u64,
    /// Target utilization of the server pool; sets the inter-arrival time.
    #[serde(default = "default_utilization")]
    pub utilization: f64,
}

fn default_arrival_model() -> ArrivalModel {
    ArrivalModel::Poisson
}

fn default_num_requests() -> u64 {
    100
}

fn default_generators() -> u64 {
    1
}

fn default_utilization() -> f64 {
    0.9
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency. Every violation here would either
    /// corrupt a run or silently change its meaning, so all of them are
    /// rejected before any simulation state exists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Validation(msg));

        if self.servers.count == 0 {
            return fail("servers.count must be > 0".into());
        }
        if self.servers.concurrency == 0 {
            return fail("servers.concurrency must be > 0".into());
        }
        if self.servers.service_time <= 0.0 {
            return fail("servers.service_time must be > 0".into());
        }
        match self.servers.scenario {
            Scenario::Heterogeneous => {
                let f = self.servers.slow_server_fraction;
                let s = self.servers.slow_server_slowness;
                if !(0.0..1.0).contains(&f) {
                    return fail("slow_server_fraction must be in [0, 1)".into());
                }
                if !(0.0..1.0).contains(&s) {
                    return fail("slow_server_slowness must be in [0, 1)".into());
                }
                if (s == 0.0) != (f == 0.0) {
                    return fail(
                        "slow_server_fraction and slow_server_slowness must be zero or nonzero together"
                            .into(),
                    );
                }
                if f > 0.0 && (f * self.servers.count as f64) < 1.0 {
                    return fail(
                        "slow_server_fraction selects no server at this pool size".into(),
                    );
                }
            }
            Scenario::TimeVarying => {
                if self.servers.interval_param <= 0.0 {
                    return fail("interval_param must be > 0 for the time_varying scenario".into());
                }
                if !(0.0..=1.0).contains(&self.servers.time_varying_drift)
                    || self.servers.time_varying_drift == 0.0
                {
                    return fail("time_varying_drift must be in (0, 1]".into());
                }
            }
            Scenario::Base | Scenario::MultipleServiceTimes => {}
        }

        if self.clients.count == 0 {
            return fail("clients.count must be > 0".into());
        }
        if lbsim_policies::policy_by_name(&self.clients.selection_strategy).is_none() {
            return fail(format!(
                "unknown selection_strategy '{}'; available: {:?}",
                self.clients.selection_strategy,
                lbsim_policies::available_policies(),
            ));
        }
        if self.clients.replication_factor == 0
            || self.clients.replication_factor > self.servers.count
        {
            return fail(format!(
                "replication_factor must be in 1..={}",
                self.servers.count
            ));
        }
        if !(0.0..=1.0).contains(&self.clients.shadow_read_ratio) {
            return fail("shadow_read_ratio must be in [0, 1]".into());
        }
        if self.clients.rate_interval <= 0.0 {
            return fail("rate_interval must be > 0".into());
        }
        if self.clients.cubic_c <= 0.0 {
            return fail("cubic_c must be > 0".into());
        }
        if self.clients.cubic_smax <= 0.0 {
            return fail("cubic_smax must be > 0".into());
        }
        if !(0.0..=1.0).contains(&self.clients.cubic_beta) || self.clients.cubic_beta == 0.0 {
            return fail("cubic_beta must be in (0, 1]".into());
        }
        if self.clients.window_floor <= 0.0 || self.clients.window_floor > self.clients.cubic_smax
        {
            return fail("window_floor must be in (0, cubic_smax]".into());
        }
        if self.clients.hysteresis_factor < 0.0 {
            return fail("hysteresis_factor must be >= 0".into());
        }
        if let Some(deadline) = self.clients.response_deadline {
            if deadline <= 0.0 {
                return fail("response_deadline must be > 0 when set".into());
            }
        }
        let skew = self.clients.demand_skew;
        let hdf = self.clients.high_demand_fraction;
        if !(0.0..1.0).contains(&skew) {
            return fail("demand_skew must be in [0, 1)".into());
        }
        if !(0.0..1.0).contains(&hdf) {
            return fail("high_demand_fraction must be in [0, 1)".into());
        }
        if (skew == 0.0) != (hdf == 0.0) {
            return fail(
                "demand_skew and high_demand_fraction must be zero or nonzero together".into(),
            );
        }
        if hdf > 0.0 && (hdf * self.clients.count as f64) < 1.0 {
            return fail("high_demand_fraction selects no client at this pool size".into());
        }

        if self.network.latency_base < 0.0 || self.network.latency_sigma < 0.0 {
            return fail("network latency parameters must be non-negative".into());
        }

        if self.workload.num_requests == 0 {
            return fail("workload.num_requests must be > 0".into());
        }
        if self.workload.generators == 0 {
            return fail("workload.generators must be > 0".into());
        }
        if self.workload.num_requests % self.workload.generators != 0 {
            return fail("workload.generators must divide num_requests evenly".into());
        }
        if self.workload.utilization <= 0.0 {
            return fail("workload.utilization must be > 0".into());
        }
        Ok(())
    }

    /// Per-server mean service times for the configured scenario.
    ///
    /// The heterogeneous layout is shuffled with the supplied stream so slow
    /// servers land in random positions, reproducibly.
    pub fn server_service_times<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        let n = self.servers.count;
        let base = self.servers.service_time;
        match self.servers.scenario {
            Scenario::Base | Scenario::TimeVarying => vec![base; n],
            Scenario::MultipleServiceTimes => {
                (0..n).map(|i| (i + 1) as f64 * base).collect()
            }
            Scenario::Heterogeneous => {
                let mut rates = self.heterogeneous_rates();
                rates.shuffle(rng);
                rates.into_iter().map(|r| 1.0 / r).collect()
            }
        }
    }

    /// Per-server service rates for the heterogeneous scenario: a fraction of
    /// servers runs slowed by `slow_server_slowness`, and the leftover rate
    /// is spread over the fast servers so the pool total is unchanged.
    fn heterogeneous_rates(&self) -> Vec<f64> {
        let n = self.servers.count;
        let per_server_rate =
            self.servers.concurrency as f64 / self.servers.service_time;
        if self.servers.slow_server_fraction == 0.0 {
            return vec![per_server_rate; n];
        }
        let num_slow = (self.servers.slow_server_fraction * n as f64) as usize;
        let slow_rate = per_server_rate * self.servers.slow_server_slowness;
        let total_rate = per_server_rate * n as f64;
        let fast_rate =
            (total_rate - slow_rate * num_slow as f64) / (n - num_slow) as f64;

        let mut rates = vec![slow_rate; num_slow];
        rates.extend(std::iter::repeat(fast_rate).take(n - num_slow));
        rates
    }

    /// Total service rate of the pool, used to derive the arrival rate.
    pub fn total_service_rate(&self) -> f64 {
        match self.servers.scenario {
            Scenario::Heterogeneous => self.heterogeneous_rates().iter().sum(),
            _ => {
                self.servers.count as f64 * self.servers.concurrency as f64
                    / self.servers.service_time
            }
        }
    }

    /// Mean inter-arrival time that achieves the configured utilization.
    pub fn inter_arrival_time(&self) -> f64 {
        1.0 / (self.workload.utilization * self.total_service_rate())
    }

    /// Per-client demand weights derived from the skew parameters: heavy
    /// clients share `demand_skew` of the traffic, light clients the rest.
    pub fn client_weights(&self) -> Vec<f64> {
        let n = self.clients.count;
        let base = 1.0;
        let skew = self.clients.demand_skew;
        let hdf = self.clients.high_demand_fraction;
        if hdf == 0.0 {
            return vec![base; n];
        }
        let num_heavy = (hdf * n as f64) as usize;
        let heavy = base * skew / hdf;
        let light = base * (1.0 - skew) / (1.0 - hdf);
        let mut weights = vec![heavy; num_heavy];
        weights.extend(std::iter::repeat(light).take(n - num_heavy));
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const SAMPLE_CONFIG: &str = r#"
[simulation]
name = "test-run"
seed = 123
duration_secs = 500.0

[servers]
count = 5
concurrency = 1
service_time = 1.0
service_time_model = "exponential"

[clients]
count = 2
selection_strategy = "expected_delay"

[workload]
model = "poisson"
num_requests = 100
utilization = 0.5
"#;

    #[test]
    fn test_parse_config() {
        let config = SimConfig::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.simulation.name, "test-run");
        assert_eq!(config.simulation.seed, 123);
        assert_eq!(config.servers.count, 5);
        assert_eq!(config.clients.count, 2);
        assert_eq!(config.workload.num_requests, 100);
    }

    #[test]
    fn test_defaults() {
        let toml = r#"
[simulation]

[servers]
count = 3

[workload]
"#;
        let config = SimConfig::from_str(toml).unwrap();
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.servers.concurrency, 1);
        assert_eq!(config.clients.selection_strategy, "expected_delay");
        assert!((config.network.latency_base - 0.96).abs() < 1e-12);
        assert_eq!(config.workload.generators, 1);
    }

    #[test]
    fn test_validation_zero_servers() {
        let toml = "[simulation]\n[servers]\ncount = 0\n[workload]\n";
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_validation_zero_concurrency() {
        let toml = "[simulation]\n[servers]\ncount = 2\nconcurrency = 0\n[workload]\n";
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_validation_unknown_strategy() {
        let toml = r#"
[simulation]
[servers]
count = 2
[clients]
selection_strategy = "definitely_not_registered"
[workload]
"#;
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_validation_skew_without_fraction() {
        let toml = r#"
[simulation]
[servers]
count = 2
[clients]
count = 4
demand_skew = 0.5
high_demand_fraction = 0.0
[workload]
"#;
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_validation_skew_out_of_range() {
        let toml = r#"
[simulation]
[servers]
count = 2
[clients]
count = 4
demand_skew = 1.0
high_demand_fraction = 0.5
[workload]
"#;
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_validation_replication_exceeds_pool() {
        let toml = r#"
[simulation]
[servers]
count = 2
[clients]
replication_factor = 3
[workload]
"#;
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_validation_zero_utilization() {
        let toml = r#"
[simulation]
[servers]
count = 2
[workload]
utilization = 0.0
"#;
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_validation_generators_must_divide_requests() {
        let toml = r#"
[simulation]
[servers]
count = 2
[workload]
num_requests = 100
generators = 3
"#;
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_validation_time_varying_needs_params() {
        let toml = r#"
[simulation]
[servers]
count = 2
scenario = "time_varying"
[workload]
"#;
        assert!(SimConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_inter_arrival_from_utilization() {
        let config = SimConfig::from_str(SAMPLE_CONFIG).unwrap();
        // 5 servers · concurrency 1 / service_time 1.0 = 5 rps pool rate;
        // utilization 0.5 → 2.5 rps arrivals → 0.4 s gaps.
        assert!((config.inter_arrival_time() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_multiple_service_times_layout() {
        let toml = r#"
[simulation]
[servers]
count = 3
service_time = 2.0
scenario = "multiple_service_times"
[workload]
"#;
        let config = SimConfig::from_str(toml).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(config.server_service_times(&mut rng), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_heterogeneous_preserves_total_rate() {
        let toml = r#"
[simulation]
[servers]
count = 4
service_time = 1.0
scenario = "heterogeneous"
slow_server_fraction = 0.5
slow_server_slowness = 0.5
[workload]
"#;
        let config = SimConfig::from_str(toml).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let times = config.server_service_times(&mut rng);
        let total_rate: f64 = times.iter().map(|t| 1.0 / t).sum();
        assert!(
            (total_rate - 4.0).abs() < 1e-9,
            "pool rate {total_rate} should stay at 4.0"
        );
        // Two slow servers at half rate, two fast ones picking up the slack.
        let slow = times.iter().filter(|&&t| (t - 2.0).abs() < 1e-9).count();
        assert_eq!(slow, 2);
    }

    #[test]
    fn test_client_weights_skewed() {
        let toml = r#"
[simulation]
[servers]
count = 2
[clients]
count = 4
demand_skew = 0.6
high_demand_fraction = 0.25
[workload]
"#;
        let config = SimConfig::from_str(toml).unwrap();
        let weights = config.client_weights();
        assert_eq!(weights.len(), 4);
        assert!((weights[0] - 2.4).abs() < 1e-12, "heavy weight {}", weights[0]);
        for &w in &weights[1..] {
            assert!((w - (0.4 / 0.75)).abs() < 1e-12, "light weight {w}");
        }
        // Total weight stays at the pool size, as with uniform demand.
        let total: f64 = weights.iter().sum();
        assert!((total - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_client_weights_uniform() {
        let config = SimConfig::from_str(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.client_weights(), vec![1.0, 1.0]);
    }
}
