//! lbsim — deterministic discrete-event simulator for request routing.
//!
//! The crate models a pool of clients dispatching tasks to a pool of servers
//! under configurable load-balancing policies, network latency, and
//! service-time distributions, producing latency and throughput traces.
//! Selection policies from `lbsim-policies` are plugged in to pick servers
//! for each task; an external decision maker (e.g. a learned policy) can be
//! injected through the same interface.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌────────────┐     ┌───────────┐
//! │ Workload │────▶│   Engine   │────▶│  Monitors │
//! │ Generator│     │  (Events)  │     │ (Latency) │
//! └──────────┘     └─────┬──────┘     └───────────┘
//!                        │
//!                 ┌──────┴──────┐
//!                 │   Clients   │──── selection policy / rate control
//!                 └──────┬──────┘
//!                        │  network delay hops
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!    ┌──────────┐  ┌──────────┐  ┌──────────┐
//!    │ Server 0 │  │ Server 1 │  │ Server N │
//!    │  Queue   │  │  Queue   │  │  Queue   │
//!    └──────────┘  └──────────┘  └──────────┘
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod engine;
pub mod monitor;
pub mod report;
pub mod server;
pub mod task;
pub mod workload;

// Re-export key types for convenience.
pub use client::{Client, CubicWindow};
pub use clock::SimClock;
pub use config::{ConfigError, Scenario, SimConfig};
pub use engine::{RandomStreams, SimEvent, Simulation};
pub use monitor::Monitor;
pub use report::{format_comparison_table, format_table, Percentiles, RunReport, RunSummary};
pub use server::{Server, ServiceTimeModel};
pub use task::{Completion, CompletionSignal, SignalError, Task};
pub use workload::{ArrivalModel, WorkloadGenerator};

use lbsim_policies::SelectionPolicy;
use thiserror::Error;

/// Errors surfaced to the experiment driver.
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The run ended with fewer completions than requested: the configured
    /// duration is too small for the request volume. Never silently
    /// truncated.
    #[error("run completed {completed} of {expected} requests; simulation duration is too small for the configured load")]
    CompletionMismatch { expected: u64, completed: u64 },
}

/// Run a complete experiment, building each client's policy from the
/// configured strategy name.
pub fn run_experiment(config: &SimConfig) -> Result<RunReport, SimError> {
    let strategy = config.clients.selection_strategy.clone();
    run_experiment_with(config, |_| {
        lbsim_policies::policy_by_name(&strategy)
            .expect("strategy name validated by the configuration layer")
    })
}

/// Run a complete experiment with caller-supplied policies — the injection
/// point for externally driven (e.g. learned) decision makers. The factory
/// is called once per client id.
pub fn run_experiment_with<F>(config: &SimConfig, make_policy: F) -> Result<RunReport, SimError>
where
    F: FnMut(usize) -> Box<dyn SelectionPolicy>,
{
    config.validate()?;
    let mut make_policy = make_policy;
    let policies: Vec<Box<dyn SelectionPolicy>> =
        (0..config.clients.count).map(&mut make_policy).collect();
    let policy_name = policies
        .first()
        .map(|p| p.name().to_string())
        .unwrap_or_default();

    let mut sim = Simulation::new(config, policies);
    sim.run(config.simulation.duration_secs);

    let completed = sim.completed();
    if completed != config.workload.num_requests {
        return Err(SimError::CompletionMismatch {
            expected: config.workload.num_requests,
            completed,
        });
    }
    Ok(RunReport::from_simulation(
        sim,
        &policy_name,
        config.workload.num_requests,
    ))
}

/// Rerun one configuration across several registered policies.
pub fn compare_policies(
    config: &SimConfig,
    policy_names: &[&str],
) -> Result<Vec<RunReport>, SimError> {
    policy_names
        .iter()
        .map(|name| {
            let mut cfg = config.clone();
            cfg.clients.selection_strategy = name.to_string();
            run_experiment(&cfg)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimConfig {
        SimConfig::from_str(
            r#"
[simulation]
name = "lib-test"
seed = 42
duration_secs = 2000.0

[servers]
count = 3
service_time = 1.0

[clients]
count = 1
selection_strategy = "round_robin"
shadow_read_ratio = 0.0

[workload]
model = "constant"
num_requests = 30
utilization = 0.5
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_run_experiment_completes_all_requests() {
        let report = run_experiment(&small_config()).unwrap();
        assert_eq!(report.summary.completed, 30);
        assert_eq!(report.latency.len(), 30);
        assert_eq!(report.summary.policy, "round_robin");
    }

    #[test]
    fn test_run_experiment_with_injected_policy() {
        let report = run_experiment_with(&small_config(), |_| {
            Box::new(lbsim_policies::ExternalPolicy::new(
                "always_zero",
                Box::new(|_snapshot| 0),
            ))
        })
        .unwrap();
        assert_eq!(report.summary.policy, "always_zero");
        // Everything lands on server 0.
        assert_eq!(report.summary.servers[0].served, 30);
        assert_eq!(report.summary.servers[1].served, 0);
    }

    #[test]
    fn test_completion_mismatch_on_short_duration() {
        let mut config = small_config();
        config.simulation.duration_secs = 3.0;
        match run_experiment(&config) {
            Err(SimError::CompletionMismatch {
                expected,
                completed,
            }) => {
                assert_eq!(expected, 30);
                assert!(completed < 30);
            }
            other => panic!("expected CompletionMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_compare_policies_runs_each() {
        let reports = compare_policies(&small_config(), &["round_robin", "random"]).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].summary.policy, "round_robin");
        assert_eq!(reports[1].summary.policy, "random");
    }
}
