//! Run output: monitors handed to external reporting code, plus an
//! aggregated summary with table renderers for the CLI.
//!
//! The core does not persist anything; consumers iterate the monitors or
//! serialize the [`RunSummary`].

use crate::engine::Simulation;
use crate::monitor::{percentile_sorted, Monitor};
use serde::{Deserialize, Serialize};

/// Percentile values for a latency distribution, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Percentiles {
    /// Compute percentiles from a slice of values.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                p50: 0.0,
                p75: 0.0,
                p90: 0.0,
                p95: 0.0,
                p99: 0.0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;

        Self {
            p50: percentile_sorted(&sorted, 50.0),
            p75: percentile_sorted(&sorted, 75.0),
            p90: percentile_sorted(&sorted, 90.0),
            p95: percentile_sorted(&sorted, 95.0),
            p99: percentile_sorted(&sorted, 99.0),
            min: sorted[0],
            max: sorted[n - 1],
            mean,
        }
    }
}

/// Per-server aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSummary {
    pub id: usize,
    /// Mean time tasks spent waiting for a slot, seconds.
    pub wait_mean: f64,
    /// Mean drawn service duration, seconds.
    pub act_mean: f64,
    pub served: u64,
}

/// Per-client aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: usize,
    pub mean_pending: f64,
    pub mean_window: f64,
}

/// Aggregated results for an entire run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Selection policy name.
    pub policy: String,
    /// Virtual time at which the run stopped, seconds.
    pub duration_secs: f64,
    pub requested: u64,
    pub completed: u64,
    pub latency: Percentiles,
    pub throughput_rps: f64,
    pub servers: Vec<ServerSummary>,
    pub clients: Vec<ClientSummary>,
    pub events_processed: u64,
}

/// Per-server monitors exposed to external reporting code.
#[derive(Debug, Clone)]
pub struct ServerMonitors {
    pub id: usize,
    pub wait: Monitor,
    pub act: Monitor,
}

/// Per-client monitors exposed to external reporting code.
#[derive(Debug, Clone)]
pub struct ClientMonitors {
    pub id: usize,
    pub pending: Monitor,
    pub rate: Monitor,
    pub tokens: Monitor,
    pub receive_rate: Monitor,
    pub ed_score: Monitor,
}

/// Everything a finished run hands to its consumers: the summary plus the
/// raw monitors for training and plotting collaborators.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub latency: Monitor,
    pub servers: Vec<ServerMonitors>,
    pub clients: Vec<ClientMonitors>,
}

impl RunReport {
    /// Consume a finished simulation and aggregate its monitors.
    pub fn from_simulation(sim: Simulation, policy: &str, requested: u64) -> Self {
        let duration_secs = sim.now_secs();
        let completed = sim.completed();
        let events_processed = sim.events_processed;

        let server_summaries: Vec<ServerSummary> = sim
            .servers
            .iter()
            .map(|s| ServerSummary {
                id: s.id,
                wait_mean: s.wait_monitor.mean(),
                act_mean: s.act_monitor.mean(),
                served: s.total_served,
            })
            .collect();
        let client_summaries: Vec<ClientSummary> = sim
            .clients
            .iter()
            .map(|c| ClientSummary {
                id: c.id,
                mean_pending: c.pending_monitor.mean(),
                mean_window: c.rate_monitor.mean(),
            })
            .collect();

        let latency = sim.latency_monitor;
        let summary = RunSummary {
            policy: policy.to_string(),
            duration_secs,
            requested,
            completed,
            latency: Percentiles::from_values(&latency.values()),
            throughput_rps: if duration_secs > 0.0 {
                completed as f64 / duration_secs
            } else {
                0.0
            },
            servers: server_summaries,
            clients: client_summaries,
            events_processed,
        };

        let servers = sim
            .servers
            .into_iter()
            .map(|s| ServerMonitors {
                id: s.id,
                wait: s.wait_monitor,
                act: s.act_monitor,
            })
            .collect();
        let clients = sim
            .clients
            .into_iter()
            .map(|c| ClientMonitors {
                id: c.id,
                pending: c.pending_monitor,
                rate: c.rate_monitor,
                tokens: c.token_monitor,
                receive_rate: c.receive_rate_monitor,
                ed_score: c.ed_score_monitor,
            })
            .collect();

        Self {
            summary,
            latency,
            servers,
            clients,
        }
    }
}

/// Format a run summary as a pretty-printed table string.
pub fn format_table(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<70}\n",
        format!("  {} Results  ", summary.policy)
    ));
    out.push_str(&format!(
        "  Duration: {:.1}s | Requests: {}/{} completed | Events: {}\n",
        summary.duration_secs, summary.completed, summary.requested, summary.events_processed,
    ));
    out.push_str(&format!("{:-<70}\n", "  Latency (s)  "));
    out.push_str(&format!(
        "  P50={:>8.3}  P90={:>8.3}  P99={:>8.3}  Mean={:>8.3}\n",
        summary.latency.p50, summary.latency.p90, summary.latency.p99, summary.latency.mean,
    ));
    out.push_str(&format!(
        "  Min={:>8.3}  Max={:>8.3}  Throughput: {:.2} req/s\n",
        summary.latency.min, summary.latency.max, summary.throughput_rps,
    ));
    out.push_str(&format!("{:-<70}\n", "  Servers  "));
    for s in &summary.servers {
        out.push_str(&format!(
            "  Server {:<3} wait mean={:>8.3}s  act mean={:>8.3}s  served={}\n",
            s.id, s.wait_mean, s.act_mean, s.served,
        ));
    }
    out.push_str(&format!("{:-<70}\n", "  Clients  "));
    for c in &summary.clients {
        out.push_str(&format!(
            "  Client {:<3} mean pending={:>6.2}  mean window={:>6.2}\n",
            c.id, c.mean_pending, c.mean_window,
        ));
    }
    out.push_str(&format!("{:=<70}\n", ""));
    out
}

/// Format a comparison table of multiple run summaries.
pub fn format_comparison_table(results: &[RunSummary]) -> String {
    if results.is_empty() {
        return String::from("No results to compare.\n");
    }

    let mut out = String::new();
    out.push_str(&format!("\n{:=<78}\n", "  Policy Comparison  "));
    out.push_str(&format!(
        "{:<18} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
        "Policy", "P50 (s)", "P90 (s)", "P99 (s)", "Mean (s)", "Req/s", "Completed"
    ));
    out.push_str(&format!("{:-<78}\n", ""));

    for r in results {
        out.push_str(&format!(
            "{:<18} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.2} {:>9}\n",
            r.policy,
            r.latency.p50,
            r.latency.p90,
            r.latency.p99,
            r.latency.mean,
            r.throughput_rps,
            r.completed,
        ));
    }
    out.push_str(&format!("{:=<78}\n", ""));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles_empty() {
        let p = Percentiles::from_values(&[]);
        assert_eq!(p.p50, 0.0);
        assert_eq!(p.mean, 0.0);
    }

    #[test]
    fn test_percentiles_single() {
        let p = Percentiles::from_values(&[42.0]);
        assert_eq!(p.p50, 42.0);
        assert_eq!(p.p99, 42.0);
        assert_eq!(p.mean, 42.0);
    }

    #[test]
    fn test_percentiles_distribution() {
        let values: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let p = Percentiles::from_values(&values);
        assert!((p.p50 - 50.0).abs() < 2.0);
        assert!((p.p99 - 99.0).abs() < 2.0);
        assert_eq!(p.min, 1.0);
        assert_eq!(p.max, 100.0);
    }

    fn sample_summary() -> RunSummary {
        RunSummary {
            policy: "round_robin".to_string(),
            duration_secs: 100.0,
            requested: 50,
            completed: 50,
            latency: Percentiles::from_values(&[1.0, 2.0, 3.0]),
            throughput_rps: 0.5,
            servers: vec![ServerSummary {
                id: 0,
                wait_mean: 0.1,
                act_mean: 1.0,
                served: 50,
            }],
            clients: vec![ClientSummary {
                id: 0,
                mean_pending: 1.5,
                mean_window: 4.0,
            }],
            events_processed: 500,
        }
    }

    #[test]
    fn test_format_table_no_panic() {
        let table = format_table(&sample_summary());
        assert!(table.contains("round_robin"));
        assert!(table.contains("Server 0"));
        assert!(table.contains("Client 0"));
    }

    #[test]
    fn test_format_comparison_table() {
        let table = format_comparison_table(&[sample_summary(), sample_summary()]);
        assert!(table.contains("Policy Comparison"));
        assert!(table.lines().count() > 5);
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let json = serde_json::to_string(&sample_summary()).unwrap();
        assert!(json.contains("\"policy\":\"round_robin\""));
    }
}
