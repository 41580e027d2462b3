//! lbsim CLI — run deterministic load-balancing experiments.

use clap::{Parser, Subcommand};
use lbsim_core::config::SimConfig;
use lbsim_core::report;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lbsim",
    about = "Deterministic discrete-event simulator for request routing",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation with a single selection policy.
    Run {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Override the configured selection policy.
        #[arg(short, long)]
        policy: Option<String>,
        /// Override the configured random seed.
        #[arg(short, long)]
        seed: Option<u64>,
        /// Write the run summary as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare multiple policies on the same configuration.
    Compare {
        /// Path to TOML configuration file.
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated list of policy names (default: all built-ins).
        #[arg(short = 'P', long, value_delimiter = ',')]
        policies: Vec<String>,
        /// Write all run summaries as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List available selection policies.
    ListPolicies,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            policy,
            seed,
            output,
        } => {
            let mut sim_config = load_config(&config);
            if let Some(policy) = policy {
                sim_config.clients.selection_strategy = policy;
            }
            if let Some(seed) = seed {
                sim_config.simulation.seed = seed;
            }
            if let Err(e) = sim_config.validate() {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }

            let result = lbsim_core::run_experiment(&sim_config).unwrap_or_else(|e| {
                eprintln!("Run failed: {}", e);
                std::process::exit(1);
            });
            println!("{}", report::format_table(&result.summary));

            if let Some(output_path) = output {
                write_json(&output_path, &result.summary);
            }
        }
        Commands::Compare {
            config,
            policies,
            output,
        } => {
            let sim_config = load_config(&config);
            let names: Vec<&str> = if policies.is_empty() {
                lbsim_policies::available_policies()
            } else {
                policies.iter().map(|s| s.as_str()).collect()
            };

            let results = lbsim_core::compare_policies(&sim_config, &names).unwrap_or_else(|e| {
                eprintln!("Comparison failed: {}", e);
                std::process::exit(1);
            });
            let summaries: Vec<_> = results.iter().map(|r| r.summary.clone()).collect();
            println!("{}", report::format_comparison_table(&summaries));

            for summary in &summaries {
                println!("{}", report::format_table(summary));
            }

            if let Some(output_path) = output {
                write_json(&output_path, &summaries);
            }
        }
        Commands::ListPolicies => {
            println!("Available selection policies:");
            for name in lbsim_policies::available_policies() {
                println!("  - {}", name);
            }
        }
    }
}

fn load_config(path: &PathBuf) -> SimConfig {
    SimConfig::from_file(path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    })
}

fn write_json<T: serde::Serialize>(path: &PathBuf, value: &T) {
    let json = serde_json::to_string_pretty(value).expect("summaries always serialize");
    std::fs::write(path, json).unwrap_or_else(|e| {
        eprintln!("Error writing output: {}", e);
        std::process::exit(1);
    });
    println!("Results written to {}", path.display());
}
