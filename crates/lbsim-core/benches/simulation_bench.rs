use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lbsim_core::config::SimConfig;

fn bench_config(num_requests: u64) -> SimConfig {
    SimConfig::from_str(&format!(
        r#"
[simulation]
name = "bench"
seed = 42
duration_secs = 100000.0

[servers]
count = 8
service_time = 1.0

[clients]
count = 4
selection_strategy = "expected_delay"

[workload]
model = "poisson"
num_requests = {}
utilization = 0.7
"#,
        num_requests
    ))
    .unwrap()
}

fn bench_simulation_1k(c: &mut Criterion) {
    let config = bench_config(1_000);

    c.bench_function("simulate_1k_requests_8_servers", |b| {
        b.iter(|| lbsim_core::run_experiment(black_box(&config)).unwrap())
    });
}

fn bench_simulation_10k(c: &mut Criterion) {
    let config = bench_config(10_000);

    c.bench_function("simulate_10k_requests_8_servers", |b| {
        b.iter(|| lbsim_core::run_experiment(black_box(&config)).unwrap())
    });
}

criterion_group!(benches, bench_simulation_1k, bench_simulation_10k);
criterion_main!(benches);
