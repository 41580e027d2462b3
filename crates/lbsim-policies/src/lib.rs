//! Built-in server selection policies for lbsim.
//!
//! This crate provides the [`SelectionPolicy`] trait and several built-in
//! implementations for request load balancing:
//!
//! | Policy | Strategy | Best for |
//! |--------|----------|----------|
//! | [`RoundRobin`] | Cycle through servers | Homogeneous pools |
//! | [`RandomChoice`] | Uniform random | No-information baseline |
//! | [`WeightedRandom`] | Random, biased to idle servers | Avoiding herds |
//! | [`ExpectedDelay`] | Lowest `(1+pending)·latency` | Heterogeneous pools |
//! | [`ExternalPolicy`] | Injected decision callback | Learned policies |

pub mod expected_delay;
pub mod external;
pub mod random_choice;
pub mod round_robin;
pub mod traits;
pub mod weighted_random;

pub use expected_delay::ExpectedDelay;
pub use external::{ExternalPolicy, PolicySnapshot};
pub use random_choice::RandomChoice;
pub use round_robin::RoundRobin;
pub use traits::*;
pub use weighted_random::WeightedRandom;

/// Create a built-in selection policy by name.
///
/// [`ExternalPolicy`] is not constructible here — it needs a decision
/// callback and is injected by the caller instead.
pub fn policy_by_name(name: &str) -> Option<Box<dyn SelectionPolicy>> {
    match name {
        "round_robin" => Some(Box::new(RoundRobin::new())),
        "random" => Some(Box::new(RandomChoice::new())),
        "weighted_random" => Some(Box::new(WeightedRandom::new())),
        "expected_delay" => Some(Box::new(ExpectedDelay::new())),
        _ => None,
    }
}

/// List all available built-in policy names.
pub fn available_policies() -> Vec<&'static str> {
    vec!["round_robin", "random", "weighted_random", "expected_delay"]
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Helper to create N idle test server snapshots.
    pub fn make_servers(n: usize) -> Vec<ServerSnapshot> {
        (0..n)
            .map(|i| ServerSnapshot {
                id: i,
                pending: 0,
                queue_length: 0,
                outstanding: 0,
                ewma_latency: 1.0,
            })
            .collect()
    }

    pub fn dummy_task() -> TaskInfo {
        TaskInfo {
            id: 0,
            created_at: 0.0,
        }
    }

    pub struct FixedClock(pub f64);

    impl Clock for FixedClock {
        fn now(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_policy_by_name() {
        for name in available_policies() {
            assert!(policy_by_name(name).is_some(), "Missing: {}", name);
        }
        assert!(policy_by_name("nonexistent").is_none());
    }

    #[test]
    fn test_available_policies_not_empty() {
        assert!(!available_policies().is_empty());
    }
}
