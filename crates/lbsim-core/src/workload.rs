//! Workload generators: the arrival process feeding the client pool.
//!
//! A generator emits a fixed number of tasks, assigning each to a client by
//! weighted random choice (probability proportional to the client's demand
//! weight, via a cumulative-sum scan over one uniform draw) and suspending
//! between tasks for an inter-arrival interval drawn from the configured
//! arrival model.

use rand::{Rng, RngCore};
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

/// Arrival process shaping the inter-task gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrivalModel {
    /// Poisson-distributed gap with mean equal to the inter-arrival
    /// parameter.
    Poisson,
    /// Fixed gap equal to the inter-arrival parameter.
    Constant,
}

/// Emits tasks until its request budget runs out.
#[derive(Debug)]
pub struct WorkloadGenerator {
    pub id: usize,
    remaining: u64,
    model: ArrivalModel,
    inter_arrival: f64,
    weights: Vec<f64>,
    total_weight: f64,
}

impl WorkloadGenerator {
    pub fn new(
        id: usize,
        model: ArrivalModel,
        inter_arrival: f64,
        num_requests: u64,
        client_weights: Vec<f64>,
    ) -> Self {
        let total_weight = client_weights.iter().sum();
        Self {
            id,
            remaining: num_requests,
            model,
            inter_arrival,
            weights: client_weights,
            total_weight,
        }
    }

    /// Tasks still to be emitted; the generator terminates at zero.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Consume one unit of the request budget.
    pub fn take_one(&mut self) {
        assert!(self.remaining > 0, "workload {} over-emitted", self.id);
        self.remaining -= 1;
    }

    /// Pick a client index with probability `weight / total_weight`.
    pub fn pick_client<R: RngCore>(&self, rng: &mut R) -> usize {
        let r = rng.gen::<f64>() * self.total_weight;
        let mut upto = 0.0;
        for (i, &w) in self.weights.iter().enumerate() {
            upto += w;
            if upto > r {
                return i;
            }
        }
        // Float accumulation can land exactly on the boundary.
        self.weights.len() - 1
    }

    /// Draw the gap before the next task, in seconds.
    pub fn next_delay<R: RngCore>(&self, rng: &mut R) -> f64 {
        match self.model {
            ArrivalModel::Constant => self.inter_arrival,
            ArrivalModel::Poisson => {
                let poisson =
                    Poisson::new(self.inter_arrival).expect("inter-arrival validated positive");
                poisson.sample(rng)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_budget_counts_down_to_terminal_zero() {
        let mut wl = WorkloadGenerator::new(0, ArrivalModel::Constant, 1.0, 3, vec![1.0]);
        assert_eq!(wl.remaining(), 3);
        wl.take_one();
        wl.take_one();
        wl.take_one();
        assert_eq!(wl.remaining(), 0);
    }

    #[test]
    #[should_panic(expected = "over-emitted")]
    fn test_over_emission_panics() {
        let mut wl = WorkloadGenerator::new(0, ArrivalModel::Constant, 1.0, 0, vec![1.0]);
        wl.take_one();
    }

    #[test]
    fn test_constant_delay() {
        let wl = WorkloadGenerator::new(0, ArrivalModel::Constant, 0.25, 1, vec![1.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert_eq!(wl.next_delay(&mut rng), 0.25);
        assert_eq!(wl.next_delay(&mut rng), 0.25);
    }

    #[test]
    fn test_poisson_delay_mean() {
        let wl = WorkloadGenerator::new(0, ArrivalModel::Poisson, 4.0, 1, vec![1.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let n = 20_000;
        let total: f64 = (0..n).map(|_| wl.next_delay(&mut rng)).sum();
        let mean = total / n as f64;
        assert!((mean - 4.0).abs() < 0.1, "mean {mean} far from 4.0");
    }

    #[test]
    fn test_weighted_choice_frequencies_match_weights() {
        // Weights 1:2:5 over 10_000 draws should converge on the weight
        // shares within a few percent.
        let weights = vec![1.0, 2.0, 5.0];
        let wl = WorkloadGenerator::new(0, ArrivalModel::Constant, 1.0, 1, weights.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(17);

        let draws = 10_000usize;
        let mut counts = [0u32; 3];
        for _ in 0..draws {
            counts[wl.pick_client(&mut rng)] += 1;
        }

        let total: f64 = weights.iter().sum();
        for (i, &w) in weights.iter().enumerate() {
            let expected = w / total;
            let observed = counts[i] as f64 / draws as f64;
            assert!(
                (observed - expected).abs() < 0.02,
                "client {i}: observed {observed:.3}, expected {expected:.3}"
            );
        }
    }

    #[test]
    fn test_weighted_choice_single_client() {
        let wl = WorkloadGenerator::new(0, ArrivalModel::Constant, 1.0, 1, vec![3.5]);
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..100 {
            assert_eq!(wl.pick_client(&mut rng), 0);
        }
    }
}
