//! Load-weighted random selection policy.
//!
//! Draws a server with probability inversely proportional to its pending
//! request count, so lightly loaded servers are favored without the herd
//! behavior of always picking the minimum.

use crate::traits::*;
use rand::{Rng, RngCore};

/// Weighted random selector. Weight for server `s` is `1 / (1 + pending_s)`.
pub struct WeightedRandom;

impl WeightedRandom {
    pub fn new() -> Self {
        Self
    }

    fn weight(server: &ServerSnapshot) -> f64 {
        1.0 / (1.0 + server.pending as f64)
    }
}

impl Default for WeightedRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for WeightedRandom {
    fn select(
        &mut self,
        _task: &TaskInfo,
        servers: &[ServerSnapshot],
        _clock: &dyn Clock,
        rng: &mut dyn RngCore,
    ) -> Selection {
        // Repeated cumulative-sum draws without replacement, so the full
        // ranking is weight-ordered and replicated dispatches stay diverse.
        let mut remaining: Vec<usize> = (0..servers.len()).collect();
        let mut ranked = Vec::with_capacity(servers.len());
        while !remaining.is_empty() {
            let total: f64 = remaining.iter().map(|&i| Self::weight(&servers[i])).sum();
            let r = rng.gen::<f64>() * total;
            let mut upto = 0.0;
            let mut picked = remaining.len() - 1;
            for (pos, &i) in remaining.iter().enumerate() {
                upto += Self::weight(&servers[i]);
                if upto > r {
                    picked = pos;
                    break;
                }
            }
            ranked.push(remaining.remove(picked));
        }
        Selection {
            ranked,
            scores: None,
        }
    }

    fn name(&self) -> &str {
        "weighted_random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{dummy_task, make_servers, FixedClock};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_weighted_random_prefers_idle_servers() {
        let mut policy = WeightedRandom::new();
        let mut servers = make_servers(2);
        servers[0].pending = 9; // weight 0.1
        servers[1].pending = 0; // weight 1.0
        let clock = FixedClock(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let mut idle_picks = 0u32;
        for _ in 0..1000 {
            let sel = policy.select(&dummy_task(), &servers, &clock, &mut rng);
            if sel.ranked[0] == 1 {
                idle_picks += 1;
            }
        }
        // Expected frequency 1.0 / 1.1 ≈ 0.909.
        assert!(
            idle_picks > 850,
            "idle server should dominate, got {idle_picks}/1000"
        );
    }

    #[test]
    fn test_weighted_random_ranking_is_complete() {
        let mut policy = WeightedRandom::new();
        let servers = make_servers(5);
        let clock = FixedClock(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let sel = policy.select(&dummy_task(), &servers, &clock, &mut rng);
        let mut seen = sel.ranked.clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
