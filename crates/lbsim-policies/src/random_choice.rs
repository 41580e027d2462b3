//! Uniform random selection policy.
//!
//! Picks a server uniformly at random from the exploration stream. Useful as
//! a no-information baseline and for generating diverse training traces.

use crate::traits::*;
use rand::seq::SliceRandom;
use rand::RngCore;

/// Uniform random selector.
pub struct RandomChoice;

impl RandomChoice {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomChoice {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionPolicy for RandomChoice {
    fn select(
        &mut self,
        _task: &TaskInfo,
        servers: &[ServerSnapshot],
        _clock: &dyn Clock,
        rng: &mut dyn RngCore,
    ) -> Selection {
        let mut ranked: Vec<usize> = (0..servers.len()).collect();
        ranked.shuffle(rng);
        Selection {
            ranked,
            scores: None,
        }
    }

    fn name(&self) -> &str {
        "random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{dummy_task, make_servers, FixedClock};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_covers_all_servers() {
        let mut policy = RandomChoice::new();
        let servers = make_servers(4);
        let clock = FixedClock(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut counts = [0u32; 4];
        for _ in 0..1000 {
            let sel = policy.select(&dummy_task(), &servers, &clock, &mut rng);
            counts[sel.ranked[0]] += 1;
        }
        for &c in &counts {
            assert!(c > 150, "uniform draw should hit every server: {:?}", counts);
        }
    }

    #[test]
    fn test_random_is_reproducible_per_seed() {
        let servers = make_servers(5);
        let clock = FixedClock(0.0);

        let mut a = RandomChoice::new();
        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let picks_a: Vec<usize> = (0..50)
            .map(|_| a.select(&dummy_task(), &servers, &clock, &mut rng_a).ranked[0])
            .collect();

        let mut b = RandomChoice::new();
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);
        let picks_b: Vec<usize> = (0..50)
            .map(|_| b.select(&dummy_task(), &servers, &clock, &mut rng_b).ranked[0])
            .collect();

        assert_eq!(picks_a, picks_b);
    }
}
