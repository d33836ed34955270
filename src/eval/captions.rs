//! Smoke-test caption pool.

use rand::seq::SliceRandom;
use rand::Rng;

/// Fixed prompt pool paired against sampled images
pub const CAPTIONS: &[&str] = &[
    "The early bird might get the worm, but the second mouse gets the cheese.",
    "Don't count your chickens before they hatch... or your omelet will be disappointing.",
    "If at first you don't succeed, try hiding all evidence that you ever tried.",
    "Experience is a great teacher, but she gives really tough exams.",
    "My imaginary friends think I'm the best listener.",
    "A clear conscience is often a sign of a bad memory.",
    "Today was a total waste of makeup.",
    "My level of sarcasm has gotten to the point where I don't even know if I'm kidding or not.",
    "If you think nobody cares if you're alive, try missing a couple of payments.",
    "Apparently, rock bottom has a basement.",
];

/// Pick one caption uniformly at random
pub fn random_caption<R: Rng>(rng: &mut R) -> &'static str {
    CAPTIONS.choose(rng).copied().unwrap_or(CAPTIONS[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_caption_comes_from_pool() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let caption = random_caption(&mut rng);
            assert!(CAPTIONS.contains(&caption));
        }
    }

    #[test]
    fn test_seeded_choice_is_reproducible() {
        let mut rng_a = ChaCha8Rng::seed_from_u64(11);
        let mut rng_b = ChaCha8Rng::seed_from_u64(11);
        let picks_a: Vec<&str> = (0..10).map(|_| random_caption(&mut rng_a)).collect();
        let picks_b: Vec<&str> = (0..10).map(|_| random_caption(&mut rng_b)).collect();
        assert_eq!(picks_a, picks_b);
    }
}
