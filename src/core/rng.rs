//! Target Number Generation
//!
//! Uses Xorshift128+ for fast, uniform target draws. The generator sits behind
//! the [`TargetSource`] trait so tests can pin the hidden number of every round.

use std::collections::VecDeque;
use std::sync::Mutex;

use sha2::{Sha256, Digest};

use crate::{TARGET_MAX, TARGET_MIN};

/// PRNG using the Xorshift128+ algorithm.
///
/// Given the same seed, produces the same sequence on every platform.
///
/// # Example
///
/// ```
/// use guess_round::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift never leaves the all-zero state
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Create an RNG seeded from fresh UUID entropy.
    pub fn from_entropy() -> Self {
        let entropy = uuid::Uuid::new_v4().into_bytes();
        tracing::debug!("Seeding target RNG from entropy {}", hex::encode(entropy));
        Self::new(derive_seed(&entropy))
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, max).
    #[inline]
    pub fn next_int(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        // Modulo bias is negligible for the small ranges drawn here
        (self.next_u64() % max as u64) as u32
    }

    /// Generate a random integer in range [min, max].
    #[inline]
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        if min >= max {
            return min;
        }
        let range = (max - min + 1) as u32;
        min + self.next_int(range) as i32
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a 64-bit seed from raw entropy bytes.
pub fn derive_seed(entropy: &[u8]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"GUESS_ROUND_TARGET_SEED_V1");
    hasher.update(entropy);

    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TARGET SOURCES
// =============================================================================

/// Supplies the hidden number for each new round.
///
/// Implementations must return a value in `[TARGET_MIN, TARGET_MAX]`.
pub trait TargetSource: Send + Sync {
    /// Draw the target for the next round.
    fn next_target(&self) -> u8;
}

/// Uniform draws in `[1, 100]` from a [`DeterministicRng`].
#[derive(Debug)]
pub struct RandomTargets {
    rng: Mutex<DeterministicRng>,
}

impl RandomTargets {
    /// Create a source with a fixed seed (reproducible rounds).
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(DeterministicRng::new(seed)) }
    }

    /// Create a source seeded from fresh entropy.
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(DeterministicRng::from_entropy()) }
    }
}

impl Default for RandomTargets {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl TargetSource for RandomTargets {
    fn next_target(&self) -> u8 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.next_int_range(TARGET_MIN as i32, TARGET_MAX as i32) as u8
    }
}

/// Replays a fixed list of targets, cycling when exhausted.
#[derive(Debug)]
pub struct SequenceTargets {
    queue: Mutex<VecDeque<u8>>,
}

impl SequenceTargets {
    /// Create a source from a non-empty list of targets.
    ///
    /// Values outside `[1, 100]` are clamped. An empty list behaves like `[TARGET_MIN]`.
    pub fn new(targets: impl IntoIterator<Item = u8>) -> Self {
        let mut queue: VecDeque<u8> = targets.into_iter()
            .map(|t| t.clamp(TARGET_MIN, TARGET_MAX))
            .collect();
        if queue.is_empty() {
            queue.push_back(TARGET_MIN);
        }
        Self { queue: Mutex::new(queue) }
    }

    /// Always produce the same target.
    pub fn constant(target: u8) -> Self {
        Self::new([target])
    }
}

impl TargetSource for SequenceTargets {
    fn next_target(&self) -> u8 {
        let mut queue = self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match queue.pop_front() {
            Some(target) => {
                queue.push_back(target);
                target
            }
            None => TARGET_MIN,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        assert_ne!(rng1.next_u64(), rng2.next_u64());
    }

    #[test]
    fn test_next_int_range() {
        let mut rng = DeterministicRng::new(5678);

        for _ in 0..1000 {
            let val = rng.next_int_range(1, 100);
            assert!((1..=100).contains(&val));
        }

        // Edge case: min = max
        assert_eq!(rng.next_int_range(5, 5), 5);
    }

    #[test]
    fn test_next_int_edges() {
        let mut rng = DeterministicRng::new(1234);
        assert_eq!(rng.next_int(0), 0);
        assert_eq!(rng.next_int(1), 0);
    }

    #[test]
    fn test_random_targets_cover_bounds() {
        let targets = RandomTargets::with_seed(42);
        let mut seen_min = false;
        let mut seen_max = false;

        for _ in 0..10_000 {
            let t = targets.next_target();
            assert!((TARGET_MIN..=TARGET_MAX).contains(&t));
            seen_min |= t == TARGET_MIN;
            seen_max |= t == TARGET_MAX;
        }

        assert!(seen_min && seen_max);
    }

    #[test]
    fn test_seeded_targets_reproducible() {
        let a = RandomTargets::with_seed(7);
        let b = RandomTargets::with_seed(7);
        let seq_a: Vec<u8> = (0..20).map(|_| a.next_target()).collect();
        let seq_b: Vec<u8> = (0..20).map(|_| b.next_target()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_sequence_targets_cycle() {
        let targets = SequenceTargets::new([10, 20, 30]);
        let drawn: Vec<u8> = (0..5).map(|_| targets.next_target()).collect();
        assert_eq!(drawn, vec![10, 20, 30, 10, 20]);
    }

    #[test]
    fn test_sequence_targets_clamped() {
        let targets = SequenceTargets::new([0, 200]);
        assert_eq!(targets.next_target(), TARGET_MIN);
        assert_eq!(targets.next_target(), TARGET_MAX);
    }

    #[test]
    fn test_derive_seed() {
        let seed1 = derive_seed(&[1u8; 16]);
        let seed2 = derive_seed(&[1u8; 16]);
        assert_eq!(seed1, seed2);
        assert_ne!(seed1, derive_seed(&[2u8; 16]));
    }
}
