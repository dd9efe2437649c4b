//! Injectable randomness for banner padding, salts and jitter.
//!
//! Handlers never reach for a process-wide generator. Each session gets a
//! `RandomSource` through its `MockConfig`, so tests can hand in a seeded one
//! and get the same bytes on every run.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Cloneable handle to a session's random number generator.
///
/// The lock is only held for the duration of a single draw, never across an
/// `.await`.
#[derive(Clone)]
pub struct RandomSource {
    rng: Arc<Mutex<StdRng>>,
}

impl RandomSource {
    /// A generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// A deterministic generator for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        // A poisoned generator is still a usable generator.
        let mut guard = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Uniform value in `[0, upper)`. Returns 0 when `upper` is 0.
    pub fn below(&self, upper: u64) -> u64 {
        if upper == 0 {
            return 0;
        }
        self.with(|rng| rng.gen_range(0..upper))
    }

    /// Uniform value in `[low, high]`.
    pub fn between(&self, low: u64, high: u64) -> u64 {
        if low >= high {
            return low;
        }
        self.with(|rng| rng.gen_range(low..=high))
    }

    pub fn next_u64(&self) -> u64 {
        self.with(|rng| rng.next_u64())
    }

    pub fn fill(&self, dest: &mut [u8]) {
        self.with(|rng| rng.fill_bytes(dest));
    }

    /// `len` random lowercase hex digits.
    pub fn hex_string(&self, len: usize) -> String {
        self.with(|rng| {
            (0..len)
                .map(|_| HEX_DIGITS[rng.gen_range(0..HEX_DIGITS.len())] as char)
                .collect()
        })
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl fmt::Debug for RandomSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RandomSource")
    }
}
