//! Deterministic Environment implementation for simulation and tests.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use ghostchat_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Simulation environment with a manual clock and seeded RNG.
///
/// This implementation provides:
///
/// - **Manual Time**: `wall_clock_millis()` returns a value that only moves
///   when [`SimEnv::advance`] is called, so every relayed `ts` is predictable.
///
/// - **Seeded RNG**: `random_bytes()` uses `ChaCha20Rng` seeded with a fixed
///   value, so PINs, tokens, and group ids repeat across runs.
///
/// Clones share both the clock and the RNG stream.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
    clock: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock value a fresh environment starts at.
    pub const START_MILLIS: u64 = 1_700_000_000_000;

    /// Create a new `SimEnv` with default seed (0)
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create a new `SimEnv` with a specific seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            clock: Arc::new(AtomicU64::new(Self::START_MILLIS)),
        }
    }

    /// Move the clock forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.clock.fetch_add(millis, Ordering::Relaxed);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    fn wall_clock_millis(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    fn random_bytes(&self, dest: &mut [u8]) {
        // The RNG holds no invariant a panic could break.
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(dest);
    }
}
