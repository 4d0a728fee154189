//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples routing logic from system resources
//! (wall-clock time and randomness). This enables:
//!
//! - Deterministic Simulation: the harness provides a manual clock and a
//!   seeded RNG, so a failing operation sequence replays exactly.
//!
//! - Production Runtime: the server uses the system clock and OS entropy
//!   without any change to the state machines.
//!
//! # Invariants
//!
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

/// Abstract environment providing wall-clock time and randomness.
///
/// Nothing in the core suspends, so unlike a transport environment there is
/// no `sleep`: the only things the state machines ever ask for are a
/// timestamp to stamp on a relayed message and entropy for identifiers.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Milliseconds since the UNIX epoch.
    ///
    /// This is the authoritative `ts` stamped on every relayed message.
    fn wall_clock_millis(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Security
    ///
    /// Session tokens are drawn from this source. Production implementations
    /// MUST use OS entropy (`getrandom`), simulations MUST use a seeded RNG.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for connection ids and PINs.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
