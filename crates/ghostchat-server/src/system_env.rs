//! Production Environment implementation using system time and RNG.

use std::time::{SystemTime, UNIX_EPOCH};

use ghostchat_core::Environment;

/// Production environment using the system clock and cryptographic RNG.
///
/// # Security
///
/// The RNG uses `getrandom` which provides OS-level cryptographic randomness.
/// Session tokens, PINs, group ids, and connection ids are all drawn from it.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn wall_clock_millis(&self) -> u64 {
        // A clock before the epoch stamps 0 rather than failing the relay.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).unwrap_or_else(|e| {
            tracing::error!("getrandom failed, identifiers are no longer unique: {}", e);
            buffer.fill(0);
        });
    }
}
