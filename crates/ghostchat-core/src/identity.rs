//! Identity issuance.
//!
//! Identities are anonymous: registration hands out the next sequential
//! [`Code`] and a random 4-digit PIN, login exchanges the pair for an opaque
//! [`SessionToken`]. Only one token is active per identity; a fresh login
//! overwrites the previous one and there is no revocation list.
//!
//! The router consumes exactly two facts from this module: "which identity
//! owns this token" ([`IdentityIssuer::resolve_token`]) and "does this
//! identity exist" ([`IdentityIssuer::exists`]).

use ghostchat_proto::Code;
use serde::{Deserialize, Serialize};

use crate::{
    env::Environment,
    error::{IdentityError, StoreError},
    store::{IdentityStore, MemoryIdentityStore},
};

/// Number of random bytes behind a session token (hex-encoded on the wire).
pub const TOKEN_BYTES: usize = 16;

/// Fresh tokens drawn before login gives up on a degraded RNG.
const TOKEN_ATTEMPTS: usize = 4;

/// Opaque bearer token presented at the channel handshake.
///
/// # Security
///
/// - **Debug Redaction**: The `Debug` impl never prints the token.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Draw a fresh token from the environment's entropy source.
    pub fn generate<E: Environment>(env: &E) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        env.random_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Borrow the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionToken(<redacted {} chars>)", self.0.len())
    }
}

/// Code and PIN returned once at registration.
///
/// # Security
///
/// - **Debug Redaction**: The `Debug` impl redacts `pin`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Public identifier
    pub code: Code,
    /// 4-digit PIN required to log in
    pub pin: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("code", &self.code).field("pin", &"<redacted>").finish()
    }
}

/// A registered identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    code: Code,
    pin: String,
    token: Option<SessionToken>,
}

impl Identity {
    /// Create an identity that has never logged in.
    pub fn new(code: Code, pin: String) -> Self {
        Self { code, pin, token: None }
    }

    /// Public identifier.
    pub fn code(&self) -> &Code {
        &self.code
    }

    /// Currently active token, if the identity has logged in.
    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }

    /// Replace the active token.
    pub fn set_token(&mut self, token: SessionToken) {
        self.token = Some(token);
    }

    /// Compare `pin` against the stored PIN without short-circuiting.
    pub fn verify_pin(&self, pin: &str) -> bool {
        if self.pin.len() != pin.len() {
            return false;
        }
        let diff =
            self.pin.as_bytes().iter().zip(pin.as_bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y));
        diff == 0
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("code", &self.code)
            .field("pin", &"<redacted>")
            .field("token", &self.token)
            .finish()
    }
}

/// Mints identities and session tokens.
#[derive(Debug)]
pub struct IdentityIssuer<S = MemoryIdentityStore>
where
    S: IdentityStore,
{
    store: S,
    /// Sequence number of the next code to hand out.
    next_seq: u64,
}

impl IdentityIssuer<MemoryIdentityStore> {
    /// Create an issuer over an empty in-memory store.
    pub fn new() -> Self {
        Self { store: MemoryIdentityStore::new(), next_seq: 1 }
    }
}

impl Default for IdentityIssuer<MemoryIdentityStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> IdentityIssuer<S>
where
    S: IdentityStore,
{
    /// Create an issuer over an existing store.
    ///
    /// Sequencing resumes after the identities already present.
    pub fn with_store(store: S) -> Result<Self, StoreError> {
        let next_seq = store.len()? as u64 + 1;
        Ok(Self { store, next_seq })
    }

    /// Register a new identity with the next free code and a random PIN.
    pub fn register<E: Environment>(&mut self, env: &E) -> Result<Credentials, IdentityError> {
        let code = loop {
            let candidate = Code::from_sequence(self.next_seq);
            self.next_seq += 1;
            if !self.store.contains(&candidate)? {
                break candidate;
            }
        };

        let pin = format!("{}", 1000 + env.random_u64() % 9000);
        self.store.put(Identity::new(code.clone(), pin.clone()))?;

        tracing::info!(code = %code, "identity registered");

        Ok(Credentials { code, pin })
    }

    /// Verify `code` + `pin` and issue a fresh token, replacing any previous
    /// one.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` for an unknown code or a
    /// wrong PIN, and `IdentityError::TokenCollision` if the environment
    /// keeps producing tokens that are already in use.
    pub fn login<E: Environment>(
        &mut self,
        env: &E,
        code: &Code,
        pin: &str,
    ) -> Result<SessionToken, IdentityError> {
        let mut identity = match self.store.get(code)? {
            Some(identity) if identity.verify_pin(pin) => identity,
            _ => {
                tracing::debug!(code = %code, "login rejected");
                return Err(IdentityError::InvalidCredentials);
            },
        };

        let token = self.unused_token(env)?;
        identity.set_token(token.clone());
        self.store.put(identity)?;

        tracing::info!(code = %code, "identity logged in");

        Ok(token)
    }

    /// Draw a token no identity holds yet.
    fn unused_token<E: Environment>(&self, env: &E) -> Result<SessionToken, IdentityError> {
        for _ in 0..TOKEN_ATTEMPTS {
            let token = SessionToken::generate(env);
            if self.store.find_by_token(&token)?.is_none() {
                return Ok(token);
            }
        }
        tracing::error!("session token collided {} times, refusing login", TOKEN_ATTEMPTS);
        Err(IdentityError::TokenCollision)
    }

    /// Resolve a presented token to the identity that currently owns it.
    pub fn resolve_token(&self, token: &str) -> Result<Option<Code>, StoreError> {
        if token.is_empty() {
            return Ok(None);
        }
        self.store.find_by_token(&SessionToken::new(token))
    }

    /// Whether an identity exists for `code`.
    pub fn exists(&self, code: &Code) -> Result<bool, StoreError> {
        self.store.contains(code)
    }

    /// Number of registered identities.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.store.len()
    }

    /// Whether no identity has been registered yet.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        self.store.is_empty()
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    };

    use super::*;

    /// Counter-based environment: every random byte is the next counter value.
    #[derive(Clone, Default)]
    struct CountingEnv {
        counter: Arc<AtomicU64>,
    }

    impl Environment for CountingEnv {
        fn wall_clock_millis(&self) -> u64 {
            0
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            for byte in buffer {
                *byte = self.counter.fetch_add(1, Ordering::Relaxed) as u8;
            }
        }
    }

    #[test]
    fn register_assigns_sequential_zero_padded_codes() {
        let env = CountingEnv::default();
        let mut issuer = IdentityIssuer::new();

        let codes: Vec<String> =
            (0..11).map(|_| issuer.register(&env).unwrap().code.to_string()).collect();

        assert_eq!(codes[0], "01");
        assert_eq!(codes[8], "09");
        assert_eq!(codes[9], "10");
        assert_eq!(codes[10], "11");
    }

    #[test]
    fn register_issues_four_digit_pins() {
        let env = CountingEnv::default();
        let mut issuer = IdentityIssuer::new();

        for _ in 0..50 {
            let credentials = issuer.register(&env).unwrap();
            assert_eq!(credentials.pin.len(), 4);
            assert!(credentials.pin.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(credentials.pin.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn login_requires_matching_pin() {
        let env = CountingEnv::default();
        let mut issuer = IdentityIssuer::new();
        let credentials = issuer.register(&env).unwrap();

        let result = issuer.login(&env, &credentials.code, "0000");
        assert_eq!(result, Err(IdentityError::InvalidCredentials));

        let result = issuer.login(&env, &Code::new("99"), &credentials.pin);
        assert_eq!(result, Err(IdentityError::InvalidCredentials));
    }

    #[test]
    fn fresh_login_overwrites_previous_token() {
        let env = CountingEnv::default();
        let mut issuer = IdentityIssuer::new();
        let credentials = issuer.register(&env).unwrap();

        let first = issuer.login(&env, &credentials.code, &credentials.pin).unwrap();
        let second = issuer.login(&env, &credentials.code, &credentials.pin).unwrap();

        assert_ne!(first, second);
        assert_eq!(issuer.resolve_token(first.as_str()).unwrap(), None);
        assert_eq!(issuer.resolve_token(second.as_str()).unwrap(), Some(credentials.code));
    }

    /// Environment whose RNG is stuck at zero.
    #[derive(Clone)]
    struct ZeroEnv;

    impl Environment for ZeroEnv {
        fn wall_clock_millis(&self) -> u64 {
            0
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }
    }

    #[test]
    fn login_refuses_a_token_held_by_another_identity() {
        let mut issuer = IdentityIssuer::new();
        let a = issuer.register(&ZeroEnv).unwrap();
        let b = issuer.register(&ZeroEnv).unwrap();

        let token_a = issuer.login(&ZeroEnv, &a.code, &a.pin).unwrap();
        let result = issuer.login(&ZeroEnv, &b.code, &b.pin);

        assert_eq!(result, Err(IdentityError::TokenCollision));
        assert_eq!(issuer.resolve_token(token_a.as_str()).unwrap(), Some(a.code));
        assert_eq!(issuer.store().get(&b.code).unwrap().unwrap().token(), None);
    }

    #[test]
    fn tokens_are_hex_encoded() {
        let token = SessionToken::generate(&CountingEnv::default());
        assert_eq!(token.as_str().len(), TOKEN_BYTES * 2);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let credentials = Credentials { code: Code::new("01"), pin: "4321".to_string() };
        assert!(!format!("{credentials:?}").contains("4321"));

        let token = SessionToken::new("deadbeef");
        assert!(!format!("{token:?}").contains("deadbeef"));
    }

    #[test]
    fn with_store_resumes_sequence() {
        let env = CountingEnv::default();
        let mut issuer = IdentityIssuer::new();
        issuer.register(&env).unwrap();
        issuer.register(&env).unwrap();

        let store = issuer.store().clone();
        let mut resumed = IdentityIssuer::with_store(store).unwrap();

        assert_eq!(resumed.register(&env).unwrap().code, Code::new("03"));
    }
}
