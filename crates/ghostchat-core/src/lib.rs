//! Ghostchat core state machines.
//!
//! Everything here is Sans-IO: no sockets, no tasks, no clocks. The
//! transport layer feeds events into [`MessageRouter`] and executes the
//! [`RouterAction`]s it returns. Time and randomness come in through
//! [`Environment`], so the same code runs under the production server and
//! under the deterministic harness.
//!
//! ## Components
//!
//! ```text
//! ghostchat-core
//!   ├─ IdentityIssuer      (code + PIN registration, token login)
//!   ├─ ConnectionRegistry  (identity → live connection)
//!   ├─ PairingGraph        (symmetric pairings, direct-message gate)
//!   ├─ GroupManager        (group lifecycle and fan-out)
//!   └─ MessageRouter       (frame dispatch, notice → action)
//! ```
//!
//! State lives behind the [`store`] traits. The in-memory implementations
//! are the default; nothing survives a restart.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod env;
pub mod error;
pub mod group;
pub mod group_manager;
pub mod identity;
pub mod pairing;
pub mod registry;
pub mod router;
pub mod store;

pub use action::{Notice, Recipient, RouterAction};
pub use env::Environment;
pub use error::{IdentityError, RouterError, StoreError};
pub use group::Group;
pub use group_manager::GroupManager;
pub use identity::{Credentials, Identity, IdentityIssuer, SessionToken};
pub use pairing::{DirectPayload, PairingGraph};
pub use registry::{ConnectionId, ConnectionRegistry};
pub use router::{MessageRouter, ReplacePolicy, RouterConfig};
pub use store::{
    GroupStore, IdentityStore, MemoryGroupStore, MemoryIdentityStore, MemoryPairingStore,
    PairingStore,
};
