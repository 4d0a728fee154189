//! Deterministic test harness for Ghostchat.
//!
//! [`SimEnv`] replaces the system clock and OS entropy with a manual clock
//! and a seeded RNG, so router runs replay exactly.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real router,
//! and their deliveries and observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;

pub use model::{
    Addressed, ClientId, Delivery, GroupRef, ModelWorld, ObservableState, Operation, SmallText,
};
pub use sim_env::SimEnv;
