//! Reference model for model-based testing.
//!
//! The model is a simplified implementation that captures the routing rules
//! of Ghostchat without stores, tokens, or random identifiers. It serves as
//! the oracle against which the real router is verified.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Identifiers abstracted: clients by index, groups by creation order
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod world;

pub use operation::{ClientId, Delivery, GroupRef, Operation, SmallText};
pub use world::{Addressed, ModelWorld, ObservableState};
