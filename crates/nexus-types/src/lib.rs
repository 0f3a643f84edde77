//! Nexus Types - Canonical domain types for autonomous BCH agents
//!
//! Foundation crate with zero dependencies on other nexus crates.
//! Everything an agent reasons about lives here: identities, the action
//! catalog, chain-state snapshots, memory entries, and cycle outcomes.

pub mod action;
pub mod address;
pub mod identity;
pub mod state;

pub use action::*;
pub use address::*;
pub use identity::*;
pub use state::*;
