//! Nexus Chain - on-chain collaborators and the execution gateway
//!
//! The agent core does not serialize or sign raw transactions; it consumes
//! two capabilities with stable interfaces:
//!
//! - [`NetworkProvider`]: UTXO lookup and transaction broadcast
//! - [`Signer`]: turns a transaction plan into a broadcastable payload
//!
//! The [`ExecutionGateway`] sits on top of both and owns the one hard
//! invariant of the system: every state-mutating transaction consumes the
//! agent's identity token and recreates it at the same contract address
//! with an updated commitment.

pub mod artifact;
pub mod gateway;
pub mod provider;
pub mod rest;

pub use artifact::*;
pub use gateway::*;
pub use provider::*;
pub use rest::*;
