//! Nexus Agent - autonomous agent runtime
//!
//! Drives the full cycle for one deployed agent:
//!
//! ```text
//! timer ─▶ sync state ─▶ decide ─▶ enforce ─▶ execute ─▶ persist ─▶ report
//! ```
//!
//! The decision engine treats model output as untrusted and falls back to
//! idling on any malformed response; the guard is the last off-chain check
//! before funds move; the orchestrator guarantees one failing cycle never
//! poisons the next.

pub mod brain;
pub mod cycle;
pub mod memory;
pub mod report;
pub mod runtime;

pub use brain::*;
pub use cycle::*;
pub use memory::*;
pub use report::*;
pub use runtime::*;
