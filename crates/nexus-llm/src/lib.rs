//! Nexus LLM - Unified text-generation provider abstraction
//!
//! One interface over backends with different wire envelopes:
//!
//! - OpenAI-style chat completions (`choices[0].message.content`), which
//!   also covers DeepSeek and local OpenAI-compatible servers via `base_url`
//! - Anthropic messages (`content[0].text` blocks)
//! - A deterministic provider that always proposes idling (no network)
//!
//! Every envelope is normalized to plain text before anything downstream
//! parses it. Providers never move funds: they produce untrusted proposals
//! that the guard validates.

pub mod providers;
pub mod router;
pub mod types;

pub use providers::*;
pub use router::*;
pub use types::*;
