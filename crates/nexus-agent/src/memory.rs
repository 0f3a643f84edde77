//! Durable cycle memory
//!
//! A small sled-backed store holding the last few cycle summaries per
//! agent. Opening the store is startup-fatal; once open, reads and
//! writes degrade gracefully so a storage hiccup can never abort a
//! cycle.

use std::path::Path;

use thiserror::Error;

use nexus_types::MemoryEntry;

/// Entries retained per agent, oldest evicted first.
pub const DEFAULT_MEMORY_CAPACITY: usize = 10;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("failed to open memory store: {0}")]
    Open(#[from] sled::Error),
}

/// Append-only (up to capacity) history of cycle summaries, keyed by
/// agent name.
pub struct MemoryStore {
    db: sled::Db,
    capacity: usize,
}

impl MemoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            capacity: DEFAULT_MEMORY_CAPACITY,
        })
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Load the stored history for an agent. Missing or corrupt data
    /// reads as an empty history.
    pub fn load(&self, agent: &str) -> Vec<MemoryEntry> {
        let bytes = match self.db.get(agent.as_bytes()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(agent, error = %err, "memory read failed, starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<MemoryEntry>>(&bytes) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(agent, error = %err, "memory record corrupt, starting empty");
                Vec::new()
            }
        }
    }

    /// Append one summary, evicting the oldest entry past capacity.
    /// Storage failures are logged and swallowed.
    pub fn append(&self, agent: &str, summary: impl Into<String>) {
        let mut entries = self.load(agent);
        entries.push(MemoryEntry::new(summary));
        while entries.len() > self.capacity {
            entries.remove(0);
        }

        let bytes = match serde_json::to_vec(&entries) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(agent, error = %err, "memory serialization failed, entry dropped");
                return;
            }
        };
        if let Err(err) = self.db.insert(agent.as_bytes(), bytes) {
            tracing::warn!(agent, error = %err, "memory write failed, entry dropped");
            return;
        }
        if let Err(err) = self.db.flush() {
            tracing::warn!(agent, error = %err, "memory flush failed");
        }
    }
}
