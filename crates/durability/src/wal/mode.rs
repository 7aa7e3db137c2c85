//! Durability mode: controls when the WAL is fsynced.
//!
//! Orthogonal to whether a pool is persistent at all (`vsmap`'s volatile
//! map never opens a WAL regardless of this setting).

/// Controls WAL fsync behavior for a persistent engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurabilityMode {
    /// No WAL at all — an engine operating in this mode accepts data loss
    /// on crash in exchange for no persistence I/O.
    InMemory,
    /// fsync after every record. Maximum durability, highest latency.
    Strict,
    /// fsync every `batch_size` writes or every `interval_ms` milliseconds,
    /// whichever comes first.
    Batched {
        /// Maximum time between fsyncs, in milliseconds.
        interval_ms: u64,
        /// Maximum writes between fsyncs.
        batch_size: usize,
    },
}

impl DurabilityMode {
    /// Whether this mode requires an on-disk WAL.
    pub fn requires_wal(&self) -> bool {
        !matches!(self, DurabilityMode::InMemory)
    }

    /// Whether this mode fsyncs after every single record.
    pub fn requires_immediate_fsync(&self) -> bool {
        matches!(self, DurabilityMode::Strict)
    }

    /// `Batched` with recommended defaults (100ms / 1000 writes).
    pub fn batched_default() -> Self {
        DurabilityMode::Batched {
            interval_ms: 100,
            batch_size: 1000,
        }
    }
}

impl Default for DurabilityMode {
    fn default() -> Self {
        DurabilityMode::batched_default()
    }
}
