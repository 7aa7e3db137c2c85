//! The engine contract every storage backend implements.
//!
//! Grounded on `examples/original_source/src/engine.h`'s `engine_base`:
//! `name`/`get`/`put`/`remove` are required, everything else defaults to
//! `Status::NotSupported` so a minimal engine (see `kvengine-store-blackhole`)
//! can implement the trait with four methods.

use kvengine_core::{Error, Result, Status};

/// What a range-iteration callback tells the engine to do next.
///
/// Returning `Stop` is not an error: the engine's `get_*` method returns
/// `Err(Status::StoppedByCb)`, which callers treat as an ordinary early
/// exit, not a failure (see `Status::is_soft`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterControl {
    /// Keep visiting entries.
    Continue,
    /// Stop visiting entries now.
    Stop,
}

/// A callback invoked once per entry during a range scan.
pub type VisitFn<'a> = dyn FnMut(&[u8], &[u8]) -> IterControl + 'a;

/// Turn a `Stop` into the `StoppedByCb` status the scan methods return.
pub(crate) fn stopped_by_cb() -> Error {
    Error::new(Status::StoppedByCb, "range scan stopped by callback")
}

/// A pluggable storage backend.
///
/// Implementors register a matching [`crate::registry::EngineFactory`] and
/// are looked up by name from [`crate::Database::open`]. Optional
/// capabilities (range scans, counting, transactions, iterators, defrag)
/// default to `Status::NotSupported`; an engine overrides only what it can
/// actually do.
pub trait Engine: Send + Sync {
    /// The registered name this engine was opened under (`cmap`, `csmap`, ...).
    fn name(&self) -> &'static str;

    /// Point lookup. `Ok(None)` means the key is absent — not an error.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert or overwrite.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove a key. `Ok(false)` means the key was already absent.
    fn remove(&self, key: &[u8]) -> Result<bool>;

    /// Whether `key` is present. Default implementation is a `get` plus a
    /// presence check; engines with a cheaper existence check override it.
    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Number of entries in the whole engine.
    fn count_all(&self) -> Result<usize> {
        Err(Error::not_supported("count_all"))
    }

    /// Number of entries with key strictly greater than `key`.
    fn count_above(&self, _key: &[u8]) -> Result<usize> {
        Err(Error::not_supported("count_above"))
    }

    /// Number of entries with key strictly less than `key`.
    fn count_below(&self, _key: &[u8]) -> Result<usize> {
        Err(Error::not_supported("count_below"))
    }

    /// Number of entries with key strictly between `lower` and `upper`.
    fn count_between(&self, _lower: &[u8], _upper: &[u8]) -> Result<usize> {
        Err(Error::not_supported("count_between"))
    }

    /// Visit every entry. `Err(Status::StoppedByCb)` if the callback stopped early.
    fn get_all(&self, _visit: &mut VisitFn<'_>) -> Result<()> {
        Err(Error::not_supported("get_all"))
    }

    /// Visit every entry with key strictly greater than `key`, in order.
    fn get_above(&self, _key: &[u8], _visit: &mut VisitFn<'_>) -> Result<()> {
        Err(Error::not_supported("get_above"))
    }

    /// Visit every entry with key strictly less than `key`, in order.
    fn get_below(&self, _key: &[u8], _visit: &mut VisitFn<'_>) -> Result<()> {
        Err(Error::not_supported("get_below"))
    }

    /// Visit every entry with key strictly between `lower` and `upper`, in order.
    fn get_between(&self, _lower: &[u8], _upper: &[u8], _visit: &mut VisitFn<'_>) -> Result<()> {
        Err(Error::not_supported("get_between"))
    }

    /// Reclaim space freed by prior removes/overwrites. `start_percent` and
    /// `amount_percent` are validated by the facade before this is called
    /// (both in `[0,100]`, `start_percent + amount_percent <= 100`), matching
    /// pmemkv's own `config.h`/`libpmemkv.hpp` validation split.
    fn defrag(&self, _start_percent: u8, _amount_percent: u8) -> Result<()> {
        Err(Error::not_supported("defrag"))
    }

    /// Begin a batched transaction.
    fn begin_tx(&self) -> Result<Box<dyn crate::transaction::Transaction + '_>> {
        Err(Error::not_supported("begin_tx"))
    }

    /// A read-only cursor.
    fn new_iterator(&self) -> Result<Box<dyn crate::iterator::EngineIterator + '_>> {
        Err(Error::not_supported("new_iterator"))
    }

    /// A read-write cursor with a buffered range-modify/commit/abort surface.
    fn new_write_iterator(&self) -> Result<Box<dyn crate::iterator::EngineWriteIterator + '_>> {
        Err(Error::not_supported("new_write_iterator"))
    }
}
