//! The `Database` facade: a single open engine, name-selected at open time.
//!
//! Grounded on `examples/original_source/src/libpmemkv.hpp`'s `class db`.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use kvengine_config::Config;
use kvengine_core::{Error, Result, Status};

use crate::engine::{Engine, IterControl, VisitFn};
use crate::iterator::{EngineIterator, EngineWriteIterator};
use crate::registry::create_engine;
use crate::transaction::Transaction;

thread_local! {
    static LAST_ERROR: RefCell<String> = RefCell::new(String::new());
}

fn track<T>(result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => LAST_ERROR.with(|cell| cell.borrow_mut().clear()),
        Err(e) if e.status().is_soft() => LAST_ERROR.with(|cell| cell.borrow_mut().clear()),
        Err(e) => LAST_ERROR.with(|cell| *cell.borrow_mut() = e.message().to_string()),
    }
    result
}

fn closed_err() -> Error {
    Error::invalid_argument("database is closed")
}

/// A database: one open storage engine, selected by name at open time.
///
/// The engine cannot be changed after open — matching the spec's
/// non-goal "changing engines on an open database".
pub struct Database {
    engine: Arc<dyn Engine>,
    closed: AtomicBool,
}

impl Database {
    /// Open (or create) a database backed by the named engine.
    ///
    /// `Status::WrongEngineName` if no engine is registered under
    /// `engine_name`; otherwise whatever the engine's own open-time
    /// validation returns (e.g. `Status::InvalidArgument` for a missing
    /// `path`, `Status::ComparatorMismatch` for a sorted engine reopened
    /// with a different comparator than it was created with).
    pub fn open(engine_name: &str, config: Config) -> Result<Self> {
        let engine = track(create_engine(engine_name, &config))?;
        tracing::debug!(engine = engine_name, "database opened");
        Ok(Database { engine, closed: AtomicBool::new(false) })
    }

    /// The diagnostic message for the last error on this thread, or an
    /// empty string if the last operation on this thread succeeded or
    /// returned a soft status (`Ok`/`NotFound`/`StoppedByCb`).
    pub fn errormsg() -> String {
        LAST_ERROR.with(|cell| cell.borrow().clone())
    }

    /// The name of the engine this database opened. Stays available after
    /// [`close`](Self::close) — it describes the database, not a live
    /// handle into it.
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(AtomicOrdering::Acquire) {
            track(Err(closed_err()))
        } else {
            Ok(())
        }
    }

    /// Destroy the underlying engine. Idempotent: closing an
    /// already-closed database is a no-op. Every operation after `close`
    /// returns `Status::InvalidArgument` — matching pmemkv's own
    /// `db::close()`, after which the handle stays alive but engineless.
    pub fn close(&self) {
        if !self.closed.swap(true, AtomicOrdering::AcqRel) {
            tracing::debug!(engine = self.engine.name(), "database closed");
        }
    }

    /// Point lookup, returning an owned copy of the value.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.check_open()?;
        track(self.engine.get(key))
    }

    /// Point lookup into a caller-supplied buffer.
    ///
    /// Returns the value's length. If `buf` is too small to hold it,
    /// returns `Status::OutOfMemory` carrying the required length in the
    /// message, without writing partial data — pmemkv's `get_copy`
    /// contract from `libpmemkv.hpp`.
    pub fn get_copy(&self, key: &[u8], buf: &mut [u8]) -> Result<usize> {
        self.check_open()?;
        let value = track(self.engine.get(key))?.ok_or_else(|| Error::not_found("key not present"))?;
        if value.len() > buf.len() {
            return Err(track(Err(Error::out_of_memory(format!(
                "buffer of {} bytes too small for {} byte value",
                buf.len(),
                value.len()
            ))))
            .unwrap_err());
        }
        buf[..value.len()].copy_from_slice(&value);
        Ok(value.len())
    }

    /// Insert or overwrite.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_open()?;
        track(self.engine.put(key, value))
    }

    /// Remove a key. `Ok(false)` if it was already absent — not an error.
    pub fn remove(&self, key: &[u8]) -> Result<bool> {
        self.check_open()?;
        track(self.engine.remove(key))
    }

    /// Whether `key` is present.
    pub fn exists(&self, key: &[u8]) -> Result<bool> {
        self.check_open()?;
        track(self.engine.exists(key))
    }

    /// Number of entries in the database.
    pub fn count_all(&self) -> Result<usize> {
        self.check_open()?;
        track(self.engine.count_all())
    }

    /// Number of entries with key strictly greater than `key`.
    pub fn count_above(&self, key: &[u8]) -> Result<usize> {
        self.check_open()?;
        track(self.engine.count_above(key))
    }

    /// Number of entries with key strictly less than `key`.
    pub fn count_below(&self, key: &[u8]) -> Result<usize> {
        self.check_open()?;
        track(self.engine.count_below(key))
    }

    /// Number of entries with key strictly between `lower` and `upper`.
    pub fn count_between(&self, lower: &[u8], upper: &[u8]) -> Result<usize> {
        self.check_open()?;
        track(self.engine.count_between(lower, upper))
    }

    /// Visit every entry in the database.
    pub fn get_all(&self, visit: &mut VisitFn<'_>) -> Result<()> {
        self.check_open()?;
        track(self.engine.get_all(visit))
    }

    /// Visit every entry with key strictly greater than `key`.
    pub fn get_above(&self, key: &[u8], visit: &mut VisitFn<'_>) -> Result<()> {
        self.check_open()?;
        track(self.engine.get_above(key, visit))
    }

    /// Visit every entry with key strictly less than `key`.
    pub fn get_below(&self, key: &[u8], visit: &mut VisitFn<'_>) -> Result<()> {
        self.check_open()?;
        track(self.engine.get_below(key, visit))
    }

    /// Visit every entry with key strictly between `lower` and `upper`.
    pub fn get_between(&self, lower: &[u8], upper: &[u8], visit: &mut VisitFn<'_>) -> Result<()> {
        self.check_open()?;
        track(self.engine.get_between(lower, upper, visit))
    }

    /// Reclaim space freed by prior removes/overwrites.
    ///
    /// Bounds are validated here, once, for every engine — both percentages
    /// in `[0,100]` and `start_percent + amount_percent <= 100` — rather
    /// than duplicated per engine, matching how `config.h`/`libpmemkv.hpp`
    /// validate before ever calling into the engine.
    pub fn defrag(&self, start_percent: u8, amount_percent: u8) -> Result<()> {
        self.check_open()?;
        if start_percent > 100 || amount_percent > 100 {
            return track(Err(Error::invalid_argument(
                "defrag percentages must each be in [0,100]",
            )));
        }
        if start_percent as u16 + amount_percent as u16 > 100 {
            return track(Err(Error::invalid_argument(
                "defrag start_percent + amount_percent must not exceed 100",
            )));
        }
        track(self.engine.defrag(start_percent, amount_percent))
    }

    /// Begin a batched transaction.
    pub fn begin_tx(&self) -> Result<Box<dyn Transaction + '_>> {
        self.check_open()?;
        track(self.engine.begin_tx())
    }

    /// Open a read-only cursor.
    pub fn new_iterator(&self) -> Result<Box<dyn EngineIterator + '_>> {
        self.check_open()?;
        track(self.engine.new_iterator())
    }

    /// Open a read-write cursor.
    pub fn new_write_iterator(&self) -> Result<Box<dyn EngineWriteIterator + '_>> {
        self.check_open()?;
        track(self.engine.new_write_iterator())
    }
}

/// Convenience for `get_*` callbacks: keep going unless `stop` is true.
pub fn continue_unless(stop: bool) -> IterControl {
    if stop {
        IterControl::Stop
    } else {
        IterControl::Continue
    }
}

/// Whether a `get_all`/`get_above`/`get_below`/`get_between` call was
/// stopped by its callback rather than exhausting the range.
pub fn was_stopped_by_callback(result: &Result<()>) -> bool {
    matches!(result, Err(e) if e.status() == Status::StoppedByCb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    struct MemEngine {
        data: StdMutex<std::collections::BTreeMap<Vec<u8>, Vec<u8>>>,
    }

    impl Engine for MemEngine {
        fn name(&self) -> &'static str {
            "test-mem"
        }
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }
        fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
            self.data.lock().unwrap().insert(key.to_vec(), value.to_vec());
            Ok(())
        }
        fn remove(&self, key: &[u8]) -> Result<bool> {
            Ok(self.data.lock().unwrap().remove(key).is_some())
        }
        fn count_all(&self) -> Result<usize> {
            Ok(self.data.lock().unwrap().len())
        }
    }

    struct MemFactory;
    impl crate::registry::EngineFactory for MemFactory {
        fn name(&self) -> &'static str {
            "test-mem"
        }
        fn open(&self, _config: &Config) -> Result<Arc<dyn Engine>> {
            Ok(Arc::new(MemEngine {
                data: StdMutex::new(std::collections::BTreeMap::new()),
            }))
        }
    }

    static REGISTERED: AtomicBool = AtomicBool::new(false);
    fn ensure_registered() {
        if !REGISTERED.swap(true, Ordering::SeqCst) {
            crate::registry::register_engine(Arc::new(MemFactory));
        }
    }

    #[test]
    fn open_unknown_engine_is_wrong_engine_name() {
        let err = Database::open("does-not-exist-xyz", Config::new()).unwrap_err();
        assert_eq!(err.status(), Status::WrongEngineName);
    }

    #[test]
    fn put_get_remove_roundtrip() {
        ensure_registered();
        let db = Database::open("test-mem", Config::new()).unwrap();
        db.put(b"k", b"v").unwrap();
        assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert_eq!(db.count_all().unwrap(), 1);
        assert!(db.remove(b"k").unwrap());
        assert_eq!(db.get(b"k").unwrap(), None);
        assert!(!db.remove(b"k").unwrap());
    }

    #[test]
    fn get_copy_reports_required_size_on_small_buffer() {
        ensure_registered();
        let db = Database::open("test-mem", Config::new()).unwrap();
        db.put(b"k", b"0123456789").unwrap();
        let mut buf = [0u8; 4];
        let err = db.get_copy(b"k", &mut buf).unwrap_err();
        assert_eq!(err.status(), Status::OutOfMemory);

        let mut buf = [0u8; 16];
        let n = db.get_copy(b"k", &mut buf).unwrap();
        assert_eq!(&buf[..n], b"0123456789");
    }

    #[test]
    fn defrag_rejects_bad_percentages() {
        ensure_registered();
        let db = Database::open("test-mem", Config::new()).unwrap();
        assert_eq!(db.defrag(101, 0).unwrap_err().status(), Status::InvalidArgument);
        assert_eq!(db.defrag(60, 50).unwrap_err().status(), Status::InvalidArgument);
    }

    #[test]
    fn errormsg_clears_on_soft_status_and_sets_on_hard_error() {
        ensure_registered();
        let db = Database::open("test-mem", Config::new()).unwrap();
        let _ = db.get(b"missing-but-not-hard-error");
        assert_eq!(Database::errormsg(), "");

        let mut buf = [0u8; 0];
        db.put(b"k", b"v").unwrap();
        let _ = db.get_copy(b"k", &mut buf);
        assert!(!Database::errormsg().is_empty());
    }

    #[test]
    fn close_is_idempotent_and_further_ops_are_invalid_argument() {
        ensure_registered();
        let db = Database::open("test-mem", Config::new()).unwrap();
        db.put(b"k", b"v").unwrap();
        db.close();
        db.close();
        assert_eq!(db.get(b"k").unwrap_err().status(), Status::InvalidArgument);
        assert_eq!(db.put(b"k2", b"v2").unwrap_err().status(), Status::InvalidArgument);
        assert_eq!(db.engine_name(), "test-mem");
    }
}
