//! `blackhole`: an engine that accepts every write and reports nothing
//! was ever stored. Useful for measuring the facade's own overhead in
//! isolation from any real storage engine.
//!
//! Grounded on `examples/original_source/tests/engines/blackhole_test.cc`'s
//! behavioral contract (`put` always succeeds, `get`/`exists` always
//! report absent, `count_all` is always zero) — the original engine has
//! no header of its own beyond `engine_base`.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::Arc;

use kvengine_config::Config;
use kvengine_core::{Error, Result};
use kvengine_engine::{Engine, EngineFactory, EngineIterator, VisitFn};

/// The no-op engine. Holds no state; every put succeeds and is discarded.
#[derive(Debug, Default)]
pub struct BlackholeEngine;

impl Engine for BlackholeEngine {
    fn name(&self) -> &'static str {
        "blackhole"
    }

    fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
        Ok(())
    }

    fn remove(&self, _key: &[u8]) -> Result<bool> {
        Ok(false)
    }

    fn exists(&self, _key: &[u8]) -> Result<bool> {
        Ok(false)
    }

    fn count_all(&self) -> Result<usize> {
        Ok(0)
    }

    fn get_all(&self, _visit: &mut VisitFn<'_>) -> Result<()> {
        Ok(())
    }

    fn defrag(&self, _start_percent: u8, _amount_percent: u8) -> Result<()> {
        Ok(())
    }

    fn new_iterator(&self) -> Result<Box<dyn EngineIterator + '_>> {
        Ok(Box::new(BlackholeCursor))
    }
}

/// A cursor over nothing. `seek` always succeeds (there is nowhere to not
/// be), but nothing is ever positioned, so every read reports absent.
///
/// `new_write_iterator` is left at [`Engine`]'s default: range-modify
/// operations are not supported here, matching the original's contract
/// for this engine.
struct BlackholeCursor;

impl EngineIterator for BlackholeCursor {
    fn seek(&mut self, _key: &[u8]) -> Result<()> {
        Ok(())
    }

    fn is_next(&self) -> bool {
        false
    }

    fn next(&mut self) -> Result<()> {
        Err(Error::not_found("blackhole positions nothing"))
    }

    fn key(&self) -> Result<Vec<u8>> {
        Err(Error::not_found("blackhole positions nothing"))
    }

    fn read_range(&self, _offset: usize, _len: usize) -> Result<Vec<u8>> {
        Err(Error::not_found("blackhole positions nothing"))
    }
}

/// Constructs [`BlackholeEngine`] instances.
#[derive(Debug, Default)]
pub struct BlackholeFactory;

impl EngineFactory for BlackholeFactory {
    fn name(&self) -> &'static str {
        "blackhole"
    }

    fn open(&self, _config: &Config) -> Result<Arc<dyn Engine>> {
        Ok(Arc::new(BlackholeEngine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_reports_absent() {
        let engine = BlackholeEngine;
        engine.put(b"k", b"v").unwrap();
        assert_eq!(engine.get(b"k").unwrap(), None);
        assert!(!engine.exists(b"k").unwrap());
        assert_eq!(engine.count_all().unwrap(), 0);
    }

    #[test]
    fn remove_always_reports_absent() {
        let engine = BlackholeEngine;
        assert!(!engine.remove(b"k").unwrap());
    }

    #[test]
    fn cursor_seek_ok_but_key_and_read_range_report_absent() {
        let engine = BlackholeEngine;
        let mut it = engine.new_iterator().unwrap();
        it.seek(b"anything").unwrap();
        assert!(!it.is_next());
        assert_eq!(it.key().unwrap_err().status(), kvengine_core::Status::NotFound);
        assert_eq!(it.read_range(0, 4).unwrap_err().status(), kvengine_core::Status::NotFound);
    }

    #[test]
    fn write_iterator_is_not_supported() {
        let engine = BlackholeEngine;
        assert_eq!(engine.new_write_iterator().unwrap_err().status(), kvengine_core::Status::NotSupported);
    }

    #[test]
    fn conformance_subset() {
        use kvengine_engine::conformance::get_missing_is_not_an_error;
        let engine = BlackholeEngine;
        get_missing_is_not_an_error(&engine);
    }
}
