//! `vsmap`: a volatile, file-backed sorted engine.
//!
//! Grounded on `examples/original_source/src/engines/vsmap.h`: accepts a
//! caller-supplied comparator, supports the full ordered operation set,
//! but is explicitly not persistent across crashes — the original backs
//! its ordered map with `libpmemobj`'s volatile (`vmem`) allocator rather
//! than a transactional persistent one. This workspace has no `vmem`
//! equivalent crate, so the ordered data itself lives in an ordinary
//! `BTreeMap`; what we do carry over is the "backed by a mapped file, but
//! the mapping is not a source of recoverability" shape — `config`'s
//! `path`/`size` reserve and memory-map a backing file via `memmap2`
//! purely to mirror that contract (no WAL, no record of what's been
//! written survives a restart, matching vsmap's explicit non-persistence).

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use kvengine_config::Config;
use kvengine_core::comparator::between;
use kvengine_core::{BinaryComparator, Comparator, Error, Result};
use kvengine_engine::{clamp_range, CursorState, Engine, EngineFactory, EngineIterator, EngineWriteIterator, IterControl, VisitFn};
use memmap2::MmapMut;
use parking_lot::RwLock;

/// Default size reserved for the backing mmap when `config` supplies no
/// `size`, matching the small pool sizes pmemkv's own example configs use.
const DEFAULT_MMAP_SIZE: u64 = 8 * 1024 * 1024;

#[derive(Clone)]
struct CmpKey {
    bytes: Vec<u8>,
    comparator: Arc<dyn Comparator>,
}

impl PartialEq for CmpKey {
    fn eq(&self, other: &Self) -> bool {
        self.comparator.compare(&self.bytes, &other.bytes) == Ordering::Equal
    }
}

impl Eq for CmpKey {}

impl PartialOrd for CmpKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CmpKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator.compare(&self.bytes, &other.bytes)
    }
}

/// Volatile sorted engine.
pub struct VolatileEngine {
    map: RwLock<BTreeMap<CmpKey, Vec<u8>>>,
    comparator: Arc<dyn Comparator>,
    _mmap: Option<MmapMut>,
}

impl VolatileEngine {
    /// Open in pure in-memory mode with `comparator`, no backing file.
    pub fn in_memory(comparator: Arc<dyn Comparator>) -> Self {
        VolatileEngine { map: RwLock::new(BTreeMap::new()), comparator, _mmap: None }
    }

    /// Open per `config`'s `comparator`/`path`/`size`/`create_if_missing`/
    /// `create_or_error_if_exists`. Data always starts empty: there is no
    /// WAL or recovery path, by design (see module docs).
    pub fn open(config: &Config) -> Result<Self> {
        let comparator: Arc<dyn Comparator> = config.comparator()?.unwrap_or_else(|| Arc::new(BinaryComparator));

        let mmap = match config.path() {
            Ok(path) => {
                let size = config.size().unwrap_or(DEFAULT_MMAP_SIZE);
                Some(open_backing_file(path, size, config.create_if_missing(), config.create_or_error_if_exists())?)
            }
            Err(_) => None,
        };

        Ok(VolatileEngine { map: RwLock::new(BTreeMap::new()), comparator, _mmap: mmap })
    }

    fn key(&self, bytes: &[u8]) -> CmpKey {
        CmpKey { bytes: bytes.to_vec(), comparator: self.comparator.clone() }
    }

    fn scan(
        &self,
        lower: Option<&[u8]>,
        lower_inclusive: bool,
        upper: Option<&[u8]>,
        upper_inclusive: bool,
        visit: &mut VisitFn<'_>,
    ) -> Result<()> {
        for (k, v) in self.map.read().iter() {
            if !between(self.comparator.as_ref(), &k.bytes, lower, lower_inclusive, upper, upper_inclusive) {
                continue;
            }
            if matches!(visit(&k.bytes, v), IterControl::Stop) {
                return Err(Error::new(kvengine_core::Status::StoppedByCb, "range scan stopped by callback"));
            }
        }
        Ok(())
    }

    fn count(&self, lower: Option<&[u8]>, lower_inclusive: bool, upper: Option<&[u8]>, upper_inclusive: bool) -> usize {
        self.map
            .read()
            .keys()
            .filter(|k| between(self.comparator.as_ref(), &k.bytes, lower, lower_inclusive, upper, upper_inclusive))
            .count()
    }
}

fn open_backing_file(path: &str, size: u64, create_if_missing: bool, create_or_error_if_exists: bool) -> Result<MmapMut> {
    let exists = Path::new(path).exists();
    if exists && create_or_error_if_exists {
        return Err(Error::invalid_argument(format!("path `{path}` already exists")));
    }
    if !exists && !create_if_missing {
        return Err(Error::not_found(format!("path `{path}` does not exist")));
    }
    let file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?;
    file.set_len(size)?;
    let mmap = unsafe { MmapMut::map_mut(&file)? };
    Ok(mmap)
}

impl Engine for VolatileEngine {
    fn name(&self) -> &'static str {
        "vsmap"
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(&self.key(key)).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map.write().insert(self.key(key), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &[u8]) -> Result<bool> {
        Ok(self.map.write().remove(&self.key(key)).is_some())
    }

    fn count_all(&self) -> Result<usize> {
        Ok(self.map.read().len())
    }

    fn count_above(&self, key: &[u8]) -> Result<usize> {
        Ok(self.count(Some(key), false, None, true))
    }

    fn count_below(&self, key: &[u8]) -> Result<usize> {
        Ok(self.count(None, true, Some(key), false))
    }

    fn count_between(&self, lower: &[u8], upper: &[u8]) -> Result<usize> {
        Ok(self.count(Some(lower), false, Some(upper), false))
    }

    fn get_all(&self, visit: &mut VisitFn<'_>) -> Result<()> {
        self.scan(None, true, None, true, visit)
    }

    fn get_above(&self, key: &[u8], visit: &mut VisitFn<'_>) -> Result<()> {
        self.scan(Some(key), false, None, true, visit)
    }

    fn get_below(&self, key: &[u8], visit: &mut VisitFn<'_>) -> Result<()> {
        self.scan(None, true, Some(key), false, visit)
    }

    fn get_between(&self, lower: &[u8], upper: &[u8], visit: &mut VisitFn<'_>) -> Result<()> {
        self.scan(Some(lower), false, Some(upper), false, visit)
    }

    fn new_iterator(&self) -> Result<Box<dyn EngineIterator + '_>> {
        Ok(Box::new(VolatileCursor::new(self)))
    }

    fn new_write_iterator(&self) -> Result<Box<dyn EngineWriteIterator + '_>> {
        Ok(Box::new(VolatileCursor::new(self)))
    }
}

/// Read/write cursor over a comparator-ordered snapshot of the map's keys
/// taken when the cursor was opened.
///
/// Grounded on `examples/original_source/src/engines/vsmap.h`'s iterator:
/// like the persistent radix engine (and unlike the skip list), `vsmap`'s
/// underlying ordered container supports reverse iteration, so the full
/// sorted surface including `seek_to_last`/`prev` is implemented here.
struct VolatileCursor<'a> {
    engine: &'a VolatileEngine,
    snapshot: Vec<Vec<u8>>,
    state: CursorState<usize>,
    writes: Vec<(usize, Vec<u8>)>,
}

impl<'a> VolatileCursor<'a> {
    fn new(engine: &'a VolatileEngine) -> Self {
        let snapshot = engine.map.read().keys().map(|k| k.bytes.clone()).collect();
        VolatileCursor { engine, snapshot, state: CursorState::Undefined, writes: Vec::new() }
    }

    fn cmp(&self) -> &dyn Comparator {
        self.engine.comparator.as_ref()
    }

    fn settle(&mut self, found: Option<usize>) -> Result<()> {
        self.writes.clear();
        match found {
            Some(idx) => {
                self.state = CursorState::Positioned(idx);
                Ok(())
            }
            None => {
                self.state = CursorState::Undefined;
                Err(Error::not_found("no matching key"))
            }
        }
    }

    fn current_value(&self) -> Result<Vec<u8>> {
        let idx = *self.state.get()?;
        let key = &self.snapshot[idx];
        self.engine.get(key)?.ok_or_else(|| Error::not_found("positioned record no longer present"))
    }
}

impl<'a> EngineIterator for VolatileCursor<'a> {
    fn seek(&mut self, key: &[u8]) -> Result<()> {
        let found = self.snapshot.binary_search_by(|k| self.cmp().compare(k, key)).ok();
        self.settle(found)
    }

    fn seek_lower(&mut self, key: &[u8]) -> Result<()> {
        let idx = self.snapshot.partition_point(|k| self.cmp().compare(k, key) == Ordering::Less);
        self.settle(idx.checked_sub(1))
    }

    fn seek_lower_eq(&mut self, key: &[u8]) -> Result<()> {
        let idx = self.snapshot.partition_point(|k| self.cmp().compare(k, key) != Ordering::Greater);
        self.settle(idx.checked_sub(1))
    }

    fn seek_higher(&mut self, key: &[u8]) -> Result<()> {
        let idx = self.snapshot.partition_point(|k| self.cmp().compare(k, key) != Ordering::Greater);
        self.settle((idx < self.snapshot.len()).then_some(idx))
    }

    fn seek_higher_eq(&mut self, key: &[u8]) -> Result<()> {
        let idx = self.snapshot.partition_point(|k| self.cmp().compare(k, key) == Ordering::Less);
        self.settle((idx < self.snapshot.len()).then_some(idx))
    }

    fn seek_to_first(&mut self) -> Result<()> {
        self.settle((!self.snapshot.is_empty()).then_some(0))
    }

    fn seek_to_last(&mut self) -> Result<()> {
        self.settle(self.snapshot.len().checked_sub(1))
    }

    fn is_next(&self) -> bool {
        matches!(self.state, CursorState::Positioned(idx) if idx + 1 < self.snapshot.len())
    }

    fn next(&mut self) -> Result<()> {
        let idx = *self.state.get()?;
        self.settle((idx + 1 < self.snapshot.len()).then_some(idx + 1))
    }

    fn prev(&mut self) -> Result<()> {
        let idx = *self.state.get()?;
        self.settle(idx.checked_sub(1))
    }

    fn key(&self) -> Result<Vec<u8>> {
        let idx = *self.state.get()?;
        Ok(self.snapshot[idx].clone())
    }

    fn read_range(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        Ok(clamp_range(&self.current_value()?, offset, len).to_vec())
    }
}

impl<'a> EngineWriteIterator for VolatileCursor<'a> {
    fn write_range(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.state.get()?;
        self.writes.push((offset, data.to_vec()));
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let idx = *self.state.get()?;
        let key = self.snapshot[idx].clone();
        let mut value = self
            .engine
            .get(&key)?
            .ok_or_else(|| Error::not_found("positioned record no longer present"))?;
        for (offset, data) in self.writes.drain(..) {
            let end = offset + data.len();
            if end > value.len() {
                value.resize(end, 0);
            }
            value[offset..end].copy_from_slice(&data);
        }
        self.engine.put(&key, &value)
    }

    fn abort(&mut self) {
        self.writes.clear();
    }
}

/// Constructs [`VolatileEngine`] instances.
#[derive(Debug, Default)]
pub struct VolatileFactory;

impl EngineFactory for VolatileFactory {
    fn name(&self) -> &'static str {
        "vsmap"
    }

    fn open(&self, config: &Config) -> Result<Arc<dyn Engine>> {
        Ok(Arc::new(VolatileEngine::open(config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> VolatileEngine {
        VolatileEngine::in_memory(Arc::new(BinaryComparator))
    }

    #[test]
    fn put_get_remove_roundtrip() {
        let engine = engine();
        engine.put(b"k", b"v").unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Some(b"v".to_vec()));
        assert!(engine.remove(b"k").unwrap());
        assert_eq!(engine.get(b"k").unwrap(), None);
    }

    #[test]
    fn range_ops_respect_order() {
        let engine = engine();
        for k in [b"a".as_slice(), b"b", b"c"] {
            engine.put(k, k).unwrap();
        }
        assert_eq!(engine.count_above(b"a").unwrap(), 2);
        assert_eq!(engine.count_between(b"a", b"c").unwrap(), 1);
    }

    #[test]
    fn cursor_supports_full_sorted_surface() {
        let engine = engine();
        for k in [b"a".as_slice(), b"b", b"c"] {
            engine.put(k, k).unwrap();
        }
        let mut it = engine.new_iterator().unwrap();
        it.seek_to_last().unwrap();
        assert_eq!(it.key().unwrap(), b"c");
        it.prev().unwrap();
        assert_eq!(it.key().unwrap(), b"b");
        assert!(it.is_next());
    }

    #[test]
    fn write_iterator_write_range_then_commit_is_visible() {
        let engine = engine();
        engine.put(b"k", b"value").unwrap();
        let mut it = engine.new_write_iterator().unwrap();
        it.seek(b"k").unwrap();
        it.write_range(0, b"xxxxx").unwrap();
        it.commit().unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Some(b"xxxxx".to_vec()));
    }

    #[test]
    fn backing_file_is_reserved_but_data_does_not_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool").to_string_lossy().to_string();
        let mut cfg = Config::new();
        cfg.put_string("path", path.clone());
        cfg.put_uint64("create_if_missing", 1);

        {
            let engine = VolatileEngine::open(&cfg).unwrap();
            engine.put(b"k", b"v").unwrap();
        }
        assert!(Path::new(&path).exists());

        let reopened = VolatileEngine::open(&cfg).unwrap();
        assert_eq!(reopened.get(b"k").unwrap(), None);
    }

    #[test]
    fn conformance_suite() {
        use kvengine_engine::conformance::*;
        put_then_get_roundtrips(&engine());
        get_missing_is_not_an_error(&engine());
        put_overwrites_existing_value(&engine());
        remove_present_key(&engine());
        remove_missing_key_returns_false(&engine());
        binary_keys_and_values_are_safe(&engine());
        empty_value_is_valid(&engine());
    }
}
