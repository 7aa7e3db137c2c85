//! Read and write cursor contracts.
//!
//! Grounded on `examples/original_source/src/iterator.h`'s `iterator_base`:
//! `seek*`/`is_next`/`next`/`prev`/`key` form the navigation surface every
//! cursor supports to the extent its engine's ordering allows (the hash
//! engines support none of it; the sorted engines support all of it); a
//! write cursor adds the buffered range-modify/commit/abort surface.

use kvengine_core::{Error, Result};

/// A read-only cursor over an engine's keys.
///
/// Default method bodies return `Status::NotSupported`; sorted engines
/// (`csmap`, `radix`, `vsmap`) override the navigation methods their
/// ordering actually supports. `cmap` implements only `seek` — an
/// unordered engine has no meaningful `next`/`prev`/`seek_to_first`.
/// `blackhole` implements a trivial cursor (`seek` always succeeds,
/// nothing is ever positioned). `robinhood` does not implement this trait
/// at all — `Engine::new_iterator` stays at its default.
pub trait EngineIterator {
    /// Position the cursor exactly at `key`. `Status::NotFound` if absent.
    fn seek(&mut self, key: &[u8]) -> Result<()>;

    /// Position at the greatest key strictly less than `key`.
    fn seek_lower(&mut self, _key: &[u8]) -> Result<()> {
        Err(Error::not_supported("seek_lower"))
    }

    /// Position at the greatest key less than or equal to `key`.
    fn seek_lower_eq(&mut self, _key: &[u8]) -> Result<()> {
        Err(Error::not_supported("seek_lower_eq"))
    }

    /// Position at the least key strictly greater than `key`.
    fn seek_higher(&mut self, _key: &[u8]) -> Result<()> {
        Err(Error::not_supported("seek_higher"))
    }

    /// Position at the least key greater than or equal to `key`.
    fn seek_higher_eq(&mut self, _key: &[u8]) -> Result<()> {
        Err(Error::not_supported("seek_higher_eq"))
    }

    /// Position at the first key in iteration order.
    fn seek_to_first(&mut self) -> Result<()> {
        Err(Error::not_supported("seek_to_first"))
    }

    /// Position at the last key in iteration order.
    fn seek_to_last(&mut self) -> Result<()> {
        Err(Error::not_supported("seek_to_last"))
    }

    /// Whether `next()` would move to another entry.
    fn is_next(&self) -> bool;

    /// Advance to the next key in iteration order.
    fn next(&mut self) -> Result<()>;

    /// Move to the previous key in iteration order.
    fn prev(&mut self) -> Result<()> {
        Err(Error::not_supported("prev"))
    }

    /// The key the cursor currently sits on.
    fn key(&self) -> Result<Vec<u8>>;

    /// Read `len` bytes of the current entry's value starting at `offset`.
    fn read_range(&self, offset: usize, len: usize) -> Result<Vec<u8>>;
}

/// A read-write cursor: [`EngineIterator`] plus a staged, commit/abort
/// range-modify surface, so a caller can overwrite part of a value in
/// place without reading the whole thing back.
pub trait EngineWriteIterator: EngineIterator {
    /// Stage an in-place overwrite of `data` at `offset` in the current
    /// entry's value. Not visible to other readers until [`commit`](Self::commit).
    fn write_range(&mut self, offset: usize, data: &[u8]) -> Result<()>;

    /// Apply every staged write since the last commit/abort.
    fn commit(&mut self) -> Result<()>;

    /// Discard every staged write since the last commit/abort.
    fn abort(&mut self);
}
