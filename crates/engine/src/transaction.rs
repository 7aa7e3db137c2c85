//! The batched-transaction contract.
//!
//! Grounded on `examples/original_source/src/transaction.h`: a minimal
//! put/remove/commit/abort surface, no isolation or read operations —
//! a transaction stages writes and applies them atomically on commit.

use kvengine_core::Result;

/// A batch of puts/removes applied atomically on [`commit`](Transaction::commit).
///
/// Dropping a `Transaction` without calling `commit` discards the batch,
/// the same as calling [`abort`](Transaction::abort) explicitly.
pub trait Transaction {
    /// Stage a put, to be applied on commit.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Stage a remove, to be applied on commit.
    fn remove(&mut self, key: &[u8]) -> Result<()>;

    /// Apply every staged operation atomically.
    fn commit(&mut self) -> Result<()>;

    /// Discard every staged operation.
    fn abort(&mut self);
}
