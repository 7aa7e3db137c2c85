//! WAL segments, durability modes, and pool open/create semantics for
//! persistent engines.
//!
//! - `format`: on-disk WAL segment/record byte layout
//! - `wal`: durability modes, WAL configuration, segmented writer/reader
//! - `pool`: pool directory layout and open/create semantics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod pool;
pub mod wal;

pub use format::{MutationOp, SegmentHeader, WalRecord, WalRecordError, WalSegment};
pub use pool::{open_pool, PoolHandle, PoolPaths};
pub use wal::{DurabilityMode, ReadStopReason, TruncateInfo, WalConfig, WalConfigError, WalReadResult, WalReader, WalReaderError, WalWriter};
