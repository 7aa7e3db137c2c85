//! On-disk byte formats for the WAL.
//!
//! - `wal_record`: WAL segment header and record format

pub mod wal_record;

pub use wal_record::{
    MutationOp, SegmentHeader, WalRecord, WalRecordError, WalSegment, SEGMENT_FORMAT_VERSION,
    SEGMENT_HEADER_SIZE, SEGMENT_MAGIC, WAL_RECORD_FORMAT_VERSION,
};
