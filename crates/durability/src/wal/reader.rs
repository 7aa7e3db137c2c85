//! WAL reader for recovery and replay.

use crate::format::{WalRecord, WalRecordError, WalSegment, SEGMENT_HEADER_SIZE};
use std::io::Read;
use std::path::Path;

/// Maximum number of bytes to scan forward when searching for the next
/// valid record after encountering corruption during WAL recovery.
const MAX_RECOVERY_SCAN_WINDOW: usize = 1_024 * 1_024;

/// Reads records back out of WAL segments for recovery.
pub struct WalReader;

impl WalReader {
    /// Construct a reader.
    pub fn new() -> Self {
        WalReader
    }

    /// Read all records from a single segment, stopping at the first
    /// invalid/incomplete record. The returned offset marks where valid
    /// records end, for truncation.
    pub fn read_segment(
        &self,
        wal_dir: &Path,
        segment_number: u64,
    ) -> Result<(Vec<WalRecord>, u64, ReadStopReason, usize), WalReaderError> {
        let mut segment = WalSegment::open_read(wal_dir, segment_number)
            .map_err(|e| WalReaderError::IoError(e.to_string()))?;
        self.read_segment_from(&mut segment)
    }

    /// Read records from an already-opened segment.
    pub fn read_segment_from(
        &self,
        segment: &mut WalSegment,
    ) -> Result<(Vec<WalRecord>, u64, ReadStopReason, usize), WalReaderError> {
        let mut records = Vec::new();
        let hdr_size = SEGMENT_HEADER_SIZE as u64;
        let mut valid_end = hdr_size;

        segment
            .seek_to(hdr_size)
            .map_err(|e| WalReaderError::IoError(e.to_string()))?;

        let mut buffer = Vec::new();
        segment
            .file_mut()
            .read_to_end(&mut buffer)
            .map_err(|e| WalReaderError::IoError(e.to_string()))?;

        let mut offset = 0;
        let mut stop_reason = ReadStopReason::EndOfData;
        let mut skipped_corrupted = 0usize;

        while offset < buffer.len() {
            let remaining = &buffer[offset..];
            match WalRecord::from_bytes(remaining) {
                Ok((record, consumed)) => {
                    records.push(record);
                    offset += consumed;
                    valid_end = hdr_size + offset as u64;
                }
                Err(WalRecordError::InsufficientData) => {
                    stop_reason = ReadStopReason::PartialRecord;
                    break;
                }
                Err(WalRecordError::ChecksumMismatch { .. }) => {
                    let scan_start = offset + 1;
                    let scan_end = (offset + MAX_RECOVERY_SCAN_WINDOW).min(buffer.len());
                    let mut found = false;

                    for scan_offset in scan_start..scan_end {
                        if WalRecord::from_bytes(&buffer[scan_offset..]).is_ok() {
                            tracing::warn!(
                                corrupted_offset = offset,
                                resumed_offset = scan_offset,
                                skipped_bytes = scan_offset - offset,
                                "skipped corrupted WAL region, found valid record"
                            );
                            offset = scan_offset;
                            skipped_corrupted += 1;
                            found = true;
                            break;
                        }
                    }

                    if found {
                        continue;
                    }

                    stop_reason = ReadStopReason::ChecksumMismatch { offset };
                    break;
                }
                Err(e) => {
                    stop_reason = ReadStopReason::ParseError {
                        offset,
                        detail: e.to_string(),
                    };
                    break;
                }
            }
        }

        Ok((records, valid_end, stop_reason, skipped_corrupted))
    }

    /// Read all records from all segments in a WAL directory, in order.
    pub fn read_all(&self, wal_dir: &Path) -> Result<WalReadResult, WalReaderError> {
        let segments = self.list_segments(wal_dir)?;

        let mut all_records = Vec::new();
        let mut truncate_info = None;
        let mut last_stop_reason = ReadStopReason::EndOfData;
        let mut total_skipped_corrupted = 0usize;

        for (idx, segment_num) in segments.iter().enumerate() {
            let (records, valid_end, stop_reason, skipped) = self.read_segment(wal_dir, *segment_num)?;
            all_records.extend(records);
            last_stop_reason = stop_reason;
            total_skipped_corrupted += skipped;

            if idx == segments.len() - 1 {
                let segment = WalSegment::open_read(wal_dir, *segment_num)
                    .map_err(|e| WalReaderError::IoError(e.to_string()))?;
                if valid_end < segment.size() {
                    truncate_info = Some(TruncateInfo {
                        segment_number: *segment_num,
                        valid_end,
                        original_size: segment.size(),
                    });
                }
            }
        }

        Ok(WalReadResult {
            records: all_records,
            truncate_info,
            stop_reason: last_stop_reason,
            skipped_corrupted: total_skipped_corrupted,
        })
    }

    /// Read all records with `seq` greater than `watermark`, across all
    /// segments. Used to resume replay after a snapshot.
    pub fn read_all_after_watermark(&self, wal_dir: &Path, watermark: u64) -> Result<Vec<WalRecord>, WalReaderError> {
        let result = self.read_all(wal_dir)?;
        Ok(result.records.into_iter().filter(|r| r.seq > watermark).collect())
    }

    /// List all segment numbers present in the WAL directory, ascending.
    pub fn list_segments(&self, wal_dir: &Path) -> Result<Vec<u64>, WalReaderError> {
        let mut segments = Vec::new();
        let entries = std::fs::read_dir(wal_dir).map_err(|e| WalReaderError::IoError(e.to_string()))?;

        for entry in entries {
            let entry = entry.map_err(|e| WalReaderError::IoError(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("wal-") && name.ends_with(".seg") && name.len() >= 14 {
                if let Ok(num) = name[4..10].parse::<u64>() {
                    segments.push(num);
                }
            }
        }

        segments.sort();
        Ok(segments)
    }

    /// Highest `seq` across all segments, if any records exist.
    pub fn max_seq(&self, wal_dir: &Path) -> Result<Option<u64>, WalReaderError> {
        let result = self.read_all(wal_dir)?;
        Ok(result.records.iter().map(|r| r.seq).max())
    }
}

impl Default for WalReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Reason record reading stopped before the end of a segment's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStopReason {
    /// Read every record to the end of the segment's data.
    EndOfData,
    /// A partial record trails the segment (expected after a crash mid-write).
    PartialRecord,
    /// A CRC32 mismatch was detected; the region is corrupted.
    ChecksumMismatch {
        /// Byte offset within the segment's record area.
        offset: usize,
    },
    /// The checksum was valid but the payload could not be parsed — a
    /// format version mismatch, not corruption.
    ParseError {
        /// Byte offset within the segment's record area.
        offset: usize,
        /// Human-readable detail.
        detail: String,
    },
}

/// Result of reading every segment in a WAL directory.
#[derive(Debug)]
pub struct WalReadResult {
    /// Every valid record, in order.
    pub records: Vec<WalRecord>,
    /// Truncation needed for the tail segment, if any.
    pub truncate_info: Option<TruncateInfo>,
    /// Why reading stopped.
    pub stop_reason: ReadStopReason,
    /// Count of corrupted regions skipped during recovery.
    pub skipped_corrupted: usize,
}

/// Describes a trailing segment that needs truncating back to its last
/// valid record before resuming writes.
#[derive(Debug, Clone)]
pub struct TruncateInfo {
    /// The segment's number.
    pub segment_number: u64,
    /// Offset where valid data ends.
    pub valid_end: u64,
    /// The file's size on disk before truncation.
    pub original_size: u64,
}

impl TruncateInfo {
    /// Bytes that need to be truncated off the end of the segment.
    pub fn bytes_to_truncate(&self) -> u64 {
        self.original_size - self.valid_end
    }
}

/// WAL reader errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalReaderError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    IoError(String),
    /// Referenced segment does not exist.
    #[error("segment not found: {0}")]
    SegmentNotFound(u64),
}
