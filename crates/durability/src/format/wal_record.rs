//! WAL segment file and record format.
//!
//! WAL segments are named `wal-NNNNNN.seg` where `NNNNNN` is a zero-padded
//! segment number, the same naming the teacher's durability layer used for
//! its transaction log (`stratadb-labs-strata-core/crates/durability/src/format/wal_record.rs`).
//! A kvengine WAL record carries one mutation — a put or a remove — rather
//! than a whole transaction's writeset, since the facade's batched
//! transactions apply their staged operations directly to the engine and do
//! not themselves need a WAL entry; persistent engines log each individual
//! mutation as it lands.
//!
//! # Segment layout
//!
//! ```text
//! ┌────────────────────────────────────┐
//! │ Segment header (32 bytes)          │
//! ├────────────────────────────────────┤
//! │ Record 1 │ Record 2 │ ...          │
//! └────────────────────────────────────┘
//! ```
//!
//! # Record layout
//!
//! ```text
//! ┌─────────────────┬──────────────┬─────────────────────┬──────────┐
//! │ Length (4 bytes)│ Format Ver(1)│ Payload (variable)  │ CRC32 (4)│
//! └─────────────────┴──────────────┴─────────────────────┴──────────┘
//! ```

use crc32fast::Hasher;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes identifying a kvengine WAL segment file.
pub const SEGMENT_MAGIC: [u8; 4] = *b"KVWL";

/// Current segment format version.
pub const SEGMENT_FORMAT_VERSION: u32 = 1;

/// Size of the segment header in bytes.
pub const SEGMENT_HEADER_SIZE: usize = 16;

/// Current WAL record format version.
pub const WAL_RECORD_FORMAT_VERSION: u8 = 1;

/// WAL segment header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Magic bytes (`KVWL`).
    pub magic: [u8; 4],
    /// Format version, for forward compatibility.
    pub format_version: u32,
    /// Segment number, monotonically increasing.
    pub segment_number: u64,
}

impl SegmentHeader {
    /// Construct a header for a new segment.
    pub fn new(segment_number: u64) -> Self {
        SegmentHeader {
            magic: SEGMENT_MAGIC,
            format_version: SEGMENT_FORMAT_VERSION,
            segment_number,
        }
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> [u8; SEGMENT_HEADER_SIZE] {
        let mut bytes = [0u8; SEGMENT_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..8].copy_from_slice(&self.format_version.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.segment_number.to_le_bytes());
        bytes
    }

    /// Deserialize from bytes.
    pub fn from_bytes(bytes: &[u8; SEGMENT_HEADER_SIZE]) -> Option<Self> {
        Some(SegmentHeader {
            magic: bytes[0..4].try_into().ok()?,
            format_version: u32::from_le_bytes(bytes[4..8].try_into().ok()?),
            segment_number: u64::from_le_bytes(bytes[8..16].try_into().ok()?),
        })
    }

    /// Whether the magic bytes are intact.
    pub fn is_valid(&self) -> bool {
        self.magic == SEGMENT_MAGIC
    }
}

/// A WAL segment file handle. Only the active segment is writable; closed
/// segments are immutable.
pub struct WalSegment {
    file: File,
    segment_number: u64,
    write_position: u64,
    path: PathBuf,
    closed: bool,
}

impl WalSegment {
    /// Create a new segment file and write its header.
    pub fn create(dir: &Path, segment_number: u64) -> std::io::Result<Self> {
        let path = Self::segment_path(dir, segment_number);
        let mut file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .read(true)
            .open(&path)?;
        file.write_all(&SegmentHeader::new(segment_number).to_bytes())?;
        Ok(WalSegment {
            file,
            segment_number,
            write_position: SEGMENT_HEADER_SIZE as u64,
            path,
            closed: false,
        })
    }

    /// Open an existing segment for reading.
    pub fn open_read(dir: &Path, segment_number: u64) -> std::io::Result<Self> {
        let path = Self::segment_path(dir, segment_number);
        let mut file = OpenOptions::new().read(true).open(&path)?;
        let header = Self::read_header(&mut file, segment_number)?;
        let write_position = file.seek(SeekFrom::End(0))?;
        Ok(WalSegment {
            file,
            segment_number: header.segment_number,
            write_position,
            path,
            closed: true,
        })
    }

    /// Open an existing segment for appending.
    pub fn open_append(dir: &Path, segment_number: u64) -> std::io::Result<Self> {
        let path = Self::segment_path(dir, segment_number);
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;
        let header = Self::read_header(&mut file, segment_number)?;
        let write_position = file.seek(SeekFrom::End(0))?;
        Ok(WalSegment {
            file,
            segment_number: header.segment_number,
            write_position,
            path,
            closed: false,
        })
    }

    fn read_header(file: &mut File, expected: u64) -> std::io::Result<SegmentHeader> {
        let mut header_bytes = [0u8; SEGMENT_HEADER_SIZE];
        file.read_exact(&mut header_bytes)?;
        let header = SegmentHeader::from_bytes(&header_bytes).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid segment header")
        })?;
        if !header.is_valid() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "invalid segment magic bytes",
            ));
        }
        if header.segment_number != expected {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "segment number mismatch: expected {expected}, got {}",
                    header.segment_number
                ),
            ));
        }
        Ok(header)
    }

    /// `wal-NNNNNN.seg` path for a segment number.
    pub fn segment_path(dir: &Path, segment_number: u64) -> PathBuf {
        dir.join(format!("wal-{segment_number:06}.seg"))
    }

    /// This segment's number.
    pub fn segment_number(&self) -> u64 {
        self.segment_number
    }

    /// Current size in bytes, including the header.
    pub fn size(&self) -> u64 {
        self.write_position
    }

    /// The file path on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append bytes, failing if the segment is closed.
    pub fn write(&mut self, data: &[u8]) -> std::io::Result<()> {
        if self.closed {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "cannot write to a closed segment",
            ));
        }
        self.file.write_all(data)?;
        self.write_position += data.len() as u64;
        Ok(())
    }

    /// fsync the segment file.
    pub fn sync(&mut self) -> std::io::Result<()> {
        self.file.sync_all()
    }

    /// Mark the segment closed (immutable), syncing first.
    pub fn close(&mut self) -> std::io::Result<()> {
        if !self.closed {
            self.file.sync_all()?;
            self.closed = true;
        }
        Ok(())
    }

    /// Whether the segment is closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mutable access to the underlying file, for reading.
    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }

    /// Seek to an absolute position, for reading.
    pub fn seek_to(&mut self, position: u64) -> std::io::Result<u64> {
        self.file.seek(SeekFrom::Start(position))
    }
}

/// A single logged mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOp {
    /// Insert or overwrite.
    Put {
        /// The key.
        key: Vec<u8>,
        /// The value.
        value: Vec<u8>,
    },
    /// Remove a key.
    Remove {
        /// The key.
        key: Vec<u8>,
    },
}

/// A WAL record: one mutation, self-delimiting with a length prefix and a
/// CRC32 checksum. Records are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The mutation this record represents.
    pub op: MutationOp,
}

impl WalRecord {
    /// Construct a put record.
    pub fn put(seq: u64, key: Vec<u8>, value: Vec<u8>) -> Self {
        WalRecord {
            seq,
            op: MutationOp::Put { key, value },
        }
    }

    /// Construct a remove record.
    pub fn remove(seq: u64, key: Vec<u8>) -> Self {
        WalRecord {
            seq,
            op: MutationOp::Remove { key },
        }
    }

    /// Serialize to bytes: `length(4) + format_version(1) + payload + crc32(4)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.push(WAL_RECORD_FORMAT_VERSION);
        payload.extend_from_slice(&self.seq.to_le_bytes());
        match &self.op {
            MutationOp::Put { key, value } => {
                payload.push(0);
                payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
                payload.extend_from_slice(key);
                payload.extend_from_slice(&(value.len() as u32).to_le_bytes());
                payload.extend_from_slice(value);
            }
            MutationOp::Remove { key } => {
                payload.push(1);
                payload.extend_from_slice(&(key.len() as u32).to_le_bytes());
                payload.extend_from_slice(key);
            }
        }

        let crc = Self::compute_crc(&payload);
        let total_len = payload.len() + 4;
        let mut record = Vec::with_capacity(4 + total_len);
        record.extend_from_slice(&(total_len as u32).to_le_bytes());
        record.extend_from_slice(&payload);
        record.extend_from_slice(&crc.to_le_bytes());
        record
    }

    /// Parse one record from the front of `bytes`, returning it and the
    /// number of bytes consumed.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, usize), WalRecordError> {
        if bytes.len() < 4 {
            return Err(WalRecordError::InsufficientData);
        }
        let length = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
        if length < 5 {
            return Err(WalRecordError::InvalidFormat);
        }
        if bytes.len() < 4 + length {
            return Err(WalRecordError::InsufficientData);
        }

        let payload_with_crc = &bytes[4..4 + length];
        let payload = &payload_with_crc[..length - 4];
        let stored_crc = u32::from_le_bytes(payload_with_crc[length - 4..].try_into().unwrap());
        let computed_crc = Self::compute_crc(payload);
        if computed_crc != stored_crc {
            return Err(WalRecordError::ChecksumMismatch {
                expected: stored_crc,
                computed: computed_crc,
            });
        }

        if payload.len() < 13 {
            return Err(WalRecordError::InvalidFormat);
        }
        let format_version = payload[0];
        if format_version != WAL_RECORD_FORMAT_VERSION {
            return Err(WalRecordError::UnsupportedVersion(format_version));
        }
        let seq = u64::from_le_bytes(payload[1..9].try_into().unwrap());
        let tag = payload[9];
        let rest = &payload[10..];

        let op = match tag {
            0 => {
                if rest.len() < 4 {
                    return Err(WalRecordError::InvalidFormat);
                }
                let key_len = u32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
                if rest.len() < 4 + key_len + 4 {
                    return Err(WalRecordError::InvalidFormat);
                }
                let key = rest[4..4 + key_len].to_vec();
                let value_len_off = 4 + key_len;
                let value_len = u32::from_le_bytes(
                    rest[value_len_off..value_len_off + 4].try_into().unwrap(),
                ) as usize;
                let value_off = value_len_off + 4;
                if rest.len() < value_off + value_len {
                    return Err(WalRecordError::InvalidFormat);
                }
                let value = rest[value_off..value_off + value_len].to_vec();
                MutationOp::Put { key, value }
            }
            1 => {
                if rest.len() < 4 {
                    return Err(WalRecordError::InvalidFormat);
                }
                let key_len = u32::from_le_bytes(rest[0..4].try_into().unwrap()) as usize;
                if rest.len() < 4 + key_len {
                    return Err(WalRecordError::InvalidFormat);
                }
                let key = rest[4..4 + key_len].to_vec();
                MutationOp::Remove { key }
            }
            other => return Err(WalRecordError::UnknownOpTag(other)),
        };

        Ok((WalRecord { seq, op }, 4 + length))
    }

    fn compute_crc(data: &[u8]) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(data);
        hasher.finalize()
    }
}

/// WAL record parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalRecordError {
    /// Not enough bytes to parse a full record.
    #[error("insufficient data to parse record")]
    InsufficientData,
    /// Record framing is malformed.
    #[error("invalid record format")]
    InvalidFormat,
    /// CRC32 verification failed.
    #[error("checksum mismatch: expected {expected:08x}, computed {computed:08x}")]
    ChecksumMismatch {
        /// Checksum stored in the record.
        expected: u32,
        /// Checksum computed from the payload.
        computed: u32,
    },
    /// Record format version newer than this build understands.
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),
    /// Mutation op tag not recognised.
    #[error("unknown mutation op tag: {0}")]
    UnknownOpTag(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn segment_header_roundtrip() {
        let header = SegmentHeader::new(12345);
        let bytes = header.to_bytes();
        let parsed = SegmentHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.is_valid());
    }

    #[test]
    fn segment_path_format() {
        let dir = Path::new("/tmp/wal");
        assert_eq!(
            WalSegment::segment_path(dir, 1),
            PathBuf::from("/tmp/wal/wal-000001.seg")
        );
    }

    #[test]
    fn segment_create_write_reopen() {
        let dir = tempdir().unwrap();
        let mut segment = WalSegment::create(dir.path(), 1).unwrap();
        segment.write(b"hello").unwrap();
        segment.close().unwrap();

        let reopened = WalSegment::open_read(dir.path(), 1).unwrap();
        assert_eq!(reopened.size(), SEGMENT_HEADER_SIZE as u64 + 5);
    }

    #[test]
    fn put_record_roundtrips() {
        let record = WalRecord::put(1, b"k".to_vec(), b"v".to_vec());
        let bytes = record.to_bytes();
        let (parsed, consumed) = WalRecord::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn remove_record_roundtrips() {
        let record = WalRecord::remove(2, b"gone".to_vec());
        let bytes = record.to_bytes();
        let (parsed, _) = WalRecord::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn corrupted_record_fails_checksum() {
        let record = WalRecord::put(1, b"k".to_vec(), b"v".to_vec());
        let mut bytes = record.to_bytes();
        let last = bytes.len() - 6;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            WalRecord::from_bytes(&bytes),
            Err(WalRecordError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncated_record_is_insufficient_data() {
        let record = WalRecord::put(1, b"k".to_vec(), b"v".to_vec());
        let bytes = record.to_bytes();
        assert!(matches!(
            WalRecord::from_bytes(&bytes[..bytes.len() - 2]),
            Err(WalRecordError::InsufficientData)
        ));
    }
}
