//! WAL writer with durability-mode-aware fsync behavior.

use super::config::WalConfig;
use super::DurabilityMode;
use crate::format::{WalRecord, WalSegment, SEGMENT_HEADER_SIZE};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Appends [`WalRecord`]s to rotating segments, fsyncing per the configured
/// [`DurabilityMode`].
pub struct WalWriter {
    segment: Option<WalSegment>,
    durability: DurabilityMode,
    wal_dir: PathBuf,
    config: WalConfig,
    bytes_since_sync: u64,
    writes_since_sync: usize,
    last_sync_time: Instant,
    current_segment_number: u64,
}

impl WalWriter {
    /// Open (resuming the last segment if present) or create a WAL writer.
    /// `DurabilityMode::InMemory` creates no files.
    pub fn open(wal_dir: PathBuf, durability: DurabilityMode, config: WalConfig) -> std::io::Result<Self> {
        if !durability.requires_wal() {
            return Ok(WalWriter {
                segment: None,
                durability,
                wal_dir,
                config,
                bytes_since_sync: 0,
                writes_since_sync: 0,
                last_sync_time: Instant::now(),
                current_segment_number: 0,
            });
        }

        std::fs::create_dir_all(&wal_dir)?;
        let latest = Self::find_latest_segment(&wal_dir);

        let (segment, segment_number) = match latest {
            Some(num) => match WalSegment::open_append(&wal_dir, num) {
                Ok(seg) => (seg, num),
                Err(_) => {
                    let new_num = num + 1;
                    (WalSegment::create(&wal_dir, new_num)?, new_num)
                }
            },
            None => (WalSegment::create(&wal_dir, 1)?, 1),
        };

        Ok(WalWriter {
            segment: Some(segment),
            durability,
            wal_dir,
            config,
            bytes_since_sync: 0,
            writes_since_sync: 0,
            last_sync_time: Instant::now(),
            current_segment_number: segment_number,
        })
    }

    /// Append a record, rotating segments and fsyncing as the durability
    /// mode requires. A no-op under `DurabilityMode::InMemory`.
    pub fn append(&mut self, record: &WalRecord) -> std::io::Result<()> {
        if !self.durability.requires_wal() {
            return Ok(());
        }

        let encoded = record.to_bytes();
        let segment = self.segment.as_mut().expect("segment exists for wal-backed mode");
        if segment.size() + encoded.len() as u64 > self.config.segment_size {
            self.rotate_segment()?;
        }

        let segment = self.segment.as_mut().unwrap();
        segment.write(&encoded)?;
        self.bytes_since_sync += encoded.len() as u64;
        self.writes_since_sync += 1;
        self.maybe_sync()
    }

    fn maybe_sync(&mut self) -> std::io::Result<()> {
        let should_sync = match self.durability {
            DurabilityMode::Strict => true,
            DurabilityMode::Batched { interval_ms, batch_size } => {
                self.writes_since_sync >= batch_size
                    || self.last_sync_time.elapsed().as_millis() as u64 >= interval_ms
                    || self.bytes_since_sync >= self.config.buffered_sync_bytes
            }
            DurabilityMode::InMemory => false,
        };

        if should_sync {
            if let Some(segment) = self.segment.as_mut() {
                segment.sync()?;
            }
            self.bytes_since_sync = 0;
            self.writes_since_sync = 0;
            self.last_sync_time = Instant::now();
        }
        Ok(())
    }

    fn rotate_segment(&mut self) -> std::io::Result<()> {
        if let Some(segment) = self.segment.as_mut() {
            segment.close()?;
        }
        self.current_segment_number += 1;
        self.segment = Some(WalSegment::create(&self.wal_dir, self.current_segment_number)?);
        self.bytes_since_sync = 0;
        self.writes_since_sync = 0;
        self.last_sync_time = Instant::now();
        Ok(())
    }

    /// Force an fsync regardless of durability mode.
    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(segment) = self.segment.as_mut() {
            segment.sync()?;
        }
        self.bytes_since_sync = 0;
        self.writes_since_sync = 0;
        self.last_sync_time = Instant::now();
        Ok(())
    }

    /// The current segment number.
    pub fn current_segment(&self) -> u64 {
        self.current_segment_number
    }

    /// The WAL directory.
    pub fn wal_dir(&self) -> &Path {
        &self.wal_dir
    }

    fn find_latest_segment(dir: &Path) -> Option<u64> {
        std::fs::read_dir(dir)
            .ok()?
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                if name.starts_with("wal-") && name.ends_with(".seg") && name.len() >= 14 {
                    name[4..10].parse::<u64>().ok()
                } else {
                    None
                }
            })
            .max()
    }

    /// Close the writer, flushing and closing the active segment.
    pub fn close(mut self) -> std::io::Result<()> {
        self.flush()?;
        if let Some(segment) = self.segment.as_mut() {
            segment.close()?;
        }
        Ok(())
    }
}
