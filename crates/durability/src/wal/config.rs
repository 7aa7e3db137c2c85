//! WAL configuration.

/// Tunable WAL parameters.
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// Maximum segment size in bytes before rotating to a new segment.
    pub segment_size: u64,
    /// Bytes written between fsyncs in `Batched` mode.
    pub buffered_sync_bytes: u64,
}

impl Default for WalConfig {
    fn default() -> Self {
        WalConfig {
            segment_size: 64 * 1024 * 1024,
            buffered_sync_bytes: 4 * 1024 * 1024,
        }
    }
}

impl WalConfig {
    /// Default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set segment size.
    pub fn with_segment_size(mut self, size: u64) -> Self {
        self.segment_size = size;
        self
    }

    /// Builder: set the buffered-sync byte threshold.
    pub fn with_buffered_sync_bytes(mut self, bytes: u64) -> Self {
        self.buffered_sync_bytes = bytes;
        self
    }

    /// Small segment size, for fast-rotating tests.
    pub fn for_testing() -> Self {
        WalConfig {
            segment_size: 64 * 1024,
            buffered_sync_bytes: 16 * 1024,
        }
    }

    /// Validate internal consistency.
    pub fn validate(&self) -> Result<(), WalConfigError> {
        if self.segment_size < 1024 {
            return Err(WalConfigError::SegmentSizeTooSmall);
        }
        if self.buffered_sync_bytes > self.segment_size {
            return Err(WalConfigError::BufferedSyncExceedsSegment);
        }
        Ok(())
    }
}

/// WAL configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalConfigError {
    /// `segment_size` below the 1KB floor.
    #[error("segment size must be at least 1KB")]
    SegmentSizeTooSmall,
    /// `buffered_sync_bytes` larger than `segment_size`.
    #[error("buffered sync threshold cannot exceed segment size")]
    BufferedSyncExceedsSegment,
}
