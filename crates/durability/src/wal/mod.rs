//! WAL (write-ahead log) module.
//!
//! - `mode`: [`DurabilityMode`] — when the WAL is fsynced
//! - `config`: [`WalConfig`] tuning
//! - `writer`: segmented [`WalWriter`]
//! - `reader`: segmented [`WalReader`]

pub mod config;
pub mod mode;
pub mod reader;
pub mod writer;

pub use config::{WalConfig, WalConfigError};
pub use mode::DurabilityMode;
pub use reader::{ReadStopReason, TruncateInfo, WalReadResult, WalReader, WalReaderError};
pub use writer::WalWriter;
