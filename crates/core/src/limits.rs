//! Key/value byte-size limits enforced before an operation reaches an engine.
//!
//! Most engines accept any key/value length the underlying store can hold;
//! [`Limits`] exists because one engine, the Robin-Hood hash
//! (`kvengine-store-robinhood`), requires exactly 8-byte keys and values and
//! rejects anything else as `Status::InvalidArgument`. The facade and other
//! engines use the permissive default.

use crate::error::{Error, Status};

/// Byte-length bounds a `Database::put`/`get`/`remove` call must satisfy.
///
/// The default permits any non-empty key and any value; an engine that
/// needs tighter bounds (fixed-width Robin-Hood entries) constructs its
/// own `Limits` and validates with [`Limits::validate_key`] /
/// [`Limits::validate_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Exact key length required, if any.
    pub fixed_key_bytes: Option<usize>,
    /// Exact value length required, if any.
    pub fixed_value_bytes: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            fixed_key_bytes: None,
            fixed_value_bytes: None,
        }
    }
}

impl Limits {
    /// The bound the Robin-Hood engine enforces: 8-byte keys and values.
    pub const fn fixed(width: usize) -> Self {
        Limits {
            fixed_key_bytes: Some(width),
            fixed_value_bytes: Some(width),
        }
    }

    /// Validate a key, returning `Status::InvalidArgument` on violation.
    pub fn validate_key(&self, key: &[u8]) -> Result<(), Error> {
        if key.is_empty() {
            return Err(Error::invalid_argument("key must not be empty"));
        }
        if let Some(width) = self.fixed_key_bytes {
            if key.len() != width {
                return Err(Error::invalid_argument(format!(
                    "key must be exactly {} bytes, got {}",
                    width,
                    key.len()
                )));
            }
        }
        Ok(())
    }

    /// Validate a value, returning `Status::InvalidArgument` on violation.
    pub fn validate_value(&self, value: &[u8]) -> Result<(), Error> {
        if let Some(width) = self.fixed_value_bytes {
            if value.len() != width {
                return Err(Error::invalid_argument(format!(
                    "value must be exactly {} bytes, got {}",
                    width,
                    value.len()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accepts_any_nonempty_key() {
        let limits = Limits::default();
        assert!(limits.validate_key(b"a").is_ok());
        assert!(limits.validate_key(b"a very long key indeed").is_ok());
    }

    #[test]
    fn default_rejects_empty_key() {
        let limits = Limits::default();
        let err = limits.validate_key(b"").unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
    }

    #[test]
    fn fixed_width_rejects_wrong_length() {
        let limits = Limits::fixed(8);
        assert!(limits.validate_key(&[0u8; 8]).is_ok());
        assert!(limits.validate_value(&[0u8; 8]).is_ok());
        assert_eq!(
            limits.validate_key(&[0u8; 7]).unwrap_err().status(),
            Status::InvalidArgument
        );
        assert_eq!(
            limits.validate_value(&[0u8; 9]).unwrap_err().status(),
            Status::InvalidArgument
        );
    }
}
