//! The configuration store every engine is opened with.
//!
//! A heterogeneous, typed option bag modeled on the C++ `internal::config`
//! in `examples/original_source/src/config.h`, expressed as owned Rust
//! values instead of a tagged union over raw storage.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::any::Any;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::Arc;

use kvengine_core::{Comparator, Error, Status};

/// Recognised option name: path to the pool/directory an engine should
/// open or create.
pub const OPTION_PATH: &str = "path";
/// Recognised option name: requested size in bytes, used on pool creation.
pub const OPTION_SIZE: &str = "size";
/// Recognised option name: pre-existing persistent object's OID, as raw bytes.
pub const OPTION_OID: &str = "oid";
/// Recognised option name: create a new pool if `path` doesn't exist.
pub const OPTION_CREATE_IF_MISSING: &str = "create_if_missing";
/// Recognised option name: fail if `path` already exists.
pub const OPTION_CREATE_OR_ERROR_IF_EXISTS: &str = "create_or_error_if_exists";
/// Deprecated alias of [`OPTION_CREATE_OR_ERROR_IF_EXISTS`], kept for the
/// original pmemkv's compatibility contract.
pub const OPTION_FORCE_CREATE: &str = "force_create";
/// Recognised option name: the `Arc<dyn Comparator>` a sorted engine orders keys by.
pub const OPTION_COMPARATOR: &str = "comparator";

/// One entry in a [`Config`].
#[derive(Clone)]
pub enum ConfigValue {
    /// A signed 64-bit integer.
    Int64(i64),
    /// An unsigned 64-bit integer.
    UInt64(u64),
    /// A UTF-8 string.
    String(String),
    /// Raw bytes (used for `oid` and other binary options).
    Bytes(Vec<u8>),
    /// An opaque, type-erased object (used for any host-supplied collaborator
    /// other than the comparator, which has its own variant since `dyn Any`
    /// cannot downcast to a trait object).
    Object(Arc<dyn Any + Send + Sync>),
    /// A caller-supplied key ordering, set via [`Config::set_comparator`].
    Comparator(Arc<dyn Comparator>),
}

impl std::fmt::Debug for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::Int64(v) => write!(f, "Int64({v})"),
            ConfigValue::UInt64(v) => write!(f, "UInt64({v})"),
            ConfigValue::String(v) => write!(f, "String({v:?})"),
            ConfigValue::Bytes(v) => write!(f, "Bytes({} bytes)", v.len()),
            ConfigValue::Object(_) => write!(f, "Object(..)"),
            ConfigValue::Comparator(c) => write!(f, "Comparator({})", c.name()),
        }
    }
}

/// A heterogeneous map of configuration options, passed to `Database::open`.
///
/// Typed accessors coerce between `Int64`/`UInt64` when the requested
/// type differs from the stored one but the value is representable,
/// exactly as `internal::config::get_int64`/`get_uint64` do in the
/// original: a stored `Int64` that happens to be non-negative can be
/// read back with `get_uint64`, and vice versa for values that fit in
/// `i64`. Anything else is `Status::ConfigTypeError`, and a missing key
/// is `Status::NotFound`.
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: HashMap<String, ConfigValue>,
}

impl Config {
    /// An empty configuration.
    pub fn new() -> Self {
        Config::default()
    }

    /// Insert a signed integer option.
    pub fn put_int64(&mut self, key: impl Into<String>, value: i64) {
        self.entries.insert(key.into(), ConfigValue::Int64(value));
    }

    /// Insert an unsigned integer option.
    pub fn put_uint64(&mut self, key: impl Into<String>, value: u64) {
        self.entries.insert(key.into(), ConfigValue::UInt64(value));
    }

    /// Insert a string option.
    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(key.into(), ConfigValue::String(value.into()));
    }

    /// Insert a raw-bytes option.
    pub fn put_data(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries
            .insert(key.into(), ConfigValue::Bytes(value.into()));
    }

    /// Insert an opaque object option.
    pub fn put_object(&mut self, key: impl Into<String>, value: Arc<dyn Any + Send + Sync>) {
        self.entries.insert(key.into(), ConfigValue::Object(value));
    }

    /// Insert a comparator option, the typed convenience over `put_object`
    /// every sorted engine reads via [`Config::comparator`].
    pub fn set_comparator(&mut self, comparator: Arc<dyn Comparator>) {
        self.entries
            .insert(OPTION_COMPARATOR.to_string(), ConfigValue::Comparator(comparator));
    }

    fn get(&self, key: &str) -> Result<&ConfigValue, Error> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::not_found(format!("config key `{key}` not set")))
    }

    /// Read a signed integer, coercing from `UInt64` when it fits in `i64`.
    pub fn get_int64(&self, key: &str) -> Result<i64, Error> {
        match self.get(key)? {
            ConfigValue::Int64(v) => Ok(*v),
            ConfigValue::UInt64(v) => i64::try_from(*v).map_err(|_| {
                Error::config_type_error(format!(
                    "config key `{key}` is uint64 {v}, out of i64 range"
                ))
            }),
            other => Err(wrong_type(key, "int64", other)),
        }
    }

    /// Read an unsigned integer, coercing from `Int64` when it is non-negative.
    pub fn get_uint64(&self, key: &str) -> Result<u64, Error> {
        match self.get(key)? {
            ConfigValue::UInt64(v) => Ok(*v),
            ConfigValue::Int64(v) => u64::try_from(*v).map_err(|_| {
                Error::config_type_error(format!(
                    "config key `{key}` is int64 {v}, negative, cannot be uint64"
                ))
            }),
            other => Err(wrong_type(key, "uint64", other)),
        }
    }

    /// Read a string.
    pub fn get_string(&self, key: &str) -> Result<&str, Error> {
        match self.get(key)? {
            ConfigValue::String(v) => Ok(v.as_str()),
            other => Err(wrong_type(key, "string", other)),
        }
    }

    /// Read raw bytes.
    pub fn get_data(&self, key: &str) -> Result<&[u8], Error> {
        match self.get(key)? {
            ConfigValue::Bytes(v) => Ok(v.as_slice()),
            other => Err(wrong_type(key, "data", other)),
        }
    }

    /// Read and downcast an opaque object option.
    pub fn get_object<T: Send + Sync + 'static>(&self, key: &str) -> Result<Arc<T>, Error> {
        match self.get(key)? {
            ConfigValue::Object(v) => v
                .clone()
                .downcast::<T>()
                .map_err(|_| Error::config_type_error(format!("config key `{key}` is a different object type"))),
            other => Err(wrong_type(key, "object", other)),
        }
    }

    /// Whether `key` is present at all.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The `path` option, required by every persistent engine.
    pub fn path(&self) -> Result<&str, Error> {
        self.get_string(OPTION_PATH)
    }

    /// The `size` option, used on pool creation.
    pub fn size(&self) -> Result<u64, Error> {
        self.get_uint64(OPTION_SIZE)
    }

    /// `create_if_missing`, defaulting to `false` when absent.
    pub fn create_if_missing(&self) -> bool {
        self.get_uint64(OPTION_CREATE_IF_MISSING).unwrap_or(0) != 0
    }

    /// `create_or_error_if_exists`, honoring the deprecated `force_create`
    /// alias (with a warning) when the canonical key is absent.
    pub fn create_or_error_if_exists(&self) -> bool {
        if self.contains(OPTION_CREATE_OR_ERROR_IF_EXISTS) {
            return self
                .get_uint64(OPTION_CREATE_OR_ERROR_IF_EXISTS)
                .unwrap_or(0)
                != 0;
        }
        if self.contains(OPTION_FORCE_CREATE) {
            tracing::warn!(
                "config option `force_create` is deprecated, use `create_or_error_if_exists`"
            );
            return self.get_uint64(OPTION_FORCE_CREATE).unwrap_or(0) != 0;
        }
        false
    }

    /// The `comparator` option, defaulting to `None` (engines fall back to
    /// `BinaryComparator`) when absent.
    pub fn comparator(&self) -> Result<Option<Arc<dyn Comparator>>, Error> {
        if !self.contains(OPTION_COMPARATOR) {
            return Ok(None);
        }
        match self.get(OPTION_COMPARATOR)? {
            ConfigValue::Comparator(v) => Ok(Some(v.clone())),
            other => Err(wrong_type(OPTION_COMPARATOR, "comparator", other)),
        }
    }
}

fn wrong_type(key: &str, wanted: &str, got: &ConfigValue) -> Error {
    Error::config_type_error(format!(
        "config key `{key}` requested as {wanted} but stored as {got:?}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_not_found() {
        let cfg = Config::new();
        assert_eq!(cfg.get_int64("path").unwrap_err().status(), Status::NotFound);
    }

    #[test]
    fn int64_uint64_coercion_both_ways() {
        let mut cfg = Config::new();
        cfg.put_int64("a", 5);
        assert_eq!(cfg.get_uint64("a").unwrap(), 5);

        cfg.put_uint64("b", 7);
        assert_eq!(cfg.get_int64("b").unwrap(), 7);
    }

    #[test]
    fn negative_int64_cannot_become_uint64() {
        let mut cfg = Config::new();
        cfg.put_int64("a", -1);
        assert_eq!(cfg.get_uint64("a").unwrap_err().status(), Status::ConfigTypeError);
    }

    #[test]
    fn huge_uint64_cannot_become_int64() {
        let mut cfg = Config::new();
        cfg.put_uint64("a", u64::MAX);
        assert_eq!(cfg.get_int64("a").unwrap_err().status(), Status::ConfigTypeError);
    }

    #[test]
    fn wrong_type_is_config_type_error() {
        let mut cfg = Config::new();
        cfg.put_string("path", "/mnt/pool");
        assert_eq!(cfg.get_int64("path").unwrap_err().status(), Status::ConfigTypeError);
    }

    #[test]
    fn path_and_size_accessors() {
        let mut cfg = Config::new();
        cfg.put_string(OPTION_PATH, "/mnt/pool");
        cfg.put_uint64(OPTION_SIZE, 1 << 30);
        assert_eq!(cfg.path().unwrap(), "/mnt/pool");
        assert_eq!(cfg.size().unwrap(), 1 << 30);
    }

    #[test]
    fn force_create_alias_honoured() {
        let mut cfg = Config::new();
        cfg.put_uint64(OPTION_FORCE_CREATE, 1);
        assert!(cfg.create_or_error_if_exists());
    }

    #[test]
    fn canonical_name_takes_precedence_over_alias() {
        let mut cfg = Config::new();
        cfg.put_uint64(OPTION_FORCE_CREATE, 1);
        cfg.put_uint64(OPTION_CREATE_OR_ERROR_IF_EXISTS, 0);
        assert!(!cfg.create_or_error_if_exists());
    }

    #[test]
    fn comparator_defaults_to_none() {
        let cfg = Config::new();
        assert!(cfg.comparator().unwrap().is_none());
    }

    #[test]
    fn object_roundtrips_and_rejects_wrong_type() {
        #[derive(Debug, PartialEq)]
        struct Marker(u32);
        let mut cfg = Config::new();
        cfg.put_object("thing", Arc::new(Marker(42)));
        let got = cfg.get_object::<Marker>("thing").unwrap();
        assert_eq!(*got, Marker(42));
        assert_eq!(
            cfg.get_object::<u8>("thing").unwrap_err().status(),
            Status::ConfigTypeError
        );
    }
}
