//! Engine contract, factory registry, and the [`Database`] facade.
//!
//! This crate defines *how* a storage backend plugs into kvengine — the
//! [`Engine`]/[`iterator::EngineIterator`]/[`iterator::EngineWriteIterator`]/
//! [`transaction::Transaction`] contracts a backend implements, the
//! [`registry`] a backend registers itself into, and the [`Database`]
//! facade callers open by name. The `kvengine-store-*` crates are the
//! backends; this crate never depends on any of them.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod database;
pub mod engine;
pub mod iterator;
pub mod registry;
pub mod transaction;

pub use cursor::{clamp_range, CursorState};
pub use database::{continue_unless, was_stopped_by_callback, Database};
pub use engine::{Engine, IterControl, VisitFn};
pub use iterator::{EngineIterator, EngineWriteIterator};
pub use registry::{create_engine, register_engine, registered_engine_names, EngineFactory};
pub use transaction::Transaction;

/// A conformance test harness parameterized over `&dyn Engine`, shared by
/// every `kvengine-store-*` crate so each backend is checked against the
/// same universal invariants rather than writing its own ad-hoc put/get
/// tests. Mirrors how `examples/original_source/tests/engine_test.cc`
/// reruns one test body across every registered engine name.
#[cfg(any(test, feature = "conformance"))]
pub mod conformance {
    use crate::engine::Engine;
    use kvengine_core::Status;

    /// Put followed by get returns exactly what was put.
    pub fn put_then_get_roundtrips(engine: &dyn Engine) {
        engine.put(b"alpha", b"one").unwrap();
        assert_eq!(engine.get(b"alpha").unwrap(), Some(b"one".to_vec()));
    }

    /// Getting an absent key is `Ok(None)`, not an error.
    pub fn get_missing_is_not_an_error(engine: &dyn Engine) {
        assert_eq!(engine.get(b"does-not-exist").unwrap(), None);
    }

    /// Overwriting a key replaces its value rather than appending.
    pub fn put_overwrites_existing_value(engine: &dyn Engine) {
        engine.put(b"k", b"first").unwrap();
        engine.put(b"k", b"second").unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Some(b"second".to_vec()));
    }

    /// Removing a present key returns `true` and makes it absent.
    pub fn remove_present_key(engine: &dyn Engine) {
        engine.put(b"k", b"v").unwrap();
        assert!(engine.remove(b"k").unwrap());
        assert_eq!(engine.get(b"k").unwrap(), None);
    }

    /// Removing an absent key returns `false`, not an error.
    pub fn remove_missing_key_returns_false(engine: &dyn Engine) {
        assert!(!engine.remove(b"never-inserted").unwrap());
    }

    /// Keys and values are opaque byte strings: embedded NULs and
    /// non-UTF-8 bytes round-trip unchanged.
    pub fn binary_keys_and_values_are_safe(engine: &dyn Engine) {
        let key: &[u8] = b"k\0\xff\x01";
        let value: &[u8] = b"v\0\xfe\x02";
        engine.put(key, value).unwrap();
        assert_eq!(engine.get(key).unwrap(), Some(value.to_vec()));
    }

    /// An empty value is a valid value, distinct from absence.
    pub fn empty_value_is_valid(engine: &dyn Engine) {
        engine.put(b"k", b"").unwrap();
        assert_eq!(engine.get(b"k").unwrap(), Some(Vec::new()));
    }

    /// Capabilities an engine does not implement return `NotSupported`,
    /// never panic.
    pub fn unsupported_capability_returns_not_supported_status(
        result: &kvengine_core::Result<()>,
    ) {
        if let Err(e) = result {
            assert_eq!(e.status(), Status::NotSupported);
        }
    }
}
