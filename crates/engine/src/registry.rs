//! The process-wide engine name → factory registry.
//!
//! Construction idiom (`once_cell::sync::Lazy` guarding a `parking_lot`
//! lock) follows `stratadb-labs-strata-core/crates/engine/src/database/registry.rs`;
//! parking_lot is used there, and here, to avoid turning a poisoned-mutex
//! panic in one engine into a panic for every other caller of the registry.
//! The shape — name keyed, factory valued, rather than path keyed,
//! instance valued — follows `examples/original_source/src/engine.h`'s
//! `storage_engine_factory` (`register_factory`/`create_engine`/
//! `get_engine_factories`).

use std::collections::HashMap;
use std::sync::Arc;

use kvengine_config::Config;
use kvengine_core::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::engine::Engine;

/// Constructs an [`Engine`] instance from a [`Config`].
pub trait EngineFactory: Send + Sync {
    /// The name this factory is registered under (`cmap`, `csmap`, ...).
    fn name(&self) -> &'static str;

    /// Open or create an engine instance from the given config.
    fn open(&self, config: &Config) -> Result<Arc<dyn Engine>>;
}

static REGISTRY: Lazy<RwLock<HashMap<&'static str, Arc<dyn EngineFactory>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register an engine factory under its `name()`. Re-registering the same
/// name replaces the previous factory — callers normally do this once at
/// process startup from `register_builtin_engines()`.
pub fn register_engine(factory: Arc<dyn EngineFactory>) {
    let name = factory.name();
    REGISTRY.write().insert(name, factory);
    tracing::debug!(engine = name, "registered engine factory");
}

/// Open an engine by its registered name.
///
/// `Status::WrongEngineName` if no factory is registered under `name`,
/// matching the spec's `WRONG_ENGINE_NAME` contract for `Database::open`.
pub fn create_engine(name: &str, config: &Config) -> Result<Arc<dyn Engine>> {
    let factory = REGISTRY
        .read()
        .get(name)
        .cloned()
        .ok_or_else(|| Error::wrong_engine_name(format!("no engine registered as `{name}`")))?;
    factory.open(config)
}

/// Names of every currently-registered engine, for diagnostics and tests.
pub fn registered_engine_names() -> Vec<&'static str> {
    REGISTRY.read().keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct NoopEngine;
    impl Engine for NoopEngine {
        fn name(&self) -> &'static str {
            "test-noop"
        }
        fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }
        fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
            Ok(())
        }
        fn remove(&self, _key: &[u8]) -> Result<bool> {
            Ok(false)
        }
    }

    struct NoopFactory;
    impl EngineFactory for NoopFactory {
        fn name(&self) -> &'static str {
            "test-noop"
        }
        fn open(&self, _config: &Config) -> Result<Arc<dyn Engine>> {
            Ok(Arc::new(NoopEngine))
        }
    }

    static REGISTERED: AtomicBool = AtomicBool::new(false);

    fn ensure_registered() {
        if !REGISTERED.swap(true, Ordering::SeqCst) {
            register_engine(Arc::new(NoopFactory));
        }
    }

    #[test]
    fn unknown_engine_name_is_wrong_engine_name() {
        let cfg = Config::new();
        let err = create_engine("does-not-exist", &cfg).unwrap_err();
        assert_eq!(err.status(), kvengine_core::Status::WrongEngineName);
    }

    #[test]
    fn registered_engine_can_be_opened() {
        ensure_registered();
        let cfg = Config::new();
        let engine = create_engine("test-noop", &cfg).unwrap();
        assert_eq!(engine.name(), "test-noop");
        assert!(registered_engine_names().contains(&"test-noop"));
    }
}
