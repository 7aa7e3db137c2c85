//! # kvengine
//!
//! An embedded key-value storage library with a pluggable engine
//! contract: one database handle, one engine selected by name at open
//! time, the same put/get/remove/range/transaction surface regardless of
//! which on-device index structure backs it.
//!
//! ```no_run
//! use kvengine::{register_builtin_engines, Config, Database};
//!
//! fn main() -> kvengine::Result<()> {
//!     register_builtin_engines();
//!
//!     let mut config = Config::new();
//!     config.put_string("path", "/tmp/my-pool");
//!     config.put_uint64("create_if_missing", 1);
//!     config.put_uint64("size", 1 << 20);
//!
//!     let db = Database::open("csmap", config)?;
//!     db.put(b"user:name", b"Alice")?;
//!     assert_eq!(db.get(b"user:name")?, Some(b"Alice".to_vec()));
//!     Ok(())
//! }
//! ```
//!
//! # Engines
//!
//! | Name | Ordering | Persistent | Transactions |
//! |------|----------|------------|--------------|
//! | `cmap` | none | yes | no |
//! | `csmap` | comparator | yes | no |
//! | `radix` | byte order | yes | yes |
//! | `heterogeneous_radix` | byte order | yes (write-behind) | yes |
//! | `robinhood` | none, fixed 8-byte width | yes | no |
//! | `vsmap` | comparator | no | no |
//! | `blackhole` | n/a | no | no |
//!
//! Internal crates (`kvengine-core`, `kvengine-config`, `kvengine-engine`,
//! `kvengine-durability`, and one `kvengine-store-*` crate per engine) are
//! not required to be depended on directly; this crate re-exports the
//! public surface every caller needs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use kvengine_config::Config;
pub use kvengine_core::{BinaryComparator, Comparator, Error, Key, Limits, Result, Status, Value};
pub use kvengine_engine::{
    create_engine, register_engine, registered_engine_names, Database, Engine, EngineFactory,
    EngineIterator, EngineWriteIterator, IterControl, Transaction, VisitFn,
};

use std::sync::Arc;

/// Register every engine this crate ships against the process-wide
/// registry, so [`Database::open`] can find them by name. Idempotent:
/// call it once at process start, typically before any `Database::open`.
pub fn register_builtin_engines() {
    register_engine(Arc::new(kvengine_store_blackhole::BlackholeFactory));
    register_engine(Arc::new(kvengine_store_hash::HashFactory));
    register_engine(Arc::new(kvengine_store_sorted::SortedFactory));
    register_engine(Arc::new(kvengine_store_radix::RadixFactory));
    register_engine(Arc::new(kvengine_store_radix::HeterogeneousRadixFactory));
    register_engine(Arc::new(kvengine_store_robinhood::RobinhoodFactory));
    register_engine(Arc::new(kvengine_store_volatile::VolatileFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_builtin_engines_registers_every_name() {
        register_builtin_engines();
        let names = registered_engine_names();
        for expected in ["blackhole", "cmap", "csmap", "radix", "heterogeneous_radix", "robinhood", "vsmap"] {
            assert!(names.contains(&expected), "missing engine `{expected}`");
        }
    }

    #[test]
    fn open_and_use_an_in_memory_engine() {
        register_builtin_engines();
        let db = Database::open("cmap", Config::new()).unwrap();
        db.put(b"k", b"v").unwrap();
        assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
    }
}
