//! Infrastructure layer: store adapters, the stock adjustment pipeline, config.

pub mod adjuster;
pub mod config;
pub mod locks;
pub mod memory;
pub mod ports;

/// Postgres adapter (connection pool, catalog queries, guarded stock writes).
#[cfg(feature = "postgres")]
pub mod postgres;

pub use adjuster::{AdjustError, StockAdjuster, DEFAULT_STORE_TIMEOUT, EMPTY_BATCH_MESSAGE, INVALID_ITEM_MESSAGE};
pub use config::{AppConfig, ConfigError};
pub use locks::LevelLocks;
pub use memory::{InMemoryCatalog, SeedError};
pub use ports::{AppliedLevel, CatalogReader, LevelUpdate, LevelWriter, StoreError};

#[cfg(feature = "postgres")]
pub use postgres::PostgresCatalog;
