//! Inventory domain module.
//!
//! This crate contains the business rules for stock: aggregating quantities across
//! records and locations, validating deductions, deciding what to write, and
//! assembling batch reports. Pure, deterministic logic (no IO, no HTTP, no storage).

pub mod adjustment;
pub mod model;
pub mod report;
pub mod stock;

pub use adjustment::{
    plan_adjustment, AdjustmentPlan, AdjustmentRequest, LevelKey, MissingInventory, RawAdjustment,
    Resolution, INVALID_REQUEST_MESSAGE,
};
pub use model::{
    CatalogEntry, InventoryRecord, LocationLevel, Product, ProductSummary, Variant, PUBLISHED_STATUS,
};
pub use report::{AdjustmentOutcome, BatchReport, ItemError, StockAdjustment, SKIPPED_MESSAGE};
pub use stock::{level_quantity, record_stock, summarize, RecordStock, StockSummary};
