//! Products domain module: price-bearing catalog fields.
//!
//! Pure logic only (no IO, no HTTP, no storage). Prices cross the system boundary in
//! whatever unit the upstream catalog used; this crate normalizes them.

pub mod money;
pub mod pricing;

pub use money::{normalize_amount, raw_amount, NormalizedAmount, CENTS_CUTOFF};
pub use pricing::{
    NormalizedPrice, NormalizedPriceSet, NormalizedVariantPricing, Price, PriceSet, VariantPricing,
};
