//! Stock aggregation across inventory records and warehouse locations.
//!
//! Aggregation never fails: missing or malformed data degrades to zero.

use serde::Serialize;

use stockwise_core::InventoryItemId;

use crate::model::{InventoryRecord, LocationLevel, Variant};

type QuantityAccessor = fn(&LocationLevel) -> Option<i64>;

/// Field aliases for a level's stocked quantity, in priority order. First present wins.
pub const LEVEL_QUANTITY_ALIASES: [(&str, QuantityAccessor); 4] = [
    ("stocked_quantity", |l| l.stocked_quantity),
    ("quantity", |l| l.quantity),
    ("available", |l| l.available),
    ("available_quantity", |l| l.available_quantity),
];

/// Quantity of a single location level, clamped to zero.
pub fn level_quantity(level: &LocationLevel) -> u64 {
    LEVEL_QUANTITY_ALIASES
        .iter()
        .find_map(|(_, get)| get(level))
        .map(clamp)
        .unwrap_or(0)
}

/// Stock held by one inventory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordStock<'a> {
    pub inventory_item_id: Option<&'a InventoryItemId>,
    pub total_quantity: u64,
    pub location_levels: &'a [LocationLevel],
}

/// Variant-level stock summary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub total_quantity: u64,
    pub in_stock: bool,
}

impl StockSummary {
    fn from_total(total_quantity: u64) -> Self {
        Self {
            total_quantity,
            in_stock: total_quantity > 0,
        }
    }
}

/// Per-record stock for a variant.
///
/// When the variant has location levels anywhere, each record is the sum of its own
/// levels. When it has none at all, records report their legacy scalar instead.
pub fn record_stock(variant: &Variant) -> Vec<RecordStock<'_>> {
    let has_levels = has_location_levels(variant);
    variant
        .inventory_items
        .iter()
        .map(|record| RecordStock {
            inventory_item_id: record.id.as_ref(),
            total_quantity: if has_levels {
                levels_total(record)
            } else {
                legacy_record_quantity(record).unwrap_or(0)
            },
            location_levels: &record.location_levels,
        })
        .collect()
}

/// Total on-hand quantity for a variant, summed over all records and locations.
///
/// Fallback when no location level exists anywhere: the records' legacy scalars, then
/// the variant's own `inventory_quantity`, then zero.
pub fn summarize(variant: &Variant) -> StockSummary {
    if has_location_levels(variant) {
        let total = variant
            .inventory_items
            .iter()
            .map(levels_total)
            .fold(0u64, u64::saturating_add);
        return StockSummary::from_total(total);
    }

    let legacy: Vec<u64> = variant
        .inventory_items
        .iter()
        .filter_map(legacy_record_quantity)
        .collect();

    let total = if legacy.is_empty() {
        variant.inventory_quantity.map(clamp).unwrap_or(0)
    } else {
        legacy.into_iter().fold(0u64, u64::saturating_add)
    };

    StockSummary::from_total(total)
}

fn has_location_levels(variant: &Variant) -> bool {
    variant
        .inventory_items
        .iter()
        .any(|record| !record.location_levels.is_empty())
}

fn levels_total(record: &InventoryRecord) -> u64 {
    record
        .location_levels
        .iter()
        .map(level_quantity)
        .fold(0u64, u64::saturating_add)
}

fn legacy_record_quantity(record: &InventoryRecord) -> Option<u64> {
    record.total_quantity.or(record.quantity).map(clamp)
}

fn clamp(q: i64) -> u64 {
    q.max(0) as u64
}
