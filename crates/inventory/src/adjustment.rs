//! Stock deduction requests and the pure decision of what to write.
//!
//! Deductions are best-effort consumption tracking, not reservations: asking for more
//! than is on hand clamps the level to zero instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use stockwise_core::{DomainError, DomainResult, InventoryItemId, LocationId, VariantId};

use crate::model::Variant;
use crate::stock::level_quantity;

/// Message returned when a request is missing its variant id or positive quantity.
pub const INVALID_REQUEST_MESSAGE: &str = "variantId and quantity (> 0) are required";

/// An adjustment as received over the wire, before validation.
///
/// Fields stay loosely typed so a malformed item in a batch becomes a per-item error
/// rather than failing the whole request body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawAdjustment {
    #[serde(default, rename = "variantId", alias = "variant_id")]
    pub variant_id: Option<JsonValue>,
    #[serde(default)]
    pub quantity: Option<JsonValue>,
}

impl RawAdjustment {
    pub fn new(variant_id: &str, quantity: i64) -> Self {
        Self {
            variant_id: Some(JsonValue::from(variant_id)),
            quantity: Some(JsonValue::from(quantity)),
        }
    }

    /// The variant id as given, for error reporting. Non-string ids render as JSON.
    pub fn variant_label(&self) -> Option<String> {
        match &self.variant_id {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

/// A validated deduction: a variant and a positive quantity to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustmentRequest {
    pub variant_id: VariantId,
    pub quantity: u64,
}

impl AdjustmentRequest {
    pub fn new(variant_id: VariantId, quantity: i64) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation(INVALID_REQUEST_MESSAGE));
        }
        Ok(Self {
            variant_id,
            quantity: quantity as u64,
        })
    }

    /// Validate a wire request. The variant id must be a non-blank string and the
    /// quantity a positive whole number.
    pub fn parse(raw: &RawAdjustment) -> DomainResult<Self> {
        let variant_id = match &raw.variant_id {
            Some(JsonValue::String(s)) => {
                VariantId::parse(s.as_str()).map_err(|_| DomainError::validation(INVALID_REQUEST_MESSAGE))?
            }
            _ => return Err(DomainError::validation(INVALID_REQUEST_MESSAGE)),
        };

        let quantity = raw
            .quantity
            .as_ref()
            .and_then(whole_number)
            .ok_or_else(|| DomainError::validation(INVALID_REQUEST_MESSAGE))?;

        Self::new(variant_id, quantity)
    }
}

fn whole_number(value: &JsonValue) -> Option<i64> {
    let JsonValue::Number(n) = value else {
        return None;
    };
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

/// Storage key of a location level: the unit of write serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelKey {
    pub inventory_item_id: InventoryItemId,
    pub location_id: LocationId,
}

impl core::fmt::Display for LevelKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.inventory_item_id, self.location_id)
    }
}

/// The write an adjustment resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentPlan {
    pub variant_id: VariantId,
    pub key: LevelKey,
    pub previous_quantity: u64,
    pub adjusted_by: u64,
    pub new_quantity: u64,
    /// Level version the plan was computed from.
    pub expected_version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The variant does not track inventory; nothing to write.
    Skip,
    Adjust(AdjustmentPlan),
}

/// The variant exists but has nothing to deduct from.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MissingInventory {
    #[error("no inventory item found for variant {0}")]
    InventoryItem(VariantId),

    #[error("no location level found for variant {0}")]
    LocationLevel(VariantId),
}

/// Decide what an adjustment writes.
///
/// The first inventory record and its first location level are the write target.
/// The new quantity is `max(0, current - requested)`.
pub fn plan_adjustment(
    variant: &Variant,
    request: &AdjustmentRequest,
) -> Result<Resolution, MissingInventory> {
    if !variant.manage_inventory {
        return Ok(Resolution::Skip);
    }

    let record = variant.inventory_items.first();
    let inventory_item_id = record
        .and_then(|r| r.id.clone())
        .ok_or_else(|| MissingInventory::InventoryItem(variant.id.clone()))?;

    let level = record
        .and_then(|r| r.location_levels.first())
        .ok_or_else(|| MissingInventory::LocationLevel(variant.id.clone()))?;

    let location_id = level
        .location_id
        .clone()
        .ok_or_else(|| MissingInventory::LocationLevel(variant.id.clone()))?;

    let previous_quantity = level_quantity(level);
    let new_quantity = previous_quantity.saturating_sub(request.quantity);

    Ok(Resolution::Adjust(AdjustmentPlan {
        variant_id: variant.id.clone(),
        key: LevelKey {
            inventory_item_id,
            location_id,
        },
        previous_quantity,
        adjusted_by: request.quantity,
        new_quantity,
        expected_version: level.version,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InventoryRecord, LocationLevel};
    use serde_json::json;

    fn vid(s: &str) -> VariantId {
        VariantId::parse(s).unwrap()
    }

    fn stocked_variant(id: &str, stock: i64) -> Variant {
        let mut v = Variant::new(vid(id));
        v.inventory_items = vec![InventoryRecord::new(
            InventoryItemId::parse(format!("iitem_{id}")).unwrap(),
            vec![LocationLevel::stocked(LocationId::parse("sloc_main").unwrap(), stock)],
        )];
        v
    }

    fn request(id: &str, qty: i64) -> AdjustmentRequest {
        AdjustmentRequest::new(vid(id), qty).unwrap()
    }

    fn expect_plan(resolution: Resolution) -> AdjustmentPlan {
        match resolution {
            Resolution::Adjust(plan) => plan,
            Resolution::Skip => panic!("expected an adjustment plan"),
        }
    }

    #[test]
    fn zero_or_negative_quantity_is_rejected() {
        assert!(AdjustmentRequest::new(vid("v1"), 0).is_err());
        assert!(AdjustmentRequest::new(vid("v1"), -1).is_err());
    }

    #[test]
    fn parse_accepts_well_formed_request() {
        let req = AdjustmentRequest::parse(&RawAdjustment::new("v1", 3)).unwrap();
        assert_eq!(req, request("v1", 3));
    }

    #[test]
    fn parse_accepts_snake_case_variant_id_and_whole_floats() {
        let raw: RawAdjustment =
            serde_json::from_value(json!({ "variant_id": "v1", "quantity": 2.0 })).unwrap();
        assert_eq!(AdjustmentRequest::parse(&raw).unwrap(), request("v1", 2));
    }

    #[test]
    fn parse_rejects_malformed_requests() {
        let cases = [
            json!({ "quantity": 1 }),
            json!({ "variantId": "", "quantity": 1 }),
            json!({ "variantId": 42, "quantity": 1 }),
            json!({ "variantId": "v1" }),
            json!({ "variantId": "v1", "quantity": "3" }),
            json!({ "variantId": "v1", "quantity": 1.5 }),
            json!({ "variantId": "v1", "quantity": 0 }),
            json!({ "variantId": "v1", "quantity": -4 }),
        ];

        for case in cases {
            let raw: RawAdjustment = serde_json::from_value(case.clone()).unwrap();
            let err = AdjustmentRequest::parse(&raw).unwrap_err();
            assert_eq!(err, DomainError::validation(INVALID_REQUEST_MESSAGE), "case: {case}");
        }
    }

    #[test]
    fn variant_label_renders_non_string_ids() {
        let raw: RawAdjustment = serde_json::from_value(json!({ "variantId": 42 })).unwrap();
        assert_eq!(raw.variant_label().as_deref(), Some("42"));
        assert_eq!(RawAdjustment::default().variant_label(), None);
    }

    #[test]
    fn deduction_within_stock_is_exact() {
        let plan = expect_plan(plan_adjustment(&stocked_variant("v1", 10), &request("v1", 2)).unwrap());
        assert_eq!(plan.previous_quantity, 10);
        assert_eq!(plan.adjusted_by, 2);
        assert_eq!(plan.new_quantity, 8);
        assert_eq!(plan.key.location_id.as_str(), "sloc_main");
    }

    #[test]
    fn over_deduction_clamps_to_zero() {
        let plan = expect_plan(plan_adjustment(&stocked_variant("v3", 3), &request("v3", 5)).unwrap());
        assert_eq!(plan.previous_quantity, 3);
        assert_eq!(plan.new_quantity, 0);
    }

    #[test]
    fn unmanaged_variant_is_skipped() {
        let mut v = stocked_variant("v1", 10);
        v.manage_inventory = false;
        assert_eq!(plan_adjustment(&v, &request("v1", 1)).unwrap(), Resolution::Skip);
    }

    #[test]
    fn missing_record_or_level_is_reported() {
        let bare = Variant::new(vid("v1"));
        assert_eq!(
            plan_adjustment(&bare, &request("v1", 1)).unwrap_err(),
            MissingInventory::InventoryItem(vid("v1"))
        );

        let mut no_levels = Variant::new(vid("v2"));
        no_levels.inventory_items = vec![InventoryRecord::new(
            InventoryItemId::parse("iitem_2").unwrap(),
            vec![],
        )];
        assert_eq!(
            plan_adjustment(&no_levels, &request("v2", 1)).unwrap_err(),
            MissingInventory::LocationLevel(vid("v2"))
        );
    }

    #[test]
    fn plan_captures_level_version() {
        let mut v = stocked_variant("v1", 10);
        v.inventory_items[0].location_levels[0].version = 7;
        let plan = expect_plan(plan_adjustment(&v, &request("v1", 1)).unwrap());
        assert_eq!(plan.expected_version, 7);
    }
}
