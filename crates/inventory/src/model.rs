//! Catalog read shapes: Variant → InventoryRecord → LocationLevel.
//!
//! These mirror what the catalog query returns. Quantities are read leniently because
//! legacy records store them under different field names and sometimes as strings.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use stockwise_core::{InventoryItemId, LocationId, ProductId, SellerId, VariantId};
use stockwise_products::VariantPricing;

/// Stock of one inventory record at one location.
///
/// The stocked quantity may be present under any of several legacy names; see
/// [`crate::stock::LEVEL_QUANTITY_ALIASES`] for the order they are consulted in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocationLevel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
    #[serde(default, deserialize_with = "lenient_quantity", skip_serializing_if = "Option::is_none")]
    pub stocked_quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_quantity", skip_serializing_if = "Option::is_none")]
    pub available_quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_quantity", skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
    #[serde(default, deserialize_with = "lenient_quantity", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
    /// Optimistic concurrency token; bumped by every successful write.
    #[serde(default)]
    pub version: u64,
}

impl LocationLevel {
    pub fn stocked(location_id: LocationId, stocked_quantity: i64) -> Self {
        Self {
            location_id: Some(location_id),
            stocked_quantity: Some(stocked_quantity),
            ..Self::default()
        }
    }
}

/// The stock-tracking entity bound to a variant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventoryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<InventoryItemId>,
    #[serde(default)]
    pub location_levels: Vec<LocationLevel>,
    /// Legacy scalar totals, consulted only when no location levels exist.
    #[serde(default, deserialize_with = "lenient_quantity", skip_serializing_if = "Option::is_none")]
    pub total_quantity: Option<i64>,
    #[serde(default, deserialize_with = "lenient_quantity", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i64>,
}

impl InventoryRecord {
    pub fn new(id: InventoryItemId, location_levels: Vec<LocationLevel>) -> Self {
        Self {
            id: Some(id),
            location_levels,
            ..Self::default()
        }
    }
}

/// A purchasable SKU-level configuration of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    /// Whether stock is tracked for this variant. The commerce platform defaults it on.
    #[serde(default = "default_true")]
    pub manage_inventory: bool,
    #[serde(default)]
    pub inventory_items: Vec<InventoryRecord>,
    /// Legacy variant-level stock scalar, the last fallback of the aggregator.
    #[serde(default, deserialize_with = "lenient_quantity", skip_serializing_if = "Option::is_none")]
    pub inventory_quantity: Option<i64>,
    #[serde(flatten)]
    pub pricing: VariantPricing,
}

impl Variant {
    pub fn new(id: VariantId) -> Self {
        Self {
            id,
            title: None,
            sku: None,
            product_id: None,
            manage_inventory: true,
            inventory_items: Vec::new(),
            inventory_quantity: None,
            pricing: VariantPricing::default(),
        }
    }
}

/// A product with its variants, as returned by a by-id catalog query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Descriptive product fields (description, images, categories, ...) passed through.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Publication status a product must have to appear on a storefront.
pub const PUBLISHED_STATUS: &str = "published";

impl Product {
    /// Seller recorded in `metadata.seller_id`, else `metadata.seller`. Blank values
    /// count as absent.
    pub fn seller_id(&self) -> Option<&str> {
        let metadata = self.extra.get("metadata")?;
        ["seller_id", "seller"]
            .iter()
            .find_map(|field| metadata.get(field).and_then(JsonValue::as_str).filter(|s| !s.is_empty()))
    }

    /// Products without a `status` field are treated as published.
    pub fn is_published(&self) -> bool {
        match self.extra.get("status") {
            None | Some(JsonValue::Null) => true,
            Some(status) => status.as_str() == Some(PUBLISHED_STATUS),
        }
    }

    /// Whether the product belongs on `seller`'s storefront.
    pub fn listed_by(&self, seller: &SellerId) -> bool {
        self.is_published() && self.seller_id() == Some(seller.as_str())
    }

    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            handle: self.handle.clone(),
        }
    }
}

/// The product fields listed next to each variant in inventory listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: Option<String>,
    pub handle: Option<String>,
}

/// A variant together with its owning product.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub variant: Variant,
    pub product: Option<ProductSummary>,
}

fn default_true() -> bool {
    true
}

fn lenient_quantity<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(quantity_from_json))
}

/// Interpret a loosely typed JSON quantity.
///
/// Integers pass through, floats and numeric strings truncate toward zero, anything
/// else (null, booleans, garbage strings) reads as absent.
pub fn quantity_from_json(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64),
        _ => None,
    }
}
