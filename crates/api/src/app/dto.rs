use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use stockwise_core::{ProductId, VariantId};
use stockwise_inventory::{
    record_stock, summarize, AdjustmentOutcome, CatalogEntry, InventoryRecord, Product, RawAdjustment,
    RecordStock,
};
use stockwise_products::NormalizedVariantPricing;

pub const ADJUSTED_MESSAGE: &str = "stock adjusted";

// -------------------------
// Request mapping
// -------------------------

/// Items of a batch body, or `None` when `items` is absent, not a list, or empty.
///
/// Entries that are not objects become empty adjustments so they are reported per item.
pub fn batch_items(body: &JsonValue) -> Option<Vec<RawAdjustment>> {
    let items = body.get("items")?.as_array()?;
    if items.is_empty() {
        return None;
    }
    Some(
        items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
            .collect(),
    )
}

// -------------------------
// Response DTOs
// -------------------------

/// One row of the inventory listing.
#[derive(Debug, Serialize)]
pub struct InventoryRow {
    pub variant_id: VariantId,
    pub variant_title: Option<String>,
    pub sku: Option<String>,
    pub product_id: Option<ProductId>,
    pub product_title: Option<String>,
    pub product_handle: Option<String>,
    pub manage_inventory: bool,
    pub available_quantity: u64,
    pub in_stock: bool,
}

pub fn inventory_row(entry: &CatalogEntry) -> InventoryRow {
    let variant = &entry.variant;
    let stock = summarize(variant);
    let product = entry.product.as_ref();

    InventoryRow {
        variant_id: variant.id.clone(),
        variant_title: variant.title.clone(),
        sku: variant.sku.clone(),
        product_id: product.map(|p| p.id.clone()).or_else(|| variant.product_id.clone()),
        product_title: product.and_then(|p| p.title.clone()),
        product_handle: product.and_then(|p| p.handle.clone()),
        manage_inventory: variant.manage_inventory,
        available_quantity: stock.total_quantity,
        in_stock: stock.in_stock,
    }
}

#[derive(Debug, Serialize)]
pub struct ProductRef<'a> {
    pub id: &'a ProductId,
    pub title: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct VariantStockView<'a> {
    pub id: &'a VariantId,
    pub title: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub manage_inventory: bool,
    pub inventory_items: Vec<RecordStock<'a>>,
    pub total_quantity: u64,
}

/// Per-variant, per-record stock of one product.
#[derive(Debug, Serialize)]
pub struct ProductInventoryView<'a> {
    pub product: ProductRef<'a>,
    pub variants: Vec<VariantStockView<'a>>,
    pub count: usize,
}

pub fn product_inventory_view(product: &Product) -> ProductInventoryView<'_> {
    let variants: Vec<_> = product
        .variants
        .iter()
        .map(|v| VariantStockView {
            id: &v.id,
            title: v.title.as_deref(),
            sku: v.sku.as_deref(),
            manage_inventory: v.manage_inventory,
            inventory_items: record_stock(v),
            total_quantity: summarize(v).total_quantity,
        })
        .collect();

    ProductInventoryView {
        product: ProductRef {
            id: &product.id,
            title: product.title.as_deref(),
        },
        count: variants.len(),
        variants,
    }
}

#[derive(Debug, Serialize)]
pub struct VariantView<'a> {
    pub id: &'a VariantId,
    pub title: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub product_id: Option<&'a ProductId>,
    pub manage_inventory: bool,
    pub inventory_items: &'a [InventoryRecord],
    #[serde(flatten)]
    pub pricing: NormalizedVariantPricing,
}

/// A product with every variant price normalized.
#[derive(Debug, Serialize)]
pub struct ProductView<'a> {
    pub id: &'a ProductId,
    pub title: Option<&'a str>,
    pub handle: Option<&'a str>,
    pub variants: Vec<VariantView<'a>>,
    #[serde(flatten)]
    pub extra: &'a Map<String, JsonValue>,
}

pub fn product_view(product: &Product) -> ProductView<'_> {
    ProductView {
        id: &product.id,
        title: product.title.as_deref(),
        handle: product.handle.as_deref(),
        variants: product
            .variants
            .iter()
            .map(|v| VariantView {
                id: &v.id,
                title: v.title.as_deref(),
                sku: v.sku.as_deref(),
                product_id: v.product_id.as_ref(),
                manage_inventory: v.manage_inventory,
                inventory_items: &v.inventory_items,
                pricing: v.pricing.normalized(),
            })
            .collect(),
        extra: &product.extra,
    }
}

#[derive(Debug, Serialize)]
pub struct StoreVariantView<'a> {
    pub id: &'a VariantId,
    pub title: Option<&'a str>,
    pub sku: Option<&'a str>,
    pub product_id: Option<&'a ProductId>,
    pub manage_inventory: bool,
    pub inventory_items: Vec<RecordStock<'a>>,
    pub total_quantity: u64,
    pub in_stock: bool,
    pub is_active: bool,
    #[serde(flatten)]
    pub pricing: NormalizedVariantPricing,
}

/// A storefront product: aggregated stock and normalized prices on every variant.
#[derive(Debug, Serialize)]
pub struct StoreProductView<'a> {
    pub id: &'a ProductId,
    pub title: Option<&'a str>,
    pub handle: Option<&'a str>,
    pub variants: Vec<StoreVariantView<'a>>,
    #[serde(flatten)]
    pub extra: &'a Map<String, JsonValue>,
}

pub fn store_product_view(product: &Product) -> StoreProductView<'_> {
    StoreProductView {
        id: &product.id,
        title: product.title.as_deref(),
        handle: product.handle.as_deref(),
        variants: product
            .variants
            .iter()
            .map(|v| {
                let stock = summarize(v);
                StoreVariantView {
                    id: &v.id,
                    title: v.title.as_deref(),
                    sku: v.sku.as_deref(),
                    product_id: v.product_id.as_ref(),
                    manage_inventory: v.manage_inventory,
                    inventory_items: record_stock(v),
                    total_quantity: stock.total_quantity,
                    in_stock: stock.in_stock,
                    is_active: stock.in_stock,
                    pricing: v.pricing.normalized(),
                }
            })
            .collect(),
        extra: &product.extra,
    }
}

pub fn adjustment_to_json(outcome: &AdjustmentOutcome) -> JsonValue {
    match outcome {
        AdjustmentOutcome::Success(adjusted) => serde_json::json!({
            "success": true,
            "message": ADJUSTED_MESSAGE,
            "variant_id": adjusted.variant_id.as_str(),
            "previous_quantity": adjusted.previous_quantity,
            "adjusted_by": adjusted.adjusted_by,
            "new_quantity": adjusted.new_quantity,
        }),
        AdjustmentOutcome::Skipped { variant_id, message } => serde_json::json!({
            "success": true,
            "message": message,
            "variant_id": variant_id.as_str(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_items_requires_a_non_empty_list() {
        assert!(batch_items(&json!({})).is_none());
        assert!(batch_items(&json!({ "items": {} })).is_none());
        assert!(batch_items(&json!({ "items": [] })).is_none());

        let items = batch_items(&json!({ "items": [{ "variantId": "v1", "quantity": 1 }, 7] })).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], RawAdjustment::new("v1", 1));
        assert_eq!(items[1], RawAdjustment::default());
    }

    #[test]
    fn product_view_normalizes_prices_and_keeps_extra_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": "prod_1",
            "title": "Mug",
            "description": "Ceramic",
            "variants": [{ "id": "v1", "prices": [{ "amount": 250, "currency_code": "usd" }] }]
        }))
        .unwrap();

        let v = serde_json::to_value(product_view(&product)).unwrap();
        assert_eq!(v["description"], json!("Ceramic"));
        assert_eq!(v["variants"][0]["prices"][0]["amount"], json!(25_000));
        assert_eq!(v["variants"][0]["price_set"]["prices"][0]["amount_units"], json!(250.0));
    }

    #[test]
    fn store_product_view_carries_stock_and_prices() {
        let product: Product = serde_json::from_value(json!({
            "id": "prod_1",
            "metadata": { "seller_id": "seller_1" },
            "variants": [{
                "id": "v1",
                "prices": [{ "amount": 150_000, "currency_code": "usd" }],
                "inventory_items": [{
                    "id": "iitem_1",
                    "location_levels": [
                        { "location_id": "a", "quantity": 2, "available_quantity": 50 },
                        { "location_id": "b", "stocked_quantity": 3 }
                    ]
                }]
            }]
        }))
        .unwrap();

        let v = serde_json::to_value(store_product_view(&product)).unwrap();
        let variant = &v["variants"][0];
        assert_eq!(v["metadata"]["seller_id"], json!("seller_1"));
        assert_eq!(variant["total_quantity"], json!(5));
        assert_eq!(variant["in_stock"], json!(true));
        assert_eq!(variant["is_active"], json!(true));
        assert_eq!(variant["inventory_items"][0]["total_quantity"], json!(5));
        assert_eq!(variant["prices"][0]["amount"], json!(150_000));
        assert_eq!(variant["price_set"]["prices"][0]["amount_units"], json!(1500.0));
    }
}
