//! Postgres-backed catalog and stock level store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | StoreError |
//! |------------|------------|
//! | `PoolClosed`, `PoolTimedOut`, `Io` | `Unavailable` |
//! | `Database` and everything else | `Backend` |
//!
//! A stock write that matches no row is re-checked: a missing level is `NotFound`, an
//! existing level at another version is `Conflict`.

use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;

use stockwise_core::{ExpectedVersion, InventoryItemId, LocationId, ProductId, VariantId};
use stockwise_inventory::{
    CatalogEntry, InventoryRecord, LocationLevel, Product, ProductSummary, Variant,
};
use stockwise_products::Price;

use crate::ports::{AppliedLevel, CatalogReader, LevelUpdate, LevelWriter, StoreError};

/// Tables read and written by [`PostgresCatalog`].
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS product (
    id          TEXT PRIMARY KEY,
    title       TEXT NULL,
    handle      TEXT NULL,
    attributes  JSONB NOT NULL DEFAULT '{}'::jsonb
);

CREATE TABLE IF NOT EXISTS product_variant (
    id                  TEXT PRIMARY KEY,
    product_id          TEXT NOT NULL REFERENCES product (id),
    title               TEXT NULL,
    sku                 TEXT NULL,
    manage_inventory    BOOLEAN NOT NULL DEFAULT TRUE,
    inventory_quantity  BIGINT NULL,
    position            INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS inventory_item (
    id          TEXT PRIMARY KEY,
    variant_id  TEXT NOT NULL REFERENCES product_variant (id),
    position    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS inventory_level (
    inventory_item_id   TEXT NOT NULL REFERENCES inventory_item (id),
    location_id         TEXT NOT NULL,
    stocked_quantity    BIGINT NOT NULL DEFAULT 0 CHECK (stocked_quantity >= 0),
    version             BIGINT NOT NULL DEFAULT 0,
    position            INTEGER NOT NULL DEFAULT 0,
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (inventory_item_id, location_id)
);

CREATE TABLE IF NOT EXISTS price (
    id              TEXT PRIMARY KEY,
    variant_id      TEXT NOT NULL REFERENCES product_variant (id),
    currency_code   TEXT NOT NULL,
    amount          NUMERIC NOT NULL
);
"#;

/// Optional filters shared by the catalog queries. `NULL` matches everything.
const VARIANT_FILTER: &str = "($1::text IS NULL OR v.id = $1) AND ($2::text IS NULL OR v.product_id = $2)";

#[derive(Debug, Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the catalog tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    /// Load variants (with records, levels and prices) matching the optional filters.
    async fn load_variants(
        &self,
        variant_id: Option<&str>,
        product_id: Option<&str>,
    ) -> Result<Vec<CatalogEntry>, StoreError> {
        let variant_rows = sqlx::query(&format!(
            r#"
            SELECT v.id, v.product_id, v.title, v.sku, v.manage_inventory, v.inventory_quantity,
                   p.title AS product_title, p.handle AS product_handle
            FROM product_variant v
            JOIN product p ON p.id = v.product_id
            WHERE {VARIANT_FILTER}
            ORDER BY p.id, v.position, v.id
            "#
        ))
        .bind(variant_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_variants", e))?;

        let mut entries = Vec::with_capacity(variant_rows.len());
        let mut index = HashMap::with_capacity(variant_rows.len());
        for row in &variant_rows {
            let entry = variant_from_row(row).map_err(|e| decode_error("product_variant", e))?;
            index.insert(entry.variant.id.as_str().to_string(), entries.len());
            entries.push(entry);
        }
        if entries.is_empty() {
            return Ok(entries);
        }

        let level_rows = sqlx::query(&format!(
            r#"
            SELECT i.variant_id, i.id AS inventory_item_id,
                   l.location_id, l.stocked_quantity, l.version
            FROM inventory_item i
            JOIN product_variant v ON v.id = i.variant_id
            LEFT JOIN inventory_level l ON l.inventory_item_id = i.id
            WHERE {VARIANT_FILTER}
            ORDER BY i.variant_id, i.position, i.id, l.position, l.location_id
            "#
        ))
        .bind(variant_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_levels", e))?;

        for row in &level_rows {
            let owner: String = row.try_get("variant_id").map_err(|e| decode_error("inventory_item", e))?;
            let Some(&slot) = index.get(&owner) else {
                continue;
            };
            attach_level(&mut entries[slot].variant, row).map_err(|e| decode_error("inventory_level", e))?;
        }

        let price_rows = sqlx::query(&format!(
            r#"
            SELECT pr.variant_id, pr.id, pr.currency_code, pr.amount::float8 AS amount
            FROM price pr
            JOIN product_variant v ON v.id = pr.variant_id
            WHERE {VARIANT_FILTER}
            ORDER BY pr.variant_id, pr.id
            "#
        ))
        .bind(variant_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_prices", e))?;

        for row in &price_rows {
            let owner: String = row.try_get("variant_id").map_err(|e| decode_error("price", e))?;
            let Some(&slot) = index.get(&owner) else {
                continue;
            };
            let price = price_from_row(row).map_err(|e| decode_error("price", e))?;
            entries[slot].variant.pricing.prices.push(price);
        }

        Ok(entries)
    }

    /// Apply one guarded overwrite. Returns the new version.
    async fn apply(&self, update: &LevelUpdate) -> Result<u64, StoreError> {
        let expected = match update.expected_version {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(v as i64),
        };

        let row = sqlx::query(
            r#"
            UPDATE inventory_level
            SET stocked_quantity = $3, version = version + 1, updated_at = now()
            WHERE inventory_item_id = $1 AND location_id = $2
              AND ($4::bigint IS NULL OR version = $4)
            RETURNING version
            "#,
        )
        .bind(update.key.inventory_item_id.as_str())
        .bind(update.key.location_id.as_str())
        .bind(update.stocked_quantity as i64)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_level", e))?;

        if let Some(row) = row {
            let version: i64 = row.try_get("version").map_err(|e| decode_error("inventory_level", e))?;
            return Ok(version as u64);
        }

        let current: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM inventory_level WHERE inventory_item_id = $1 AND location_id = $2",
        )
        .bind(update.key.inventory_item_id.as_str())
        .bind(update.key.location_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("check_level_version", e))?;

        Err(match current {
            None => StoreError::NotFound(format!("location level {}", update.key)),
            Some(actual) => StoreError::Conflict(format!(
                "location level {}: expected {:?}, found version {actual}",
                update.key, update.expected_version
            )),
        })
    }
}

#[async_trait::async_trait]
impl CatalogReader for PostgresCatalog {
    #[instrument(skip(self), err)]
    async fn list_variants(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        self.load_variants(None, None).await
    }

    #[instrument(skip(self), fields(variant_id = %id), err)]
    async fn find_variant(&self, id: &VariantId) -> Result<Option<Variant>, StoreError> {
        let mut entries = self.load_variants(Some(id.as_str()), None).await?;
        Ok(entries.pop().map(|e| e.variant))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT id, title, handle, attributes FROM product WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut product = product_from_row(&row).map_err(|e| decode_error("product", e))?;
        product.variants = self
            .load_variants(None, Some(id.as_str()))
            .await?
            .into_iter()
            .map(|e| e.variant)
            .collect();

        Ok(Some(product))
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT id, title, handle, attributes FROM product ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        let mut products = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());
        for row in &rows {
            let product = product_from_row(row).map_err(|e| decode_error("product", e))?;
            index.insert(product.id.as_str().to_string(), products.len());
            products.push(product);
        }

        for entry in self.load_variants(None, None).await? {
            let owner = entry.variant.product_id.as_ref().map(|id| id.as_str().to_string());
            if let Some(&slot) = owner.as_ref().and_then(|id| index.get(id)) {
                products[slot].variants.push(entry.variant);
            }
        }

        Ok(products)
    }
}

#[async_trait::async_trait]
impl LevelWriter for PostgresCatalog {
    #[instrument(skip(self, updates), fields(update_count = updates.len()), err)]
    async fn update_levels(&self, updates: Vec<LevelUpdate>) -> Result<Vec<AppliedLevel>, StoreError> {
        let mut applied = Vec::with_capacity(updates.len());
        for update in updates {
            let version = self.apply(&update).await?;
            applied.push(AppliedLevel {
                key: update.key,
                stocked_quantity: update.stocked_quantity,
                version,
            });
        }
        Ok(applied)
    }
}

fn variant_from_row(row: &PgRow) -> Result<CatalogEntry, String> {
    let id: String = row.try_get("id").map_err(|e| e.to_string())?;
    let product_id: String = row.try_get("product_id").map_err(|e| e.to_string())?;
    let product_id = ProductId::parse(product_id).map_err(|e| e.to_string())?;

    let mut variant = Variant::new(VariantId::parse(id).map_err(|e| e.to_string())?);
    variant.title = row.try_get("title").map_err(|e| e.to_string())?;
    variant.sku = row.try_get("sku").map_err(|e| e.to_string())?;
    variant.manage_inventory = row.try_get("manage_inventory").map_err(|e| e.to_string())?;
    variant.inventory_quantity = row.try_get("inventory_quantity").map_err(|e| e.to_string())?;
    variant.product_id = Some(product_id.clone());

    Ok(CatalogEntry {
        variant,
        product: Some(ProductSummary {
            id: product_id,
            title: row.try_get("product_title").map_err(|e| e.to_string())?,
            handle: row.try_get("product_handle").map_err(|e| e.to_string())?,
        }),
    })
}

/// A `product` row without its variants. Non-object `attributes` read as empty.
fn product_from_row(row: &PgRow) -> Result<Product, String> {
    let id: String = row.try_get("id").map_err(|e| e.to_string())?;
    let attributes: JsonValue = row.try_get("attributes").map_err(|e| e.to_string())?;
    let extra = match attributes {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    };

    Ok(Product {
        id: ProductId::parse(id).map_err(|e| e.to_string())?,
        title: row.try_get("title").map_err(|e| e.to_string())?,
        handle: row.try_get("handle").map_err(|e| e.to_string())?,
        variants: Vec::new(),
        extra,
    })
}

/// Append one `inventory_item LEFT JOIN inventory_level` row to its variant.
fn attach_level(variant: &mut Variant, row: &PgRow) -> Result<(), String> {
    let item_id: String = row.try_get("inventory_item_id").map_err(|e| e.to_string())?;
    let item_id = InventoryItemId::parse(item_id).map_err(|e| e.to_string())?;

    let is_new_record = variant
        .inventory_items
        .last()
        .is_none_or(|r| r.id.as_ref() != Some(&item_id));
    if is_new_record {
        variant.inventory_items.push(InventoryRecord::new(item_id, Vec::new()));
    }

    let location_id: Option<String> = row.try_get("location_id").map_err(|e| e.to_string())?;
    let (Some(location_id), Some(record)) = (location_id, variant.inventory_items.last_mut()) else {
        return Ok(());
    };

    let stocked: i64 = row.try_get("stocked_quantity").map_err(|e| e.to_string())?;
    let version: i64 = row.try_get("version").map_err(|e| e.to_string())?;
    let mut level = LocationLevel::stocked(LocationId::parse(location_id).map_err(|e| e.to_string())?, stocked);
    level.version = version as u64;
    record.location_levels.push(level);
    Ok(())
}

fn price_from_row(row: &PgRow) -> Result<Price, String> {
    let id: String = row.try_get("id").map_err(|e| e.to_string())?;
    let currency_code: String = row.try_get("currency_code").map_err(|e| e.to_string())?;
    let amount: f64 = row.try_get("amount").map_err(|e| e.to_string())?;
    Ok(Price::new(amount)
        .with_field("id", id)
        .with_field("currency_code", currency_code))
}

fn decode_error(table: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("failed to decode {table} row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {operation}: {}", db_err.message()))
        }
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
