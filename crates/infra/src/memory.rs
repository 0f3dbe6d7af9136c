//! In-memory catalog for tests/dev.
//!
//! Holds products with their nested variants, inventory records and location levels,
//! and implements both collaborator ports over them. Writes check and bump the level
//! version under a single write lock, so each update is atomic.

use std::path::Path;
use std::sync::RwLock;

use serde::Deserialize;
use thiserror::Error;

use stockwise_core::{ProductId, VariantId};
use stockwise_inventory::{CatalogEntry, LevelKey, LocationLevel, Product, Variant};

use crate::ports::{AppliedLevel, CatalogReader, LevelUpdate, LevelWriter, StoreError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse seed file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Seed file layout: `{ "products": [ ... ] }`.
#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    products: Vec<Product>,
}

/// In-memory catalog + stock store.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<Vec<Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
        }
    }

    /// Load a catalog from a JSON seed file.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: display.clone(),
            source,
        })?;
        let seed: SeedFile = serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
            path: display,
            source,
        })?;
        Ok(Self::with_products(seed.products))
    }

    /// Current level for a key, if any variant references it.
    pub fn level(&self, key: &LevelKey) -> Result<Option<LocationLevel>, StoreError> {
        let products = self.products.read().map_err(poisoned)?;
        let found = products
            .iter()
            .flat_map(|p| p.variants.iter())
            .flat_map(|v| v.inventory_items.iter())
            .filter(|r| r.id.as_ref() == Some(&key.inventory_item_id))
            .flat_map(|r| r.location_levels.iter())
            .find(|l| l.location_id.as_ref() == Some(&key.location_id))
            .cloned();
        Ok(found)
    }

    fn apply(products: &mut [Product], update: &LevelUpdate) -> Result<AppliedLevel, StoreError> {
        let key = &update.key;
        let mut levels: Vec<&mut LocationLevel> = products
            .iter_mut()
            .flat_map(|p| p.variants.iter_mut())
            .flat_map(|v| v.inventory_items.iter_mut())
            .filter(|r| r.id.as_ref() == Some(&key.inventory_item_id))
            .flat_map(|r| r.location_levels.iter_mut())
            .filter(|l| l.location_id.as_ref() == Some(&key.location_id))
            .collect();

        let current = match levels.first() {
            Some(level) => level.version,
            None => return Err(StoreError::NotFound(format!("location level {key}"))),
        };

        update
            .expected_version
            .check(current)
            .map_err(|e| StoreError::Conflict(format!("location level {key}: {e}")))?;

        let stocked = i64::try_from(update.stocked_quantity)
            .map_err(|_| StoreError::Backend(format!("stocked quantity out of range for {key}")))?;
        let version = current + 1;

        // The same inventory item can be linked from several variants; keep every copy in step.
        for level in levels.iter_mut() {
            level.stocked_quantity = Some(stocked);
            level.version = version;
        }

        Ok(AppliedLevel {
            key: key.clone(),
            stocked_quantity: update.stocked_quantity,
            version,
        })
    }
}

#[async_trait::async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn list_variants(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        let products = self.products.read().map_err(poisoned)?;
        Ok(products
            .iter()
            .flat_map(|p| {
                let summary = p.summary();
                p.variants.iter().map(move |v| CatalogEntry {
                    variant: v.clone(),
                    product: Some(summary.clone()),
                })
            })
            .collect())
    }

    async fn find_variant(&self, id: &VariantId) -> Result<Option<Variant>, StoreError> {
        let products = self.products.read().map_err(poisoned)?;
        Ok(products
            .iter()
            .flat_map(|p| p.variants.iter())
            .find(|v| &v.id == id)
            .cloned())
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().map_err(poisoned)?;
        Ok(products.iter().find(|p| &p.id == id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.products.read().map_err(poisoned)?.clone())
    }
}

#[async_trait::async_trait]
impl LevelWriter for InMemoryCatalog {
    async fn update_levels(&self, updates: Vec<LevelUpdate>) -> Result<Vec<AppliedLevel>, StoreError> {
        let mut products = self.products.write().map_err(poisoned)?;
        let mut applied = Vec::with_capacity(updates.len());
        for update in &updates {
            applied.push(Self::apply(&mut products, update)?);
        }
        Ok(applied)
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("in-memory catalog lock poisoned".to_string())
}
