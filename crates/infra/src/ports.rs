//! Collaborator interfaces the stock engine is written against.
//!
//! The catalog and the stock levels are owned by an external store. The engine only
//! reads nested Variant → InventoryRecord → LocationLevel snapshots and issues
//! quantity overwrites; everything else about persistence lives behind these traits.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockwise_core::{ExpectedVersion, ProductId, VariantId};
use stockwise_inventory::{CatalogEntry, LevelKey, Product, Variant};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record changed since it was read (optimistic concurrency).
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    /// The record addressed by a write does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backing store could not be reached or is unusable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("store error: {0}")]
    Backend(String),
}

/// Overwrite of one location level's stocked quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpdate {
    pub key: LevelKey,
    pub stocked_quantity: u64,
    pub expected_version: ExpectedVersion,
}

/// A level as it stands after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedLevel {
    pub key: LevelKey,
    pub stocked_quantity: u64,
    pub version: u64,
}

/// Read side: nested catalog snapshots.
#[async_trait::async_trait]
pub trait CatalogReader: Send + Sync {
    /// Every variant with its inventory and owning product, in catalog order.
    async fn list_variants(&self) -> Result<Vec<CatalogEntry>, StoreError>;

    async fn find_variant(&self, id: &VariantId) -> Result<Option<Variant>, StoreError>;

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;

    /// Every product with its variants, in catalog order.
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
}

/// Write side: stocked quantity overwrites.
#[async_trait::async_trait]
pub trait LevelWriter: Send + Sync {
    /// Apply updates in order. Each update is atomic on its own; the call stops at the
    /// first failing update and earlier updates stay applied.
    async fn update_levels(&self, updates: Vec<LevelUpdate>) -> Result<Vec<AppliedLevel>, StoreError>;
}

#[async_trait::async_trait]
impl<S> CatalogReader for Arc<S>
where
    S: CatalogReader + ?Sized,
{
    async fn list_variants(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        (**self).list_variants().await
    }

    async fn find_variant(&self, id: &VariantId) -> Result<Option<Variant>, StoreError> {
        (**self).find_variant(id).await
    }

    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find_product(id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }
}

#[async_trait::async_trait]
impl<S> LevelWriter for Arc<S>
where
    S: LevelWriter + ?Sized,
{
    async fn update_levels(&self, updates: Vec<LevelUpdate>) -> Result<Vec<AppliedLevel>, StoreError> {
        (**self).update_levels(updates).await
    }
}
