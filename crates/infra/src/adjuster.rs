//! Stock adjustment pipeline (application-level orchestration).
//!
//! ```text
//! AdjustmentRequest
//!   ↓
//! 1. Load the variant snapshot from the catalog
//!   ↓
//! 2. Plan the deduction (skip / clamp to zero / missing metadata)
//!   ↓
//! 3. Lock the target level, reload and re-plan
//!   ↓
//! 4. Write the new stocked quantity, guarded by the level version
//! ```
//!
//! Batches run items one after another in input order. A failing item is recorded in
//! the report and never aborts or rolls back the others.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use stockwise_core::{DomainError, ExpectedVersion, VariantId};
use stockwise_inventory::{
    plan_adjustment, AdjustmentOutcome, AdjustmentPlan, AdjustmentRequest, BatchReport, MissingInventory,
    RawAdjustment, Resolution, StockAdjustment,
};

use crate::locks::LevelLocks;
use crate::ports::{CatalogReader, LevelUpdate, LevelWriter, StoreError};

/// Per-item message for batch entries that fail shape validation.
pub const INVALID_ITEM_MESSAGE: &str = "invalid data for this item";

pub const EMPTY_BATCH_MESSAGE: &str = "items must be a non-empty list";

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdjustError {
    /// Caller input was malformed; nothing was looked up.
    #[error("{0}")]
    InvalidInput(String),

    #[error("variant {0} not found")]
    VariantNotFound(VariantId),

    /// The variant exists but has no inventory record or location level to deduct from.
    #[error(transparent)]
    InventoryMetadataMissing(#[from] MissingInventory),

    /// The level changed between read and write.
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AdjustError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => AdjustError::Conflict(msg),
            other => AdjustError::Store(other),
        }
    }
}

impl From<DomainError> for AdjustError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => AdjustError::InvalidInput(msg),
            DomainError::Conflict(msg) => AdjustError::Conflict(msg),
        }
    }
}

/// Applies stock deductions against an external catalog.
///
/// Writes to one `(inventory_item_id, location_id)` are serialized in-process by
/// [`LevelLocks`]; writers in other processes are caught by the level version check.
pub struct StockAdjuster<C, W> {
    catalog: C,
    writer: W,
    locks: LevelLocks,
    store_timeout: Duration,
}

impl<C, W> StockAdjuster<C, W>
where
    C: CatalogReader,
    W: LevelWriter,
{
    pub fn new(catalog: C, writer: W) -> Self {
        Self {
            catalog,
            writer,
            locks: LevelLocks::new(),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound every store call by `timeout`.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Validate a wire request, then adjust.
    pub async fn adjust_raw(&self, raw: &RawAdjustment) -> Result<AdjustmentOutcome, AdjustError> {
        let request = AdjustmentRequest::parse(raw)?;
        self.adjust(&request).await
    }

    /// Deduct `request.quantity` from the variant's primary location level.
    #[instrument(skip_all, fields(variant_id = %request.variant_id, quantity = request.quantity))]
    pub async fn adjust(&self, request: &AdjustmentRequest) -> Result<AdjustmentOutcome, AdjustError> {
        let variant_id = &request.variant_id;

        let planned = match self.resolve(request).await? {
            Resolution::Skip => return Ok(self.skip(variant_id)),
            Resolution::Adjust(plan) => plan,
        };

        let _guard = self.locks.acquire(&planned.key).await?;

        // Someone may have written between the first read and acquiring the lock.
        let plan = match self.resolve(request).await? {
            Resolution::Skip => return Ok(self.skip(variant_id)),
            Resolution::Adjust(plan) => plan,
        };
        if plan.key != planned.key {
            return Err(AdjustError::Conflict(format!(
                "write target for variant {variant_id} moved from {} to {}",
                planned.key, plan.key
            )));
        }

        self.write(&plan).await?;

        info!(
            level = %plan.key,
            previous_quantity = plan.previous_quantity,
            new_quantity = plan.new_quantity,
            "stock adjusted"
        );
        Ok(AdjustmentOutcome::Success(StockAdjustment::from(&plan)))
    }

    /// Apply a batch of wire requests sequentially with per-item isolation.
    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn adjust_batch(&self, items: &[RawAdjustment]) -> Result<BatchReport, AdjustError> {
        if items.is_empty() {
            return Err(AdjustError::InvalidInput(EMPTY_BATCH_MESSAGE.to_string()));
        }

        let mut report = BatchReport::with_capacity(items.len());
        for raw in items {
            let label = raw.variant_label();
            let outcome = match AdjustmentRequest::parse(raw) {
                Err(_) => {
                    warn!(variant_id = label.as_deref(), "rejected malformed batch item");
                    Err(INVALID_ITEM_MESSAGE.to_string())
                }
                Ok(request) => self.adjust(&request).await.map_err(|e| {
                    warn!(variant_id = %request.variant_id, error = %e, "batch item failed");
                    e.to_string()
                }),
            };
            report.record(label, outcome);
        }

        info!(
            processed = report.processed(),
            errors = report.error_count(),
            "batch adjustment finished"
        );
        Ok(report)
    }

    async fn resolve(&self, request: &AdjustmentRequest) -> Result<Resolution, AdjustError> {
        let variant = self
            .bounded("find_variant", self.catalog.find_variant(&request.variant_id))
            .await?
            .ok_or_else(|| AdjustError::VariantNotFound(request.variant_id.clone()))?;

        Ok(plan_adjustment(&variant, request)?)
    }

    async fn write(&self, plan: &AdjustmentPlan) -> Result<(), AdjustError> {
        let update = LevelUpdate {
            key: plan.key.clone(),
            stocked_quantity: plan.new_quantity,
            expected_version: ExpectedVersion::Exact(plan.expected_version),
        };

        self.bounded("update_levels", self.writer.update_levels(vec![update]))
            .await
            .inspect_err(|e| error!(level = %plan.key, error = %e, "stock write failed"))?;
        Ok(())
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, AdjustError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(AdjustError::from),
            Err(_) => Err(AdjustError::Timeout {
                operation,
                after: self.store_timeout,
            }),
        }
    }

    fn skip(&self, variant_id: &VariantId) -> AdjustmentOutcome {
        warn!(%variant_id, "skipped adjustment: variant does not manage inventory");
        AdjustmentOutcome::skipped(variant_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;
    use stockwise_core::{InventoryItemId, LocationId, ProductId};
    use stockwise_inventory::{CatalogEntry, ItemError, LevelKey, Product, Variant};

    use crate::memory::InMemoryCatalog;
    use crate::ports::AppliedLevel;

    fn seeded() -> Arc<InMemoryCatalog> {
        let product: Product = serde_json::from_value(json!({
            "id": "prod_1",
            "title": "Mug",
            "variants": [
                {
                    "id": "v1",
                    "inventory_items": [{
                        "id": "iitem_v1",
                        "location_levels": [{ "location_id": "sloc_1", "stocked_quantity": 10 }]
                    }]
                },
                {
                    "id": "v3",
                    "inventory_items": [{
                        "id": "iitem_v3",
                        "location_levels": [{ "location_id": "sloc_1", "available": 3 }]
                    }]
                },
                { "id": "v_unmanaged", "manage_inventory": false },
                { "id": "v_bare" }
            ]
        }))
        .unwrap();
        Arc::new(InMemoryCatalog::with_products(vec![product]))
    }

    fn key(item: &str) -> LevelKey {
        LevelKey {
            inventory_item_id: InventoryItemId::parse(item).unwrap(),
            location_id: LocationId::parse("sloc_1").unwrap(),
        }
    }

    fn request(id: &str, qty: i64) -> AdjustmentRequest {
        AdjustmentRequest::new(VariantId::parse(id).unwrap(), qty).unwrap()
    }

    fn stocked(catalog: &InMemoryCatalog, item: &str) -> Option<i64> {
        catalog.level(&key(item)).unwrap().and_then(|l| l.stocked_quantity)
    }

    /// Counts writes and forwards them to an inner writer.
    struct RecordingWriter<W> {
        inner: W,
        writes: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl<W: LevelWriter> LevelWriter for RecordingWriter<W> {
        async fn update_levels(&self, updates: Vec<LevelUpdate>) -> Result<Vec<AppliedLevel>, StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.update_levels(updates).await
        }
    }

    struct FailingWriter;

    #[async_trait::async_trait]
    impl LevelWriter for FailingWriter {
        async fn update_levels(&self, _: Vec<LevelUpdate>) -> Result<Vec<AppliedLevel>, StoreError> {
            Err(StoreError::Backend("connection reset".to_string()))
        }
    }

    struct StalledWriter;

    #[async_trait::async_trait]
    impl LevelWriter for StalledWriter {
        async fn update_levels(&self, _: Vec<LevelUpdate>) -> Result<Vec<AppliedLevel>, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    /// Forwards writes to `inner`, except those touching `item`, which fail or stall.
    struct SelectiveWriter<W> {
        inner: W,
        item: &'static str,
        stall: bool,
    }

    #[async_trait::async_trait]
    impl<W: LevelWriter> LevelWriter for SelectiveWriter<W> {
        async fn update_levels(&self, updates: Vec<LevelUpdate>) -> Result<Vec<AppliedLevel>, StoreError> {
            if !updates.iter().any(|u| u.key.inventory_item_id.as_str() == self.item) {
                return self.inner.update_levels(updates).await;
            }
            if self.stall {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Err(StoreError::Backend("connection reset".to_string()))
        }
    }

    /// Always serves the same (possibly outdated) variant snapshot.
    struct FrozenCatalog(Variant);

    #[async_trait::async_trait]
    impl CatalogReader for FrozenCatalog {
        async fn list_variants(&self) -> Result<Vec<CatalogEntry>, StoreError> {
            Ok(vec![CatalogEntry {
                variant: self.0.clone(),
                product: None,
            }])
        }

        async fn find_variant(&self, id: &VariantId) -> Result<Option<Variant>, StoreError> {
            Ok((&self.0.id == id).then(|| self.0.clone()))
        }

        async fn find_product(&self, _: &ProductId) -> Result<Option<Product>, StoreError> {
            Ok(None)
        }

        async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn deducts_from_first_level() {
        let catalog = seeded();
        let adjuster = StockAdjuster::new(catalog.clone(), catalog.clone());

        let outcome = adjuster.adjust(&request("v1", 2)).await.unwrap();

        assert_eq!(
            outcome,
            AdjustmentOutcome::Success(StockAdjustment {
                variant_id: VariantId::parse("v1").unwrap(),
                previous_quantity: 10,
                adjusted_by: 2,
                new_quantity: 8,
            })
        );
        assert_eq!(stocked(&catalog, "iitem_v1"), Some(8));
    }

    #[tokio::test]
    async fn over_deduction_clamps_to_zero() {
        let catalog = seeded();
        let adjuster = StockAdjuster::new(catalog.clone(), catalog.clone());

        adjuster.adjust(&request("v3", 5)).await.unwrap();
        assert_eq!(stocked(&catalog, "iitem_v3"), Some(0));
    }

    #[tokio::test]
    async fn unmanaged_variant_is_skipped_without_writing() {
        let catalog = seeded();
        let writer = RecordingWriter {
            inner: catalog.clone(),
            writes: AtomicUsize::new(0),
        };
        let adjuster = StockAdjuster::new(catalog.clone(), writer);

        let outcome = adjuster.adjust(&request("v_unmanaged", 1)).await.unwrap();

        assert!(matches!(outcome, AdjustmentOutcome::Skipped { .. }));
        assert_eq!(adjuster.writer.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_variant_is_not_found() {
        let catalog = seeded();
        let adjuster = StockAdjuster::new(catalog.clone(), catalog.clone());

        let err = adjuster.adjust(&request("nope", 1)).await.unwrap_err();
        assert_eq!(err, AdjustError::VariantNotFound(VariantId::parse("nope").unwrap()));
    }

    #[tokio::test]
    async fn variant_without_inventory_record_reports_missing_metadata() {
        let catalog = seeded();
        let adjuster = StockAdjuster::new(catalog.clone(), catalog.clone());

        let err = adjuster.adjust(&request("v_bare", 1)).await.unwrap_err();
        assert!(matches!(
            err,
            AdjustError::InventoryMetadataMissing(MissingInventory::InventoryItem(_))
        ));
    }

    #[tokio::test]
    async fn zero_quantity_is_invalid_input() {
        let catalog = seeded();
        let adjuster = StockAdjuster::new(catalog.clone(), catalog.clone());

        let err = adjuster.adjust_raw(&RawAdjustment::new("v1", 0)).await.unwrap_err();
        assert!(matches!(err, AdjustError::InvalidInput(_)));
        assert_eq!(stocked(&catalog, "iitem_v1"), Some(10));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_store_error() {
        let adjuster = StockAdjuster::new(seeded(), FailingWriter);

        let err = adjuster.adjust(&request("v1", 1)).await.unwrap_err();
        assert_eq!(err, AdjustError::Store(StoreError::Backend("connection reset".to_string())));
    }

    #[tokio::test]
    async fn stalled_write_times_out() {
        let adjuster = StockAdjuster::new(seeded(), StalledWriter).with_store_timeout(Duration::from_millis(20));

        let err = adjuster.adjust(&request("v1", 1)).await.unwrap_err();
        assert!(matches!(
            err,
            AdjustError::Timeout {
                operation: "update_levels",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn stale_snapshot_is_rejected_as_conflict() {
        let store = seeded();
        let stale = store
            .find_variant(&VariantId::parse("v1").unwrap())
            .await
            .unwrap()
            .unwrap();

        // Another writer moves the level on after the snapshot was taken.
        store
            .update_levels(vec![LevelUpdate {
                key: key("iitem_v1"),
                stocked_quantity: 4,
                expected_version: ExpectedVersion::Any,
            }])
            .await
            .unwrap();

        let adjuster = StockAdjuster::new(FrozenCatalog(stale), store.clone());
        let err = adjuster.adjust(&request("v1", 1)).await.unwrap_err();

        assert!(matches!(err, AdjustError::Conflict(_)));
        assert_eq!(stocked(&store, "iitem_v1"), Some(4));
    }

    #[tokio::test]
    async fn concurrent_adjustments_lose_no_deductions() {
        let catalog = seeded();
        let adjuster = Arc::new(StockAdjuster::new(catalog.clone(), catalog.clone()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let adjuster = adjuster.clone();
                tokio::spawn(async move { adjuster.adjust(&request("v1", 1)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(stocked(&catalog, "iitem_v1"), Some(2));
    }

    #[tokio::test]
    async fn batch_isolates_failures_and_keeps_order() {
        let catalog = seeded();
        let adjuster = StockAdjuster::new(catalog.clone(), catalog.clone());
        let items = vec![
            RawAdjustment::new("v1", 2),
            RawAdjustment::new("v2", -1),
            RawAdjustment::new("v3", 5),
        ];

        let report = adjuster.adjust_batch(&items).await.unwrap();

        assert!(!report.success());
        assert_eq!(report.processed(), 2);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.len(), items.len());

        let body = serde_json::to_value(&report).unwrap();
        assert_eq!(body["results"][0]["variantId"], "v1");
        assert_eq!(body["results"][0]["new_quantity"], 8);
        assert_eq!(body["results"][1]["variantId"], "v3");
        assert_eq!(body["results"][1]["new_quantity"], 0);
        assert_eq!(
            body["errors_detail"],
            json!([{ "variantId": "v2", "error": INVALID_ITEM_MESSAGE }])
        );
    }

    #[tokio::test]
    async fn batch_reports_lookup_failures_per_item() {
        let catalog = seeded();
        let adjuster = StockAdjuster::new(catalog.clone(), catalog.clone());
        let items = vec![
            RawAdjustment::new("nope", 1),
            RawAdjustment::new("v_unmanaged", 1),
        ];

        let report = adjuster.adjust_batch(&items).await.unwrap();

        assert_eq!(report.errors()[0].error, "variant nope not found");
        assert!(matches!(report.results()[0], AdjustmentOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn batch_store_failure_stays_with_its_item() {
        let catalog = seeded();
        let writer = SelectiveWriter {
            inner: catalog.clone(),
            item: "iitem_v1",
            stall: false,
        };
        let adjuster = StockAdjuster::new(catalog.clone(), writer);
        let items = vec![RawAdjustment::new("v1", 2), RawAdjustment::new("v3", 1)];

        let report = adjuster.adjust_batch(&items).await.unwrap();

        assert_eq!(report.len(), items.len());
        assert_eq!(
            report.errors(),
            &[ItemError {
                variant_id: Some("v1".to_string()),
                error: "store error: connection reset".to_string(),
            }]
        );
        assert_eq!(report.results()[0].variant_id().as_str(), "v3");
        assert_eq!(stocked(&catalog, "iitem_v1"), Some(10));
        assert_eq!(stocked(&catalog, "iitem_v3"), Some(2));
    }

    #[tokio::test]
    async fn batch_timeout_stays_with_its_item() {
        let catalog = seeded();
        let writer = SelectiveWriter {
            inner: catalog.clone(),
            item: "iitem_v1",
            stall: true,
        };
        let adjuster = StockAdjuster::new(catalog.clone(), writer).with_store_timeout(Duration::from_millis(20));
        let items = vec![RawAdjustment::new("v1", 2), RawAdjustment::new("v3", 1)];

        let report = adjuster.adjust_batch(&items).await.unwrap();

        assert_eq!(report.processed() + report.error_count(), items.len());
        assert_eq!(report.errors()[0].variant_id.as_deref(), Some("v1"));
        assert_eq!(report.errors()[0].error, "update_levels timed out after 20ms");
        assert_eq!(report.processed(), 1);
        assert_eq!(stocked(&catalog, "iitem_v3"), Some(2));
    }

    #[tokio::test]
    async fn empty_batch_is_invalid_input() {
        let catalog = seeded();
        let adjuster = StockAdjuster::new(catalog.clone(), catalog.clone());

        let err = adjuster.adjust_batch(&[]).await.unwrap_err();
        assert_eq!(err, AdjustError::InvalidInput(EMPTY_BATCH_MESSAGE.to_string()));
    }
}
