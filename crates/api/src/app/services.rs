use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use stockwise_core::ProductId;
use stockwise_infra::{
    AdjustError, AppConfig, CatalogReader, InMemoryCatalog, SeedError, StockAdjuster, StoreError,
};
use stockwise_inventory::{AdjustmentOutcome, BatchReport, CatalogEntry, Product, RawAdjustment};

#[cfg(feature = "postgres")]
use stockwise_infra::PostgresCatalog;

type InMemoryAdjuster = StockAdjuster<Arc<InMemoryCatalog>, Arc<InMemoryCatalog>>;

#[cfg(feature = "postgres")]
type PersistentAdjuster = StockAdjuster<Arc<PostgresCatalog>, Arc<PostgresCatalog>>;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Catalog + adjuster wiring behind the HTTP handlers.
pub enum AppServices {
    InMemory {
        adjuster: InMemoryAdjuster,
    },
    #[cfg(feature = "postgres")]
    Persistent {
        adjuster: PersistentAdjuster,
    },
}

impl AppServices {
    pub fn in_memory(catalog: Arc<InMemoryCatalog>, store_timeout: Duration) -> Self {
        AppServices::InMemory {
            adjuster: StockAdjuster::new(catalog.clone(), catalog).with_store_timeout(store_timeout),
        }
    }

    pub async fn list_variants(&self) -> Result<Vec<CatalogEntry>, StoreError> {
        match self {
            AppServices::InMemory { adjuster } => adjuster.catalog().list_variants().await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { adjuster } => adjuster.catalog().list_variants().await,
        }
    }

    pub async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        match self {
            AppServices::InMemory { adjuster } => adjuster.catalog().find_product(id).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { adjuster } => adjuster.catalog().find_product(id).await,
        }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        match self {
            AppServices::InMemory { adjuster } => adjuster.catalog().list_products().await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { adjuster } => adjuster.catalog().list_products().await,
        }
    }

    pub async fn adjust(&self, raw: &RawAdjustment) -> Result<AdjustmentOutcome, AdjustError> {
        match self {
            AppServices::InMemory { adjuster } => adjuster.adjust_raw(raw).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { adjuster } => adjuster.adjust_raw(raw).await,
        }
    }

    pub async fn adjust_batch(&self, items: &[RawAdjustment]) -> Result<BatchReport, AdjustError> {
        match self {
            AppServices::InMemory { adjuster } => adjuster.adjust_batch(items).await,
            #[cfg(feature = "postgres")]
            AppServices::Persistent { adjuster } => adjuster.adjust_batch(items).await,
        }
    }
}

fn build_in_memory_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    let catalog = match &config.seed_catalog_path {
        Some(path) => {
            let catalog = InMemoryCatalog::from_seed_file(path)?;
            tracing::info!(path = %path.display(), "loaded seed catalog");
            catalog
        }
        None => InMemoryCatalog::new(),
    };
    Ok(AppServices::in_memory(Arc::new(catalog), config.store_write_timeout))
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;

    let catalog = Arc::new(PostgresCatalog::connect(database_url).await?);
    catalog.ensure_schema().await?;

    Ok(AppServices::Persistent {
        adjuster: StockAdjuster::new(catalog.clone(), catalog).with_store_timeout(config.store_write_timeout),
    })
}

/// Pick the store implementation from configuration.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    if config.use_persistent_stores {
        #[cfg(feature = "postgres")]
        {
            return build_persistent_services(config).await;
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!("USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory");
        }
    }
    build_in_memory_services(config)
}
