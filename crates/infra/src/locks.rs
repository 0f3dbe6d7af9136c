//! Per-level write serialization.
//!
//! Adjustments to the same `(inventory_item_id, location_id)` run their read, compute and
//! write steps one at a time within this process. Different levels proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use stockwise_inventory::LevelKey;

use crate::ports::StoreError;

#[derive(Debug, Default)]
pub struct LevelLocks {
    slots: Mutex<HashMap<LevelKey, Arc<AsyncMutex<()>>>>,
}

impl LevelLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a level. The guard releases it on drop.
    pub async fn acquire(&self, key: &LevelKey) -> Result<OwnedMutexGuard<()>, StoreError> {
        let slot = {
            let mut slots = self
                .slots
                .lock()
                .map_err(|_| StoreError::Unavailable("level lock table poisoned".to_string()))?;

            // Drop idle slots: only the table itself holds them.
            slots.retain(|k, slot| k == key || Arc::strong_count(slot) > 1);

            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        Ok(slot.lock_owned().await)
    }

    /// Number of levels currently tracked.
    pub fn tracked(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}
