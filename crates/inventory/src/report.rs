//! Adjustment outcomes and the batch report built from them.

use serde::{Serialize, Serializer};

use stockwise_core::VariantId;

use crate::adjustment::AdjustmentPlan;

pub const SKIPPED_MESSAGE: &str = "variant does not manage inventory";

/// A completed stock deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAdjustment {
    #[serde(rename = "variantId")]
    pub variant_id: VariantId,
    pub previous_quantity: u64,
    pub adjusted_by: u64,
    pub new_quantity: u64,
}

impl From<&AdjustmentPlan> for StockAdjustment {
    fn from(plan: &AdjustmentPlan) -> Self {
        Self {
            variant_id: plan.variant_id.clone(),
            previous_quantity: plan.previous_quantity,
            adjusted_by: plan.adjusted_by,
            new_quantity: plan.new_quantity,
        }
    }
}

/// Result of a single adjustment that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AdjustmentOutcome {
    Success(StockAdjustment),
    Skipped {
        #[serde(rename = "variantId")]
        variant_id: VariantId,
        message: &'static str,
    },
}

impl AdjustmentOutcome {
    pub fn skipped(variant_id: VariantId) -> Self {
        Self::Skipped {
            variant_id,
            message: SKIPPED_MESSAGE,
        }
    }

    pub fn variant_id(&self) -> &VariantId {
        match self {
            Self::Success(a) => &a.variant_id,
            Self::Skipped { variant_id, .. } => variant_id,
        }
    }
}

/// A per-item failure inside a batch. Only the message is exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    #[serde(rename = "variantId")]
    pub variant_id: Option<String>,
    pub error: String,
}

/// Combined result of a batch: every input lands in exactly one of the two lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    results: Vec<AdjustmentOutcome>,
    errors: Vec<ItemError>,
}

impl BatchReport {
    pub fn with_capacity(items: usize) -> Self {
        Self {
            results: Vec::with_capacity(items),
            errors: Vec::new(),
        }
    }

    /// Record the outcome of one input item.
    pub fn record(&mut self, variant_id: Option<String>, outcome: Result<AdjustmentOutcome, String>) {
        match outcome {
            Ok(result) => self.results.push(result),
            Err(error) => self.errors.push(ItemError { variant_id, error }),
        }
    }

    pub fn results(&self) -> &[AdjustmentOutcome] {
        &self.results
    }

    pub fn errors(&self) -> &[ItemError] {
        &self.errors
    }

    /// True when no item failed. Skipped items count as success.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn processed(&self) -> usize {
        self.results.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of input items accounted for.
    pub fn len(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize)]
struct BatchReportBody<'a> {
    success: bool,
    processed: usize,
    errors: usize,
    results: &'a [AdjustmentOutcome],
    errors_detail: &'a [ItemError],
}

impl Serialize for BatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BatchReportBody {
            success: self.success(),
            processed: self.processed(),
            errors: self.error_count(),
            results: &self.results,
            errors_detail: &self.errors,
        }
        .serialize(serializer)
    }
}
