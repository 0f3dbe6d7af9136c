//! Monetary amount normalization.
//!
//! Upstream price sources do not say whether an amount is in minor units (cents) or
//! major units. The normalizer infers it from magnitude:
//!
//! - an integer whose magnitude exceeds [`CENTS_CUTOFF`] is taken to be cents already;
//! - anything else (fractional values, integers up to the cutoff) is taken to be
//!   major units and multiplied by 100.
//!
//! Integers in `1..=1000` are inherently ambiguous (`500` could be five hundred units or
//! five units in cents). The cutoff is preserved exactly; sources that need the other
//! reading must carry an explicit unit on the record.
//!
//! Only the `raw` value is authoritative input. Feeding `units` back in as raw is not
//! idempotent: `150000` cents becomes `1500.00` units, which re-reads as `1500` cents.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Integer amounts strictly above this magnitude are treated as already-cents.
pub const CENTS_CUTOFF: f64 = 1000.0;

/// A raw price with both its cents and two-decimal unit representations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedAmount {
    pub raw: f64,
    pub cents: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub units: Decimal,
}

/// Normalize a raw numeric price. Non-finite input normalizes as zero.
pub fn normalize_amount(raw: f64) -> NormalizedAmount {
    let raw = if raw.is_finite() { raw } else { 0.0 };

    let cents = if is_integral(raw) && raw.abs() > CENTS_CUTOFF {
        raw as i64
    } else {
        round_half_up(raw * 100.0)
    };

    NormalizedAmount {
        raw,
        cents,
        units: Decimal::new(cents, 2),
    }
}

/// Read a raw amount from loosely typed JSON (number or numeric string).
///
/// Absent, null and unparseable values read as `0.0`.
pub fn raw_amount(value: Option<&JsonValue>) -> f64 {
    let parsed = match value {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            if s.is_empty() { Some(0.0) } else { s.parse::<f64>().ok() }
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn is_integral(v: f64) -> bool {
    v.fract() == 0.0
}

// Halves round toward positive infinity, matching how storefront clients round.
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}
