use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::money::{normalize_amount, raw_amount};

/// A price row as the catalog returns it.
///
/// Only `amount` is interpreted; every other field (id, currency, rules, ...) is
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Price {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<JsonValue>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl Price {
    pub fn new(amount: impl Into<JsonValue>) -> Self {
        Self {
            amount: Some(amount.into()),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn normalized(&self) -> NormalizedPrice {
        let amount = normalize_amount(raw_amount(self.amount.as_ref()));
        let mut extra = self.extra.clone();
        for derived in ["amount_raw", "amount_cents", "amount_units"] {
            extra.remove(derived);
        }
        NormalizedPrice {
            extra,
            amount_raw: amount.raw,
            amount_cents: amount.cents,
            amount_units: amount.units,
            amount: amount.cents,
        }
    }
}

/// A price decorated with its normalized representations.
///
/// `amount` is overwritten with the cents value; storefront clients read it that way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPrice {
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
    pub amount_raw: f64,
    pub amount_cents: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_units: rust_decimal::Decimal,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceSet {
    #[serde(default)]
    pub prices: Vec<Price>,
}

/// Price-bearing fields of a variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariantPricing {
    #[serde(default)]
    pub prices: Vec<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_set: Option<PriceSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPriceSet {
    pub prices: Vec<NormalizedPrice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedVariantPricing {
    pub prices: Vec<NormalizedPrice>,
    pub price_set: NormalizedPriceSet,
}

impl VariantPricing {
    /// Normalize every price of the variant.
    ///
    /// `price_set.prices` falls back to the flat `prices` list when the variant has no
    /// price set at all; an explicit empty price set stays empty.
    pub fn normalized(&self) -> NormalizedVariantPricing {
        let set_source = match &self.price_set {
            Some(set) => &set.prices,
            None => &self.prices,
        };

        NormalizedVariantPricing {
            prices: self.prices.iter().map(Price::normalized).collect(),
            price_set: NormalizedPriceSet {
                prices: set_source.iter().map(Price::normalized).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn normalized_price_keeps_extra_fields_and_overwrites_amount() {
        let price = Price::new(250).with_field("currency_code", "usd").with_field("id", "price_1");
        let v = serde_json::to_value(price.normalized()).unwrap();

        assert_eq!(v["currency_code"], json!("usd"));
        assert_eq!(v["id"], json!("price_1"));
        assert_eq!(v["amount_raw"].as_f64(), Some(250.0));
        assert_eq!(v["amount_cents"], json!(25_000));
        assert_eq!(v["amount_units"].as_f64(), Some(250.0));
        assert_eq!(v["amount"], json!(25_000));
    }

    #[test]
    fn string_amounts_are_parsed() {
        let n = Price::new("1500").normalized();
        assert_eq!(n.amount_cents, 1500);
        assert_eq!(n.amount_units, Decimal::new(1500, 2));
    }

    #[test]
    fn missing_amount_normalizes_to_zero() {
        let n = Price::default().normalized();
        assert_eq!(n.amount, 0);
        assert_eq!(n.amount_raw, 0.0);
    }

    #[test]
    fn price_set_falls_back_to_flat_prices() {
        let pricing = VariantPricing {
            prices: vec![Price::new(10), Price::new(2500)],
            price_set: None,
        };
        let n = pricing.normalized();
        assert_eq!(n.price_set.prices.len(), 2);
        assert_eq!(n.price_set.prices[0].amount, 1000);
        assert_eq!(n.price_set.prices[1].amount, 2500);
    }

    #[test]
    fn explicit_price_set_wins_even_when_empty() {
        let pricing = VariantPricing {
            prices: vec![Price::new(10)],
            price_set: Some(PriceSet { prices: vec![] }),
        };
        let n = pricing.normalized();
        assert_eq!(n.prices.len(), 1);
        assert!(n.price_set.prices.is_empty());
    }

    #[test]
    fn deserializes_catalog_price_rows() {
        let price: Price = serde_json::from_value(json!({
            "id": "price_9",
            "amount": 12.5,
            "currency_code": "eur"
        }))
        .unwrap();
        assert_eq!(price.amount, Some(json!(12.5)));
        assert_eq!(price.extra["currency_code"], json!("eur"));
        assert_eq!(price.normalized().amount_cents, 1250);
    }
}
