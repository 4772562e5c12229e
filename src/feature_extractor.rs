//! Feature extraction for fraud model inference.
//!
//! Transforms a raw transaction into the fixed-order feature vector the
//! classifier was trained on. Derivation is a pure function of the single
//! transaction: no customer-history lookups, so per-transaction latency is
//! independent of database state.

use chrono::{Datelike, Timelike};
use serde_json::json;
use thiserror::Error;

use crate::types::transaction::Transaction;

/// Merchant category vocabulary the model was trained with (v1).
///
/// Order is load-bearing: it matches the one-hot encoding of the training
/// export. Categories outside this list fall into the trailing `other`
/// bucket so schema drift upstream degrades to a coarser feature instead of
/// failing the pipeline.
pub const CATEGORY_VOCABULARY: [&str; 14] = [
    "entertainment",
    "food_dining",
    "gas_transport",
    "grocery_net",
    "grocery_pos",
    "health_fitness",
    "home",
    "kids_pets",
    "misc_net",
    "misc_pos",
    "personal_care",
    "shopping_net",
    "shopping_pos",
    "travel",
];

/// Names of the produced features, in vector order.
pub const FEATURE_NAMES: [&str; 22] = [
    "amt",
    "hour",
    "day_of_week",
    "city_pop",
    "is_night",
    "is_weekend",
    "cat_entertainment",
    "cat_food_dining",
    "cat_gas_transport",
    "cat_grocery_net",
    "cat_grocery_pos",
    "cat_health_fitness",
    "cat_home",
    "cat_kids_pets",
    "cat_misc_net",
    "cat_misc_pos",
    "cat_personal_care",
    "cat_shopping_net",
    "cat_shopping_pos",
    "cat_travel",
    "cat_other",
    "gender_f",
];

/// Rejection of a transaction that cannot be turned into model input.
#[derive(Debug, Error)]
#[error("malformed transaction: {field} {reason}")]
pub struct MalformedInput {
    /// Offending transaction field
    pub field: &'static str,
    /// What was wrong with it
    pub reason: String,
}

impl MalformedInput {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Fixed-size, ordered feature vector derived from one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    /// Raw values in model input order.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(name, value)` pairs in vector order.
    pub fn iter_named(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    /// Name → value mapping as JSON, for the persisted audit copy.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .iter_named()
            .map(|(name, value)| (name.to_string(), json!(value)))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// Feature extractor that transforms transactions into model input.
///
/// Stateless and deterministic: identical transactions always yield
/// identical vectors. Features are produced in the exact order expected by
/// the ONNX model.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Derive the feature vector for a transaction.
    ///
    /// Fails with [`MalformedInput`] if a required field is missing, out of
    /// range, or unparseable. Unseen category values are not an error; they
    /// map to the `other` bucket.
    pub fn derive(&self, tx: &Transaction) -> Result<FeatureVector, MalformedInput> {
        if tx.transaction_id.trim().is_empty() {
            return Err(MalformedInput::new("transaction_id", "is empty"));
        }
        if !tx.amount.is_finite() {
            return Err(MalformedInput::new("amount", "is not a number"));
        }
        if tx.amount < 0.0 {
            return Err(MalformedInput::new(
                "amount",
                format!("is negative ({})", tx.amount),
            ));
        }
        if tx.city_pop < 0 {
            return Err(MalformedInput::new(
                "city_pop",
                format!("is negative ({})", tx.city_pop),
            ));
        }
        if !tx.lat.is_finite() || !(-90.0..=90.0).contains(&tx.lat) {
            return Err(MalformedInput::new("lat", format!("out of range ({})", tx.lat)));
        }
        if !tx.longitude.is_finite() || !(-180.0..=180.0).contains(&tx.longitude) {
            return Err(MalformedInput::new(
                "long",
                format!("out of range ({})", tx.longitude),
            ));
        }
        let occurred_at = tx
            .occurred_at()
            .ok_or_else(|| MalformedInput::new("timestamp", format!("unparseable ({:?})", tx.timestamp)))?;

        let hour = occurred_at.hour();
        // Monday = 0 .. Sunday = 6, matching the training data
        let day_of_week = occurred_at.weekday().num_days_from_monday();
        let is_night = hour >= 22 || hour <= 6;
        let is_weekend = day_of_week >= 5;

        let mut values = Vec::with_capacity(FEATURE_NAMES.len());
        values.push(tx.amount as f32);
        values.push(hour as f32);
        values.push(day_of_week as f32);
        values.push(tx.city_pop as f32);
        values.push(if is_night { 1.0 } else { 0.0 });
        values.push(if is_weekend { 1.0 } else { 0.0 });

        // One-hot category over the fixed vocabulary, `other` last
        let category = tx.category.trim().to_ascii_lowercase();
        let slot = CATEGORY_VOCABULARY.iter().position(|&c| c == category);
        for i in 0..CATEGORY_VOCABULARY.len() {
            values.push(if slot == Some(i) { 1.0 } else { 0.0 });
        }
        values.push(if slot.is_none() { 1.0 } else { 0.0 });

        values.push(if tx.gender.eq_ignore_ascii_case("f") { 1.0 } else { 0.0 });

        Ok(FeatureVector { values })
    }

    /// Number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Feature names in vector order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        let mut tx = Transaction::new("tx_001", 4200.0, "2020-06-21 02:14:25");
        tx.category = "shopping_net".to_string();
        tx
    }

    #[test]
    fn test_derive_is_deterministic() {
        let extractor = FeatureExtractor::new();
        let tx = sample();

        let a = extractor.derive(&tx).unwrap();
        let b = extractor.derive(&tx).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_feature_order_and_values() {
        let extractor = FeatureExtractor::new();
        // 2020-06-21 is a Sunday; 02:14 is night
        let features = extractor.derive(&sample()).unwrap();

        assert_eq!(features.len(), extractor.feature_count());
        let values = features.values();
        assert_eq!(values[0], 4200.0); // amt
        assert_eq!(values[1], 2.0); // hour
        assert_eq!(values[2], 6.0); // day_of_week (Sunday)
        assert_eq!(values[4], 1.0); // is_night
        assert_eq!(values[5], 1.0); // is_weekend

        let named: Vec<_> = features.iter_named().collect();
        assert_eq!(named[0].0, "amt");
        // exactly one category slot set, and it is shopping_net
        let hot: Vec<_> = named
            .iter()
            .filter(|(name, value)| name.starts_with("cat_") && *value == 1.0)
            .collect();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].0, "cat_shopping_net");
    }

    #[test]
    fn test_weekday_afternoon_flags() {
        let extractor = FeatureExtractor::new();
        // 2020-06-17 is a Wednesday
        let tx = Transaction::new("tx_002", 12.50, "2020-06-17 14:30:00");

        let values = extractor.derive(&tx).unwrap().values().to_vec();
        assert_eq!(values[1], 14.0); // hour
        assert_eq!(values[2], 2.0); // Wednesday
        assert_eq!(values[4], 0.0); // not night
        assert_eq!(values[5], 0.0); // not weekend
    }

    #[test]
    fn test_unseen_category_maps_to_other() {
        let extractor = FeatureExtractor::new();
        let mut tx = sample();
        tx.category = "crypto_atm".to_string();

        let features = extractor.derive(&tx).unwrap();
        let other = features
            .iter_named()
            .find(|(name, _)| *name == "cat_other")
            .unwrap();
        assert_eq!(other.1, 1.0);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let extractor = FeatureExtractor::new();
        let mut tx = sample();
        tx.amount = -5.0;

        let err = extractor.derive(&tx).unwrap_err();
        assert_eq!(err.field, "amount");
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let extractor = FeatureExtractor::new();
        let mut tx = sample();
        tx.timestamp = "not a timestamp".to_string();

        let err = extractor.derive(&tx).unwrap_err();
        assert_eq!(err.field, "timestamp");
    }

    #[test]
    fn test_empty_id_rejected() {
        let extractor = FeatureExtractor::new();
        let mut tx = sample();
        tx.transaction_id = "  ".to_string();

        assert!(extractor.derive(&tx).is_err());
    }

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let extractor = FeatureExtractor::new();
        let mut tx = sample();
        tx.lat = 93.5;

        let err = extractor.derive(&tx).unwrap_err();
        assert_eq!(err.field, "lat");
    }

    #[test]
    fn test_feature_names_match_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_names().len(), extractor.feature_count());
        assert_eq!(extractor.feature_count(), 22);
    }

    #[test]
    fn test_audit_json_mapping() {
        let extractor = FeatureExtractor::new();
        let features = extractor.derive(&sample()).unwrap();

        let audit = features.to_json();
        assert_eq!(audit["amt"], 4200.0);
        assert_eq!(audit["cat_shopping_net"], 1.0);
        assert_eq!(audit.as_object().unwrap().len(), 22);
    }
}
