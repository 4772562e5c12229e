//! Transaction data structures for the fraud scoring pipeline

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp format used by the upstream transaction feed.
const FEED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single financial transaction to be evaluated for fraud.
///
/// Field aliases match the upstream feed's column names, so the raw JSON
/// payload deserializes directly. The timestamp is kept as the raw feed
/// string; parsing (and rejection of garbage) happens during feature
/// derivation via [`Transaction::occurred_at`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier
    #[serde(alias = "trans_num")]
    pub transaction_id: String,

    /// Transaction timestamp as delivered by the feed
    #[serde(alias = "trans_date_trans_time")]
    pub timestamp: String,

    /// Transaction amount
    #[serde(alias = "amt")]
    pub amount: f64,

    /// Merchant category (e.g. "grocery_pos", "shopping_net")
    pub category: String,

    /// Merchant name
    pub merchant: String,

    /// Customer gender ("M" / "F")
    pub gender: String,

    /// Population of the customer's city of residence
    pub city_pop: i64,

    /// Transaction latitude
    pub lat: f64,

    /// Transaction longitude
    #[serde(alias = "long")]
    pub longitude: f64,
}

impl Transaction {
    /// Create a transaction with the given identity, amount and timestamp;
    /// remaining fields take benign defaults. Intended for tests and tools.
    pub fn new(transaction_id: &str, amount: f64, timestamp: &str) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            timestamp: timestamp.to_string(),
            amount,
            category: "grocery_pos".to_string(),
            merchant: "fraud_Kirlin and Sons".to_string(),
            gender: "F".to_string(),
            city_pop: 24_509,
            lat: 40.3207,
            longitude: -110.4360,
        }
    }

    /// Parse the feed timestamp. Accepts the feed's native
    /// `YYYY-MM-DD HH:MM:SS` format as well as RFC 3339.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&self.timestamp, FEED_TIMESTAMP_FORMAT) {
            return Some(naive.and_utc());
        }
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_deserializes_feed_field_names() {
        let json = r#"{
            "trans_num": "0b242abb623afc578575680df30655b9",
            "trans_date_trans_time": "2020-06-21 12:14:25",
            "amt": 2.86,
            "category": "personal_care",
            "merchant": "fraud_Kirlin and Sons",
            "gender": "M",
            "city_pop": 333497,
            "lat": 33.9659,
            "long": -80.9355
        }"#;

        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.transaction_id, "0b242abb623afc578575680df30655b9");
        assert_eq!(tx.amount, 2.86);
        assert_eq!(tx.longitude, -80.9355);
    }

    #[test]
    fn test_timestamp_parsing() {
        let tx = Transaction::new("t1", 10.0, "2020-06-21 02:14:25");
        let parsed = tx.occurred_at().unwrap();
        assert_eq!(parsed.hour(), 2);

        let rfc = Transaction::new("t2", 10.0, "2020-06-21T02:14:25Z");
        assert_eq!(rfc.occurred_at().unwrap(), parsed);

        let bad = Transaction::new("t3", 10.0, "yesterday-ish");
        assert!(bad.occurred_at().is_none());
    }

    #[test]
    fn test_transaction_serialization_roundtrip() {
        let tx = Transaction::new("tx_123", 50.0, "2020-06-21 12:14:25");

        let json = serde_json::to_string(&tx).unwrap();
        let deserialized: Transaction = serde_json::from_str(&json).unwrap();

        assert_eq!(tx.transaction_id, deserialized.transaction_id);
        assert_eq!(tx.amount, deserialized.amount);
        assert_eq!(tx.timestamp, deserialized.timestamp);
    }
}
