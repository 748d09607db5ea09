//! Intent identity — a content-addressed, immutable description of a
//! desired trade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Direction;
use crate::Px;

/// Immutable descriptor of a desired trade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    // Identity fields.
    pub trading_date: String,
    pub stream: String,
    pub canonical_instrument: String,
    pub session_tag: String,
    pub slot_time: String,

    // Plan fields.
    pub direction: Option<Direction>,
    pub entry_price: Option<Px>,
    pub stop_price: Option<Px>,
    pub target_price: Option<Px>,
    pub be_trigger_price: Option<Px>,
    pub entry_timestamp: Option<DateTime<Utc>>,
    pub trigger_reason: Option<String>,

    // Sizing — execution metadata, not part of the identity hash (a
    // resubmission with a corrected size must still collide with the
    // original intent id).
    pub qty: i64,
}

impl Intent {
    /// The 10 canonical identity+plan fields that feed the intent-id hash.
    ///
    /// `entry_timestamp` and `trigger_reason` are execution metadata, not
    /// trade-defining plan fields, and including a wall-clock timestamp in
    /// a hash meant to stay stable across retries, restarts, and processes
    /// would make every retry mint a fresh id. The 10 fields actually
    /// hashed are the 5 identity fields plus the 5 fields that define the
    /// trade plan: direction, entry/stop/target price, and the BE trigger
    /// price.
    fn canonical_fields(&self) -> [String; 10] {
        [
            self.trading_date.clone(),
            self.stream.clone(),
            self.canonical_instrument.clone(),
            self.session_tag.clone(),
            self.slot_time.clone(),
            opt_to_canonical(self.direction.map(|d| d.to_string())),
            opt_to_canonical(self.entry_price.map(|p| p.canonical())),
            opt_to_canonical(self.stop_price.map(|p| p.canonical())),
            opt_to_canonical(self.target_price.map(|p| p.canonical())),
            opt_to_canonical(self.be_trigger_price.map(|p| p.canonical())),
        ]
    }

    /// First 16 hex characters of SHA-256 over the pipe-joined canonical
    /// fields. Deterministic and content-addressed: two intents with
    /// identical fields collide by design.
    pub fn intent_id(&self) -> String {
        let joined = self.canonical_fields().join("|");
        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        let digest = hasher.finalize();
        hex::encode(digest)[..16].to_string()
    }
}

fn opt_to_canonical(v: Option<String>) -> String {
    v.unwrap_or_else(|| "NULL".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Intent {
        Intent {
            trading_date: "2024-05-10".to_string(),
            stream: "ES1".to_string(),
            canonical_instrument: "ES".to_string(),
            session_tag: "RTH".to_string(),
            slot_time: "09:31".to_string(),
            direction: Some(Direction::Long),
            entry_price: Some(Px::from_f64(5000.0).unwrap()),
            stop_price: Some(Px::from_f64(4990.0).unwrap()),
            target_price: Some(Px::from_f64(5020.0).unwrap()),
            be_trigger_price: Some(Px::from_f64(5010.0).unwrap()),
            entry_timestamp: None,
            trigger_reason: None,
            qty: 2,
        }
    }

    #[test]
    fn intent_id_is_16_hex_chars() {
        let id = sample().intent_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn intent_id_is_pure_function_of_canonical_fields() {
        let a = sample();
        let mut b = sample();
        // Reconstructing from scratch with identical fields must collide.
        b.entry_timestamp = Some(Utc::now());
        b.trigger_reason = Some("breakout".to_string());
        assert_eq!(a.intent_id(), b.intent_id());
    }

    #[test]
    fn different_direction_changes_id() {
        let a = sample();
        let mut b = sample();
        b.direction = Some(Direction::Short);
        assert_ne!(a.intent_id(), b.intent_id());
    }

    #[test]
    fn missing_plan_fields_hash_as_null() {
        let mut a = sample();
        a.direction = None;
        a.entry_price = None;
        let id_a = a.intent_id();

        let mut b = sample();
        b.direction = None;
        b.entry_price = None;
        let id_b = b.intent_id();

        assert_eq!(id_a, id_b);
        assert_ne!(id_a, sample().intent_id());
    }

    #[test]
    fn rehashing_reconstructed_intent_is_stable() {
        let original = sample();
        let id1 = original.intent_id();
        let reconstructed = Intent {
            trading_date: original.trading_date.clone(),
            stream: original.stream.clone(),
            canonical_instrument: original.canonical_instrument.clone(),
            session_tag: original.session_tag.clone(),
            slot_time: original.slot_time.clone(),
            direction: original.direction,
            entry_price: original.entry_price,
            stop_price: original.stop_price,
            target_price: original.target_price,
            be_trigger_price: original.be_trigger_price,
            entry_timestamp: Some(Utc::now()),
            trigger_reason: Some("reconstructed".to_string()),
            qty: 9,
        };
        assert_eq!(id1, reconstructed.intent_id());
    }
}
