//! Fixed-point price/money representation.
//!
//! All prices and dollar amounts that cross the journal's persistence or
//! hashing boundary are represented as `i64` hundredths (1 unit = 100
//! hundredths). This mirrors the integer-micros design used elsewhere in
//! this codebase for the same reason: `f64` comparisons drift, and
//! canonicalizing to 2 decimal places is exact and lossless in
//! hundredths but not in floating point.
//!
//! `f64` conversions happen only at the broker-adapter wire boundary
//! ([`Px::from_f64`] / [`Px::to_f64`]).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Scale factor: 1 price/dollar unit = 100 hundredths (2 decimal places).
pub const HUNDREDTHS_PER_UNIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PxError {
    NotFinite,
    OutOfRange,
    InvalidFormat(String),
}

impl fmt::Display for PxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PxError::NotFinite => write!(f, "price/money value is NaN or infinite"),
            PxError::OutOfRange => write!(f, "price/money value overflows i64 after scaling"),
            PxError::InvalidFormat(s) => write!(f, "{s:?} is not a valid canonical price string"),
        }
    }
}

impl std::error::Error for PxError {}

/// A price or dollar amount, stored as hundredths of a unit.
///
/// Serializes as its canonical 2-decimal-place string (e.g. `"4990.25"`),
/// not as a bare integer or float: every journal entry is meant to be
/// readable and diffable by hand, and a string keeps the persisted record
/// and the intent-id hash input byte-identical.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Px(i64);

impl Px {
    pub const ZERO: Px = Px(0);

    pub fn from_hundredths(hundredths: i64) -> Self {
        Px(hundredths)
    }

    pub fn hundredths(self) -> i64 {
        self.0
    }

    /// Parse a broker-wire `f64` price into hundredths. Rounds to the
    /// nearest hundredth rather than truncating.
    pub fn from_f64(v: f64) -> Result<Self, PxError> {
        if !v.is_finite() {
            return Err(PxError::NotFinite);
        }
        let scaled = v * HUNDREDTHS_PER_UNIT as f64;
        if scaled > i64::MAX as f64 || scaled < i64::MIN as f64 {
            return Err(PxError::OutOfRange);
        }
        Ok(Px(scaled.round() as i64))
    }

    /// Convert to `f64` for broker-wire serialization only.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / HUNDREDTHS_PER_UNIT as f64
    }

    pub fn checked_add(self, other: Px) -> Option<Px> {
        self.0.checked_add(other.0).map(Px)
    }

    pub fn checked_sub(self, other: Px) -> Option<Px> {
        self.0.checked_sub(other.0).map(Px)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// The canonical 2-decimal-place string form. This is both the JSON
    /// wire representation ([`Serialize`]) and the intent-id hash
    /// canonicalization input, so the two can never disagree.
    pub fn canonical(self) -> String {
        let negative = self.0 < 0;
        let abs = self.0.unsigned_abs();
        let whole = abs / HUNDREDTHS_PER_UNIT as u64;
        let frac = abs % HUNDREDTHS_PER_UNIT as u64;
        format!("{}{}.{:02}", if negative { "-" } else { "" }, whole, frac)
    }

    /// Parse the canonical string form back into hundredths. Requires
    /// exactly two fractional digits and only ASCII-digit whole/fraction
    /// parts; anything else (a float-looking `"5000"`, extra precision,
    /// scientific notation) is rejected rather than silently truncated.
    pub fn from_canonical_str(s: &str) -> Result<Self, PxError> {
        let invalid = || PxError::InvalidFormat(s.to_string());
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut parts = body.splitn(2, '.');
        let whole = parts.next().ok_or_else(invalid)?;
        let frac = parts.next().ok_or_else(invalid)?;
        if whole.is_empty() || frac.len() != 2 {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let frac: i64 = frac.parse().map_err(|_| invalid())?;
        let magnitude = whole
            .checked_mul(HUNDREDTHS_PER_UNIT)
            .and_then(|w| w.checked_add(frac))
            .ok_or(PxError::OutOfRange)?;
        Ok(Px(if negative { -magnitude } else { magnitude }))
    }
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl Serialize for Px {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for Px {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Px::from_canonical_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_whole_unit() {
        let p = Px::from_f64(5000.0).unwrap();
        assert_eq!(p.hundredths(), 500_000);
        assert_eq!(p.canonical(), "5000.00");
    }

    #[test]
    fn round_trip_fractional() {
        let p = Px::from_f64(4990.25).unwrap();
        assert_eq!(p.canonical(), "4990.25");
    }

    #[test]
    fn negative_canonical_format() {
        let p = Px::from_hundredths(-1050);
        assert_eq!(p.canonical(), "-10.50");
    }

    #[test]
    fn rejects_nan_and_infinite() {
        assert_eq!(Px::from_f64(f64::NAN), Err(PxError::NotFinite));
        assert_eq!(Px::from_f64(f64::INFINITY), Err(PxError::NotFinite));
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Px::from_f64(f64::MAX), Err(PxError::OutOfRange));
    }

    #[test]
    fn json_round_trip_is_a_canonical_string() {
        let p = Px::from_hundredths(500025);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"5000.25\"");
        let back: Px = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn json_round_trip_negative() {
        let p = Px::from_hundredths(-1050);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"-10.50\"");
        let back: Px = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn rejects_malformed_canonical_strings() {
        assert!(Px::from_canonical_str("5000").is_err());
        assert!(Px::from_canonical_str("5000.5").is_err());
        assert!(Px::from_canonical_str("5000.555").is_err());
        assert!(Px::from_canonical_str("abc.de").is_err());
        assert!(Px::from_canonical_str("").is_err());
    }
}
