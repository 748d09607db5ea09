//! The per-intent policy expectation registered at submission time:
//! expected size and the quantity ceiling protective orders must cover.
//!
//! `expected_qty`/`max_qty` both derive from `Intent::qty`: no separate
//! risk-sizing input exists in this subsystem's scope, so the intent's
//! requested size serves as both the expected and maximum protected
//! quantity (documented in DESIGN.md).

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentPolicy {
    pub expected_qty: i64,
    pub max_qty: i64,
    pub canonical_instrument: String,
    pub execution_instrument: String,
}
