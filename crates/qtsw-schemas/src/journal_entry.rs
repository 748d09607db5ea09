//! `JournalEntry` — the durable per-intent record.
//!
//! Persisted as a JSON document at
//! `{project}/data/execution_journals/{date}_{stream}_{intent_id}.json`.
//! Field names are plain `snake_case` so the on-disk JSON reads naturally
//! next to the prose describing each one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Direction, Px};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    // Identity.
    pub intent_id: String,
    pub trading_date: String,
    pub stream: String,
    pub instrument: String,

    // Submission.
    pub entry_submitted: bool,
    pub entry_submitted_at: Option<DateTime<Utc>>,
    pub broker_order_id: Option<String>,
    pub entry_order_type: Option<String>,
    pub expected_entry_price: Option<Px>,
    pub rejected: bool,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,

    // Entry fills (delta-accumulated).
    pub entry_filled_qty_total: i64,
    pub entry_fill_notional: Px,
    pub entry_filled_at_utc: Option<DateTime<Utc>>,

    // Exit fills (delta-accumulated).
    pub exit_filled_qty_total: i64,
    pub exit_fill_notional: Px,
    pub exit_order_type: Option<String>,
    pub exit_filled_at_utc: Option<DateTime<Utc>>,

    // Immutable trade attributes, set on first entry fill.
    pub direction: Option<Direction>,
    pub contract_multiplier: Option<i64>,

    // Break-even.
    pub be_modified: bool,
    pub be_modified_at: Option<DateTime<Utc>>,
    pub be_stop_price: Option<Px>,

    // Costs.
    pub slippage_points: Option<Px>,
    pub slippage_dollars: Option<Px>,
    pub commission: Option<Px>,
    pub fees: Option<Px>,

    // Completion.
    pub trade_completed: bool,
    pub realized_pnl_points: Option<Px>,
    pub realized_pnl_gross: Option<Px>,
    pub realized_pnl_net: Option<Px>,
    pub completion_reason: Option<String>,
    pub completed_at_utc: Option<DateTime<Utc>>,
}

impl JournalEntry {
    /// A fresh entry for a not-yet-submitted intent.
    pub fn new(intent_id: impl Into<String>, trading_date: impl Into<String>, stream: impl Into<String>, instrument: impl Into<String>) -> Self {
        Self {
            intent_id: intent_id.into(),
            trading_date: trading_date.into(),
            stream: stream.into(),
            instrument: instrument.into(),

            entry_submitted: false,
            entry_submitted_at: None,
            broker_order_id: None,
            entry_order_type: None,
            expected_entry_price: None,
            rejected: false,
            rejected_at: None,
            rejection_reason: None,

            entry_filled_qty_total: 0,
            entry_fill_notional: Px::ZERO,
            entry_filled_at_utc: None,

            exit_filled_qty_total: 0,
            exit_fill_notional: Px::ZERO,
            exit_order_type: None,
            exit_filled_at_utc: None,

            direction: None,
            contract_multiplier: None,

            be_modified: false,
            be_modified_at: None,
            be_stop_price: None,

            slippage_points: None,
            slippage_dollars: None,
            commission: None,
            fees: None,

            trade_completed: false,
            realized_pnl_points: None,
            realized_pnl_gross: None,
            realized_pnl_net: None,
            completion_reason: None,
            completed_at_utc: None,
        }
    }

    /// Weighted-average entry fill price, or `None` if nothing has filled.
    pub fn entry_avg_fill_price(&self) -> Option<Px> {
        if self.entry_filled_qty_total <= 0 {
            return None;
        }
        Some(Px::from_hundredths(
            self.entry_fill_notional.hundredths() / self.entry_filled_qty_total,
        ))
    }

    /// Weighted-average exit fill price, or `None` if nothing has exited.
    pub fn exit_avg_fill_price(&self) -> Option<Px> {
        if self.exit_filled_qty_total <= 0 {
            return None;
        }
        Some(Px::from_hundredths(
            self.exit_fill_notional.hundredths() / self.exit_filled_qty_total,
        ))
    }

    /// Invariant 4: `trade_completed` iff exit == entry > 0.
    pub fn is_flat(&self) -> bool {
        self.entry_filled_qty_total > 0 && self.exit_filled_qty_total == self.entry_filled_qty_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_has_no_fills() {
        let e = JournalEntry::new("abc123", "2024-05-10", "ES1", "MES");
        assert_eq!(e.entry_avg_fill_price(), None);
        assert_eq!(e.exit_avg_fill_price(), None);
        assert!(!e.is_flat());
    }

    #[test]
    fn weighted_average_entry_price() {
        let mut e = JournalEntry::new("abc123", "2024-05-10", "ES1", "MES");
        e.entry_filled_qty_total = 2;
        e.entry_fill_notional = Px::from_hundredths(500_000 * 2);
        assert_eq!(e.entry_avg_fill_price().unwrap().canonical(), "5000.00");
    }
}
