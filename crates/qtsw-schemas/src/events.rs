//! Structured log/notification event taxonomy.
//!
//! Rather than building an ad-hoc string or a dynamic payload at each call
//! site, every event is a variant of [`ExecutionEvent`] carrying its own
//! typed fields; [`ExecutionEvent::name`] returns a fixed taxonomy string
//! so downstream grepping keeps working, and [`ExecutionEvent::severity`]
//! derives the log level from the event's category.
//!
//! A handful of variants (marked below) are supplementary bookkeeping this
//! codebase needs (e.g. which duplicate was skipped) rather than part of
//! the core named taxonomy — they never replace a required named event.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warn => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ExecutionEvent {
    SimAccountVerified { account_id: String },
    IntentPolicyRegistered { intent_id: String, expected_qty: i64, max_qty: i64 },
    ExecutionBlocked { intent_id: String, reason: String },
    KillSwitchActive { reason: String },
    KillSwitchErrorFailClosed { reason: String },

    CanonicalMarketLockAcquired { instrument: String, run_id: String },
    CanonicalMarketLockStale { instrument: String, holder_run_id: String, age_seconds: i64 },
    CanonicalMarketLockFailed { instrument: String, reason: String },
    CanonicalMarketLockReleased { instrument: String, run_id: String },

    OrderSubmitAttempt { intent_id: String, order_kind: String },
    OrderSubmitSuccess { intent_id: String, broker_order_id: String },
    OrderSubmitFail { intent_id: String, reason: String },
    OrderSubmitted { intent_id: String, broker_order_id: String },
    OrderAcknowledged { intent_id: String, broker_order_id: String },
    OrderRejected { intent_id: String, reason: String },
    OrderCancelled { intent_id: String, broker_order_id: String },

    ExecutionPartialFill { intent_id: String, cumulative_qty: i64 },
    ExecutionFilled { intent_id: String, cumulative_qty: i64 },

    ProtectivesPlaced {
        intent_id: String,
        stop_order_id: String,
        target_order_id: String,
        stop_price: String,
        target_price: String,
        protected_quantity: i64,
    },
    ProtectiveOrdersSubmitted { intent_id: String, oco_group: String, attempt: u32 },
    ProtectiveOrdersFailedFlattened { intent_id: String, attempts: u32, failed_legs: String },

    UnprotectedPositionTimeout { intent_id: String, seconds_unprotected: i64 },
    IntentIncompleteUnprotectedPosition { intent_id: String, missing_fields: String },

    StopModifyAttempt { intent_id: String, new_stop_price: String },
    StopModifySuccess { intent_id: String, new_stop_price: String },
    StopModifyFail { intent_id: String, reason: String },
    StopModifySkipped { intent_id: String, reason: String },

    ExecutionSlippageDetected { intent_id: String, slippage_points: String },

    ExecutionJournalCorruption { path: String, reason: String },
    ExecutionJournalInvariantViolation { intent_id: String, reason: String },
    ExecutionJournalValidationFailed { intent_id: String, reason: String },
    ExecutionJournalOverfill { intent_id: String, entry_qty_total: i64, attempted_exit_total: i64 },

    TradeCompleted { intent_id: String, realized_pnl_net: String, completion_reason: String },

    FlattenAttempt { intent_id: String, attempt: u32 },
    FlattenSuccess { intent_id: String },
    FlattenFail { intent_id: String, reason: String },
    FlattenRetryAttempt { intent_id: String, attempt: u32 },
    FlattenRetrySucceeded { intent_id: String, attempt: u32 },
    PositionFlattenFailClosed { intent_id: String, reason: String },

    // Supplementary bookkeeping events (outside the core named taxonomy
    // above, never substituted for a required named event).
    IntentDuplicateSkipped { intent_id: String, stream: String },
    CanonicalMarketLockReleaseSkippedNotOwner { instrument: String, run_id: String, holder_run_id: String },
    ReplaceIgnoredStaleEvent { intent_id: String, event_id: String },
    AdapterInitFailed { mode: String, reason: String },
    BreakEvenTriggered { intent_id: String, new_stop_price: String },
}

impl ExecutionEvent {
    pub fn severity(&self) -> Severity {
        use ExecutionEvent::*;
        match self {
            SimAccountVerified { .. }
            | IntentPolicyRegistered { .. }
            | CanonicalMarketLockAcquired { .. }
            | CanonicalMarketLockReleased { .. }
            | OrderSubmitAttempt { .. }
            | OrderSubmitSuccess { .. }
            | OrderSubmitted { .. }
            | OrderAcknowledged { .. }
            | OrderCancelled { .. }
            | ExecutionPartialFill { .. }
            | ExecutionFilled { .. }
            | ProtectivesPlaced { .. }
            | ProtectiveOrdersSubmitted { .. }
            | StopModifyAttempt { .. }
            | StopModifySuccess { .. }
            | TradeCompleted { .. }
            | FlattenAttempt { .. }
            | FlattenSuccess { .. }
            | FlattenRetrySucceeded { .. }
            | BreakEvenTriggered { .. } => Severity::Info,

            IntentDuplicateSkipped { .. }
            | CanonicalMarketLockStale { .. }
            | CanonicalMarketLockReleaseSkippedNotOwner { .. }
            | OrderRejected { .. }
            | ExecutionSlippageDetected { .. }
            | UnprotectedPositionTimeout { .. }
            | StopModifySkipped { .. }
            | FlattenRetryAttempt { .. }
            | ReplaceIgnoredStaleEvent { .. } => Severity::Warn,

            ExecutionBlocked { .. }
            | KillSwitchActive { .. }
            | KillSwitchErrorFailClosed { .. }
            | CanonicalMarketLockFailed { .. }
            | OrderSubmitFail { .. }
            | ProtectiveOrdersFailedFlattened { .. }
            | IntentIncompleteUnprotectedPosition { .. }
            | StopModifyFail { .. }
            | ExecutionJournalCorruption { .. }
            | ExecutionJournalInvariantViolation { .. }
            | ExecutionJournalValidationFailed { .. }
            | ExecutionJournalOverfill { .. }
            | FlattenFail { .. }
            | PositionFlattenFailClosed { .. }
            | AdapterInitFailed { .. } => Severity::Error,
        }
    }

    /// The bare event name, in the fixed `SCREAMING_SNAKE_CASE` taxonomy
    /// every named event carries.
    pub fn name(&self) -> &'static str {
        use ExecutionEvent::*;
        match self {
            SimAccountVerified { .. } => "SIM_ACCOUNT_VERIFIED",
            IntentPolicyRegistered { .. } => "INTENT_POLICY_REGISTERED",
            ExecutionBlocked { .. } => "EXECUTION_BLOCKED",
            KillSwitchActive { .. } => "KILL_SWITCH_ACTIVE",
            KillSwitchErrorFailClosed { .. } => "KILL_SWITCH_ERROR_FAIL_CLOSED",
            CanonicalMarketLockAcquired { .. } => "CANONICAL_MARKET_LOCK_ACQUIRED",
            CanonicalMarketLockStale { .. } => "CANONICAL_MARKET_LOCK_STALE",
            CanonicalMarketLockFailed { .. } => "CANONICAL_MARKET_LOCK_FAILED",
            CanonicalMarketLockReleased { .. } => "CANONICAL_MARKET_LOCK_RELEASED",
            OrderSubmitAttempt { .. } => "ORDER_SUBMIT_ATTEMPT",
            OrderSubmitSuccess { .. } => "ORDER_SUBMIT_SUCCESS",
            OrderSubmitFail { .. } => "ORDER_SUBMIT_FAIL",
            OrderSubmitted { .. } => "ORDER_SUBMITTED",
            OrderAcknowledged { .. } => "ORDER_ACKNOWLEDGED",
            OrderRejected { .. } => "ORDER_REJECTED",
            OrderCancelled { .. } => "ORDER_CANCELLED",
            ExecutionPartialFill { .. } => "EXECUTION_PARTIAL_FILL",
            ExecutionFilled { .. } => "EXECUTION_FILLED",
            ProtectivesPlaced { .. } => "PROTECTIVES_PLACED",
            ProtectiveOrdersSubmitted { .. } => "PROTECTIVE_ORDERS_SUBMITTED",
            ProtectiveOrdersFailedFlattened { .. } => "PROTECTIVE_ORDERS_FAILED_FLATTENED",
            UnprotectedPositionTimeout { .. } => "UNPROTECTED_POSITION_TIMEOUT",
            IntentIncompleteUnprotectedPosition { .. } => "INTENT_INCOMPLETE_UNPROTECTED_POSITION",
            StopModifyAttempt { .. } => "STOP_MODIFY_ATTEMPT",
            StopModifySuccess { .. } => "STOP_MODIFY_SUCCESS",
            StopModifyFail { .. } => "STOP_MODIFY_FAIL",
            StopModifySkipped { .. } => "STOP_MODIFY_SKIPPED",
            ExecutionSlippageDetected { .. } => "EXECUTION_SLIPPAGE_DETECTED",
            ExecutionJournalCorruption { .. } => "EXECUTION_JOURNAL_CORRUPTION",
            ExecutionJournalInvariantViolation { .. } => "EXECUTION_JOURNAL_INVARIANT_VIOLATION",
            ExecutionJournalValidationFailed { .. } => "EXECUTION_JOURNAL_VALIDATION_FAILED",
            ExecutionJournalOverfill { .. } => "EXECUTION_JOURNAL_OVERFILL",
            TradeCompleted { .. } => "TRADE_COMPLETED",
            FlattenAttempt { .. } => "FLATTEN_ATTEMPT",
            FlattenSuccess { .. } => "FLATTEN_SUCCESS",
            FlattenFail { .. } => "FLATTEN_FAIL",
            FlattenRetryAttempt { .. } => "FLATTEN_RETRY_ATTEMPT",
            FlattenRetrySucceeded { .. } => "FLATTEN_RETRY_SUCCEEDED",
            PositionFlattenFailClosed { .. } => "POSITION_FLATTEN_FAIL_CLOSED",
            IntentDuplicateSkipped { .. } => "INTENT_DUPLICATE_SKIPPED",
            CanonicalMarketLockReleaseSkippedNotOwner { .. } => "CANONICAL_MARKET_LOCK_RELEASE_SKIPPED_NOT_OWNER",
            ReplaceIgnoredStaleEvent { .. } => "REPLACE_IGNORED_STALE_EVENT",
            AdapterInitFailed { .. } => "ADAPTER_INIT_FAILED",
            BreakEvenTriggered { .. } => "BREAK_EVEN_TRIGGERED",
        }
    }
}

/// Destination for structured execution events. A blanket impl over any
/// `Fn(ExecutionEvent) + Send + Sync` closure lets call sites pass a plain
/// closure while the executor holds its sink behind `Arc<dyn EventSink>` —
/// `Arc<dyn Fn(..)>` is not itself callable in stable Rust, unlike
/// `Box<dyn Fn(..)>`, so this trait is the seam instead.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ExecutionEvent);
}

impl<F: Fn(ExecutionEvent) + Send + Sync> EventSink for F {
    fn emit(&self, event: ExecutionEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fail_closed_events_are_error_severity() {
        let ev = ExecutionEvent::PositionFlattenFailClosed {
            intent_id: "abc123".to_string(),
            reason: "broker unreachable".to_string(),
        };
        assert_eq!(ev.severity(), Severity::Error);
        assert_eq!(ev.name(), "POSITION_FLATTEN_FAIL_CLOSED");
    }

    #[test]
    fn routine_fill_events_are_info_severity() {
        let ev = ExecutionEvent::ExecutionFilled {
            intent_id: "abc123".to_string(),
            cumulative_qty: 2,
        };
        assert_eq!(ev.severity(), Severity::Info);
        assert_eq!(ev.name(), "EXECUTION_FILLED");
    }

    #[test]
    fn overfill_event_matches_taxonomy_name() {
        let ev = ExecutionEvent::ExecutionJournalOverfill {
            intent_id: "abc123".to_string(),
            entry_qty_total: 2,
            attempted_exit_total: 3,
        };
        assert_eq!(ev.name(), "EXECUTION_JOURNAL_OVERFILL");
        assert_eq!(ev.severity(), Severity::Error);
    }
}
