//! The contract the core requires from any brokerage binding.
//!
//! A concrete adapter binds to a specific brokerage; the core treats it as
//! an opaque capability behind this trait. Callbacks flow the other
//! direction, through [`OrderCallbackSink`], which the executor implements.

use chrono::{DateTime, Utc};
use qtsw_schemas::{Direction, Px};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderKind {
    Market,
    Limit,
    StopMarket,
}

/// Terminal/in-flight state of a working order, as reported by the adapter.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OrderState {
    Working,
    Accepted,
    Filled,
    Cancelled,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub success: bool,
    pub broker_order_id: Option<String>,
    pub error: Option<String>,
}

impl SubmitOutcome {
    pub fn ok(broker_order_id: impl Into<String>) -> Self {
        Self { success: true, broker_order_id: Some(broker_order_id.into()), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, broker_order_id: None, error: Some(error.into()) }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub instrument: String,
    pub qty_signed: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkingOrder {
    pub broker_order_id: String,
    pub tag: String,
    pub instrument: String,
    pub state: OrderState,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub positions: Vec<Position>,
    pub working_orders: Vec<WorkingOrder>,
}

/// Callbacks delivered by the adapter back into the executor. Broker
/// callbacks arrive on adapter-owned threads; implementations
/// must be `Send + Sync`.
pub trait OrderCallbackSink: Send + Sync {
    fn on_order_update(&self, tag: &str, state: OrderState, error: Option<String>);
    fn on_execution(&self, tag: &str, fill_price: Px, delta_qty: i64, utc: DateTime<Utc>);
}

/// The capability the executor drives: entry/protective/target order
/// submission, stop modification, flatten, and cancellation.
pub trait ExecutionAdapter: Send + Sync {
    fn submit_entry(
        &self,
        intent_id: &str,
        instrument: &str,
        direction: Direction,
        entry_price: Option<Px>,
        qty: i64,
        order_kind: OrderKind,
        utc: DateTime<Utc>,
    ) -> SubmitOutcome;

    fn submit_protective_stop(
        &self,
        intent_id: &str,
        instrument: &str,
        direction: Direction,
        stop_price: Px,
        qty: i64,
        oco_group: &str,
        utc: DateTime<Utc>,
    ) -> SubmitOutcome;

    fn submit_target(
        &self,
        intent_id: &str,
        instrument: &str,
        direction: Direction,
        limit_price: Px,
        qty: i64,
        oco_group: &str,
        utc: DateTime<Utc>,
    ) -> SubmitOutcome;

    fn modify_stop_to(&self, intent_id: &str, instrument: &str, new_stop: Px, utc: DateTime<Utc>) -> SubmitOutcome;

    fn flatten(&self, intent_id: &str, instrument: &str, utc: DateTime<Utc>) -> SubmitOutcome;

    fn cancel_intent_orders(&self, intent_id: &str, utc: DateTime<Utc>) -> SubmitOutcome;

    fn get_account_snapshot(&self, utc: DateTime<Utc>) -> AccountSnapshot;

    /// Cancel only orders carrying the robot's tag prefix.
    fn cancel_robot_owned_working_orders(&self, snapshot: &AccountSnapshot, utc: DateTime<Utc>) -> SubmitOutcome;
}
