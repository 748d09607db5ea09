//! Sandboxed brokerage account adapter.
//!
//! Construction must verify the attached account is a simulation account
//! before any submission is permitted — fail-closed
//! otherwise. The matching/fill logic itself is deliberately not
//! simulated: this adapter only tracks working orders deterministically
//! and exposes [`SimAdapter::apply_fill`] for a test harness (or a real
//! sandboxed brokerage feed, in a fuller build) to deliver fills
//! explicitly. No randomness, no wall-clock dependency — the same
//! discipline as `mqk-broker-paper`'s deterministic test double.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use qtsw_schemas::{Direction, Px};

use crate::capability::{
    AccountSnapshot, ExecutionAdapter, OrderCallbackSink, OrderKind, OrderState, Position, SubmitOutcome, WorkingOrder,
};
use crate::codec::OrderIdCodec;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotASimulationAccount {
    pub account_id: String,
}

impl fmt::Display for NotASimulationAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account {:?} is not a verified simulation account", self.account_id)
    }
}

impl std::error::Error for NotASimulationAccount {}

struct TrackedOrder {
    instrument: String,
    state: OrderState,
}

pub struct SimAdapter {
    account_id: String,
    callbacks: Arc<dyn OrderCallbackSink>,
    orders: Mutex<HashMap<String, TrackedOrder>>,
    positions: Mutex<HashMap<String, i64>>,
}

impl SimAdapter {
    /// Verify the account before constructing the adapter. `is_sim_account`
    /// is injected so tests and real sandboxed-brokerage checks share the
    /// same fail-closed gate.
    pub fn verify_and_new(
        account_id: impl Into<String>,
        is_sim_account: impl Fn(&str) -> bool,
        callbacks: Arc<dyn OrderCallbackSink>,
    ) -> Result<Self, NotASimulationAccount> {
        let account_id = account_id.into();
        if !is_sim_account(&account_id) {
            return Err(NotASimulationAccount { account_id });
        }
        Ok(Self {
            account_id,
            callbacks,
            orders: Mutex::new(HashMap::new()),
            positions: Mutex::new(HashMap::new()),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Test/harness hook: deliver a fill for a working order tag.
    pub fn apply_fill(&self, tag: &str, instrument: &str, direction: Direction, fill_price: Px, delta_qty: i64, utc: DateTime<Utc>) {
        let signed = match direction {
            Direction::Long => delta_qty,
            Direction::Short => -delta_qty,
        };
        *self.positions.lock().expect("sim positions mutex poisoned").entry(instrument.to_string()).or_insert(0) += signed;
        self.callbacks.on_execution(tag, fill_price, delta_qty, utc);
    }

    fn accept(&self, tag: &str, instrument: &str) -> SubmitOutcome {
        self.orders
            .lock()
            .expect("sim orders mutex poisoned")
            .insert(tag.to_string(), TrackedOrder { instrument: instrument.to_string(), state: OrderState::Accepted });
        self.callbacks.on_order_update(tag, OrderState::Accepted, None);
        SubmitOutcome::ok(tag)
    }
}

impl ExecutionAdapter for SimAdapter {
    fn submit_entry(
        &self,
        intent_id: &str,
        instrument: &str,
        _direction: Direction,
        _entry_price: Option<Px>,
        _qty: i64,
        _order_kind: OrderKind,
        _utc: DateTime<Utc>,
    ) -> SubmitOutcome {
        self.accept(&OrderIdCodec::encode_entry(intent_id), instrument)
    }

    fn submit_protective_stop(
        &self,
        intent_id: &str,
        instrument: &str,
        _direction: Direction,
        _stop_price: Px,
        _qty: i64,
        _oco_group: &str,
        _utc: DateTime<Utc>,
    ) -> SubmitOutcome {
        self.accept(&OrderIdCodec::encode_stop(intent_id), instrument)
    }

    fn submit_target(
        &self,
        intent_id: &str,
        instrument: &str,
        _direction: Direction,
        _limit_price: Px,
        _qty: i64,
        _oco_group: &str,
        _utc: DateTime<Utc>,
    ) -> SubmitOutcome {
        self.accept(&OrderIdCodec::encode_target(intent_id), instrument)
    }

    fn modify_stop_to(&self, intent_id: &str, instrument: &str, _new_stop: Px, _utc: DateTime<Utc>) -> SubmitOutcome {
        let tag = OrderIdCodec::encode_stop(intent_id);
        self.orders
            .lock()
            .expect("sim orders mutex poisoned")
            .insert(tag.clone(), TrackedOrder { instrument: instrument.to_string(), state: OrderState::Accepted });
        self.callbacks.on_order_update(&tag, OrderState::Accepted, None);
        SubmitOutcome::ok(tag)
    }

    fn flatten(&self, intent_id: &str, instrument: &str, utc: DateTime<Utc>) -> SubmitOutcome {
        let outcome = self.cancel_intent_orders(intent_id, utc);
        self.positions.lock().expect("sim positions mutex poisoned").remove(instrument);
        outcome
    }

    fn cancel_intent_orders(&self, intent_id: &str, _utc: DateTime<Utc>) -> SubmitOutcome {
        let mut orders = self.orders.lock().expect("sim orders mutex poisoned");
        let tags: Vec<String> = orders
            .keys()
            .filter(|tag| OrderIdCodec::decode(tag).map(|d| d.intent_id == intent_id).unwrap_or(false))
            .cloned()
            .collect();
        for tag in &tags {
            if let Some(order) = orders.get_mut(tag) {
                order.state = OrderState::Cancelled;
            }
            self.callbacks.on_order_update(tag, OrderState::Cancelled, None);
        }
        SubmitOutcome::ok(format!("cancel-{intent_id}"))
    }

    fn get_account_snapshot(&self, _utc: DateTime<Utc>) -> AccountSnapshot {
        let orders = self.orders.lock().expect("sim orders mutex poisoned");
        let positions = self.positions.lock().expect("sim positions mutex poisoned");
        AccountSnapshot {
            positions: positions
                .iter()
                .map(|(instrument, qty)| Position { instrument: instrument.clone(), qty_signed: *qty })
                .collect(),
            working_orders: orders
                .iter()
                .map(|(tag, o)| WorkingOrder {
                    broker_order_id: tag.clone(),
                    tag: tag.clone(),
                    instrument: o.instrument.clone(),
                    state: o.state,
                })
                .collect(),
        }
    }

    fn cancel_robot_owned_working_orders(&self, snapshot: &AccountSnapshot, utc: DateTime<Utc>) -> SubmitOutcome {
        for working in &snapshot.working_orders {
            if let Some(decoded) = OrderIdCodec::decode(&working.tag) {
                self.cancel_intent_orders(&decoded.intent_id, utc);
            }
        }
        SubmitOutcome::ok("cancel-robot-owned")
    }
}
