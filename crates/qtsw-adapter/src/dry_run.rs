//! No-op null adapter. Every submission succeeds and is acknowledged
//! immediately; nothing is ever sent anywhere, no fills ever arrive. This
//! lets the rest of the executor's logic run end-to-end without a broker.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use qtsw_schemas::{Direction, Px};

use crate::capability::{
    AccountSnapshot, ExecutionAdapter, OrderCallbackSink, OrderKind, OrderState, SubmitOutcome,
};

pub struct DryRunAdapter {
    callbacks: Arc<dyn OrderCallbackSink>,
    seq: AtomicU64,
}

impl DryRunAdapter {
    pub fn new(callbacks: Arc<dyn OrderCallbackSink>) -> Self {
        Self { callbacks, seq: AtomicU64::new(0) }
    }

    fn fabricate_id(&self, tag: &str) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("DRYRUN-{n}-{tag}")
    }
}

impl ExecutionAdapter for DryRunAdapter {
    fn submit_entry(
        &self,
        intent_id: &str,
        _instrument: &str,
        _direction: Direction,
        _entry_price: Option<Px>,
        _qty: i64,
        _order_kind: OrderKind,
        _utc: DateTime<Utc>,
    ) -> SubmitOutcome {
        let tag = format!("QTSW2:{intent_id}");
        let id = self.fabricate_id(&tag);
        self.callbacks.on_order_update(&tag, OrderState::Accepted, None);
        SubmitOutcome::ok(id)
    }

    fn submit_protective_stop(
        &self,
        intent_id: &str,
        _instrument: &str,
        _direction: Direction,
        _stop_price: Px,
        _qty: i64,
        _oco_group: &str,
        _utc: DateTime<Utc>,
    ) -> SubmitOutcome {
        let tag = format!("QTSW2:{intent_id}:STOP");
        let id = self.fabricate_id(&tag);
        self.callbacks.on_order_update(&tag, OrderState::Accepted, None);
        SubmitOutcome::ok(id)
    }

    fn submit_target(
        &self,
        intent_id: &str,
        _instrument: &str,
        _direction: Direction,
        _limit_price: Px,
        _qty: i64,
        _oco_group: &str,
        _utc: DateTime<Utc>,
    ) -> SubmitOutcome {
        let tag = format!("QTSW2:{intent_id}:TARGET");
        let id = self.fabricate_id(&tag);
        self.callbacks.on_order_update(&tag, OrderState::Accepted, None);
        SubmitOutcome::ok(id)
    }

    fn modify_stop_to(&self, intent_id: &str, _instrument: &str, _new_stop: Px, _utc: DateTime<Utc>) -> SubmitOutcome {
        SubmitOutcome::ok(format!("DRYRUN-modify-{intent_id}"))
    }

    fn flatten(&self, intent_id: &str, _instrument: &str, _utc: DateTime<Utc>) -> SubmitOutcome {
        SubmitOutcome::ok(format!("DRYRUN-flatten-{intent_id}"))
    }

    fn cancel_intent_orders(&self, intent_id: &str, _utc: DateTime<Utc>) -> SubmitOutcome {
        SubmitOutcome::ok(format!("DRYRUN-cancel-{intent_id}"))
    }

    fn get_account_snapshot(&self, _utc: DateTime<Utc>) -> AccountSnapshot {
        AccountSnapshot::default()
    }

    fn cancel_robot_owned_working_orders(&self, _snapshot: &AccountSnapshot, _utc: DateTime<Utc>) -> SubmitOutcome {
        SubmitOutcome::ok("DRYRUN-cancel-all")
    }
}
