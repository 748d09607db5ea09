//! The per-intent state machine that submits entry/protective/break-even
//! orders with retry and fail-closed policy. This is the
//! component that ties every other crate in the workspace together:
//! kill switch, journal, coordinator, and adapter.
//!
//! States per intent: `IDLE -> ENTRY_SUBMITTED ->
//! ENTRY_FILLING -> PROTECTED -> COMPLETED`, with side paths to
//! `REJECTED` and `FLATTENING -> STOOD_DOWN`. The states themselves are
//! not reified as an enum here — each is instead a derivable combination
//! of the [`TrackedIntent`]'s `protected`/`standing_down` flags and the
//! journal's own `entry_submitted`/`trade_completed` fields, which stay
//! the single source of truth.

pub mod clock;
pub mod incident;
pub mod policy;
pub mod state;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use qtsw_adapter::{
    DecodedTag, ExecutionAdapter, OrderCallbackSink, OrderIdCodec, OrderKind, OrderLeg, OrderState as AdapterOrderState,
};
use qtsw_coordinator::{ExitFillEffect, InstrumentIntentCoordinator};
use qtsw_journal::{ExecutionJournal, ExitFillOutcome};
use qtsw_killswitch::KillSwitchCheck;
use qtsw_schemas::{Direction, EventSink, ExecutionEvent, Intent, NotificationSink, Priority, Px};

pub use clock::{Clock, RealSleeper, Sleeper, SystemClock};
pub use incident::{persist_incident, IncidentRecord};
pub use policy::IntentPolicy;
pub use state::TrackedIntent;

/// The event-emitting closure type the journal is instantiated with in
/// this crate. `Box<dyn Fn(..) + Send + Sync>` itself implements
/// `Fn(ExecutionEvent)`, so `ExecutionJournal<EventEmitter>` satisfies the
/// journal's own `E: Fn(ExecutionEvent)` bound without the executor
/// needing to be generic over it.
pub type EventEmitter = Box<dyn Fn(ExecutionEvent) + Send + Sync>;

/// The concrete journal type this crate drives.
pub type Journal = ExecutionJournal<EventEmitter>;

/// Number of attempts for the protective-orders retry loop.
const PROTECTIVE_RETRY_ATTEMPTS: u32 = 3;
/// Delay between protective-orders retry attempts.
const PROTECTIVE_RETRY_DELAY: Duration = Duration::from_millis(100);
/// Number of attempts for the flatten retry loop.
const FLATTEN_RETRY_ATTEMPTS: u32 = 3;
/// Delay between flatten retry attempts.
const FLATTEN_RETRY_DELAY: Duration = Duration::from_millis(200);
/// Unprotected-position watchdog timeout.
const WATCHDOG_TIMEOUT_SECONDS: i64 = 10;

/// Outcome of a call to [`IntentExecutor::submit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Submitted { intent_id: String, broker_order_id: String },
    Duplicate { intent_id: String },
    Blocked { intent_id: String, reason: String },
    Rejected { intent_id: String, reason: String },
}

struct Snapshot {
    intent: Intent,
    stream: String,
    canonical_instrument: String,
    execution_instrument: String,
    contract_multiplier: i64,
}

/// The per-intent execution state machine. Holds
/// concurrent maps keyed by intent id for order tracking, policy, and the
/// intent registry; never holds these locks while blocking
/// on adapter or journal I/O.
pub struct IntentExecutor {
    journal: Arc<Journal>,
    coordinator: Arc<InstrumentIntentCoordinator>,
    kill_switch: Arc<dyn KillSwitchCheck>,
    notify: Arc<dyn NotificationSink>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    incident_dir: PathBuf,
    /// Set once, after construction, via [`IntentExecutor::set_adapter`] —
    /// the adapter's callback sink is this executor itself, so the two
    /// must be wired together after both exist.
    adapter: OnceLock<Arc<dyn ExecutionAdapter>>,
    intents: Mutex<HashMap<String, TrackedIntent>>,
    policies: Mutex<HashMap<String, IntentPolicy>>,
    /// Latest known broker state per order tag, updated from
    /// `on_order_update` callbacks; the watchdog reads this to decide
    /// whether a protective leg has reached `Accepted`.
    legs: Mutex<HashMap<String, AdapterOrderState>>,
}

impl IntentExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        journal: Arc<Journal>,
        coordinator: Arc<InstrumentIntentCoordinator>,
        kill_switch: Arc<dyn KillSwitchCheck>,
        notify: Arc<dyn NotificationSink>,
        events: Arc<dyn EventSink>,
        incident_dir: impl Into<PathBuf>,
    ) -> Arc<Self> {
        Self::with_clock(
            journal,
            coordinator,
            kill_switch,
            notify,
            events,
            incident_dir,
            Arc::new(SystemClock),
            Arc::new(RealSleeper),
        )
    }

    /// Constructor with injectable clock/sleeper seams, for tests that
    /// drive the retry loops and watchdog without real wall-clock delays.
    #[allow(clippy::too_many_arguments)]
    pub fn with_clock(
        journal: Arc<Journal>,
        coordinator: Arc<InstrumentIntentCoordinator>,
        kill_switch: Arc<dyn KillSwitchCheck>,
        notify: Arc<dyn NotificationSink>,
        events: Arc<dyn EventSink>,
        incident_dir: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Arc<Self> {
        Arc::new(Self {
            journal,
            coordinator,
            kill_switch,
            notify,
            events,
            clock,
            sleeper,
            incident_dir: incident_dir.into(),
            adapter: OnceLock::new(),
            intents: Mutex::new(HashMap::new()),
            policies: Mutex::new(HashMap::new()),
            legs: Mutex::new(HashMap::new()),
        })
    }

    /// Wire the adapter in after construction. Must be called exactly
    /// once, before any call to [`IntentExecutor::submit`]; subsequent
    /// calls are ignored.
    pub fn set_adapter(&self, adapter: Arc<dyn ExecutionAdapter>) {
        let _ = self.adapter.set(adapter);
    }

    fn adapter(&self) -> &Arc<dyn ExecutionAdapter> {
        self.adapter.get().expect("adapter must be set via set_adapter before driving submissions")
    }

    fn snapshot(&self, intent_id: &str) -> Option<Snapshot> {
        let intents = self.intents.lock().expect("executor intents mutex poisoned");
        intents.get(intent_id).map(|t| Snapshot {
            intent: t.intent.clone(),
            stream: t.stream.clone(),
            canonical_instrument: t.canonical_instrument.clone(),
            execution_instrument: t.execution_instrument.clone(),
            contract_multiplier: t.contract_multiplier,
        })
    }

    pub fn policy(&self, intent_id: &str) -> Option<IntentPolicy> {
        self.policies.lock().expect("executor policy mutex poisoned").get(intent_id).cloned()
    }

    pub fn is_protected(&self, intent_id: &str) -> bool {
        self.intents
            .lock()
            .expect("executor intents mutex poisoned")
            .get(intent_id)
            .map(|t| t.protected)
            .unwrap_or(false)
    }

    /// Step 1-4 of the submission sequence: kill switch,
    /// idempotency, policy registration, entry submission.
    pub fn submit(
        &self,
        intent: &Intent,
        execution_instrument: &str,
        contract_multiplier: i64,
        utc: DateTime<Utc>,
    ) -> SubmissionOutcome {
        self.journal.summary.bump_intent_seen();
        let intent_id = intent.intent_id();

        if self.journal.is_stood_down(&intent.stream) {
            let reason = "stream is standing down".to_string();
            self.journal.summary.bump_order_blocked();
            self.events.emit(ExecutionEvent::ExecutionBlocked { intent_id: intent_id.clone(), reason: reason.clone() });
            return SubmissionOutcome::Blocked { intent_id, reason };
        }

        let kill_switch_status = self.kill_switch.check();
        if kill_switch_status.enabled {
            self.journal.summary.bump_order_blocked();
            if kill_switch_status.fail_closed {
                self.events.emit(ExecutionEvent::KillSwitchErrorFailClosed {
                    reason: kill_switch_status.message.unwrap_or_else(|| format!("blocked intent {intent_id}")),
                });
            } else {
                self.events.emit(ExecutionEvent::KillSwitchActive { reason: format!("blocked intent {intent_id}") });
            }
            return SubmissionOutcome::Blocked { intent_id, reason: "kill switch enabled".to_string() };
        }

        let claimed = match self.journal.try_claim_submission(&intent_id, &intent.trading_date, &intent.stream, execution_instrument) {
            Ok(claimed) => claimed,
            Err(_) => {
                // Corruption/invariant failure already stood the stream
                // down and persisted a fail-closed stub inside the
                // journal's own guarded operation.
                return SubmissionOutcome::Blocked { intent_id, reason: "journal error, failing closed".to_string() };
            }
        };
        if !claimed {
            self.journal.summary.bump_duplicate_skipped();
            self.events.emit(ExecutionEvent::IntentDuplicateSkipped { intent_id: intent_id.clone(), stream: intent.stream.clone() });
            return SubmissionOutcome::Duplicate { intent_id };
        }

        let policy = IntentPolicy {
            expected_qty: intent.qty,
            max_qty: intent.qty,
            canonical_instrument: intent.canonical_instrument.clone(),
            execution_instrument: execution_instrument.to_string(),
        };
        self.policies.lock().expect("executor policy mutex poisoned").insert(intent_id.clone(), policy.clone());
        self.events.emit(ExecutionEvent::IntentPolicyRegistered {
            intent_id: intent_id.clone(),
            expected_qty: policy.expected_qty,
            max_qty: policy.max_qty,
        });

        self.intents.lock().expect("executor intents mutex poisoned").insert(
            intent_id.clone(),
            TrackedIntent {
                intent: intent.clone(),
                stream: intent.stream.clone(),
                canonical_instrument: intent.canonical_instrument.clone(),
                execution_instrument: execution_instrument.to_string(),
                contract_multiplier,
                entry_filled_at: None,
                protected: false,
                standing_down: false,
            },
        );

        let Some(direction) = intent.direction else {
            let reason = "missing direction at entry submission".to_string();
            let _ = self.journal.record_rejection(&intent_id, &intent.trading_date, &intent.stream, execution_instrument, &reason, utc);
            return SubmissionOutcome::Rejected { intent_id, reason };
        };

        let is_breakout = intent.trigger_reason.as_deref().map(|r| r.to_ascii_uppercase().contains("BREAKOUT")).unwrap_or(false);
        let order_kind = if is_breakout {
            OrderKind::StopMarket
        } else if intent.entry_price.is_some() {
            OrderKind::Limit
        } else {
            OrderKind::Market
        };

        self.events.emit(ExecutionEvent::OrderSubmitAttempt { intent_id: intent_id.clone(), order_kind: format!("{order_kind:?}") });
        let outcome = self.adapter().submit_entry(&intent_id, execution_instrument, direction, intent.entry_price, intent.qty, order_kind, utc);

        if !outcome.success {
            let reason = outcome.error.unwrap_or_else(|| "entry submission rejected".to_string());
            let _ = self.journal.record_rejection(&intent_id, &intent.trading_date, &intent.stream, execution_instrument, &reason, utc);
            self.events.emit(ExecutionEvent::OrderSubmitFail { intent_id: intent_id.clone(), reason: reason.clone() });
            return SubmissionOutcome::Rejected { intent_id, reason };
        }

        let broker_order_id = outcome.broker_order_id.unwrap_or_default();
        let order_type = match order_kind {
            OrderKind::Market => "Market",
            OrderKind::Limit => "Limit",
            OrderKind::StopMarket => "StopMarket",
        };
        let _ = self.journal.record_submission(
            &intent_id,
            &intent.trading_date,
            &intent.stream,
            execution_instrument,
            order_type,
            &broker_order_id,
            intent.entry_price,
            utc,
        );
        self.events.emit(ExecutionEvent::OrderSubmitted { intent_id: intent_id.clone(), broker_order_id: broker_order_id.clone() });
        SubmissionOutcome::Submitted { intent_id, broker_order_id }
    }

    fn handle_entry_fill_callback(&self, intent_id: &str, fill_price: Px, delta_qty: i64, utc: DateTime<Utc>) {
        let Some(snap) = self.snapshot(intent_id) else { return };
        let Some(direction) = snap.intent.direction else { return };

        let outcome = match self.journal.record_entry_fill(
            intent_id,
            &snap.intent.trading_date,
            &snap.stream,
            fill_price,
            delta_qty,
            utc,
            snap.contract_multiplier,
            direction,
            &snap.execution_instrument,
            &snap.canonical_instrument,
        ) {
            Ok(outcome) => outcome,
            Err(_) => return, // journal already stood the stream down
        };

        // record_entry_fill already emitted EXECUTION_PARTIAL_FILL for this
        // chunk; EXECUTION_FILLED is this executor's own signal that the
        // entry has reached its full expected size.
        if let Some(policy) = self.policy(intent_id) {
            if outcome.cumulative_qty >= policy.expected_qty {
                self.events.emit(ExecutionEvent::ExecutionFilled { intent_id: intent_id.to_string(), cumulative_qty: outcome.cumulative_qty });
            }
        }
        self.coordinator.on_entry_fill(intent_id, delta_qty, &snap.stream, &snap.execution_instrument, direction, utc);

        {
            let mut intents = self.intents.lock().expect("executor intents mutex poisoned");
            if let Some(tracked) = intents.get_mut(intent_id) {
                if tracked.entry_filled_at.is_none() {
                    tracked.entry_filled_at = Some(utc);
                }
            }
        }

        self.handle_entry_fill(intent_id, &snap.intent, outcome.cumulative_qty, utc);
    }

    /// The protective-orders protocol.
    fn handle_entry_fill(&self, intent_id: &str, intent: &Intent, cumulative_total: i64, utc: DateTime<Utc>) {
        let (direction, stop_price, target_price) = match (intent.direction, intent.stop_price, intent.target_price) {
            (Some(d), Some(s), Some(t)) => (d, s, t),
            _ => {
                let missing = missing_fields(intent);
                self.events.emit(ExecutionEvent::IntentIncompleteUnprotectedPosition {
                    intent_id: intent_id.to_string(),
                    missing_fields: missing.clone(),
                });
                self.fail_closed(intent_id, &format!("intent missing {missing} at fill time"), "", utc);
                return;
            }
        };

        if self.journal.is_stood_down(&self.snapshot(intent_id).map(|s| s.stream).unwrap_or_default()) {
            return;
        }

        if !self.coordinator.can_submit_exit(intent_id, cumulative_total) {
            return;
        }

        let execution_instrument = self.snapshot(intent_id).map(|s| s.execution_instrument).unwrap_or_default();
        let opposite = direction.opposite();

        let mut placed: Option<(String, String)> = None;
        let mut last_failed_legs = String::new();

        for attempt in 1..=PROTECTIVE_RETRY_ATTEMPTS {
            let oco_group = OrderIdCodec::encode_oco_group(intent_id, attempt, &utc.format("%H%M%S%3f").to_string());
            self.events.emit(ExecutionEvent::ProtectiveOrdersSubmitted { intent_id: intent_id.to_string(), oco_group: oco_group.clone(), attempt });

            let stop_outcome = self.adapter().submit_protective_stop(intent_id, &execution_instrument, opposite, stop_price, cumulative_total, &oco_group, utc);
            if !stop_outcome.success {
                last_failed_legs = "STOP".to_string();
                if attempt < PROTECTIVE_RETRY_ATTEMPTS {
                    self.sleeper.sleep(PROTECTIVE_RETRY_DELAY);
                }
                continue;
            }

            let target_outcome = self.adapter().submit_target(intent_id, &execution_instrument, opposite, target_price, cumulative_total, &oco_group, utc);
            if !target_outcome.success {
                last_failed_legs = "TARGET".to_string();
                if attempt < PROTECTIVE_RETRY_ATTEMPTS {
                    self.sleeper.sleep(PROTECTIVE_RETRY_DELAY);
                }
                continue;
            }

            placed = Some((
                stop_outcome.broker_order_id.unwrap_or_default(),
                target_outcome.broker_order_id.unwrap_or_default(),
            ));
            break;
        }

        match placed {
            Some((stop_order_id, target_order_id)) => {
                if let Some(tracked) = self.intents.lock().expect("executor intents mutex poisoned").get_mut(intent_id) {
                    tracked.protected = true;
                }
                self.events.emit(ExecutionEvent::ProtectivesPlaced {
                    intent_id: intent_id.to_string(),
                    stop_order_id,
                    target_order_id,
                    stop_price: stop_price.canonical(),
                    target_price: target_price.canonical(),
                    protected_quantity: cumulative_total,
                });
            }
            None => {
                self.fail_closed(
                    intent_id,
                    &format!("protective leg(s) failed after {PROTECTIVE_RETRY_ATTEMPTS} attempts: {last_failed_legs}"),
                    &last_failed_legs,
                    utc,
                );
            }
        }
    }

    fn handle_exit_fill_callback(&self, intent_id: &str, fill_price: Px, delta_qty: i64, exit_order_type: &str, utc: DateTime<Utc>) {
        let Some(snap) = self.snapshot(intent_id) else { return };
        let outcome = match self.journal.record_exit_fill(intent_id, &snap.intent.trading_date, &snap.stream, fill_price, delta_qty, exit_order_type, utc) {
            Ok(outcome) => outcome,
            Err(_) => return,
        };

        let effect = self.coordinator.on_exit_fill(intent_id, delta_qty, utc);
        if effect == ExitFillEffect::JustClosed {
            self.adapter().cancel_intent_orders(intent_id, utc);
        }

        // record_exit_fill already emitted EXECUTION_PARTIAL_FILL or
        // TRADE_COMPLETED as appropriate; only react to completion here.
        if let ExitFillOutcome::Completed { .. } = outcome {
            self.intents.lock().expect("executor intents mutex poisoned").remove(intent_id);
            self.policies.lock().expect("executor policy mutex poisoned").remove(intent_id);
        }
    }

    /// Break-even modification for one intent. Idempotent:
    /// gated by the journal's `is_be_modified`, and uses the intent's
    /// strategic entry level, never the actual fill price.
    pub fn be_tick(&self, intent_id: &str, monitored_price: Px, utc: DateTime<Utc>) {
        let Some(snap) = self.snapshot(intent_id) else { return };
        let (direction, entry_price, be_trigger) = match (snap.intent.direction, snap.intent.entry_price, snap.intent.be_trigger_price) {
            (Some(d), Some(e), Some(b)) => (d, e, b),
            _ => return,
        };

        if self.journal.is_be_modified(intent_id, &snap.intent.trading_date, &snap.stream) {
            self.events.emit(ExecutionEvent::StopModifySkipped { intent_id: intent_id.to_string(), reason: "already break-even modified".to_string() });
            return;
        }

        let crossed = match direction {
            Direction::Long => monitored_price >= be_trigger,
            Direction::Short => monitored_price <= be_trigger,
        };
        if !crossed {
            return;
        }

        self.events.emit(ExecutionEvent::StopModifyAttempt { intent_id: intent_id.to_string(), new_stop_price: entry_price.canonical() });
        let outcome = self.adapter().modify_stop_to(intent_id, &snap.execution_instrument, entry_price, utc);
        if outcome.success {
            let _ = self.journal.record_be_modification(intent_id, &snap.intent.trading_date, &snap.stream, entry_price, utc);
            self.events.emit(ExecutionEvent::StopModifySuccess { intent_id: intent_id.to_string(), new_stop_price: entry_price.canonical() });
        } else {
            self.events.emit(ExecutionEvent::StopModifyFail { intent_id: intent_id.to_string(), reason: outcome.error.unwrap_or_default() });
        }
    }

    /// Unprotected-position watchdog: any filled entry
    /// whose fill is older than [`WATCHDOG_TIMEOUT_SECONDS`] and whose
    /// stop or target has not reached `Accepted` triggers fail-closed.
    pub fn watchdog_tick(&self, now: DateTime<Utc>) {
        let candidates: Vec<(String, DateTime<Utc>)> = {
            let intents = self.intents.lock().expect("executor intents mutex poisoned");
            intents
                .iter()
                .filter(|(_, t)| !t.protected && !t.standing_down)
                .filter_map(|(id, t)| t.entry_filled_at.map(|ts| (id.clone(), ts)))
                .collect()
        };

        for (intent_id, entry_filled_at) in candidates {
            let elapsed = (now - entry_filled_at).num_seconds();
            if elapsed < WATCHDOG_TIMEOUT_SECONDS {
                continue;
            }
            let stop_tag = OrderIdCodec::encode_stop(&intent_id);
            let target_tag = OrderIdCodec::encode_target(&intent_id);
            let (stop_ok, target_ok) = {
                let legs = self.legs.lock().expect("executor legs mutex poisoned");
                (is_accepted_or_later(legs.get(&stop_tag)), is_accepted_or_later(legs.get(&target_tag)))
            };
            if stop_ok && target_ok {
                continue;
            }
            self.events.emit(ExecutionEvent::UnprotectedPositionTimeout { intent_id: intent_id.clone(), seconds_unprotected: elapsed });
            self.fail_closed(&intent_id, "protective orders not accepted within the watchdog timeout", "", now);
        }
    }

    /// Convenience wrapper over [`IntentExecutor::watchdog_tick`] using
    /// the executor's own clock, for callers on a periodic-tick loop.
    pub fn watchdog_tick_now(&self) {
        self.watchdog_tick(self.clock.now());
    }

    /// Fail-closed path shared by the incomplete-intent, protective-leg-
    /// exhaustion, and watchdog-timeout triggers:
    /// stand the stream down, flatten with retry, persist an incident
    /// record, and emit an emergency notification. `failed_legs` is
    /// non-empty only for the protective-leg-failure trigger; the other
    /// two triggers pass an empty string and skip the
    /// `PROTECTIVE_ORDERS_FAILED_FLATTENED` event.
    fn fail_closed(&self, intent_id: &str, reason: &str, failed_legs: &str, utc: DateTime<Utc>) {
        let (stream, execution_instrument) = self
            .snapshot(intent_id)
            .map(|s| (s.stream, s.execution_instrument))
            .unwrap_or_default();

        self.journal.stand_down_stream(&stream);
        if let Some(tracked) = self.intents.lock().expect("executor intents mutex poisoned").get_mut(intent_id) {
            tracked.standing_down = true;
        }
        self.coordinator.on_protective_failure(intent_id, utc);

        let mut flattened = false;
        for attempt in 1..=FLATTEN_RETRY_ATTEMPTS {
            self.events.emit(ExecutionEvent::FlattenAttempt { intent_id: intent_id.to_string(), attempt });
            let outcome = self.adapter().flatten(intent_id, &execution_instrument, utc);
            if outcome.success {
                flattened = true;
                self.events.emit(ExecutionEvent::FlattenSuccess { intent_id: intent_id.to_string() });
                if attempt > 1 {
                    self.events.emit(ExecutionEvent::FlattenRetrySucceeded { intent_id: intent_id.to_string(), attempt });
                }
                break;
            }
            self.events.emit(ExecutionEvent::FlattenFail { intent_id: intent_id.to_string(), reason: outcome.error.unwrap_or_default() });
            if attempt < FLATTEN_RETRY_ATTEMPTS {
                self.events.emit(ExecutionEvent::FlattenRetryAttempt { intent_id: intent_id.to_string(), attempt: attempt + 1 });
                self.sleeper.sleep(FLATTEN_RETRY_DELAY);
            }
        }

        if !failed_legs.is_empty() {
            self.events.emit(ExecutionEvent::ProtectiveOrdersFailedFlattened {
                intent_id: intent_id.to_string(),
                attempts: PROTECTIVE_RETRY_ATTEMPTS,
                failed_legs: failed_legs.to_string(),
            });
        }

        if !flattened {
            self.events.emit(ExecutionEvent::PositionFlattenFailClosed { intent_id: intent_id.to_string(), reason: reason.to_string() });
        }

        self.notify.notify(Priority::Emergency, &format!("intent {intent_id} stood down: {reason}"));

        let record = IncidentRecord { intent_id, reason, failed_legs, occurred_at_utc: utc };
        if let Err(e) = persist_incident(&self.incident_dir, &record) {
            self.events.emit(ExecutionEvent::AdapterInitFailed { mode: "incident-persist".to_string(), reason: e.to_string() });
        }
    }
}

fn is_accepted_or_later(state: Option<&AdapterOrderState>) -> bool {
    matches!(state, Some(AdapterOrderState::Accepted) | Some(AdapterOrderState::Filled))
}

fn missing_fields(intent: &Intent) -> String {
    let mut missing = Vec::new();
    if intent.direction.is_none() {
        missing.push("Direction");
    }
    if intent.stop_price.is_none() {
        missing.push("StopPrice");
    }
    if intent.target_price.is_none() {
        missing.push("TargetPrice");
    }
    missing.join(",")
}

impl OrderCallbackSink for IntentExecutor {
    fn on_order_update(&self, tag: &str, state: AdapterOrderState, error: Option<String>) {
        let Some(DecodedTag { intent_id, leg: _ }) = OrderIdCodec::decode(tag) else {
            // Not a robot-owned tag: never act on foreign orders.
            return;
        };
        self.legs.lock().expect("executor legs mutex poisoned").insert(tag.to_string(), state);
        match state {
            AdapterOrderState::Accepted => {
                self.events.emit(ExecutionEvent::OrderAcknowledged { intent_id, broker_order_id: tag.to_string() });
            }
            AdapterOrderState::Rejected => {
                self.events.emit(ExecutionEvent::OrderRejected { intent_id, reason: error.unwrap_or_default() });
            }
            AdapterOrderState::Cancelled => {
                self.events.emit(ExecutionEvent::OrderCancelled { intent_id, broker_order_id: tag.to_string() });
            }
            AdapterOrderState::Working | AdapterOrderState::Filled => {}
        }
    }

    fn on_execution(&self, tag: &str, fill_price: Px, delta_qty: i64, utc: DateTime<Utc>) {
        let Some(decoded) = OrderIdCodec::decode(tag) else {
            return; // foreign order: never acted upon
        };
        match decoded.leg {
            OrderLeg::Entry => self.handle_entry_fill_callback(&decoded.intent_id, fill_price, delta_qty, utc),
            OrderLeg::Stop => self.handle_exit_fill_callback(&decoded.intent_id, fill_price, delta_qty, "STOP", utc),
            OrderLeg::Target => self.handle_exit_fill_callback(&decoded.intent_id, fill_price, delta_qty, "TARGET", utc),
        }
    }
}
