//! Durable per-intent record of submissions, fills, rejections, BE
//! modifications, and completion/realized P&L. Source of truth for
//! idempotency.
//!
//! All mutations and reads are serialized under a single mutex; the I/O
//! happens inside the lock, so the operation (read-modify-persist) is the
//! atomic unit, matching the teacher's Journal-mutex discipline.

mod error;
mod summary;

pub use error::JournalError;
pub use summary::{ExecutionSummary, ExecutionSummarySnapshot};

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use qtsw_schemas::{Direction, ExecutionEvent, JournalEntry, Px};

type JKey = (String, String, String); // (trading_date, stream, intent_id)

fn mk_key(date: &str, stream: &str, intent_id: &str) -> JKey {
    (date.to_string(), stream.to_string(), intent_id.to_string())
}

/// Outcome of an entry fill, handed back to the caller (the IntentExecutor)
/// to drive the protective-orders protocol.
#[derive(Clone, Debug, PartialEq)]
pub struct EntryFillOutcome {
    pub cumulative_qty: i64,
    pub entry_avg_price: Px,
}

/// Outcome of an exit fill.
#[derive(Clone, Debug, PartialEq)]
pub enum ExitFillOutcome {
    /// exit_qty_total < entry_qty_total: more exit fills still expected.
    Partial { cumulative_qty: i64 },
    /// exit_qty_total == entry_qty_total: trade completed, P&L computed.
    Completed {
        realized_pnl_points: Px,
        realized_pnl_gross: Px,
        realized_pnl_net: Px,
        completion_reason: String,
    },
}

struct State {
    entries: HashMap<JKey, JournalEntry>,
    stood_down_streams: HashSet<String>,
}

/// The journal. `emit` is called once per event with the relevant
/// [`ExecutionEvent`] — typically wired to `tracing` plus the notification
/// sink, matching `mqk-reconcile`'s closure-injection style rather than a
/// trait object, since there is exactly one call site per process.
pub struct ExecutionJournal<E>
where
    E: Fn(ExecutionEvent),
{
    root: PathBuf,
    state: Mutex<State>,
    emit: E,
    pub summary: ExecutionSummary,
}

impl<E: Fn(ExecutionEvent)> ExecutionJournal<E> {
    pub fn new(root: impl AsRef<Path>, emit: E) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            state: Mutex::new(State {
                entries: HashMap::new(),
                stood_down_streams: HashSet::new(),
            }),
            emit,
            summary: ExecutionSummary::new(),
        }
    }

    pub fn is_stood_down(&self, stream: &str) -> bool {
        self.state
            .lock()
            .expect("journal mutex poisoned")
            .stood_down_streams
            .contains(stream)
    }

    /// Stand a stream down from outside the journal's own guarded
    /// operations — used by the executor for protective-failure,
    /// watchdog-timeout, and flatten-exhaustion fail-closed paths, which
    /// are not journal invariant violations themselves but still must
    /// block further submission.
    pub fn stand_down_stream(&self, stream: &str) {
        self.state.lock().expect("journal mutex poisoned").stood_down_streams.insert(stream.to_string());
    }

    fn path_for(&self, date: &str, stream: &str, intent_id: &str) -> PathBuf {
        self.root.join(format!("{date}_{stream}_{intent_id}.json"))
    }

    /// Loads `key` into the in-memory cache if not already present: from
    /// disk if a file exists, freshly if not. A file that exists but fails
    /// to parse is corruption: the stream is stood down, a fail-closed stub
    /// (`entry_submitted = true`) is cached in its place so no duplicate
    /// submission can slip through, and `Err` is returned (invariant 5).
    fn ensure_loaded(&self, state: &mut State, key: &JKey, instrument: &str) -> Result<(), JournalError> {
        if state.entries.contains_key(key) {
            return Ok(());
        }
        let path = self.path_for(&key.0, &key.1, &key.2);
        if !path.exists() {
            state
                .entries
                .insert(key.clone(), JournalEntry::new(key.2.clone(), key.0.clone(), key.1.clone(), instrument));
            return Ok(());
        }
        let read_result = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|body| serde_json::from_str::<JournalEntry>(&body).map_err(|e| e.to_string()));

        match read_result {
            Ok(entry) => {
                state.entries.insert(key.clone(), entry);
                Ok(())
            }
            Err(reason) => {
                state.stood_down_streams.insert(key.1.clone());
                let mut stub =
                    JournalEntry::new(key.2.clone(), key.0.clone(), key.1.clone(), instrument);
                stub.entry_submitted = true;
                state.entries.insert(key.clone(), stub);
                (self.emit)(ExecutionEvent::ExecutionJournalCorruption {
                    path: path.display().to_string(),
                    reason: reason.clone(),
                });
                Err(JournalError::Corrupt { path: path.display().to_string(), reason })
            }
        }
    }

    fn persist(&self, state: &mut State, key: &JKey) -> Result<(), JournalError> {
        let entry = state.entries.get(key).expect("entry must be loaded before persist");
        let path = self.path_for(&key.0, &key.1, &key.2);
        let body = serde_json::to_string_pretty(entry).expect("JournalEntry serializes infallibly");
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::write(&path, body).map_err(|e| {
            state.stood_down_streams.insert(key.1.clone());
            let reason = e.to_string();
            (self.emit)(ExecutionEvent::ExecutionJournalValidationFailed {
                intent_id: key.2.clone(),
                reason: reason.clone(),
            });
            JournalError::WriteFailed { path: path.display().to_string(), reason }
        })
    }

    fn reject_empty(date: &str, stream: &str) -> Result<(), JournalError> {
        if date.is_empty() || stream.is_empty() {
            return Err(JournalError::EmptyIdentity);
        }
        Ok(())
    }

    /// `true` if this intent has already been submitted (or is unreadable,
    /// in which case it is treated as submitted — fail-closed).
    pub fn is_intent_submitted(&self, intent_id: &str, date: &str, stream: &str) -> bool {
        if date.is_empty() || stream.is_empty() {
            return true;
        }
        let key = mk_key(date, stream, intent_id);
        let mut state = self.state.lock().expect("journal mutex poisoned");
        if self.ensure_loaded(&mut state, &key, "").is_err() {
            return true;
        }
        state.entries.get(&key).map(|e| e.entry_submitted || e.rejected).unwrap_or(false)
    }

    /// Atomically test-and-set the submission flag: returns `true` only to
    /// the one caller that wins the claim, `false` to every other
    /// concurrent caller for the same intent. `is_intent_submitted` followed
    /// by a separate `record_submission` call is two independently
    /// mutex-guarded operations and cannot make that guarantee under
    /// concurrent duplicate submission — this collapses them into one.
    pub fn try_claim_submission(&self, intent_id: &str, date: &str, stream: &str, instrument: &str) -> Result<bool, JournalError> {
        Self::reject_empty(date, stream)?;
        let key = mk_key(date, stream, intent_id);
        let mut state = self.state.lock().expect("journal mutex poisoned");
        self.ensure_loaded(&mut state, &key, instrument)?;
        let already_claimed = {
            let entry = state.entries.get(&key).expect("just loaded");
            entry.entry_submitted || entry.rejected
        };
        if already_claimed {
            return Ok(false);
        }
        {
            let entry = state.entries.get_mut(&key).expect("just loaded");
            entry.entry_submitted = true;
        }
        self.persist(&mut state, &key)?;
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn record_submission(
        &self,
        intent_id: &str,
        date: &str,
        stream: &str,
        instrument: &str,
        order_type: &str,
        broker_order_id: &str,
        expected_entry_price: Option<Px>,
        utc: DateTime<Utc>,
    ) -> Result<(), JournalError> {
        Self::reject_empty(date, stream)?;
        let key = mk_key(date, stream, intent_id);
        let mut state = self.state.lock().expect("journal mutex poisoned");
        self.ensure_loaded(&mut state, &key, instrument)?;
        {
            let entry = state.entries.get_mut(&key).expect("just loaded");
            entry.entry_submitted = true;
            entry.entry_submitted_at = Some(utc);
            entry.broker_order_id = Some(broker_order_id.to_string());
            entry.entry_order_type = Some(order_type.to_string());
            entry.expected_entry_price = expected_entry_price;
        }
        self.persist(&mut state, &key)?;
        self.summary.bump_order_submitted();
        (self.emit)(ExecutionEvent::OrderSubmitSuccess {
            intent_id: intent_id.to_string(),
            broker_order_id: broker_order_id.to_string(),
        });
        Ok(())
    }

    pub fn record_rejection(
        &self,
        intent_id: &str,
        date: &str,
        stream: &str,
        instrument: &str,
        reason: &str,
        utc: DateTime<Utc>,
    ) -> Result<(), JournalError> {
        Self::reject_empty(date, stream)?;
        let key = mk_key(date, stream, intent_id);
        let mut state = self.state.lock().expect("journal mutex poisoned");
        self.ensure_loaded(&mut state, &key, instrument)?;
        {
            let entry = state.entries.get_mut(&key).expect("just loaded");
            entry.rejected = true;
            entry.rejected_at = Some(utc);
            entry.rejection_reason = Some(reason.to_string());
        }
        self.persist(&mut state, &key)?;
        self.summary.bump_order_rejected();
        (self.emit)(ExecutionEvent::OrderRejected { intent_id: intent_id.to_string(), reason: reason.to_string() });
        Ok(())
    }

    /// Accumulate a **delta** entry fill. Protective quantities are always
    /// sized from the returned `cumulative_qty`, never the delta, so a
    /// stop/target always covers the whole filled position.
    #[allow(clippy::too_many_arguments)]
    pub fn record_entry_fill(
        &self,
        intent_id: &str,
        date: &str,
        stream: &str,
        fill_price: Px,
        delta_qty: i64,
        utc: DateTime<Utc>,
        contract_multiplier: i64,
        direction: Direction,
        execution_instrument: &str,
        canonical_instrument: &str,
    ) -> Result<EntryFillOutcome, JournalError> {
        Self::reject_empty(date, stream)?;
        let key = mk_key(date, stream, intent_id);
        let mut state = self.state.lock().expect("journal mutex poisoned");
        self.ensure_loaded(&mut state, &key, execution_instrument)?;

        if let Some(existing) = state.entries.get(&key).and_then(|e| e.direction) {
            if existing != direction {
                state.stood_down_streams.insert(stream.to_string());
                (self.emit)(ExecutionEvent::ExecutionJournalInvariantViolation {
                    intent_id: intent_id.to_string(),
                    reason: format!("direction changed from {existing} to {direction}"),
                });
                return Err(JournalError::InvariantViolation {
                    reason: format!("direction changed from {existing} to {direction}"),
                });
            }
        }
        if let Some(existing) = state.entries.get(&key).and_then(|e| e.contract_multiplier) {
            if existing != contract_multiplier {
                state.stood_down_streams.insert(stream.to_string());
                (self.emit)(ExecutionEvent::ExecutionJournalInvariantViolation {
                    intent_id: intent_id.to_string(),
                    reason: format!("contract_multiplier changed from {existing} to {contract_multiplier}"),
                });
                return Err(JournalError::InvariantViolation {
                    reason: format!("contract_multiplier changed from {existing} to {contract_multiplier}"),
                });
            }
        }
        if delta_qty < 0 {
            state.stood_down_streams.insert(stream.to_string());
            return Err(JournalError::InvariantViolation {
                reason: "entry_filled_qty_total must be non-decreasing".to_string(),
            });
        }

        let mut slippage_detected: Option<Px> = None;
        {
            let entry = state.entries.get_mut(&key).expect("just loaded");
            let _ = canonical_instrument; // identity is keyed by execution_instrument on disk; canonical kept for callers.

            if delta_qty > 0 {
                let delta_notional = Px::from_hundredths(fill_price.hundredths() * delta_qty);
                entry.entry_filled_qty_total += delta_qty;
                entry.entry_fill_notional = entry
                    .entry_fill_notional
                    .checked_add(delta_notional)
                    .unwrap_or(entry.entry_fill_notional);

                if entry.direction.is_none() {
                    entry.direction = Some(direction);
                }
                if entry.contract_multiplier.is_none() {
                    entry.contract_multiplier = Some(contract_multiplier);
                }
                if entry.entry_filled_at_utc.is_none() {
                    entry.entry_filled_at_utc = Some(utc);
                }

                if let Some(expected) = entry.expected_entry_price {
                    let slip_points = match direction {
                        Direction::Long => fill_price.checked_sub(expected).unwrap_or(Px::ZERO),
                        Direction::Short => expected.checked_sub(fill_price).unwrap_or(Px::ZERO),
                    };
                    let slip_dollars = Px::from_hundredths(slip_points.hundredths() * delta_qty * contract_multiplier);
                    entry.slippage_points = Some(
                        entry.slippage_points.unwrap_or(Px::ZERO).checked_add(slip_points).unwrap_or(slip_points),
                    );
                    entry.slippage_dollars = Some(
                        entry.slippage_dollars.unwrap_or(Px::ZERO).checked_add(slip_dollars).unwrap_or(slip_dollars),
                    );
                    if !slip_points.is_zero() {
                        slippage_detected = Some(entry.slippage_points.expect("just set above"));
                    }
                }
            }
        }

        self.persist(&mut state, &key)?;
        let entry = state.entries.get(&key).expect("just persisted");
        let outcome = EntryFillOutcome {
            cumulative_qty: entry.entry_filled_qty_total,
            entry_avg_price: entry.entry_avg_fill_price().unwrap_or(Px::ZERO),
        };
        drop(state);

        self.summary.bump_order_filled();
        (self.emit)(ExecutionEvent::ExecutionPartialFill {
            intent_id: intent_id.to_string(),
            cumulative_qty: outcome.cumulative_qty,
        });
        if let Some(slippage_points) = slippage_detected {
            (self.emit)(ExecutionEvent::ExecutionSlippageDetected {
                intent_id: intent_id.to_string(),
                slippage_points: slippage_points.canonical(),
            });
        }
        Ok(outcome)
    }

    /// Accumulate a **delta** exit fill. Completion (P&L computation) is
    /// detected here, not by the caller.
    pub fn record_exit_fill(
        &self,
        intent_id: &str,
        date: &str,
        stream: &str,
        exit_price: Px,
        delta_qty: i64,
        exit_order_type: &str,
        utc: DateTime<Utc>,
    ) -> Result<ExitFillOutcome, JournalError> {
        Self::reject_empty(date, stream)?;
        let key = mk_key(date, stream, intent_id);
        let mut state = self.state.lock().expect("journal mutex poisoned");
        self.ensure_loaded(&mut state, &key, "")?;

        let (entry_qty_total, direction, contract_multiplier) = {
            let entry = state.entries.get(&key).expect("just loaded");
            (entry.entry_filled_qty_total, entry.direction, entry.contract_multiplier)
        };
        let (direction, contract_multiplier) = match (direction, contract_multiplier) {
            (Some(d), Some(m)) if entry_qty_total > 0 => (d, m),
            _ => {
                state.stood_down_streams.insert(stream.to_string());
                (self.emit)(ExecutionEvent::ExecutionJournalInvariantViolation {
                    intent_id: intent_id.to_string(),
                    reason: "exit fill with no prior entry fill".to_string(),
                });
                return Err(JournalError::InvariantViolation {
                    reason: "exit fill with no prior entry fill".to_string(),
                });
            }
        };

        let new_exit_total = {
            let entry = state.entries.get(&key).expect("just loaded");
            entry.exit_filled_qty_total + delta_qty.max(0)
        };
        if new_exit_total > entry_qty_total {
            state.stood_down_streams.insert(stream.to_string());
            (self.emit)(ExecutionEvent::ExecutionJournalOverfill {
                intent_id: intent_id.to_string(),
                entry_qty_total,
                attempted_exit_total: new_exit_total,
            });
            return Err(JournalError::Overfill { expected_max: entry_qty_total, attempted_total: new_exit_total });
        }

        {
            let entry = state.entries.get_mut(&key).expect("just loaded");
            if delta_qty > 0 {
                let delta_notional = Px::from_hundredths(exit_price.hundredths() * delta_qty);
                entry.exit_filled_qty_total += delta_qty;
                entry.exit_fill_notional =
                    entry.exit_fill_notional.checked_add(delta_notional).unwrap_or(entry.exit_fill_notional);
            }
            if entry.exit_order_type.is_none() {
                entry.exit_order_type = Some(exit_order_type.to_string());
                entry.exit_filled_at_utc = Some(utc);
            } else if entry.exit_order_type.as_deref() != Some(exit_order_type) {
                entry.completion_reason = Some("EMERGENCY_OVERRIDE".to_string());
            }
        }

        let outcome = {
            let entry = state.entries.get(&key).expect("just loaded");
            if entry.exit_filled_qty_total < entry_qty_total {
                ExitFillOutcome::Partial { cumulative_qty: entry.exit_filled_qty_total }
            } else {
                let entry_avg = entry.entry_avg_fill_price().unwrap_or(Px::ZERO);
                let exit_avg = entry.exit_avg_fill_price().unwrap_or(Px::ZERO);
                let points = match direction {
                    Direction::Long => exit_avg.checked_sub(entry_avg).unwrap_or(Px::ZERO),
                    Direction::Short => entry_avg.checked_sub(exit_avg).unwrap_or(Px::ZERO),
                };
                let gross = Px::from_hundredths(points.hundredths() * entry_qty_total * contract_multiplier);
                let mut costs = Px::ZERO;
                if let Some(s) = entry.slippage_dollars {
                    costs = costs.checked_add(s).unwrap_or(costs);
                }
                if let Some(c) = entry.commission {
                    costs = costs.checked_add(c).unwrap_or(costs);
                }
                if let Some(f) = entry.fees {
                    costs = costs.checked_add(f).unwrap_or(costs);
                }
                let net = gross.checked_sub(costs).unwrap_or(gross);
                let completion_reason =
                    entry.completion_reason.clone().unwrap_or_else(|| exit_order_type.to_string());
                ExitFillOutcome::Completed {
                    realized_pnl_points: points,
                    realized_pnl_gross: gross,
                    realized_pnl_net: net,
                    completion_reason,
                }
            }
        };

        if let ExitFillOutcome::Completed { realized_pnl_points, realized_pnl_gross, realized_pnl_net, ref completion_reason } = outcome {
            let entry = state.entries.get_mut(&key).expect("just loaded");
            entry.trade_completed = true;
            entry.realized_pnl_points = Some(realized_pnl_points);
            entry.realized_pnl_gross = Some(realized_pnl_gross);
            entry.realized_pnl_net = Some(realized_pnl_net);
            entry.completion_reason = Some(completion_reason.clone());
            entry.completed_at_utc = Some(utc);
        }

        self.persist(&mut state, &key)?;
        drop(state);

        self.summary.bump_order_filled();
        match &outcome {
            ExitFillOutcome::Partial { cumulative_qty } => {
                (self.emit)(ExecutionEvent::ExecutionPartialFill {
                    intent_id: intent_id.to_string(),
                    cumulative_qty: *cumulative_qty,
                });
            }
            ExitFillOutcome::Completed { realized_pnl_net, completion_reason, .. } => {
                self.summary.bump_intent_executed();
                (self.emit)(ExecutionEvent::TradeCompleted {
                    intent_id: intent_id.to_string(),
                    realized_pnl_net: realized_pnl_net.canonical(),
                    completion_reason: completion_reason.clone(),
                });
            }
        }
        Ok(outcome)
    }

    pub fn record_be_modification(
        &self,
        intent_id: &str,
        date: &str,
        stream: &str,
        new_stop_price: Px,
        utc: DateTime<Utc>,
    ) -> Result<(), JournalError> {
        Self::reject_empty(date, stream)?;
        let key = mk_key(date, stream, intent_id);
        let mut state = self.state.lock().expect("journal mutex poisoned");
        self.ensure_loaded(&mut state, &key, "")?;
        {
            let entry = state.entries.get_mut(&key).expect("just loaded");
            entry.be_modified = true;
            entry.be_modified_at = Some(utc);
            entry.be_stop_price = Some(new_stop_price);
        }
        self.persist(&mut state, &key)?;
        (self.emit)(ExecutionEvent::BreakEvenTriggered {
            intent_id: intent_id.to_string(),
            new_stop_price: new_stop_price.canonical(),
        });
        Ok(())
    }

    pub fn is_be_modified(&self, intent_id: &str, date: &str, stream: &str) -> bool {
        if date.is_empty() || stream.is_empty() {
            return true;
        }
        let key = mk_key(date, stream, intent_id);
        let mut state = self.state.lock().expect("journal mutex poisoned");
        if self.ensure_loaded(&mut state, &key, "").is_err() {
            return true;
        }
        state.entries.get(&key).map(|e| e.be_modified).unwrap_or(false)
    }

    /// Scans `{date}_{stream}_*.json` on disk, skipping unparseable files,
    /// returning `true` if any entry has at least one entry fill.
    pub fn has_entry_fill_for_stream(&self, date: &str, stream: &str) -> bool {
        self.scan_stream(date, stream, |e| e.entry_filled_qty_total > 0)
    }

    /// Same scan, but for a completed trade.
    pub fn has_completed_trade_for_stream(&self, date: &str, stream: &str) -> bool {
        self.scan_stream(date, stream, |e| e.trade_completed)
    }

    fn scan_stream(&self, date: &str, stream: &str, predicate: impl Fn(&JournalEntry) -> bool) -> bool {
        let prefix = format!("{date}_{stream}_");
        let Ok(read_dir) = std::fs::read_dir(&self.root) else {
            return false;
        };
        for entry in read_dir.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(&prefix) || !name.ends_with(".json") {
                continue;
            }
            let Ok(body) = std::fs::read_to_string(entry.path()) else { continue };
            let Ok(parsed) = serde_json::from_str::<JournalEntry>(&body) else { continue };
            if predicate(&parsed) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn journal() -> (tempfile::TempDir, ExecutionJournal<impl Fn(ExecutionEvent)>) {
        let dir = tempfile::tempdir().unwrap();
        let events: StdMutex<Vec<ExecutionEvent>> = StdMutex::new(Vec::new());
        let j = ExecutionJournal::new(dir.path(), move |e| events.lock().unwrap().push(e));
        (dir, j)
    }

    fn journal_with_events() -> (tempfile::TempDir, ExecutionJournal<impl Fn(ExecutionEvent)>, Arc<StdMutex<Vec<ExecutionEvent>>>) {
        let dir = tempfile::tempdir().unwrap();
        let events = Arc::new(StdMutex::new(Vec::new()));
        let recorded = events.clone();
        let j = ExecutionJournal::new(dir.path(), move |e| recorded.lock().unwrap().push(e));
        (dir, j, events)
    }

    fn now() -> DateTime<Utc> {
        "2024-05-10T14:31:00Z".parse().unwrap()
    }

    #[test]
    fn submission_then_is_submitted() {
        let (_dir, j) = journal();
        assert!(!j.is_intent_submitted("abc123", "2024-05-10", "ES1"));
        j.record_submission("abc123", "2024-05-10", "ES1", "MES", "Market", "bo-1", None, now()).unwrap();
        assert!(j.is_intent_submitted("abc123", "2024-05-10", "ES1"));
    }

    #[test]
    fn clean_long_trade_computes_expected_pnl() {
        let (_dir, j) = journal();
        j.record_submission("abc123", "2024-05-10", "ES1", "MES", "Market", "bo-1", Some(Px::from_f64(5000.0).unwrap()), now()).unwrap();
        let fill = j
            .record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 2, now(), 5, Direction::Long, "MES", "ES")
            .unwrap();
        assert_eq!(fill.cumulative_qty, 2);

        let outcome = j
            .record_exit_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5020.0).unwrap(), 2, "TARGET", now())
            .unwrap();
        match outcome {
            ExitFillOutcome::Completed { realized_pnl_points, realized_pnl_gross, completion_reason, .. } => {
                assert_eq!(realized_pnl_points.canonical(), "20.00");
                assert_eq!(realized_pnl_gross.canonical(), "200.00");
                assert_eq!(completion_reason, "TARGET");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn entry_fill_with_slippage_emits_slippage_detected() {
        let (_dir, j, events) = journal_with_events();
        j.record_submission("abc123", "2024-05-10", "ES1", "MES", "Market", "bo-1", Some(Px::from_f64(5000.0).unwrap()), now()).unwrap();
        j.record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.50).unwrap(), 2, now(), 5, Direction::Long, "MES", "ES").unwrap();

        let recorded = events.lock().unwrap();
        let slippage_event = recorded.iter().find(|e| e.name() == "EXECUTION_SLIPPAGE_DETECTED");
        match slippage_event {
            Some(ExecutionEvent::ExecutionSlippageDetected { intent_id, slippage_points }) => {
                assert_eq!(intent_id, "abc123");
                assert_eq!(slippage_points, "0.50");
            }
            other => panic!("expected ExecutionSlippageDetected, got {other:?}"),
        }
    }

    #[test]
    fn entry_fill_with_no_slippage_does_not_emit_event() {
        let (_dir, j, events) = journal_with_events();
        j.record_submission("abc123", "2024-05-10", "ES1", "MES", "Market", "bo-1", Some(Px::from_f64(5000.0).unwrap()), now()).unwrap();
        j.record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 2, now(), 5, Direction::Long, "MES", "ES").unwrap();

        let recorded = events.lock().unwrap();
        assert!(!recorded.iter().any(|e| e.name() == "EXECUTION_SLIPPAGE_DETECTED"));
    }

    #[test]
    fn partial_fill_then_stop_computes_weighted_average() {
        let (_dir, j) = journal();
        j.record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 1, now(), 5, Direction::Long, "MES", "ES").unwrap();
        let fill = j
            .record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5001.0).unwrap(), 1, now(), 5, Direction::Long, "MES", "ES")
            .unwrap();
        assert_eq!(fill.entry_avg_price.canonical(), "5000.50");

        let outcome = j
            .record_exit_fill("abc123", "2024-05-10", "ES1", Px::from_f64(4990.0).unwrap(), 2, "STOP", now())
            .unwrap();
        match outcome {
            ExitFillOutcome::Completed { realized_pnl_points, realized_pnl_gross, completion_reason, .. } => {
                assert_eq!(realized_pnl_points.canonical(), "-10.50");
                assert_eq!(realized_pnl_gross.canonical(), "-105.00");
                assert_eq!(completion_reason, "STOP");
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn overfill_stands_down_stream_and_blocks_completion() {
        let (_dir, j) = journal();
        j.record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 2, now(), 5, Direction::Long, "MES", "ES").unwrap();
        j.record_exit_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 1, "STOP", now()).unwrap();
        let err = j.record_exit_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 2, "STOP", now()).unwrap_err();
        assert!(matches!(err, JournalError::Overfill { .. }));
        assert!(j.is_stood_down("ES1"));
    }

    #[test]
    fn direction_change_mid_trade_is_invariant_violation() {
        let (_dir, j) = journal();
        j.record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 1, now(), 5, Direction::Long, "MES", "ES").unwrap();
        let err = j
            .record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5001.0).unwrap(), 1, now(), 5, Direction::Short, "MES", "ES")
            .unwrap_err();
        assert!(matches!(err, JournalError::InvariantViolation { .. }));
        assert!(j.is_stood_down("ES1"));
    }

    #[test]
    fn corrupt_entry_stands_down_and_is_treated_as_submitted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2024-05-10_ES1_abc123.json");
        std::fs::write(&path, "{not valid json").unwrap();
        let j = ExecutionJournal::new(dir.path(), |_e| {});

        assert!(j.is_intent_submitted("abc123", "2024-05-10", "ES1"));
        assert!(j.is_stood_down("ES1"));
    }

    #[test]
    fn empty_identity_is_rejected_uniformly() {
        let (_dir, j) = journal();
        let err = j.record_submission("abc123", "", "ES1", "MES", "Market", "bo-1", None, now()).unwrap_err();
        assert_eq!(err, JournalError::EmptyIdentity);
        let err = j.record_rejection("abc123", "2024-05-10", "", "MES", "no reason", now()).unwrap_err();
        assert_eq!(err, JournalError::EmptyIdentity);
    }

    #[test]
    fn zero_delta_entry_fill_does_not_change_cumulative() {
        let (_dir, j) = journal();
        j.record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 2, now(), 5, Direction::Long, "MES", "ES").unwrap();
        let fill = j
            .record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 0, now(), 5, Direction::Long, "MES", "ES")
            .unwrap();
        assert_eq!(fill.cumulative_qty, 2);
    }

    #[test]
    fn try_claim_submission_wins_exactly_once() {
        let (_dir, j) = journal();
        assert!(j.try_claim_submission("abc123", "2024-05-10", "ES1", "MES").unwrap());
        assert!(!j.try_claim_submission("abc123", "2024-05-10", "ES1", "MES").unwrap());
        assert!(j.is_intent_submitted("abc123", "2024-05-10", "ES1"));
    }

    #[test]
    fn has_entry_fill_for_stream_scans_disk() {
        let (_dir, j) = journal();
        assert!(!j.has_entry_fill_for_stream("2024-05-10", "ES1"));
        j.record_entry_fill("abc123", "2024-05-10", "ES1", Px::from_f64(5000.0).unwrap(), 1, now(), 5, Direction::Long, "MES", "ES").unwrap();
        assert!(j.has_entry_fill_for_stream("2024-05-10", "ES1"));
    }
}
