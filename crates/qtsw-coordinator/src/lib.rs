//! Tracks remaining exposure *per intent*, validates exit submissions, and
//! invokes protective-failure handling.
//!
//! Holds a concurrent map `intent_id -> IntentExposure` behind a single
//! mutex; individual records are only ever mutated through the
//! coordinator's own methods, matching the Journal's guarded-operation
//! discipline.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use qtsw_schemas::Direction;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExposureState {
    Active,
    StandingDown,
    Closed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct IntentExposure {
    pub entry_filled_qty: i64,
    pub exit_filled_qty: i64,
    pub state: ExposureState,
    pub direction: Direction,
    pub instrument: String,
    pub stream: String,
}

impl IntentExposure {
    pub fn remaining(&self) -> i64 {
        self.entry_filled_qty - self.exit_filled_qty
    }
}

/// What the caller must do after `on_exit_fill` closes an intent out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitFillEffect {
    /// Exposure is not yet flat; nothing further to do.
    StillOpen,
    /// Exposure just reached zero: cancel any remaining working orders for
    /// this intent via the adapter.
    JustClosed,
}

pub struct InstrumentIntentCoordinator {
    exposures: Mutex<HashMap<String, IntentExposure>>,
}

impl Default for InstrumentIntentCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentIntentCoordinator {
    pub fn new() -> Self {
        Self { exposures: Mutex::new(HashMap::new()) }
    }

    /// Insert-or-update exposure on an entry fill. Moves the exposure to
    /// `Active` unless it is already `Closed` (a closed intent cannot be
    /// reopened by a late/duplicate entry callback).
    pub fn on_entry_fill(
        &self,
        intent_id: &str,
        qty: i64,
        stream: &str,
        instrument: &str,
        direction: Direction,
        _utc: DateTime<Utc>,
    ) {
        let mut map = self.exposures.lock().expect("coordinator mutex poisoned");
        let exposure = map.entry(intent_id.to_string()).or_insert_with(|| IntentExposure {
            entry_filled_qty: 0,
            exit_filled_qty: 0,
            state: ExposureState::Active,
            direction,
            instrument: instrument.to_string(),
            stream: stream.to_string(),
        });
        exposure.entry_filled_qty += qty;
        if exposure.state != ExposureState::Closed {
            exposure.state = ExposureState::Active;
        }
    }

    /// Accumulate an exit fill. Returns [`ExitFillEffect::JustClosed`] the
    /// moment remaining exposure reaches zero so the caller can cancel any
    /// still-working orders for this intent.
    pub fn on_exit_fill(&self, intent_id: &str, qty: i64, _utc: DateTime<Utc>) -> ExitFillEffect {
        let mut map = self.exposures.lock().expect("coordinator mutex poisoned");
        let Some(exposure) = map.get_mut(intent_id) else {
            return ExitFillEffect::StillOpen;
        };
        let was_closed = exposure.state == ExposureState::Closed;
        exposure.exit_filled_qty += qty;
        if exposure.remaining() <= 0 && !was_closed {
            exposure.state = ExposureState::Closed;
            return ExitFillEffect::JustClosed;
        }
        ExitFillEffect::StillOpen
    }

    /// `false` if there is no exposure recorded, the exposure is not
    /// `Active`, or `qty` exceeds remaining exposure.
    pub fn can_submit_exit(&self, intent_id: &str, qty: i64) -> bool {
        let map = self.exposures.lock().expect("coordinator mutex poisoned");
        match map.get(intent_id) {
            Some(e) => e.state == ExposureState::Active && qty <= e.remaining(),
            None => false,
        }
    }

    /// Mark an intent as standing down after a protective-order failure.
    /// Returns the exposure's instrument/stream so the caller can drive
    /// per-intent then instrument-wide flatten.
    pub fn on_protective_failure(&self, intent_id: &str, _utc: DateTime<Utc>) -> Option<(String, String)> {
        let mut map = self.exposures.lock().expect("coordinator mutex poisoned");
        let exposure = map.get_mut(intent_id)?;
        exposure.state = ExposureState::StandingDown;
        Some((exposure.instrument.clone(), exposure.stream.clone()))
    }

    pub fn exposure(&self, intent_id: &str) -> Option<IntentExposure> {
        self.exposures.lock().expect("coordinator mutex poisoned").get(intent_id).cloned()
    }
}
