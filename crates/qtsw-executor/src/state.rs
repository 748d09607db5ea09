//! In-memory per-intent bookkeeping the executor needs while an intent is
//! live, tracked in concurrent maps keyed by intent id.

use chrono::{DateTime, Utc};

use qtsw_schemas::Intent;

#[derive(Clone, Debug)]
pub struct TrackedIntent {
    pub intent: Intent,
    pub stream: String,
    pub canonical_instrument: String,
    pub execution_instrument: String,
    pub contract_multiplier: i64,
    pub entry_filled_at: Option<DateTime<Utc>>,
    pub protected: bool,
    pub standing_down: bool,
}
