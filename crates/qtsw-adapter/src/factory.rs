//! Mode-gated adapter construction.
//!
//! DRY-RUN and SIM are always available. LIVE is an explicit stub: selecting
//! it never silently falls back to a safer mode, and it never silently
//! succeeds either — it returns [`AdapterError::LiveNotImplemented`] until a
//! real brokerage binding exists. Fail-closed by construction, not by
//! runtime check.

use std::fmt;
use std::sync::Arc;

use crate::capability::{ExecutionAdapter, OrderCallbackSink};
use crate::dry_run::DryRunAdapter;
use crate::sim::{NotASimulationAccount, SimAdapter};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdapterMode {
    DryRun,
    Sim,
    Live,
}

impl fmt::Display for AdapterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdapterMode::DryRun => "DRYRUN",
            AdapterMode::Sim => "SIM",
            AdapterMode::Live => "LIVE",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub enum AdapterError {
    NotASimulationAccount(NotASimulationAccount),
    LiveNotImplemented,
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterError::NotASimulationAccount(e) => write!(f, "{e}"),
            AdapterError::LiveNotImplemented => {
                write!(f, "LIVE adapter mode is not implemented; refusing to construct a live brokerage binding")
            }
        }
    }
}

impl std::error::Error for AdapterError {}

pub struct AdapterFactory;

impl AdapterFactory {
    /// `is_sim_account` is only consulted for [`AdapterMode::Sim`]; it
    /// gates construction, not submission — a SIM adapter bound to the
    /// wrong account never comes into existence.
    pub fn build(
        mode: AdapterMode,
        account_id: &str,
        is_sim_account: impl Fn(&str) -> bool,
        callbacks: Arc<dyn OrderCallbackSink>,
    ) -> Result<Arc<dyn ExecutionAdapter>, AdapterError> {
        match mode {
            AdapterMode::DryRun => Ok(Arc::new(DryRunAdapter::new(callbacks))),
            AdapterMode::Sim => SimAdapter::verify_and_new(account_id, is_sim_account, callbacks)
                .map(|a| Arc::new(a) as Arc<dyn ExecutionAdapter>)
                .map_err(AdapterError::NotASimulationAccount),
            AdapterMode::Live => Err(AdapterError::LiveNotImplemented),
        }
    }
}
