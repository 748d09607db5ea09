use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalError {
    /// trading_date or stream was empty.
    EmptyIdentity,
    /// The on-disk entry could not be parsed. The stream is stood down as
    /// a side effect of returning this error.
    Corrupt { path: String, reason: String },
    /// The entry could not be written to disk. The stream is stood down.
    WriteFailed { path: String, reason: String },
    /// direction or contract_multiplier would change mid-trade, or an
    /// exit was recorded with no prior entry. The stream is stood down.
    InvariantViolation { reason: String },
    /// exit_filled_qty_total would exceed entry_filled_qty_total. The
    /// stream is stood down.
    Overfill { expected_max: i64, attempted_total: i64 },
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JournalError::EmptyIdentity => write!(f, "trading_date and stream must not be empty"),
            JournalError::Corrupt { path, reason } => {
                write!(f, "journal entry at {path} is corrupt: {reason}")
            }
            JournalError::WriteFailed { path, reason } => {
                write!(f, "failed to persist journal entry at {path}: {reason}")
            }
            JournalError::InvariantViolation { reason } => {
                write!(f, "journal invariant violated: {reason}")
            }
            JournalError::Overfill { expected_max, attempted_total } => write!(
                f,
                "exit fill overfill: attempted total {attempted_total} exceeds entry total {expected_max}"
            ),
        }
    }
}

impl std::error::Error for JournalError {}
