//! `ExecutionContext` pairs a canonical instrument/stream with the
//! execution instrument actually routed to the broker.

use std::fmt;

/// Raised when the execution symbol would leak into the canonical stream
/// identity (e.g. execution symbol "MES" appearing inside stream "MES1").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityLeakError {
    pub canonical_stream: String,
    pub execution_instrument: String,
}

impl fmt::Display for IdentityLeakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "execution instrument {:?} must not appear as a substring of canonical stream {:?}",
            self.execution_instrument, self.canonical_stream
        )
    }
}

impl std::error::Error for IdentityLeakError {}

/// Binds a canonical (logical) instrument/stream to the execution
/// (broker-routed) instrument actually traded.
///
/// `contract_multiplier` rides along here rather than on `Intent`: it is
/// static per-execution-instrument metadata (dollars per point per
/// contract), not a trade-plan field, and the journal needs it at fill
/// time independent of
/// whatever any one intent happened to specify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionContext {
    pub canonical_instrument: String,
    pub canonical_stream: String,
    pub execution_instrument: String,
    pub contract_multiplier: i64,
}

impl ExecutionContext {
    /// Construct a context, asserting the execution symbol does not
    /// appear as a substring of the canonical stream (prevents identity
    /// leaks between the logical and execution namespaces).
    pub fn new(
        canonical_instrument: impl Into<String>,
        canonical_stream: impl Into<String>,
        execution_instrument: impl Into<String>,
        contract_multiplier: i64,
    ) -> Result<Self, IdentityLeakError> {
        let canonical_instrument = canonical_instrument.into();
        let canonical_stream = canonical_stream.into();
        let execution_instrument = execution_instrument.into();

        if canonical_stream.contains(&execution_instrument) {
            return Err(IdentityLeakError {
                canonical_stream,
                execution_instrument,
            });
        }

        Ok(Self {
            canonical_instrument,
            canonical_stream,
            execution_instrument,
            contract_multiplier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_symbols_construct_cleanly() {
        let ctx = ExecutionContext::new("ES", "ES1", "MES", 5).unwrap();
        assert_eq!(ctx.execution_instrument, "MES");
        assert_eq!(ctx.contract_multiplier, 5);
    }

    #[test]
    fn execution_symbol_substring_of_stream_is_rejected() {
        let err = ExecutionContext::new("MES", "MES1", "MES", 5).unwrap_err();
        assert_eq!(err.execution_instrument, "MES");
    }
}
