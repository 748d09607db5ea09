pub mod capability;
pub mod codec;
pub mod dry_run;
pub mod factory;
pub mod sim;

pub use capability::{
    AccountSnapshot, ExecutionAdapter, OrderCallbackSink, OrderKind, OrderState, Position, SubmitOutcome, WorkingOrder,
};
pub use codec::{DecodedTag, OrderIdCodec, OrderLeg};
pub use dry_run::DryRunAdapter;
pub use factory::{AdapterError, AdapterFactory, AdapterMode};
pub use sim::{NotASimulationAccount, SimAdapter};
