//! Shared data model for the execution-lifecycle crates: intent identity,
//! fixed-point price representation, the execution-context binding, the
//! durable journal record, and the structured event taxonomy.

pub mod direction;
pub mod events;
pub mod execution_context;
pub mod intent;
pub mod journal_entry;
pub mod notification;
pub mod price;

pub use direction::{Direction, ParseDirectionError};
pub use events::{EventSink, ExecutionEvent, Severity};
pub use execution_context::{ExecutionContext, IdentityLeakError};
pub use intent::Intent;
pub use journal_entry::JournalEntry;
pub use notification::{NotificationSink, Priority};
pub use price::{Px, PxError};
