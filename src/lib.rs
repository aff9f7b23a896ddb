//! # Tincan Flow
//!
//! Lifecycle-gated derivables on top of a fine-grained reactive runtime.
//!
//! ## Derivables (Low-level primitives)
//!
//! Reactive values that can be resolved, errored, or not resolved yet:
//! - `Signal<T>` - Writable values that notify dependents when changed
//! - `Memo<T>` - Computed values that automatically track dependencies
//! - `Reactor` - Push-based delivery of changes to a callback
//!
//! ## Control flow
//!
//! `ControlFlow<T>` wraps any derivable and decides when its changes are let
//! through:
//! - `from` - Start following the source once a condition becomes true
//! - `until` - Stop following the source for good once a condition is true
//! - `when` - Follow the source only while a condition is true
//! - `once` / `skip_first` - Take only the first update, or drop it
//!
//! ```
//! use tincan_flow::{ControlFlowOptions, DerivableExt, Signal};
//!
//! let temperature = Signal::new(20);
//! let first_reading = temperature.control_flow(ControlFlowOptions::new().once(true));
//! let _guard = first_reading.watch(|_| {});
//!
//! temperature.set(25);
//! assert_eq!(first_reading.value(), Some(20));
//! ```

pub mod adapters;
pub mod control_flow;
pub mod error;
pub mod runtime;
pub mod signal;
pub mod state;

use runtime::{ReactiveRuntime, TransactionContext};

// Re-export main types for convenience
pub use adapters::from_future;
pub use control_flow::{control_flow, ControlFlow, ControlFlowOptions};
pub use error::ReactiveError;
pub use signal::{
    create_memo, create_signal, Condition, Derivable, DerivableExt, DerivableRef, Memo, Reactor,
    ReactorOptions, Signal, Stopper, WatchGuard,
};
pub use state::{dematerialize, from_state_object, materialize, ErrorValue, State, StateObject};

/// Run `f` as one transaction on the current runtime.
///
/// Reads inside the transaction see its uncommitted changes. Reactors run
/// once, after the outermost transaction commits.
pub fn transaction<R>(f: impl FnOnce() -> R) -> R {
    ReactiveRuntime::current().transaction(f)
}

/// Run `f` as one transaction, rolling back its changes if it fails.
pub fn try_transaction<R, E>(f: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
    ReactiveRuntime::current().try_transaction(f)
}

/// Whether a transaction is open on the current runtime.
pub fn in_transaction() -> bool {
    ReactiveRuntime::current().in_transaction()
}
