//! Fine-grained reactive primitives.
//!
//! This module provides the building blocks the gated derivables sit on:
//! - Signals: writable reactive state
//! - Memos: cached computed values
//! - Reactors: push-based delivery of changes, gated by lifecycle options

mod condition;
mod derivable;
mod memo;
mod reactor;
mod signal;

pub use condition::Condition;
pub use derivable::{Derivable, DerivableExt, DerivableRef};
pub use memo::{create_memo, Memo};
pub use reactor::{Reactor, ReactorOptions, Stopper, WatchGuard};
pub use signal::{create_signal, Signal};
