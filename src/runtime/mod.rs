//! Runtime support for reactive primitives.
//!
//! This module provides the infrastructure for dependency tracking,
//! connection bookkeeping, transactions and reactor scheduling.

mod context;
mod node;

pub use context::{ReactiveRuntime, TransactionContext};
pub use node::{ChangeTarget, Observable, ObservableBase};

pub(crate) use node::{resubscribe, unsubscribe_all, Observer};
