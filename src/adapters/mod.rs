//! Bridges from other sources of values into derivables.

mod future;

pub use future::from_future;
