//! The three possible outcomes of evaluating a derivable.
//!
//! - `State<V>`: resolved value, errored, or unresolved
//! - `ErrorValue`: an error wrapped as a comparable value
//! - `StateObject<V>`: the materialized form handed to reactors

mod state;
mod state_object;

pub use state::{ErrorValue, State};
pub use state_object::{dematerialize, from_state_object, materialize, StateObject};
