use super::{ErrorValue, State};
use crate::signal::{Derivable, Memo};

/// A [`State`] flattened into a single comparable value.
///
/// Reactors only deliver resolved values. Materializing a derivable wraps
/// every kind of state into a resolved `StateObject`, so a reactor on the
/// materialized derivable sees errors and unresolved states too.
#[derive(Clone, Debug, PartialEq)]
pub enum StateObject<V> {
    Value(V),
    Error(ErrorValue),
    Unresolved,
}

impl<V> StateObject<V> {
    /// True for values and errors, false only for unresolved.
    pub fn resolved(&self) -> bool {
        !matches!(self, StateObject::Unresolved)
    }

    pub fn errored(&self) -> bool {
        matches!(self, StateObject::Error(_))
    }
}

impl<V> From<State<V>> for StateObject<V> {
    fn from(state: State<V>) -> Self {
        match state {
            State::Resolved(value) => StateObject::Value(value),
            State::Errored(error) => StateObject::Error(error),
            State::Unresolved => StateObject::Unresolved,
        }
    }
}

/// Inverse of materialization.
pub fn from_state_object<V>(object: StateObject<V>) -> State<V> {
    match object {
        StateObject::Value(value) => State::Resolved(value),
        StateObject::Error(error) => State::Errored(error),
        StateObject::Unresolved => State::Unresolved,
    }
}

/// Map a derivable to one that is always resolved with a [`StateObject`]
/// describing the source's state.
pub fn materialize<V, D>(source: D) -> Memo<StateObject<V>>
where
    V: Clone + PartialEq + 'static,
    D: Derivable<V> + 'static,
{
    Memo::from_state(move || State::Resolved(StateObject::from(source.get_state())))
}

/// Turn a derivable of state objects back into a derivable of values.
pub fn dematerialize<V, D>(source: D) -> Memo<V>
where
    V: Clone + PartialEq + 'static,
    D: Derivable<StateObject<V>> + 'static,
{
    Memo::from_state(move || match source.get_state() {
        State::Resolved(object) => from_state_object(object),
        State::Errored(error) => State::Errored(error),
        State::Unresolved => State::Unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{DerivableExt, Signal};

    #[test]
    fn materialized_derivable_is_always_resolved() {
        let source: Signal<i32> = Signal::unresolved();
        let materialized = materialize(source.clone());

        assert_eq!(materialized.value(), Some(StateObject::Unresolved));

        source.set_error(ErrorValue::msg("bad"));
        let object = materialized.value();
        assert!(object.as_ref().is_some_and(|o| o.resolved() && o.errored()));

        source.set(3);
        assert_eq!(materialized.value(), Some(StateObject::Value(3)));
    }

    #[test]
    fn dematerialize_restores_the_source_state() {
        let source: Signal<i32> = Signal::new(1);
        let round = dematerialize(source.materialize());
        assert_eq!(round.get_state(), State::Resolved(1));

        source.set_error(ErrorValue::msg("bad"));
        assert_eq!(round.get_state(), State::Errored(ErrorValue::msg("bad")));

        source.set_unresolved();
        assert!(round.get_state().is_unresolved());
    }
}
