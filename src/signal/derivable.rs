use super::memo::Memo;
use super::reactor::{Reactor, ReactorOptions, Stopper, WatchGuard};
use crate::control_flow::{ControlFlow, ControlFlowOptions};
use crate::error::ReactiveError;
use crate::runtime::Observable;
use crate::state::{materialize, ErrorValue, State, StateObject};
use std::rc::Rc;

/// A value cell with a pull-based state query.
///
/// Reading the state through [`Derivable::get_state`] records the read with
/// the current runtime, so memos and reactors that read a derivable are
/// notified when it changes.
pub trait Derivable<V>: Observable {
    fn get_state(&self) -> State<V>;
}

/// A shared, type-erased derivable.
pub type DerivableRef<V> = Rc<dyn Derivable<V>>;

impl<V, D: Derivable<V> + ?Sized> Derivable<V> for Rc<D> {
    fn get_state(&self) -> State<V> {
        (**self).get_state()
    }
}

/// Convenience methods available on every clonable derivable.
pub trait DerivableExt<V>: Derivable<V> + Clone + Sized + 'static
where
    V: Clone + PartialEq + 'static,
{
    /// The current value, or why there is none.
    fn get(&self) -> Result<V, ReactiveError> {
        self.get_state().into_result()
    }

    /// The current value, if resolved.
    fn value(&self) -> Option<V> {
        match self.get_state() {
            State::Resolved(value) => Some(value),
            _ => None,
        }
    }

    fn resolved(&self) -> bool {
        self.get_state().is_resolved()
    }

    fn errored(&self) -> bool {
        self.get_state().is_errored()
    }

    fn error(&self) -> Option<ErrorValue> {
        match self.get_state() {
            State::Errored(error) => Some(error),
            _ => None,
        }
    }

    /// Whether anything currently observes this derivable.
    fn connected(&self) -> bool {
        self.base().connected()
    }

    /// Derive a new value from this one. Errors and unresolved states pass
    /// through unchanged.
    fn map<U, F>(&self, f: F) -> Memo<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(V) -> U + 'static,
    {
        let source = self.clone();
        Memo::from_state(move || source.get_state().map(&f))
    }

    /// See [`materialize`].
    fn materialize(&self) -> Memo<StateObject<V>> {
        materialize(self.clone())
    }

    /// Start a reactor on this derivable.
    fn react<F>(&self, reaction: F, options: ReactorOptions) -> Stopper
    where
        F: FnMut(V, &Stopper) + 'static,
    {
        Reactor::create(self.clone(), reaction, options, || {})
    }

    /// Call `callback` with the current value and again on every change,
    /// until the returned guard is dropped.
    fn watch<F>(&self, mut callback: F) -> WatchGuard
    where
        F: FnMut(V) + 'static,
    {
        self.react(move |value, _| callback(value), ReactorOptions::default())
            .into_guard()
    }

    /// Gate this derivable with lifecycle options. See [`ControlFlow`].
    fn control_flow(&self, options: ControlFlowOptions<V>) -> ControlFlow<V> {
        ControlFlow::new(self.clone(), options)
    }

    /// Erase the concrete type.
    fn into_derivable(self) -> DerivableRef<V> {
        Rc::new(self)
    }
}

impl<V, D> DerivableExt<V> for D
where
    D: Derivable<V> + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
}
