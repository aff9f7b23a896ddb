use super::derivable::Derivable;
use crate::runtime::{ChangeTarget, Observable, ObservableBase, ReactiveRuntime};
use crate::state::{ErrorValue, State};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A writable reactive value that notifies observers when it changes.
///
/// A signal can hold a value, an error, or nothing yet. Writing a state equal
/// to the current one is ignored.
pub struct Signal<V> {
    inner: Rc<SignalInner<V>>,
}

struct SignalInner<V> {
    node: ObservableBase,
    state: RefCell<State<V>>,
    version: Cell<u64>,
    runtime: Rc<ReactiveRuntime>,
}

impl<V> Clone for Signal<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + PartialEq + 'static> Signal<V> {
    /// Create a new signal with the given initial value.
    pub fn new(initial: V) -> Self {
        Self::with_state(State::Resolved(initial))
    }

    /// Create a signal that has no value yet.
    pub fn unresolved() -> Self {
        Self::with_state(State::Unresolved)
    }

    pub fn with_state(state: State<V>) -> Self {
        let runtime = ReactiveRuntime::current();
        Self {
            inner: Rc::new(SignalInner {
                node: ObservableBase::new(&runtime),
                state: RefCell::new(state),
                version: Cell::new(0),
                runtime,
            }),
        }
    }

    /// Set a new value for the signal.
    pub fn set(&self, value: V) {
        self.set_state(State::Resolved(value));
    }

    pub fn set_error(&self, error: ErrorValue) {
        self.set_state(State::Errored(error));
    }

    pub fn set_unresolved(&self) {
        self.set_state(State::Unresolved);
    }

    /// Replace the state, notifying observers if it differs.
    pub fn set_state(&self, state: State<V>) {
        let old_state = {
            let mut current = self.inner.state.borrow_mut();
            if *current == state {
                return;
            }
            std::mem::replace(&mut *current, state)
        };
        let version = self.inner.version.get();
        self.inner.version.set(version + 1);

        let target: Rc<dyn ChangeTarget<V>> = self.inner.clone();
        self.inner
            .runtime
            .process_changed_atom(target, old_state, version);
    }

    /// Update the value in place. Does nothing while the signal is not
    /// resolved.
    pub fn update(&self, f: impl FnOnce(&mut V)) {
        let current = self.inner.state.borrow().value().cloned();
        let Some(mut next) = current else {
            return;
        };
        f(&mut next);
        self.set(next);
    }

    /// Number of changes applied so far.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.inner.node.id()
    }
}

impl<V> Observable for SignalInner<V> {
    fn base(&self) -> &ObservableBase {
        &self.node
    }
}

impl<V> ChangeTarget<V> for SignalInner<V> {
    fn restore(&self, state: State<V>, version: u64) {
        *self.state.borrow_mut() = state;
        self.version.set(version);
    }
}

impl<V> Observable for Signal<V> {
    fn base(&self) -> &ObservableBase {
        &self.inner.node
    }

    fn connect(&self) {
        self.inner.connect()
    }

    fn disconnect(&self) {
        self.inner.disconnect()
    }
}

impl<V: Clone + 'static> Derivable<V> for Signal<V> {
    fn get_state(&self) -> State<V> {
        self.inner.runtime.record_observation(self.inner.clone());
        self.inner.state.borrow().clone()
    }
}

/// Create a new signal.
///
/// # Example
///
/// ```
/// use tincan_flow::{create_signal, DerivableExt};
///
/// let count = create_signal(0);
/// count.set(42);
/// assert_eq!(count.value(), Some(42));
/// ```
pub fn create_signal<V: Clone + PartialEq + 'static>(initial: V) -> Signal<V> {
    Signal::new(initial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::DerivableExt;

    #[test]
    fn signal_get_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.value(), Some(0));
        signal.set(42);
        assert_eq!(signal.value(), Some(42));
        assert_eq!(signal.version(), 1);
    }

    #[test]
    fn equal_writes_are_ignored() {
        let signal = Signal::new(7);
        signal.set(7);
        assert_eq!(signal.version(), 0);
    }

    #[test]
    fn update_closure_may_write_the_same_signal() {
        let signal = Signal::new(0);
        let writer = signal.clone();
        signal.update(move |n| {
            writer.set(100);
            *n += 1;
        });
        assert_eq!(signal.value(), Some(1));
        assert_eq!(signal.version(), 2);
    }

    #[test]
    fn signal_holds_every_state_kind() {
        let signal: Signal<i32> = Signal::unresolved();
        assert!(!signal.resolved());

        signal.set_error(ErrorValue::msg("nope"));
        assert!(signal.errored());
        assert_eq!(signal.error(), Some(ErrorValue::msg("nope")));

        signal.set(3);
        signal.update(|n| *n += 1);
        assert_eq!(signal.get().ok(), Some(4));

        signal.set_unresolved();
        signal.update(|n| *n += 1);
        assert!(signal.get().is_err_and(|e| e.is_unresolved()));
    }
}
