use super::derivable::{Derivable, DerivableRef};
use super::memo::Memo;
use super::signal::Signal;
use crate::runtime::Observable;
use crate::state::State;
use std::fmt;
use std::rc::Rc;

/// A boolean gate: either a constant or a boolean derivable.
#[derive(Clone)]
pub enum Condition {
    Constant(bool),
    Derivable(DerivableRef<bool>),
}

impl Condition {
    pub fn derivable(source: impl Derivable<bool> + 'static) -> Self {
        Condition::Derivable(Rc::new(source))
    }

    /// The current state of the gate. Reading a derivable gate is tracked.
    pub fn current(&self) -> State<bool> {
        match self {
            Condition::Constant(value) => State::Resolved(*value),
            Condition::Derivable(source) => source.get_state(),
        }
    }

    /// Whether the gate currently resolves to exactly `expected`.
    pub fn is(&self, expected: bool) -> bool {
        self.current() == State::Resolved(expected)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Condition::Derivable(source) => f
                .debug_tuple("Derivable")
                .field(&source.base().id())
                .finish(),
        }
    }
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        Condition::Constant(value)
    }
}

impl From<Signal<bool>> for Condition {
    fn from(source: Signal<bool>) -> Self {
        Condition::derivable(source)
    }
}

impl From<Memo<bool>> for Condition {
    fn from(source: Memo<bool>) -> Self {
        Condition::derivable(source)
    }
}

impl From<DerivableRef<bool>> for Condition {
    fn from(source: DerivableRef<bool>) -> Self {
        Condition::Derivable(source)
    }
}
