use crate::error::ReactiveError;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// The current state of a derivable.
#[derive(Clone, Debug, PartialEq)]
pub enum State<V> {
    /// Evaluated to a value.
    Resolved(V),
    /// Evaluated to an error.
    Errored(ErrorValue),
    /// No value is available yet.
    Unresolved,
}

impl<V> Default for State<V> {
    fn default() -> Self {
        State::Unresolved
    }
}

impl<V> State<V> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, State::Resolved(_))
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, State::Errored(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, State::Unresolved)
    }

    /// Borrow the value, if resolved.
    pub fn value(&self) -> Option<&V> {
        match self {
            State::Resolved(value) => Some(value),
            _ => None,
        }
    }

    /// Borrow the error, if errored.
    pub fn error(&self) -> Option<&ErrorValue> {
        match self {
            State::Errored(error) => Some(error),
            _ => None,
        }
    }

    /// Transform the resolved value, keeping errors and unresolved as they are.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> State<U> {
        match self {
            State::Resolved(value) => State::Resolved(f(value)),
            State::Errored(error) => State::Errored(error),
            State::Unresolved => State::Unresolved,
        }
    }

    /// Convert into a `Result`, mapping errored and unresolved states to
    /// [`ReactiveError`].
    pub fn into_result(self) -> Result<V, ReactiveError> {
        match self {
            State::Resolved(value) => Ok(value),
            State::Errored(error) => Err(ReactiveError::Errored(error)),
            State::Unresolved => Err(ReactiveError::Unresolved),
        }
    }

    /// Inverse of [`State::into_result`]. Errors that are not already
    /// reactive states become errored states.
    pub fn from_result(result: Result<V, ReactiveError>) -> Self {
        match result {
            Ok(value) => State::Resolved(value),
            Err(ReactiveError::Unresolved) => State::Unresolved,
            Err(ReactiveError::Errored(error)) => State::Errored(error),
            Err(other) => State::Errored(ErrorValue::new(other)),
        }
    }
}

impl<V> From<V> for State<V> {
    fn from(value: V) -> Self {
        State::Resolved(value)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

/// An error held as a value inside a [`State`].
///
/// Two error values are equal when they share the same allocation or render
/// the same message, so re-raising an equivalent error does not count as a
/// change.
#[derive(Clone)]
pub struct ErrorValue(Arc<dyn Error + Send + Sync>);

impl ErrorValue {
    pub fn new(error: impl Error + Send + Sync + 'static) -> Self {
        Self(Arc::new(error))
    }

    /// Create an error value from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self::new(Message(message.to_string()))
    }

    /// Borrow the wrapped error.
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }

    /// Attempt to view the wrapped error as a concrete type.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl PartialEq for ErrorValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.to_string() == other.0.to_string()
    }
}

impl fmt::Debug for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorValue").field(&self.0.to_string()).finish()
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
