use crate::signal::{Condition, DerivableRef, Memo, ReactorOptions};
use crate::state::State;
use std::fmt;
use std::rc::Rc;

/// A gate computed from the wrapped source.
pub type ConditionFn<V> = Rc<dyn Fn(&DerivableRef<V>) -> Condition>;

/// A `from` / `until` / `when` option as supplied by the caller.
pub enum ConditionOption<V> {
    Ready(Condition),
    /// Called with the wrapped source. Converted into a memo once, when the
    /// wrapper is built.
    Function(ConditionFn<V>),
}

impl<V> Clone for ConditionOption<V> {
    fn clone(&self) -> Self {
        match self {
            ConditionOption::Ready(condition) => ConditionOption::Ready(condition.clone()),
            ConditionOption::Function(f) => ConditionOption::Function(Rc::clone(f)),
        }
    }
}

impl<V> fmt::Debug for ConditionOption<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionOption::Ready(condition) => f.debug_tuple("Ready").field(condition).finish(),
            ConditionOption::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Lifecycle options for a [`ControlFlow`](super::ControlFlow).
///
/// ```
/// use tincan_flow::{ControlFlowOptions, Signal};
///
/// let enabled = Signal::new(false);
/// let options: ControlFlowOptions<i32> = ControlFlowOptions::new()
///     .when(enabled)
///     .skip_first(true);
/// ```
pub struct ControlFlowOptions<V> {
    from: Option<ConditionOption<V>>,
    until: Option<ConditionOption<V>>,
    when: Option<ConditionOption<V>>,
    once: bool,
    skip_first: bool,
    include_unresolved: bool,
}

impl<V> Default for ControlFlowOptions<V> {
    fn default() -> Self {
        Self {
            from: None,
            until: None,
            when: None,
            once: false,
            skip_first: false,
            include_unresolved: false,
        }
    }
}

impl<V> Clone for ControlFlowOptions<V> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            until: self.until.clone(),
            when: self.when.clone(),
            once: self.once,
            skip_first: self.skip_first,
            include_unresolved: self.include_unresolved,
        }
    }
}

impl<V> fmt::Debug for ControlFlowOptions<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlFlowOptions")
            .field("from", &self.from)
            .field("until", &self.until)
            .field("when", &self.when)
            .field("once", &self.once)
            .field("skip_first", &self.skip_first)
            .field("include_unresolved", &self.include_unresolved)
            .finish()
    }
}

impl<V> ControlFlowOptions<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Become active once this is true. After that it is no longer observed.
    pub fn from(mut self, condition: impl Into<Condition>) -> Self {
        self.from = Some(ConditionOption::Ready(condition.into()));
        self
    }

    pub fn from_fn(mut self, f: impl Fn(&DerivableRef<V>) -> Condition + 'static) -> Self {
        self.from = Some(ConditionOption::Function(Rc::new(f)));
        self
    }

    /// Stop updating for good once this is true.
    pub fn until(mut self, condition: impl Into<Condition>) -> Self {
        self.until = Some(ConditionOption::Ready(condition.into()));
        self
    }

    pub fn until_fn(mut self, f: impl Fn(&DerivableRef<V>) -> Condition + 'static) -> Self {
        self.until = Some(ConditionOption::Function(Rc::new(f)));
        self
    }

    /// Update only while this is true.
    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.when = Some(ConditionOption::Ready(condition.into()));
        self
    }

    pub fn when_fn(mut self, f: impl Fn(&DerivableRef<V>) -> Condition + 'static) -> Self {
        self.when = Some(ConditionOption::Function(Rc::new(f)));
        self
    }

    /// Update only once, then stop for good.
    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    /// Ignore the first update.
    pub fn skip_first(mut self, skip_first: bool) -> Self {
        self.skip_first = skip_first;
        self
    }

    /// Treat a change to unresolved as an update.
    pub fn include_unresolved(mut self, include_unresolved: bool) -> Self {
        self.include_unresolved = include_unresolved;
        self
    }
}

/// Options after function-valued gates have been turned into derivables.
#[derive(Clone, Debug, Default)]
pub(crate) struct PreparedOptions {
    pub(crate) from: Option<Condition>,
    pub(crate) until: Option<Condition>,
    pub(crate) when: Option<Condition>,
    pub(crate) once: bool,
    pub(crate) skip_first: bool,
    pub(crate) include_unresolved: bool,
}

impl PreparedOptions {
    /// The gates the reactor applies itself. `once` and `skip_first` are
    /// handled by the wrapper's update handler.
    pub(crate) fn reactor_options(&self) -> ReactorOptions {
        ReactorOptions {
            from: self.from.clone(),
            until: self.until.clone(),
            when: self.when.clone(),
            once: false,
            skip_first: false,
        }
    }
}

pub(crate) fn prepare_options<V: 'static>(
    base: &DerivableRef<V>,
    options: ControlFlowOptions<V>,
) -> PreparedOptions {
    PreparedOptions {
        from: options.from.map(|o| prepare_condition(base, o)),
        until: options.until.map(|o| prepare_condition(base, o)),
        when: options.when.map(|o| prepare_condition(base, o)),
        once: options.once,
        skip_first: options.skip_first,
        include_unresolved: options.include_unresolved,
    }
}

fn prepare_condition<V: 'static>(base: &DerivableRef<V>, option: ConditionOption<V>) -> Condition {
    match option {
        ConditionOption::Ready(condition) => condition,
        ConditionOption::Function(f) => {
            let base = Rc::clone(base);
            Condition::derivable(Memo::from_state(move || f(&base).current()))
        }
    }
}

/// Whether the wrapper's cache can currently be trusted as live.
pub(crate) fn should_be_live(options: &PreparedOptions) -> bool {
    !options.skip_first
        && options.from.as_ref().map_or(true, |c| c.is(true))
        && options.until.as_ref().map_or(true, |c| c.current() == State::Resolved(false))
        && options.when.as_ref().map_or(true, |c| c.is(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{DerivableExt, Signal};
    use rstest::rstest;
    use std::cell::Cell;

    fn prepared(options: ControlFlowOptions<i32>) -> PreparedOptions {
        let base = Signal::new(0).into_derivable();
        prepare_options(&base, options)
    }

    #[rstest]
    #[case::no_options(ControlFlowOptions::new(), true)]
    #[case::skip_first(ControlFlowOptions::new().skip_first(true), false)]
    #[case::from_true(ControlFlowOptions::new().from(true), true)]
    #[case::from_false(ControlFlowOptions::new().from(false), false)]
    #[case::until_false(ControlFlowOptions::new().until(false), true)]
    #[case::until_true(ControlFlowOptions::new().until(true), false)]
    #[case::when_true(ControlFlowOptions::new().when(true), true)]
    #[case::when_false(ControlFlowOptions::new().when(false), false)]
    #[case::once_only(ControlFlowOptions::new().once(true), true)]
    #[case::all_open(ControlFlowOptions::new().from(true).until(false).when(true), true)]
    fn should_be_live_for_constant_options(
        #[case] options: ControlFlowOptions<i32>,
        #[case] expected: bool,
    ) {
        assert_eq!(should_be_live(&prepared(options)), expected);
    }

    #[test]
    fn unresolved_gates_are_not_live() {
        let gate: Signal<bool> = Signal::unresolved();
        assert!(!should_be_live(&prepared(ControlFlowOptions::new().until(gate.clone()))));
        assert!(!should_be_live(&prepared(ControlFlowOptions::new().when(gate.clone()))));

        gate.set(false);
        assert!(should_be_live(&prepared(ControlFlowOptions::new().until(gate))));
    }

    #[test]
    fn function_options_are_converted_once_and_evaluated_lazily() {
        let calls = Rc::new(Cell::new(0));
        let base = Signal::new(3);
        let options = ControlFlowOptions::new().when_fn({
            let calls = calls.clone();
            move |source: &DerivableRef<i32>| {
                calls.set(calls.get() + 1);
                Condition::from(source.value().is_some_and(|v| v > 2))
            }
        });

        let prepared = prepare_options(&base.clone().into_derivable(), options);
        assert_eq!(calls.get(), 0);

        assert!(should_be_live(&prepared));
        base.set(1);
        assert!(!should_be_live(&prepared));
        assert!(calls.get() >= 2);
    }

    #[test]
    fn function_options_unwrap_nested_derivables() {
        let gate = Signal::new(true);
        let base = Signal::new(0).into_derivable();
        let options = ControlFlowOptions::new().when_fn({
            let gate = gate.clone();
            move |_: &DerivableRef<i32>| Condition::from(gate.clone())
        });
        let prepared = prepare_options(&base, options);

        assert!(should_be_live(&prepared));
        gate.set(false);
        assert!(!should_be_live(&prepared));
    }

    #[test]
    fn reactor_options_leave_once_and_skip_first_to_the_wrapper() {
        let options = prepared(ControlFlowOptions::new().once(true).skip_first(true).when(true));
        let reactor = options.reactor_options();
        assert!(!reactor.once);
        assert!(!reactor.skip_first);
        assert!(reactor.when.is_some());
    }
}
