use super::condition::Condition;
use super::derivable::Derivable;
use crate::runtime::{resubscribe, unsubscribe_all, Observable, Observer, ReactiveRuntime};
use crate::state::State;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::trace;

/// Lifecycle options applied by a reactor.
#[derive(Clone, Debug, Default)]
pub struct ReactorOptions {
    /// Deliver nothing until this becomes true; afterwards it is no longer
    /// observed.
    pub from: Option<Condition>,
    /// Stop permanently once this becomes true.
    pub until: Option<Condition>,
    /// Deliver only while this is true.
    pub when: Option<Condition>,
    /// Stop after the first delivery.
    pub once: bool,
    /// Skip the first delivery.
    pub skip_first: bool,
}

impl ReactorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, condition: impl Into<Condition>) -> Self {
        self.from = Some(condition.into());
        self
    }

    pub fn until(mut self, condition: impl Into<Condition>) -> Self {
        self.until = Some(condition.into());
        self
    }

    pub fn when(mut self, condition: impl Into<Condition>) -> Self {
        self.when = Some(condition.into());
        self
    }

    pub fn once(mut self, once: bool) -> Self {
        self.once = once;
        self
    }

    pub fn skip_first(mut self, skip_first: bool) -> Self {
        self.skip_first = skip_first;
        self
    }
}

trait Stoppable {
    fn stop(&self);
    fn is_stopped(&self) -> bool;
}

/// Handle that stops a reactor. Stopping is idempotent.
#[derive(Clone)]
pub struct Stopper {
    reactor: Rc<dyn Stoppable>,
}

impl Stopper {
    pub fn stop(&self) {
        self.reactor.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.reactor.is_stopped()
    }

    /// Tie the reactor's lifetime to the returned guard.
    pub fn into_guard(self) -> WatchGuard {
        WatchGuard { stopper: self }
    }
}

/// RAII guard for reactors: stops the reactor when dropped.
pub struct WatchGuard {
    stopper: Stopper,
}

impl WatchGuard {
    pub fn is_stopped(&self) -> bool {
        self.stopper.is_stopped()
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.stopper.stop();
    }
}

/// Drives push-based delivery of a derivable's changes to a callback.
///
/// A reactor only delivers resolved values and never delivers the same value
/// twice in a row. Its lifecycle is gated by [`ReactorOptions`]:
///
/// - `until` resolved to `true` stops the reactor for good; any state other
///   than `false` pauses it.
/// - `from` must resolve to `true` once before the first delivery.
/// - `when` must resolve to `true` for every delivery.
/// - `skip_first` swallows the first delivery, `once` stops after one.
pub struct Reactor;

impl Reactor {
    /// Start observing `source`.
    ///
    /// The reaction runs synchronously if the source already has a value and
    /// the options allow it. `on_stop` runs exactly once when the reactor
    /// stops, whatever the reason.
    pub fn create<S, D, F, C>(
        source: D,
        reaction: F,
        options: ReactorOptions,
        on_stop: C,
    ) -> Stopper
    where
        S: Clone + PartialEq + 'static,
        D: Derivable<S> + 'static,
        F: FnMut(S, &Stopper) + 'static,
        C: FnOnce() + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();
        let skip_first = options.skip_first;
        let reaction: Box<dyn FnMut(S, &Stopper)> = Box::new(reaction);
        let on_stop: Box<dyn FnOnce()> = Box::new(on_stop);
        let inner = Rc::new_cyclic(|this| ReactorInner {
            id,
            source: Box::new(source),
            reaction: RefCell::new(reaction),
            on_stop: RefCell::new(Some(on_stop)),
            options,
            from_passed: Cell::new(false),
            skip_first: Cell::new(skip_first),
            last: RefCell::new(None),
            deps: RefCell::new(Vec::new()),
            stopped: Cell::new(false),
            runtime: Rc::clone(&runtime),
            this: this.clone(),
        });
        trace!(reactor = id, "reactor started");

        runtime.batch(|| inner.run());
        Stopper { reactor: inner }
    }
}

enum Outcome<S> {
    Stop,
    Idle,
    Deliver(S),
}

struct ReactorInner<S> {
    id: usize,
    source: Box<dyn Derivable<S>>,
    reaction: RefCell<Box<dyn FnMut(S, &Stopper)>>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    options: ReactorOptions,
    from_passed: Cell<bool>,
    skip_first: Cell<bool>,
    last: RefCell<Option<S>>,
    deps: RefCell<Vec<Rc<dyn Observable>>>,
    stopped: Cell<bool>,
    runtime: Rc<ReactiveRuntime>,
    this: Weak<ReactorInner<S>>,
}

impl<S: Clone + PartialEq + 'static> ReactorInner<S> {
    fn evaluate(&self) -> Outcome<S> {
        if let Some(until) = &self.options.until {
            match until.current() {
                State::Resolved(true) => return Outcome::Stop,
                State::Resolved(false) => {}
                _ => return Outcome::Idle,
            }
        }
        if !self.from_passed.get() {
            if let Some(from) = &self.options.from {
                if !from.is(true) {
                    return Outcome::Idle;
                }
            }
            self.from_passed.set(true);
        }
        if let Some(when) = &self.options.when {
            if !when.is(true) {
                return Outcome::Idle;
            }
        }
        match self.source.get_state() {
            State::Resolved(value) => Outcome::Deliver(value),
            _ => Outcome::Idle,
        }
    }

    fn run(&self) {
        if self.stopped.get() {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };

        let (outcome, reads) = self.runtime.track(|| self.evaluate());
        let value = match outcome {
            Outcome::Stop => {
                self.stop();
                return;
            }
            Outcome::Idle => None,
            Outcome::Deliver(value) => Some(value),
        };

        let old = self.deps.replace(reads.clone());
        resubscribe(this.clone(), old, &reads);
        if self.stopped.get() {
            return;
        }

        let Some(value) = value else {
            return;
        };
        {
            let mut last = self.last.borrow_mut();
            if last.as_ref() == Some(&value) {
                return;
            }
            *last = Some(value.clone());
        }
        if self.skip_first.replace(false) {
            trace!(reactor = self.id, "skipped first delivery");
            return;
        }

        let stopper = Stopper { reactor: this };
        {
            let mut reaction = self.reaction.borrow_mut();
            (*reaction)(value, &stopper);
        }
        if self.options.once {
            self.stop();
        }
    }
}

impl<S: Clone + PartialEq + 'static> Stoppable for ReactorInner<S> {
    fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        trace!(reactor = self.id, "reactor stopped");
        unsubscribe_all(self.id, self.deps.take());
        let on_stop = self.on_stop.borrow_mut().take();
        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl<S: Clone + PartialEq + 'static> Observer for ReactorInner<S> {
    fn observer_id(&self) -> usize {
        self.id
    }

    fn invalidate(&self, runtime: &ReactiveRuntime) {
        if self.stopped.get() {
            return;
        }
        if let Some(this) = self.this.upgrade() {
            runtime.schedule(this);
        }
    }

    fn react(&self) {
        self.run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{DerivableExt, Signal};

    fn recorder<V: 'static>() -> (Rc<RefCell<Vec<V>>>, impl FnMut(V, &Stopper) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |value, _: &Stopper| sink.borrow_mut().push(value))
    }

    #[test]
    fn reacts_immediately_and_on_change() {
        let source = Signal::new(1);
        let (seen, reaction) = recorder();
        let stopper = source.react(reaction, ReactorOptions::new());

        source.set(2);
        source.set(2);
        source.set(3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);

        stopper.stop();
        source.set(4);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
        assert!(!source.connected());
    }

    #[test]
    fn unresolved_values_are_not_delivered() {
        let source: Signal<i32> = Signal::unresolved();
        let (seen, reaction) = recorder();
        let _stopper = source.react(reaction, ReactorOptions::new());

        source.set(1);
        source.set_unresolved();
        source.set(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn until_stops_for_good_and_runs_on_stop_once() {
        let source = Signal::new(1);
        let until = Signal::new(false);
        let stops = Rc::new(Cell::new(0));
        let (seen, reaction) = recorder();

        let stopper = Reactor::create(
            source.clone(),
            reaction,
            ReactorOptions::new().until(until.clone()),
            {
                let stops = stops.clone();
                move || stops.set(stops.get() + 1)
            },
        );

        until.set(true);
        until.set(false);
        source.set(2);
        stopper.stop();

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(stops.get(), 1);
        assert!(stopper.is_stopped());
        assert!(!until.connected());
    }

    #[test]
    fn from_is_dropped_after_it_passes() {
        let source = Signal::new(1);
        let from = Signal::new(false);
        let (seen, reaction) = recorder();
        let _stopper = source.react(reaction, ReactorOptions::new().from(from.clone()));

        source.set(2);
        assert!(seen.borrow().is_empty());

        from.set(true);
        from.set(false);
        source.set(3);
        assert_eq!(*seen.borrow(), vec![2, 3]);
        assert!(!from.connected());
    }

    #[test]
    fn when_pauses_and_resumes_with_changed_values() {
        let source = Signal::new(1);
        let when = Signal::new(true);
        let (seen, reaction) = recorder();
        let _stopper = source.react(reaction, ReactorOptions::new().when(when.clone()));

        when.set(false);
        source.set(2);
        source.set(1);
        when.set(true);
        source.set(3);
        assert_eq!(*seen.borrow(), vec![1, 3]);
    }

    #[test]
    fn once_and_skip_first_combine() {
        let source = Signal::new(1);
        let (seen, reaction) = recorder();
        let stopper = source.react(
            reaction,
            ReactorOptions::new().skip_first(true).once(true),
        );

        source.set(2);
        source.set(3);
        assert_eq!(*seen.borrow(), vec![2]);
        assert!(stopper.is_stopped());
    }

    #[test]
    fn guard_reports_a_reactor_stopped_by_its_options() {
        let source = Signal::new(1);
        let guard = source
            .react(|_, _| {}, ReactorOptions::new().once(true))
            .into_guard();
        assert!(guard.is_stopped());
        assert!(!source.connected());
    }

    #[test]
    fn watch_guard_stops_on_drop() {
        let source = Signal::new(1);
        let guard = source.watch(|_| {});
        assert!(source.connected());
        assert!(!guard.is_stopped());
        drop(guard);
        assert!(!source.connected());
    }
}
