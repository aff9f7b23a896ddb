use super::derivable::Derivable;
use crate::error::ReactiveError;
use crate::runtime::{
    resubscribe, unsubscribe_all, Observable, ObservableBase, Observer, ReactiveRuntime,
};
use crate::state::State;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A computed value that automatically tracks the derivables it reads.
///
/// While nothing observes a memo every read recomputes it. Once connected,
/// the memo subscribes to the dependencies of its last computation and
/// serves reads from its cache until one of them changes.
pub struct Memo<V> {
    inner: Rc<MemoInner<V>>,
}

struct MemoInner<V> {
    node: ObservableBase,
    compute: Box<dyn Fn() -> State<V>>,
    // `None` while stale.
    cached: RefCell<Option<State<V>>>,
    deps: RefCell<Vec<Rc<dyn Observable>>>,
    runtime: Rc<ReactiveRuntime>,
    this: Weak<MemoInner<V>>,
}

impl<V> Clone for Memo<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + PartialEq + 'static> Memo<V> {
    /// Create a new memo with the given computation function.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> V + 'static,
    {
        Self::from_state(move || State::Resolved(compute()))
    }

    /// Create a memo from a fallible computation.
    ///
    /// Using `?` on [`get`](crate::DerivableExt::get) inside the closure makes
    /// the memo unresolved or errored whenever a dependency is.
    pub fn try_new<F>(compute: F) -> Self
    where
        F: Fn() -> Result<V, ReactiveError> + 'static,
    {
        Self::from_state(move || State::from_result(compute()))
    }

    /// Create a memo whose computation produces a full [`State`].
    pub fn from_state<F>(compute: F) -> Self
    where
        F: Fn() -> State<V> + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let inner = Rc::new_cyclic(|this| MemoInner {
            node: ObservableBase::new(&runtime),
            compute: Box::new(compute),
            cached: RefCell::new(None),
            deps: RefCell::new(Vec::new()),
            runtime,
            this: this.clone(),
        });
        Self { inner }
    }

    pub fn id(&self) -> usize {
        self.inner.node.id()
    }
}

impl<V: Clone + 'static> MemoInner<V> {
    fn current_state(&self) -> State<V> {
        if self.node.connected() {
            if let Some(state) = self.cached.borrow().clone() {
                return state;
            }
            return self.refresh();
        }
        let (state, _) = self.runtime.track(|| (self.compute)());
        state
    }

    /// Recompute, cache, and move subscriptions to the new dependencies.
    fn refresh(&self) -> State<V> {
        let (state, reads) = self.runtime.track(|| (self.compute)());
        // Cached before subscribing: an invalidation raised while a new
        // dependency connects must mark this memo stale again.
        *self.cached.borrow_mut() = Some(state.clone());
        let old = self.deps.replace(reads.clone());
        if let Some(this) = self.this.upgrade() {
            resubscribe(this, old, &reads);
        }
        state
    }
}

impl<V: Clone + 'static> Observable for MemoInner<V> {
    fn base(&self) -> &ObservableBase {
        &self.node
    }

    fn connect(&self) {
        self.node.mark_connected();
        self.refresh();
    }

    fn disconnect(&self) {
        self.node.mark_disconnected();
        self.cached.borrow_mut().take();
        unsubscribe_all(self.node.id(), self.deps.take());
    }
}

impl<V: Clone + 'static> Observer for MemoInner<V> {
    fn observer_id(&self) -> usize {
        self.node.id()
    }

    fn invalidate(&self, runtime: &ReactiveRuntime) {
        let was_fresh = self.cached.borrow_mut().take().is_some();
        if was_fresh {
            runtime.invalidate_observers(&self.node);
        }
    }
}

impl<V: Clone + 'static> Observable for Memo<V> {
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

impl<V: Clone + 'static> Derivable<V> for Memo<V> {
    fn get_state(&self) -> State<V> {
        self.inner.runtime.record_observation(self.inner.clone());
        self.inner.current_state()
    }
}

/// Create a new memoized computation.
///
/// # Example
///
/// ```
/// use tincan_flow::{create_memo, create_signal, DerivableExt};
///
/// let count = create_signal(5);
/// let doubled = create_memo({
///     let count = count.clone();
///     move || count.value().unwrap_or_default() * 2
/// });
/// assert_eq!(doubled.value(), Some(10));
/// ```
pub fn create_memo<V, F>(compute: F) -> Memo<V>
where
    V: Clone + PartialEq + 'static,
    F: Fn() -> V + 'static,
{
    Memo::new(compute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{DerivableExt, Signal};
    use std::cell::Cell;

    #[test]
    fn memo_basic() {
        let count = Signal::new(5);
        let doubled = count.map(|n| n * 2);

        assert_eq!(doubled.value(), Some(10));

        count.set(10);
        assert_eq!(doubled.value(), Some(20));
    }

    #[test]
    fn disconnected_memo_recomputes_on_every_read() {
        let runs = Rc::new(Cell::new(0));
        let memo = Memo::new({
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                1
            }
        });

        memo.value();
        memo.value();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn connected_memo_serves_cache_until_invalidated() {
        let source = Signal::new(1);
        let runs = Rc::new(Cell::new(0));
        let memo = Memo::new({
            let source = source.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                source.value().unwrap_or_default() + 1
            }
        });

        let _guard = memo.watch(|_| {});
        assert!(memo.connected());
        assert!(source.connected());
        let after_connect = runs.get();

        assert_eq!(memo.value(), Some(2));
        assert_eq!(runs.get(), after_connect);

        source.set(5);
        assert_eq!(memo.value(), Some(6));
    }

    #[test]
    fn try_new_propagates_unresolved_and_errors() {
        let source: Signal<i32> = Signal::unresolved();
        let plus_one = Memo::try_new({
            let source = source.clone();
            move || Ok(source.get()? + 1)
        });

        assert!(plus_one.get_state().is_unresolved());

        source.set_error(crate::ErrorValue::msg("broken"));
        assert!(plus_one.errored());

        source.set(1);
        assert_eq!(plus_one.value(), Some(2));
    }

    #[test]
    fn disconnect_releases_dependencies() {
        let source = Signal::new(1);
        let memo = source.map(|n| n + 1);

        let guard = memo.watch(|_| {});
        assert!(source.connected());

        drop(guard);
        assert!(!memo.connected());
        assert!(!source.connected());
    }
}
