use super::node::{ChangeTarget, Observable, ObservableBase, Observer};
use crate::state::State;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

/// Ids are unique per process so nodes created under different runtimes
/// never collide in an observer list.
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

type Rollback = Box<dyn FnOnce(&ReactiveRuntime)>;

/// Reads recorded while a computation runs.
enum TrackingFrame {
    Tracked(Vec<Rc<dyn Observable>>),
    Independent,
}

/// Answers whether a batched-mutation scope is currently open.
pub trait TransactionContext {
    fn in_transaction(&self) -> bool;
}

/// Single-threaded reactive runtime.
///
/// The runtime records which nodes a computation reads, holds the
/// transaction log, and runs scheduled reactors once the outermost
/// transaction or batch completes. Every node captures the runtime that was
/// current when it was created.
///
/// # Examples
///
/// Using the default runtime of the current thread:
///
/// ```
/// use tincan_flow::{DerivableExt, Signal};
///
/// let signal = Signal::new(42);
/// assert_eq!(signal.value(), Some(42));
/// ```
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use tincan_flow::runtime::ReactiveRuntime;
/// use tincan_flow::{DerivableExt, Signal};
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.value(), Some(0));
/// });
/// // Runtime and all its state is dropped here
/// ```
pub struct ReactiveRuntime {
    tracking: RefCell<Vec<TrackingFrame>>,
    transactions: RefCell<Vec<Vec<Rollback>>>,
    pending: RefCell<VecDeque<Rc<dyn Observer>>>,
    batch_depth: Cell<usize>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Rc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
    static DEFAULT_RUNTIME: Rc<ReactiveRuntime> = ReactiveRuntime::new();
}

/// Restores a depth counter when a scope ends, including by unwinding.
struct DepthGuard<'a>(&'a Cell<usize>);

impl<'a> DepthGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    pub fn new() -> Rc<Self> {
        Rc::new(ReactiveRuntime {
            tracking: RefCell::new(Vec::new()),
            transactions: RefCell::new(Vec::new()),
            pending: RefCell::new(VecDeque::new()),
            batch_depth: Cell::new(0),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// Nodes created inside the closure belong to that runtime; their
    /// transactions and scheduled reactors are independent from the
    /// thread's default runtime.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let runtime = Self::new();
        Self::with_runtime(runtime, f)
    }

    /// Get the current reactive runtime (scoped, or the thread's default).
    pub fn current() -> Rc<Self> {
        RUNTIME_STACK
            .with(|stack| stack.borrow().last().cloned())
            .unwrap_or_else(|| DEFAULT_RUNTIME.with(Rc::clone))
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// This pushes the runtime onto the thread-local stack for the duration
    /// of the function execution.
    pub fn with_runtime<F, R>(runtime: Rc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Generate the next unique ID for a reactive node.
    pub fn next_id(&self) -> usize {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// Register that the running computation read `node`.
    pub fn record_observation(&self, node: Rc<dyn Observable>) {
        let mut tracking = self.tracking.borrow_mut();
        if let Some(TrackingFrame::Tracked(reads)) = tracking.last_mut() {
            let id = node.base().id();
            if !reads.iter().any(|read| read.base().id() == id) {
                reads.push(node);
            }
        }
    }

    /// Run `f` in a fresh tracking frame, returning its result together with
    /// every node it read.
    pub fn track<R>(&self, f: impl FnOnce() -> R) -> (R, Vec<Rc<dyn Observable>>) {
        let frame = FrameGuard::push(self, TrackingFrame::Tracked(Vec::new()));
        let result = f();
        let reads = match frame.pop() {
            Some(TrackingFrame::Tracked(reads)) => reads,
            _ => Vec::new(),
        };
        (result, reads)
    }

    /// Run `f` without contributing its reads to the caller's dependencies.
    pub fn independent_tracking<R>(&self, f: impl FnOnce() -> R) -> R {
        let frame = FrameGuard::push(self, TrackingFrame::Independent);
        let result = f();
        drop(frame);
        result
    }

    /// Run `f` inside a transaction. Reactors scheduled by the changes it
    /// makes run once the outermost transaction commits.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.try_transaction(|| Ok::<R, std::convert::Infallible>(f())) {
            Ok(result) => result,
            Err(never) => match never {},
        }
    }

    /// Run `f` inside a transaction, rolling back every change it made when
    /// it returns `Err`.
    ///
    /// A panic inside `f` rolls back the same way before unwinding further.
    pub fn try_transaction<R, E>(&self, f: impl FnOnce() -> Result<R, E>) -> Result<R, E> {
        let frame = TransactionFrame::open(self);
        let result = f();
        let log = frame.close();
        match &result {
            Ok(_) => {
                if let Some(parent) = self.transactions.borrow_mut().last_mut() {
                    parent.extend(log);
                }
            }
            Err(_) => self.roll_back(log),
        }
        self.flush();
        result
    }

    fn roll_back(&self, log: Vec<Rollback>) {
        trace!(changes = log.len(), "rolling back transaction");
        for rollback in log.into_iter().rev() {
            rollback(self);
        }
    }

    /// Notify the runtime that `atom` changed from `old_state`.
    ///
    /// `version` is the atom's version before the change; inside a
    /// transaction it is kept so a rollback can restore both.
    pub fn process_changed_atom<V: 'static>(
        &self,
        atom: Rc<dyn ChangeTarget<V>>,
        old_state: State<V>,
        version: u64,
    ) {
        if let Some(log) = self.transactions.borrow_mut().last_mut() {
            let target = Rc::clone(&atom);
            log.push(Box::new(move |runtime: &ReactiveRuntime| {
                target.restore(old_state, version);
                runtime.invalidate_observers(target.base());
            }));
        }
        self.notify_changed(atom.base());
    }

    /// Notify observers that a derived node changed. Unlike
    /// [`process_changed_atom`](Self::process_changed_atom) nothing is logged
    /// for rollback: a derived node follows its sources when they are
    /// restored.
    pub(crate) fn notify_changed(&self, node: &ObservableBase) {
        self.invalidate_observers(node);
        self.flush();
    }

    /// Run `f` with reactor execution deferred until it returns.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let result = {
            let _batch = DepthGuard::enter(&self.batch_depth);
            f()
        };
        self.flush();
        result
    }

    pub(crate) fn invalidate_observers(&self, node: &ObservableBase) {
        for observer in node.observers() {
            observer.invalidate(self);
        }
    }

    pub(crate) fn schedule(&self, observer: Rc<dyn Observer>) {
        let mut pending = self.pending.borrow_mut();
        let id = observer.observer_id();
        if !pending.iter().any(|p| p.observer_id() == id) {
            pending.push_back(observer);
        }
    }

    /// Run scheduled reactors unless a transaction or batch is still open.
    fn flush(&self) {
        if self.in_transaction() || self.batch_depth.get() > 0 {
            return;
        }
        let _batch = DepthGuard::enter(&self.batch_depth);
        let mut ran = 0usize;
        loop {
            let next = self.pending.borrow_mut().pop_front();
            match next {
                Some(observer) => {
                    observer.react();
                    ran += 1;
                }
                None => break,
            }
        }
        if ran > 0 {
            trace!(reactors = ran, "flushed reactors");
        }
    }
}

impl TransactionContext for ReactiveRuntime {
    fn in_transaction(&self) -> bool {
        !self.transactions.borrow().is_empty()
    }
}

/// Holds a transaction level open. Dropped without [`close`](Self::close),
/// as when the transaction body panics, it rolls that level back.
struct TransactionFrame<'a> {
    runtime: &'a ReactiveRuntime,
    closed: bool,
}

impl<'a> TransactionFrame<'a> {
    fn open(runtime: &'a ReactiveRuntime) -> Self {
        runtime.transactions.borrow_mut().push(Vec::new());
        Self {
            runtime,
            closed: false,
        }
    }

    fn close(mut self) -> Vec<Rollback> {
        self.closed = true;
        self.runtime.transactions.borrow_mut().pop().unwrap_or_default()
    }
}

impl Drop for TransactionFrame<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let log = self.runtime.transactions.borrow_mut().pop().unwrap_or_default();
        self.runtime.roll_back(log);
    }
}

/// Pops a tracking frame when dropped, so a panicking computation does not
/// leave its frame on the stack.
struct FrameGuard<'a> {
    runtime: &'a ReactiveRuntime,
    popped: bool,
}

impl<'a> FrameGuard<'a> {
    fn push(runtime: &'a ReactiveRuntime, frame: TrackingFrame) -> Self {
        runtime.tracking.borrow_mut().push(frame);
        Self {
            runtime,
            popped: false,
        }
    }

    fn pop(mut self) -> Option<TrackingFrame> {
        self.popped = true;
        self.runtime.tracking.borrow_mut().pop()
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if !self.popped {
            self.runtime.tracking.borrow_mut().pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DerivableExt, Signal};

    #[test]
    fn track_records_each_read_once() {
        let runtime = ReactiveRuntime::current();
        let a = Signal::new(1);
        let b = Signal::new(2);

        let (sum, reads) = runtime.track(|| {
            a.value().unwrap_or(0) + a.value().unwrap_or(0) + b.value().unwrap_or(0)
        });
        assert_eq!(sum, 4);
        assert_eq!(reads.len(), 2);
    }

    #[test]
    fn independent_tracking_hides_reads() {
        let runtime = ReactiveRuntime::current();
        let a = Signal::new(1);

        let (_, reads) = runtime.track(|| runtime.independent_tracking(|| a.value()));
        assert!(reads.is_empty());
    }

    #[test]
    fn nested_transactions_report_in_transaction() {
        let runtime = ReactiveRuntime::current();
        assert!(!runtime.in_transaction());
        runtime.transaction(|| {
            assert!(runtime.in_transaction());
            runtime.transaction(|| assert!(runtime.in_transaction()));
            assert!(runtime.in_transaction());
        });
        assert!(!runtime.in_transaction());
    }

    fn record(signal: &Signal<i32>) -> (Rc<RefCell<Vec<i32>>>, crate::WatchGuard) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let guard = signal.watch({
            let seen = seen.clone();
            move |value| seen.borrow_mut().push(value)
        });
        (seen, guard)
    }

    #[test]
    fn panicking_transaction_rolls_back_and_closes() {
        let runtime = ReactiveRuntime::current();
        let signal = Signal::new(1);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            runtime.transaction(|| {
                signal.set(2);
                panic!("transaction body failed");
            })
        }));
        assert!(outcome.is_err());
        assert!(!runtime.in_transaction());
        assert_eq!(signal.value(), Some(1));
        assert_eq!(signal.version(), 0);

        let (seen, _guard) = record(&signal);
        signal.set(3);
        assert_eq!(*seen.borrow(), vec![1, 3]);
    }

    #[test]
    fn batch_delivers_the_final_value_once() {
        let runtime = ReactiveRuntime::current();
        let signal = Signal::new(0);
        let (seen, _guard) = record(&signal);

        runtime.batch(|| {
            signal.set(1);
            signal.set(2);
            signal.set(3);
            assert_eq!(*seen.borrow(), vec![0]);
        });
        assert_eq!(*seen.borrow(), vec![0, 3]);
        assert_eq!(signal.version(), 3);
    }

    #[test]
    fn observers_are_counted_per_node() {
        let signal = Signal::new(0);
        assert_eq!(signal.base().observer_count(), 0);

        let first = signal.watch(|_| {});
        let second = signal.watch(|_| {});
        assert_eq!(signal.base().observer_count(), 2);

        drop(first);
        assert_eq!(signal.base().observer_count(), 1);
        assert!(signal.connected());
        drop(second);
        assert_eq!(signal.base().observer_count(), 0);
        assert!(!signal.connected());
    }

    #[test]
    fn scoped_runtime_is_isolated() {
        let outer = ReactiveRuntime::current();
        ReactiveRuntime::scope(|| {
            let inner = ReactiveRuntime::current();
            assert!(!Rc::ptr_eq(&outer, &inner));
        });
        assert!(Rc::ptr_eq(&outer, &ReactiveRuntime::current()));
    }
}
