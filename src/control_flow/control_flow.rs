use super::options::{prepare_options, should_be_live, ControlFlowOptions, PreparedOptions};
use crate::runtime::{Observable, ObservableBase, ReactiveRuntime, TransactionContext};
use crate::signal::{Condition, Derivable, DerivableRef, Reactor, Stopper};
use crate::state::{from_state_object, materialize, State, StateObject};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// A derivable that follows another derivable, gated by lifecycle options.
///
/// While connected, a `ControlFlow` keeps its own copy of the source's state
/// and only replaces it when the options let an update through. Reads then
/// come from that copy. While disconnected, or inside a transaction, reads go
/// straight to the source as long as the options would currently let updates
/// through; otherwise the last forwarded state is returned.
///
/// # Example
///
/// ```
/// use tincan_flow::{ControlFlowOptions, DerivableExt, Signal};
///
/// let source = Signal::new(1);
/// let enabled = Signal::new(true);
/// let gated = source.control_flow(ControlFlowOptions::new().when(enabled.clone()));
/// let _guard = gated.watch(|_| {});
///
/// enabled.set(false);
/// source.set(2);
/// assert_eq!(gated.value(), Some(1));
///
/// enabled.set(true);
/// assert_eq!(gated.value(), Some(2));
/// ```
pub struct ControlFlow<V> {
    inner: Rc<ControlFlowInner<V>>,
}

struct ControlFlowInner<V> {
    node: ObservableBase,
    base: DerivableRef<V>,
    options: PreparedOptions,
    // Only meaningful while connected, or while updates are suppressed.
    current_state: RefCell<State<V>>,
    version: Cell<u64>,
    connection: RefCell<Option<Stopper>>,
    runtime: Rc<ReactiveRuntime>,
    this: Weak<ControlFlowInner<V>>,
}

impl<V> Clone for ControlFlow<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + PartialEq + 'static> ControlFlow<V> {
    /// Wrap `base`. Function-valued options are turned into derivables here,
    /// once.
    pub fn new(base: impl Derivable<V> + 'static, options: ControlFlowOptions<V>) -> Self {
        let runtime = ReactiveRuntime::current();
        let base: DerivableRef<V> = Rc::new(base);
        let options = prepare_options(&base, options);
        let inner = Rc::new_cyclic(|this| ControlFlowInner {
            node: ObservableBase::new(&runtime),
            base,
            options,
            current_state: RefCell::new(State::Unresolved),
            version: Cell::new(0),
            connection: RefCell::new(None),
            runtime,
            this: this.clone(),
        });
        Self { inner }
    }

    /// Number of updates forwarded so far. Only increases while connected.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub fn id(&self) -> usize {
        self.inner.node.id()
    }
}

impl<V: Clone + PartialEq + 'static> ControlFlowInner<V> {
    fn read_state(&self) -> State<V> {
        let cached = self.node.connected() && !self.runtime.in_transaction();
        if cached || !should_be_live(&self.options) {
            return self.current_state.borrow().clone();
        }
        self.runtime.independent_tracking(|| self.base.get_state())
    }

    // Not logged for rollback: a restored source is forwarded again by the
    // reactor, which keeps the cache and the reactor's last value in step.
    fn forward(&self, state: State<V>) {
        self.current_state.replace(state);
        let version = self.version.get() + 1;
        self.version.set(version);
        trace!(flow = self.node.id(), version, "forwarded update");
        self.runtime.notify_changed(&self.node);
    }
}

impl<V: Clone + PartialEq + 'static> Observable for ControlFlowInner<V> {
    fn base(&self) -> &ObservableBase {
        &self.node
    }

    fn connect(&self) {
        let already_stopped = Rc::new(Cell::new(false));
        let include_unresolved = self.options.include_unresolved;
        let once = self.options.once;
        let mut skip_first = self.options.skip_first;

        let update = {
            let flow = self.this.clone();
            move |object: StateObject<V>, stopper: &Stopper| {
                let Some(flow) = flow.upgrade() else {
                    return;
                };
                if !include_unresolved && !object.resolved() {
                    trace!(flow = flow.node.id(), "ignored unresolved update");
                    return;
                }
                if skip_first {
                    skip_first = false;
                    trace!(flow = flow.node.id(), "skipped first update");
                    return;
                }
                if once {
                    stopper.stop();
                }
                flow.forward(from_state_object(object));
            }
        };
        let cleanup = {
            let already_stopped = Rc::clone(&already_stopped);
            let flow = self.this.clone();
            move || {
                already_stopped.set(true);
                if let Some(flow) = flow.upgrade() {
                    let _stopper = flow.connection.borrow_mut().take();
                }
            }
        };

        let stopper = Reactor::create(
            materialize(Rc::clone(&self.base)),
            update,
            self.options.reactor_options(),
            cleanup,
        );
        if !already_stopped.get() {
            *self.connection.borrow_mut() = Some(stopper);
        }

        self.node.mark_connected();
        debug!(
            flow = self.node.id(),
            stopped = already_stopped.get(),
            "control flow connected"
        );
    }

    fn disconnect(&self) {
        self.node.mark_disconnected();
        self.current_state.replace(State::Unresolved);
        let stopper = self.connection.borrow_mut().take();
        if let Some(stopper) = stopper {
            stopper.stop();
        }
        debug!(flow = self.node.id(), "control flow disconnected");
    }
}

impl<V: Clone + PartialEq + 'static> Observable for ControlFlow<V> {
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

impl<V: Clone + PartialEq + 'static> Derivable<V> for ControlFlow<V> {
    fn get_state(&self) -> State<V> {
        self.inner.runtime.record_observation(self.inner.clone());
        self.inner.read_state()
    }
}

impl From<ControlFlow<bool>> for Condition {
    fn from(source: ControlFlow<bool>) -> Self {
        Condition::derivable(source)
    }
}

/// Wrap `base` in a [`ControlFlow`].
pub fn control_flow<V, D>(base: D, options: ControlFlowOptions<V>) -> ControlFlow<V>
where
    V: Clone + PartialEq + 'static,
    D: Derivable<V> + 'static,
{
    ControlFlow::new(base, options)
}
