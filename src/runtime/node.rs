use super::ReactiveRuntime;
use crate::state::State;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Anything that can be observed by the reactive runtime.
///
/// The connection bookkeeping lives in a composed [`ObservableBase`].
/// Implementors may override [`Observable::connect`] and
/// [`Observable::disconnect`] to start or stop their own upstream
/// subscriptions, but must call through to the base so the node's
/// connection state stays accurate.
pub trait Observable {
    /// The composed connection bookkeeping of this node.
    fn base(&self) -> &ObservableBase;

    /// Called when the first observer subscribes.
    fn connect(&self) {
        self.base().mark_connected();
    }

    /// Called when the last observer unsubscribes.
    fn disconnect(&self) {
        self.base().mark_disconnected();
    }
}

impl<T: Observable + ?Sized> Observable for Rc<T> {
    fn base(&self) -> &ObservableBase {
        (**self).base()
    }

    fn connect(&self) {
        (**self).connect()
    }

    fn disconnect(&self) {
        (**self).disconnect()
    }
}

/// A node that depends on observables: a memo or a reactor.
pub(crate) trait Observer {
    fn observer_id(&self) -> usize;

    /// One of the observed nodes changed.
    fn invalidate(&self, runtime: &ReactiveRuntime);

    /// Run a scheduled observer. Only reactors are ever scheduled.
    fn react(&self) {}
}

/// An observable whose state can be written back when a transaction rolls
/// back.
pub trait ChangeTarget<V>: Observable {
    fn restore(&self, state: State<V>, version: u64);
}

/// Connection bookkeeping shared by every node kind.
pub struct ObservableBase {
    id: usize,
    connected: Cell<bool>,
    observers: RefCell<Vec<Rc<dyn Observer>>>,
}

impl ObservableBase {
    pub fn new(runtime: &ReactiveRuntime) -> Self {
        Self {
            id: runtime.next_id(),
            connected: Cell::new(false),
            observers: RefCell::new(Vec::new()),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether at least one observer is subscribed.
    pub fn connected(&self) -> bool {
        self.connected.get()
    }

    pub fn mark_connected(&self) {
        self.connected.set(true);
    }

    pub fn mark_disconnected(&self) {
        self.connected.set(false);
    }

    /// Number of observers currently subscribed.
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    pub(crate) fn observers(&self) -> Vec<Rc<dyn Observer>> {
        self.observers.borrow().clone()
    }
}

/// Subscribe `observer` to `node`, connecting the node on its first observer.
fn add_observer(node: &dyn Observable, observer: Rc<dyn Observer>) {
    let first = {
        let mut observers = node.base().observers.borrow_mut();
        let id = observer.observer_id();
        if observers.iter().any(|o| o.observer_id() == id) {
            return;
        }
        observers.push(observer);
        observers.len() == 1
    };
    if first {
        node.connect();
    }
}

/// Unsubscribe an observer, disconnecting the node when it was the last one.
fn remove_observer(node: &dyn Observable, observer_id: usize) {
    // The removed observer is dropped only after the borrow is released.
    let (_removed, last) = {
        let mut observers = node.base().observers.borrow_mut();
        match observers.iter().position(|o| o.observer_id() == observer_id) {
            Some(index) => {
                let removed = observers.remove(index);
                (Some(removed), observers.is_empty())
            }
            None => (None, false),
        }
    };
    if last {
        node.disconnect();
    }
}

/// Move `observer` from its `old` dependencies to `new` ones.
///
/// New subscriptions are made before old ones are dropped so that a node
/// present in both is never disconnected in between.
pub(crate) fn resubscribe(
    observer: Rc<dyn Observer>,
    old: Vec<Rc<dyn Observable>>,
    new: &[Rc<dyn Observable>],
) {
    let id = observer.observer_id();
    for dep in new {
        let dep_id = dep.base().id();
        if !old.iter().any(|o| o.base().id() == dep_id) {
            add_observer(&**dep, Rc::clone(&observer));
        }
    }
    for dep in old {
        let dep_id = dep.base().id();
        if !new.iter().any(|n| n.base().id() == dep_id) {
            remove_observer(&*dep, id);
        }
    }
}

/// Drop every subscription held by an observer.
pub(crate) fn unsubscribe_all(observer_id: usize, deps: Vec<Rc<dyn Observable>>) {
    for dep in deps {
        remove_observer(&*dep, observer_id);
    }
}
