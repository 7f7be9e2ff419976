//! Single-threaded change signal.

use std::cell::RefCell;
use std::rc::Rc;

type Listener<T> = Rc<dyn Fn(&T)>;

/// Identifies one subscription so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An in-process broadcast of values to registered listeners.
///
/// Listeners are invoked in subscription order. The signal is single
/// threaded; handlers and their listeners live on one owner's task.
#[derive(Default)]
pub struct Signal<T> {
    listeners: RefCell<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: RefCell<u64>,
}

impl<T> Signal<T> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: RefCell::new(0),
        }
    }

    /// Registers a listener and returns its subscription id.
    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> SubscriptionId {
        let mut next = self.next_id.borrow_mut();
        let id = SubscriptionId(*next);
        *next += 1;
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }

    /// Invokes every listener with `value`.
    ///
    /// The listener list is not borrowed while a listener runs, so
    /// listeners may subscribe and unsubscribe re-entrantly. Listeners
    /// added during a fire are first invoked on the next fire; listeners
    /// removed during a fire are skipped.
    pub fn fire(&self, value: &T) {
        let snapshot: Vec<(SubscriptionId, Listener<T>)> = self
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();
        for (id, listener) in snapshot {
            let still_subscribed = self
                .listeners
                .borrow()
                .iter()
                .any(|(existing, _)| *existing == id);
            if still_subscribed {
                listener(value);
            }
        }
    }

    /// Drops all listeners.
    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.borrow().is_empty()
    }
}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("listeners", &self.len()).finish()
    }
}
