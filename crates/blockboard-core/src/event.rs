//! Minimal single-threaded pub/sub.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`EventEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Rc<dyn Fn(&E)>;

/// A list of listeners notified in subscription order.
///
/// Emission works on a snapshot of the list, so listeners may subscribe or
/// unsubscribe while an event is being delivered. Changes take effect from
/// the next emission.
pub struct EventEmitter<E> {
    listeners: RefCell<Vec<(ListenerId, Listener<E>)>>,
    next_id: Cell<u64>,
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Subscribe a listener.
    pub fn on(&self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Unsubscribe. Returns false if the listener was not subscribed.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        match listeners.iter().position(|(lid, _)| *lid == id) {
            Some(idx) => {
                listeners.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Deliver an event to every current listener.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// The two drag lifecycle signals shared by the drag engine (producer) and
/// the `drag` command (consumer).
///
/// `start` fires once when a gesture first moves, `end` fires once on
/// pointer-up after a gesture that moved.
#[derive(Debug, Default)]
pub struct DragSignals {
    pub start: EventEmitter<()>,
    pub end: EventEmitter<()>,
}

impl DragSignals {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_reaches_listeners_in_order() {
        let emitter = EventEmitter::<u32>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&seen);
        emitter.on(move |v| first.borrow_mut().push(("first", *v)));
        let second = Rc::clone(&seen);
        emitter.on(move |v| second.borrow_mut().push(("second", *v)));

        emitter.emit(&7);
        assert_eq!(*seen.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_off_removes_listener() {
        let emitter = EventEmitter::<()>::new();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let id = emitter.on(move |_| counter.set(counter.get() + 1));

        emitter.emit(&());
        assert!(emitter.off(id));
        assert!(!emitter.off(id));
        emitter.emit(&());

        assert_eq!(count.get(), 1);
        assert_eq!(emitter.listener_count(), 0);
    }

    #[test]
    fn test_listener_can_unsubscribe_during_emit() {
        let emitter = Rc::new(EventEmitter::<()>::new());
        let count = Rc::new(Cell::new(0));
        let slot: Rc<Cell<Option<ListenerId>>> = Rc::new(Cell::new(None));

        let weak = Rc::downgrade(&emitter);
        let counter = Rc::clone(&count);
        let own_id = Rc::clone(&slot);
        let id = emitter.on(move |_| {
            counter.set(counter.get() + 1);
            if let (Some(emitter), Some(id)) = (weak.upgrade(), own_id.get()) {
                emitter.off(id);
            }
        });
        slot.set(Some(id));

        emitter.emit(&());
        emitter.emit(&());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_drag_signals_are_independent() {
        let signals = DragSignals::new();
        let starts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&starts);
        signals.start.on(move |_| counter.set(counter.get() + 1));

        signals.end.emit(&());
        assert_eq!(starts.get(), 0);
        signals.start.emit(&());
        assert_eq!(starts.get(), 1);
    }
}
