#![forbid(unsafe_code)]

//! Multicast event registration point.
//!
//! [`Event<A>`] is the conventional "event" that toolkit objects expose: a
//! list of strong handlers with add/remove semantics and in-order
//! delivery. Handlers are compared by pointer identity, so removing a
//! handler requires the same `Rc` that was added.
//!
//! # Invariants
//!
//! 1. Handlers run in registration order.
//! 2. `raise` delivers to the snapshot taken when it starts; handlers
//!    added or removed during delivery take effect on the next raise.
//! 3. Registering the same handler twice delivers twice; `remove` drops
//!    the most recent registration only.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::heap::Heap;

/// Receiver of an event.
pub trait Handler<A> {
    /// Called once per raise. The heap is the raising thread's object space.
    fn handle(&self, heap: &Heap, args: &A);
}

impl<A, F> Handler<A> for F
where
    F: Fn(&Heap, &A),
{
    fn handle(&self, heap: &Heap, args: &A) {
        self(heap, args)
    }
}

/// Shared handler reference as stored by an [`Event`].
pub type HandlerRef<A> = Rc<dyn Handler<A>>;

/// A multicast event with add/remove registration.
pub struct Event<A> {
    handlers: RefCell<Vec<HandlerRef<A>>>,
}

impl<A> Default for Event<A> {
    fn default() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
        }
    }
}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

impl<A> Event<A> {
    /// Create an event with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler.
    pub fn add(&self, handler: HandlerRef<A>) {
        self.handlers.borrow_mut().push(handler);
    }

    /// Unregister the most recent registration of `handler`.
    ///
    /// Returns `false` if it was not registered.
    pub fn remove(&self, handler: &HandlerRef<A>) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        match handlers.iter().rposition(|h| Rc::ptr_eq(h, handler)) {
            Some(pos) => {
                handlers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether `handler` is currently registered.
    #[must_use]
    pub fn contains(&self, handler: &HandlerRef<A>) -> bool {
        self.handlers.borrow().iter().any(|h| Rc::ptr_eq(h, handler))
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.borrow().is_empty()
    }

    /// Deliver `args` to every handler registered when the call starts.
    pub fn raise(&self, heap: &Heap, args: &A) {
        // Snapshot so handlers can (un)subscribe without a borrow conflict.
        let snapshot: Vec<HandlerRef<A>> = self.handlers.borrow().clone();
        for handler in &snapshot {
            handler.handle(heap, args);
        }
    }
}
