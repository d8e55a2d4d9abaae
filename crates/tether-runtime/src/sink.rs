#![forbid(unsafe_code)]

//! Per-subscription forwarding record.
//!
//! Each `add_handler` call creates one [`Sink`]. The sink remembers the
//! original source and listener weakly, and is itself the one strong
//! handler (the trampoline) registered on the source's event. When the
//! event fires, the sink forwards to the listener with the original source
//! as sender, even if the event was actually raised by a proxy object.
//!
//! ```text
//! Button --*--> Listener <--o-- Sink --o--> Command
//!   ^              |             ^  ^
//!   +--------------+             |  +---- (trampoline) <---- Proxy event
//!                    SourceTable-+
//!
//!   --o-->  weak       --*-->  AliveTable (lives while target lives)
//! ```
//!
//! # States
//!
//! `Active` while both handles resolve; `Detached` (terminal) once
//! detached. An active sink whose source or listener stopped resolving is
//! reported inactive and waits for a purge.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use tether_core::{Handler, HandlerRef, Heap, WeakDelegate, WeakHandle};

use crate::notification::{Listener, Notification};

/// Shared "a purge is needed" flag.
///
/// Set from sinks while events are being delivered; consumed by the
/// broker's next cleanup pass. Setting it never mutates a sink list.
#[derive(Debug, Clone, Default)]
pub(crate) struct CleanupSignal(Rc<Cell<bool>>);

impl CleanupSignal {
    pub(crate) fn schedule(&self) {
        self.0.set(true);
    }

    pub(crate) fn is_set(&self) -> bool {
        self.0.get()
    }

    /// Clear the flag, returning whether it was set.
    pub(crate) fn take(&self) -> bool {
        self.0.replace(false)
    }
}

enum SinkState<K: Notification> {
    Active {
        source: WeakHandle<K::Source>,
        listener: WeakDelegate<K::Source, K::Args>,
    },
    Detached,
}

pub(crate) struct Sink<K: Notification> {
    state: RefCell<SinkState<K>>,
    cleanup: CleanupSignal,
}

impl<K: Notification> fmt::Debug for Sink<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.state.borrow() {
            SinkState::Active { source, .. } => format!("active({})", source.id()),
            SinkState::Detached => "detached".to_string(),
        };
        f.debug_struct("Sink")
            .field("notification", &K::NAME)
            .field("state", &state)
            .finish()
    }
}

impl<K: Notification> Sink<K> {
    /// Create a sink and register its trampoline on `source`.
    pub(crate) fn attach(
        heap: &Heap,
        handle: WeakHandle<K::Source>,
        source: &K::Source,
        listener: &Listener<K>,
        cleanup: CleanupSignal,
    ) -> Rc<Self> {
        let sink = Rc::new(Self {
            state: RefCell::new(SinkState::Active {
                source: handle,
                listener: listener.downgrade(),
            }),
            cleanup,
        });
        K::subscribe(heap, source, sink.trampoline());
        sink
    }

    fn trampoline(self: &Rc<Self>) -> HandlerRef<K::Args> {
        let sink: Rc<Self> = Rc::clone(self);
        sink
    }

    /// Source or listener no longer resolves, or the sink was detached.
    pub(crate) fn is_inactive(&self, heap: &Heap) -> bool {
        match &*self.state.borrow() {
            SinkState::Detached => true,
            SinkState::Active { source, listener } => {
                !heap.is_alive(*source)
                    || listener
                        .upgrade()
                        .is_none_or(|delegate| !delegate.is_target_alive(heap))
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_detached(&self) -> bool {
        matches!(*self.state.borrow(), SinkState::Detached)
    }

    /// The original listener, if anything still holds it.
    pub(crate) fn handler(&self) -> Option<Listener<K>> {
        match &*self.state.borrow() {
            SinkState::Active { listener, .. } => listener.upgrade(),
            SinkState::Detached => None,
        }
    }

    /// Whether this sink records exactly `(source, listener)`.
    pub(crate) fn matches(&self, source: WeakHandle<K::Source>, listener: &Listener<K>) -> bool {
        match &*self.state.borrow() {
            SinkState::Active {
                source: mine,
                listener: theirs,
            } => *mine == source && theirs.refers_to(listener),
            SinkState::Detached => false,
        }
    }

    /// Stop forwarding. Unregisters the trampoline only when
    /// `on_owner_thread` and the source is still alive; otherwise the
    /// registration is left in place, inert.
    pub(crate) fn detach(self: &Rc<Self>, heap: &Heap, on_owner_thread: bool) {
        let previous = self.state.replace(SinkState::Detached);
        let SinkState::Active { source, .. } = previous else {
            return;
        };
        if !on_owner_thread {
            return;
        }
        if let Some(source) = heap.upgrade(source) {
            K::unsubscribe(heap, &source, &self.trampoline());
        }
    }
}

impl<K: Notification> Handler<K::Args> for Sink<K> {
    fn handle(&self, heap: &Heap, args: &K::Args) {
        let (source, listener) = match &*self.state.borrow() {
            // A purge may detach us while this event is still being delivered.
            SinkState::Detached => return,
            SinkState::Active { source, listener } => (*source, listener.clone()),
        };

        let listener = listener.upgrade().filter(|d| d.is_target_alive(heap));
        match (listener, heap.upgrade(source)) {
            (Some(listener), Some(source)) => {
                listener.invoke(heap, &source, args);
            }
            _ => self.cleanup.schedule(),
        }
    }
}
