#![forbid(unsafe_code)]

//! Commands and the `CanExecuteChanged` notification.
//!
//! A [`Command`] raises "can-execute changed" whenever its availability may
//! have changed. Some commands do not own that event: they forward it to a
//! shared [`RequeryHub`] so a single invalidation reaches every command at
//! once. Subscriptions made through the broker still see the command, not
//! the hub, as sender.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use tether_core::{Event, HandlerRef, Heap};

use crate::notification::Notification;

/// Shared requery event that delegating commands route through.
#[derive(Debug, Clone, Default)]
pub struct RequeryHub {
    event: Rc<Event<()>>,
}

impl RequeryHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tell every delegating command that availability may have changed.
    pub fn invalidate(&self, heap: &Heap) {
        self.event.raise(heap, &());
    }

    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.event.handler_count()
    }
}

/// An invocable UI action with availability state.
pub struct Command {
    name: String,
    enabled: Cell<bool>,
    event: Rc<Event<()>>,
    delegating: bool,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("enabled", &self.enabled.get())
            .field("delegating", &self.delegating)
            .finish()
    }
}

impl Command {
    /// A command that owns its can-execute-changed event.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: Cell::new(true),
            event: Rc::new(Event::new()),
            delegating: false,
        }
    }

    /// A command whose event registration forwards to `hub`.
    pub fn delegating(name: impl Into<String>, hub: &RequeryHub) -> Self {
        Self {
            name: name.into(),
            enabled: Cell::new(true),
            event: Rc::clone(&hub.event),
            delegating: true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_delegating(&self) -> bool {
        self.delegating
    }

    #[must_use]
    pub fn can_execute(&self) -> bool {
        self.enabled.get()
    }

    /// Update availability; raises the event only when it changes.
    pub fn set_enabled(&self, heap: &Heap, enabled: bool) {
        if self.enabled.replace(enabled) != enabled {
            self.raise_can_execute_changed(heap);
        }
    }

    pub fn raise_can_execute_changed(&self, heap: &Heap) {
        self.event.raise(heap, &());
    }

    /// Handlers on this command's registration point (the hub's, if
    /// delegating).
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.event.handler_count()
    }
}

/// "Availability changed" notification raised by [`Command`]s.
#[derive(Debug, Clone, Copy)]
pub struct CanExecuteChanged;

impl Notification for CanExecuteChanged {
    type Source = Command;
    type Args = ();

    const NAME: &'static str = "CanExecuteChanged";

    fn subscribe(_heap: &Heap, source: &Command, handler: HandlerRef<()>) {
        source.event.add(handler);
    }

    fn unsubscribe(_heap: &Heap, source: &Command, handler: &HandlerRef<()>) -> bool {
        source.event.remove(handler)
    }
}
