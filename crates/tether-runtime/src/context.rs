#![forbid(unsafe_code)]

//! The UI thread's context: object heap plus broker registry.
//!
//! One [`UiContext`] stands for one UI thread. It owns every object the
//! brokers may refer to and the brokers themselves, so a subscription can
//! always be checked against the heap it was made in. Dropping the context
//! runs the teardown purge.
//!
//! # Example
//!
//! ```
//! use tether_runtime::{CanExecuteChanged, Command, Listener, UiContext};
//!
//! struct Button {
//!     label: &'static str,
//! }
//!
//! let mut ctx = UiContext::new();
//! let save = ctx.alloc(Command::new("save"));
//! let button = ctx.alloc(Button { label: "Save" });
//!
//! let listener = Listener::<CanExecuteChanged>::bound(button, |b: &Button, cmd, _| {
//!     println!("{} enabled: {}", b.label, cmd.can_execute());
//! });
//! ctx.add_handler::<CanExecuteChanged>(save, &listener)?;
//!
//! ctx.heap().get(save).unwrap().set_enabled(ctx.heap(), false);
//!
//! // The button goes away; the next idle pass forgets the subscription.
//! ctx.release(button);
//! ctx.heap().get(save).unwrap().raise_can_execute_changed(ctx.heap());
//! assert_eq!(ctx.process_idle(), 1);
//! # Ok::<(), tether_runtime::BrokerError>(())
//! ```

use std::fmt;

use tether_core::{Heap, ObjectId, WeakHandle};
use tracing::{debug, trace};

use crate::broker::{Access, Broker};
use crate::config::RuntimeConfig;
use crate::error::BrokerError;
use crate::notification::{Listener, Notification};
use crate::registry::BrokerRegistry;

/// Heap and brokers for one UI thread.
pub struct UiContext {
    heap: Heap,
    brokers: BrokerRegistry,
    config: RuntimeConfig,
}

impl fmt::Debug for UiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiContext")
            .field("heap", &self.heap)
            .field("brokers", &self.brokers)
            .field("cleanup_on_idle", &self.config.cleanup_on_idle)
            .finish()
    }
}

impl Default for UiContext {
    fn default() -> Self {
        Self::new()
    }
}

impl UiContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Context configured from `TETHER_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            heap: Heap::new(),
            brokers: BrokerRegistry::with_config(config.broker.clone()),
            config,
        }
    }

    #[inline]
    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    #[inline]
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    #[must_use]
    pub fn brokers(&self) -> &BrokerRegistry {
        &self.brokers
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Place `value` on the heap.
    pub fn alloc<T: 'static>(&mut self, value: T) -> WeakHandle<T> {
        self.heap.alloc(value)
    }

    /// Make an object unreachable. Subscriptions involving it go inert at
    /// once, and every broker holding subscriptions is flagged so the next
    /// [`process_idle`](Self::process_idle) removes them.
    pub fn release(&mut self, id: impl Into<ObjectId>) -> bool {
        let released = self.heap.release(id);
        if released {
            self.brokers.schedule_all();
        }
        released
    }

    /// The broker for `K`, created on first use.
    pub fn broker<K: Notification>(&mut self) -> &mut Broker<K> {
        self.brokers.broker::<K>()
    }

    pub fn add_handler<K: Notification>(
        &mut self,
        source: WeakHandle<K::Source>,
        listener: &Listener<K>,
    ) -> Result<(), BrokerError> {
        self.brokers.broker::<K>().add_handler(&self.heap, source, listener)
    }

    pub fn remove_handler<K: Notification>(
        &mut self,
        source: WeakHandle<K::Source>,
        listener: &Listener<K>,
    ) -> Result<bool, BrokerError> {
        self.brokers.broker::<K>().remove_handler(&self.heap, source, listener)
    }

    /// Purge one source in the `K` broker.
    pub fn purge<K: Notification>(&mut self, source: impl Into<ObjectId>, purge_all: bool) -> bool {
        self.brokers.broker::<K>().purge(&self.heap, source.into(), purge_all)
    }

    /// Dispatcher idle hook: run scheduled cleanups. Returns the number of
    /// subscriptions removed.
    pub fn process_idle(&mut self) -> usize {
        if !self.config.cleanup_on_idle {
            return 0;
        }
        let removed = self.brokers.cleanup_scheduled(&self.heap);
        if removed > 0 {
            trace!(removed, "idle cleanup");
        }
        removed
    }

    /// Teardown purge of every broker. The context stays usable.
    pub fn shutdown(&mut self) -> usize {
        self.brokers.purge_all(&self.heap)
    }

    /// Teardown purge as seen from a thread with the given access.
    pub fn shutdown_with(&mut self, access: Access) -> usize {
        self.brokers.shutdown(&self.heap, access)
    }
}

impl Drop for UiContext {
    fn drop(&mut self) {
        let removed = self.brokers.purge_all(&self.heap);
        debug!(removed, live_objects = self.heap.live_count(), "ui context dropped");
    }
}
