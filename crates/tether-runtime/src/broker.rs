#![forbid(unsafe_code)]

//! Weak subscription broker.
//!
//! A [`Broker<K>`] connects listeners to sources for one notification kind
//! without letting either side keep the other alive. Each subscription is a
//! sink registered on the source's event; listener delegates are retained
//! per target in an [`AliveTable`], so a listener lives exactly as long as
//! the object it is bound to.
//!
//! # Purging
//!
//! Dead subscriptions are never removed while an event is being delivered.
//! Sinks that find their listener gone only raise the cleanup flag; the
//! structural work happens in [`Broker::cleanup`], normally driven from the
//! dispatcher's idle hook. A purge of one source either drops the whole
//! list (forced, or every sink is dead) or removes only the dead sinks in
//! place.
//!
//! # Invariants
//!
//! 1. A source whose sink list becomes empty has no entry.
//! 2. Within one source, sinks fire in registration order.
//! 3. With [`Access::Foreign`], no handler is unsubscribed from any source;
//!    teardown is local bookkeeping only.
//!
//! # Failure Modes
//!
//! - Dead source handle or dead bound listener target on add:
//!   [`BrokerError::InvalidArgument`].
//! - Removing a subscription that does not exist, or whose source or
//!   listener target is gone: `Ok(false)`.

use std::fmt;
use std::rc::Rc;
use std::thread::{self, ThreadId};

use tether_core::{Heap, ObjectId, WeakHandle};
use tracing::{debug, debug_span, trace};

use crate::alive::AliveTable;
use crate::config::BrokerConfig;
use crate::error::BrokerError;
use crate::notification::{Listener, Notification};
use crate::sink::{CleanupSignal, Sink};
use crate::source_table::SourceTable;

/// Whether the caller is on the thread that created the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Calling thread owns the broker; sources may be touched.
    Owner,
    /// Calling thread does not own the broker; only local state may change.
    Foreign,
}

/// Lifetime counters for one broker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BrokerStats {
    /// Subscriptions created.
    pub added: u64,
    /// Subscriptions removed by `remove_handler`.
    pub removed: u64,
    /// Sinks removed by purges.
    pub purged: u64,
    /// Cleanup passes run.
    pub cleanups: u64,
}

/// Subscription broker for notification kind `K`.
pub struct Broker<K: Notification> {
    owner: ThreadId,
    sources: SourceTable<K>,
    alive: AliveTable<K::Source, K::Args>,
    pending: CleanupSignal,
    config: BrokerConfig,
    stats: BrokerStats,
}

impl<K: Notification> fmt::Debug for Broker<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("notification", &K::NAME)
            .field("sources", &self.sources)
            .field("alive", &self.alive)
            .field("cleanup_scheduled", &self.pending.is_set())
            .field("stats", &self.stats)
            .finish()
    }
}

impl<K: Notification> Default for Broker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Notification> Broker<K> {
    /// Create a broker owned by the calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    #[must_use]
    pub fn with_config(config: BrokerConfig) -> Self {
        debug!(notification = K::NAME, ?config, "broker created");
        Self {
            owner: thread::current().id(),
            sources: SourceTable::default(),
            alive: AliveTable::new(),
            pending: CleanupSignal::default(),
            config,
            stats: BrokerStats::default(),
        }
    }

    /// Subscribe `listener` to `source`.
    ///
    /// Duplicate pairs are allowed and create independent subscriptions.
    pub fn add_handler(
        &mut self,
        heap: &Heap,
        source: WeakHandle<K::Source>,
        listener: &Listener<K>,
    ) -> Result<(), BrokerError> {
        let source_ref = heap
            .upgrade(source)
            .ok_or_else(|| BrokerError::invalid("source", "source is not alive"))?;
        Self::check_listener(heap, listener)?;

        if self.config.purge_on_add && self.pending.is_set() {
            self.purge_with(heap, source.id(), false, true);
        }

        let sink = Sink::<K>::attach(heap, source, &*source_ref, listener, self.pending.clone());
        self.sources.push(source.id(), sink);
        self.alive.retain(listener);
        self.stats.added += 1;
        trace!(
            notification = K::NAME,
            source = %source.id(),
            target = %listener.target(),
            "handler added"
        );
        Ok(())
    }

    /// Remove the first subscription of `listener` to `source`.
    ///
    /// Returns `Ok(false)` when no such subscription exists, including
    /// when the source or the listener target is already gone. Dead sinks
    /// noticed on the way schedule a cleanup.
    pub fn remove_handler(
        &mut self,
        heap: &Heap,
        source: WeakHandle<K::Source>,
        listener: &Listener<K>,
    ) -> Result<bool, BrokerError> {
        // A dead side makes the pair stale; its sinks go at the next cleanup.
        if !heap.is_alive(source) || !listener.is_target_alive(heap) {
            self.schedule_cleanup();
            return Ok(false);
        }

        let id = source.id();
        let Some(list) = self.sources.get_mut(id) else {
            return Ok(false);
        };

        let mut found_dirt = false;
        let mut position = None;
        for (index, sink) in list.iter().enumerate() {
            if sink.matches(source, listener) {
                position = Some(index);
                break;
            }
            if sink.is_inactive(heap) {
                found_dirt = true;
            }
        }

        // Detach outside the scan so the list is not borrowed across it.
        let removed = position.map(|index| list.remove(index));
        if let Some(sink) = &removed {
            self.sources.drop_if_empty(id);
            sink.detach(heap, self.check_access() == Access::Owner);
            self.alive.release(listener);
            self.stats.removed += 1;
            trace!(notification = K::NAME, source = %id, "handler removed");
        }

        if found_dirt {
            self.schedule_cleanup();
        }
        Ok(removed.is_some())
    }

    fn check_listener(heap: &Heap, listener: &Listener<K>) -> Result<(), BrokerError> {
        if listener.is_target_alive(heap) {
            Ok(())
        } else {
            Err(BrokerError::invalid("listener", "listener target is not alive"))
        }
    }

    /// Remove dead sinks for `source`, or every sink when `purge_all`.
    ///
    /// Returns whether anything was removed. A forced purge may run off the
    /// owning thread; sources are then left untouched.
    pub fn purge(&mut self, heap: &Heap, source: ObjectId, purge_all: bool) -> bool {
        let on_owner_thread = !purge_all || self.check_access() == Access::Owner;
        self.purge_with(heap, source, purge_all, on_owner_thread) > 0
    }

    fn purge_with(&mut self, heap: &Heap, source: ObjectId, purge_all: bool, on_owner_thread: bool) -> usize {
        let Some(list) = self.sources.get(source) else {
            return 0;
        };

        let remove_list =
            purge_all || !heap.is_alive(source) || list.iter().all(|sink| sink.is_inactive(heap));

        let dead = if remove_list {
            self.sources.take(source).unwrap_or_default()
        } else {
            let mut dead = Vec::new();
            if let Some(list) = self.sources.get_mut(source) {
                list.retain(|sink| {
                    let inactive = sink.is_inactive(heap);
                    if inactive {
                        dead.push(Rc::clone(sink));
                    }
                    !inactive
                });
            }
            dead
        };

        for sink in &dead {
            let handler = sink.handler();
            sink.detach(heap, on_owner_thread);
            if let Some(handler) = handler {
                self.alive.release(&handler);
            }
        }

        if !dead.is_empty() {
            self.stats.purged += dead.len() as u64;
            debug!(
                notification = K::NAME,
                source = %source,
                removed = dead.len(),
                whole_list = remove_list,
                "purged sinks"
            );
        }
        dead.len()
    }

    /// Request a cleanup pass at the next opportunity.
    pub fn schedule_cleanup(&self) {
        self.pending.schedule();
    }

    #[must_use]
    pub fn is_cleanup_scheduled(&self) -> bool {
        self.pending.is_set()
    }

    /// Purge every source incrementally. Returns the number of sinks
    /// removed.
    pub fn cleanup(&mut self, heap: &Heap) -> usize {
        let _span = debug_span!("broker_cleanup", notification = K::NAME).entered();
        self.pending.take();

        let mut removed = 0;
        for source in self.sources.sources() {
            removed += self.purge_with(heap, source, false, true);
        }
        let swept = if self.config.sweep_alive_on_cleanup {
            self.alive.sweep(heap)
        } else {
            0
        };
        self.stats.cleanups += 1;
        debug!(removed, swept, sources = self.sources.len(), "cleanup finished");
        removed
    }

    /// Run [`Broker::cleanup`] if one was scheduled.
    pub fn cleanup_if_scheduled(&mut self, heap: &Heap) -> Option<usize> {
        self.pending.is_set().then(|| self.cleanup(heap))
    }

    /// Forced purge of every source, from whichever thread is calling.
    pub fn purge_all(&mut self, heap: &Heap) -> usize {
        let access = self.check_access();
        self.shutdown(heap, access)
    }

    /// Drop every subscription. With [`Access::Foreign`], sinks are
    /// deactivated but stay registered on their sources.
    pub fn shutdown(&mut self, heap: &Heap, access: Access) -> usize {
        let on_owner_thread = access == Access::Owner;
        let mut removed = 0;
        for source in self.sources.sources() {
            removed += self.purge_with(heap, source, true, on_owner_thread);
        }
        // Every retention is paired with a sink; clear stragglers anyway.
        self.alive.clear();
        self.pending.take();
        debug!(notification = K::NAME, removed, ?access, "broker shut down");
        removed
    }

    /// Classify the calling thread.
    #[must_use]
    pub fn check_access(&self) -> Access {
        if thread::current().id() == self.owner {
            Access::Owner
        } else {
            Access::Foreign
        }
    }

    #[must_use]
    pub fn owner_thread(&self) -> ThreadId {
        self.owner
    }

    /// Number of sources with at least one subscription.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn has_source(&self, source: impl Into<ObjectId>) -> bool {
        self.sources.contains(source.into())
    }

    #[must_use]
    pub fn sink_count(&self, source: impl Into<ObjectId>) -> usize {
        self.sources.sink_count(source.into())
    }

    /// Subscriptions across all sources.
    #[must_use]
    pub fn total_sinks(&self) -> usize {
        self.sources.total_sinks()
    }

    #[must_use]
    pub fn alive_table(&self) -> &AliveTable<K::Source, K::Args> {
        &self.alive
    }

    #[must_use]
    pub fn stats(&self) -> BrokerStats {
        self.stats
    }

    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }
}
