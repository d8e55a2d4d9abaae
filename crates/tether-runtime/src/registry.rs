#![forbid(unsafe_code)]

//! Per-thread directory of brokers, one per notification kind.
//!
//! Brokers are created on first use. The registry is owned by the thread's
//! [`UiContext`](crate::UiContext) rather than living in thread-local
//! storage, so "which thread's brokers" is always explicit.

use std::any::{Any, TypeId};
use std::fmt;

use rustc_hash::FxHashMap;
use tether_core::Heap;
use tracing::debug;

use crate::broker::{Access, Broker};
use crate::config::BrokerConfig;
use crate::notification::Notification;

/// Object-safe view of a [`Broker<K>`] for kind-agnostic passes.
pub trait AnyBroker: Any {
    fn name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn schedule_cleanup(&self);
    fn cleanup_if_scheduled(&mut self, heap: &Heap) -> Option<usize>;
    fn shutdown(&mut self, heap: &Heap, access: Access) -> usize;
    fn check_access(&self) -> Access;
    fn total_sinks(&self) -> usize;
}

impl<K: Notification> AnyBroker for Broker<K> {
    fn name(&self) -> &'static str {
        K::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn schedule_cleanup(&self) {
        Broker::schedule_cleanup(self);
    }

    fn cleanup_if_scheduled(&mut self, heap: &Heap) -> Option<usize> {
        Broker::cleanup_if_scheduled(self, heap)
    }

    fn shutdown(&mut self, heap: &Heap, access: Access) -> usize {
        Broker::shutdown(self, heap, access)
    }

    fn check_access(&self) -> Access {
        Broker::check_access(self)
    }

    fn total_sinks(&self) -> usize {
        Broker::total_sinks(self)
    }
}

/// Lazily populated map from notification kind to its broker.
#[derive(Default)]
pub struct BrokerRegistry {
    brokers: FxHashMap<TypeId, Box<dyn AnyBroker>>,
    config: BrokerConfig,
}

impl fmt::Debug for BrokerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.brokers.values().map(|b| b.name()).collect();
        names.sort_unstable();
        f.debug_struct("BrokerRegistry")
            .field("brokers", &names)
            .field("config", &self.config)
            .finish()
    }
}

impl BrokerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose brokers are created with `config`.
    #[must_use]
    pub fn with_config(config: BrokerConfig) -> Self {
        Self {
            brokers: FxHashMap::default(),
            config,
        }
    }

    /// The broker for `K`, created on first use.
    ///
    /// # Panics
    ///
    /// Panics if the entry under `TypeId::of::<K>()` is not a `Broker<K>`.
    /// Entries are only ever inserted by this method, so this cannot happen.
    pub fn broker<K: Notification>(&mut self) -> &mut Broker<K> {
        let config = &self.config;
        self.brokers
            .entry(TypeId::of::<K>())
            .or_insert_with(|| Box::new(Broker::<K>::with_config(config.clone())))
            .as_any_mut()
            .downcast_mut::<Broker<K>>()
            .expect("brokers are keyed by their own notification TypeId")
    }

    /// The broker for `K`, if one has been created.
    #[must_use]
    pub fn get<K: Notification>(&self) -> Option<&Broker<K>> {
        self.brokers
            .get(&TypeId::of::<K>())
            .and_then(|b| b.as_any().downcast_ref::<Broker<K>>())
    }

    #[must_use]
    pub fn contains<K: Notification>(&self) -> bool {
        self.brokers.contains_key(&TypeId::of::<K>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.brokers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.brokers.is_empty()
    }

    /// Subscriptions across every broker.
    #[must_use]
    pub fn total_sinks(&self) -> usize {
        self.brokers.values().map(|b| b.total_sinks()).sum()
    }

    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Flag every broker that still holds subscriptions for cleanup.
    /// Called when an object is retired, since any of them may refer to it.
    /// Returns the number of brokers flagged.
    pub fn schedule_all(&mut self) -> usize {
        let mut flagged = 0;
        for broker in self.brokers.values().filter(|b| b.total_sinks() > 0) {
            broker.schedule_cleanup();
            flagged += 1;
        }
        flagged
    }

    /// Run every pending cleanup. Returns the number of sinks removed.
    pub fn cleanup_scheduled(&mut self, heap: &Heap) -> usize {
        self.brokers
            .values_mut()
            .filter_map(|b| b.cleanup_if_scheduled(heap))
            .sum()
    }

    /// Teardown purge of every broker, honoring each one's thread access.
    pub fn purge_all(&mut self, heap: &Heap) -> usize {
        let removed: usize = self
            .brokers
            .values_mut()
            .map(|b| {
                let access = b.check_access();
                b.shutdown(heap, access)
            })
            .sum();
        debug!(brokers = self.brokers.len(), removed, "registry purged");
        removed
    }

    /// Teardown purge with an explicit access mode.
    pub fn shutdown(&mut self, heap: &Heap, access: Access) -> usize {
        self.brokers.values_mut().map(|b| b.shutdown(heap, access)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CanExecuteChanged, Command};
    use crate::notification::Listener;
    use crate::observable::{Observable, ValueChanged};

    #[test]
    fn brokers_are_created_lazily_and_cached() {
        let mut registry = BrokerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get::<CanExecuteChanged>().is_none());

        registry.broker::<CanExecuteChanged>().schedule_cleanup();
        assert!(registry.contains::<CanExecuteChanged>());
        // Same instance on the second lookup.
        assert!(registry.broker::<CanExecuteChanged>().is_cleanup_scheduled());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn kinds_get_separate_brokers() {
        let mut registry = BrokerRegistry::new();
        registry.broker::<CanExecuteChanged>();
        registry.broker::<ValueChanged<i32>>();
        registry.broker::<ValueChanged<String>>();
        assert_eq!(registry.len(), 3);
        assert!(format!("{registry:?}").contains("ValueChanged"));
    }

    #[test]
    fn brokers_inherit_registry_config() {
        let config = BrokerConfig::default().with_purge_on_add(true);
        let mut registry = BrokerRegistry::with_config(config.clone());
        assert_eq!(registry.broker::<CanExecuteChanged>().config(), &config);
    }

    #[test]
    fn cleanup_scheduled_visits_only_flagged_brokers() {
        let mut heap = Heap::new();
        let mut registry = BrokerRegistry::new();
        let cmd = heap.alloc(Command::new("x"));
        let obs = heap.alloc(Observable::new(0));
        let target = heap.alloc(());

        let on_cmd = Listener::<CanExecuteChanged>::bound(target, |_: &(), _, _| {});
        let on_obs = Listener::<ValueChanged<i32>>::bound(target, |_: &(), _, _| {});
        registry.broker::<CanExecuteChanged>().add_handler(&heap, cmd, &on_cmd).unwrap();
        registry.broker::<ValueChanged<i32>>().add_handler(&heap, obs, &on_obs).unwrap();
        assert_eq!(registry.total_sinks(), 2);

        heap.release(target);
        registry.broker::<CanExecuteChanged>().schedule_cleanup();
        assert_eq!(registry.cleanup_scheduled(&heap), 1);
        assert_eq!(registry.total_sinks(), 1);
        assert_eq!(registry.get::<CanExecuteChanged>().map(|b| b.stats().cleanups), Some(1));
        assert_eq!(registry.get::<ValueChanged<i32>>().map(|b| b.stats().cleanups), Some(0));
    }

    #[test]
    fn schedule_all_flags_only_brokers_with_sinks() {
        let mut heap = Heap::new();
        let mut registry = BrokerRegistry::new();
        let cmd = heap.alloc(Command::new("x"));
        let target = heap.alloc(());
        let listener = Listener::<CanExecuteChanged>::bound(target, |_: &(), _, _| {});
        registry.broker::<CanExecuteChanged>().add_handler(&heap, cmd, &listener).unwrap();
        let _ = registry.broker::<ValueChanged<i32>>();

        heap.release(target);
        assert_eq!(registry.schedule_all(), 1);
        assert_eq!(registry.get::<CanExecuteChanged>().map(|b| b.is_cleanup_scheduled()), Some(true));
        assert_eq!(registry.get::<ValueChanged<i32>>().map(|b| b.is_cleanup_scheduled()), Some(false));
        assert_eq!(registry.cleanup_scheduled(&heap), 1);
        assert_eq!(registry.total_sinks(), 0);
    }

    #[test]
    fn purge_all_empties_every_broker() {
        let mut heap = Heap::new();
        let mut registry = BrokerRegistry::new();
        let cmd = heap.alloc(Command::new("x"));
        let listener = Listener::<CanExecuteChanged>::unbound(|_, _| {});
        registry.broker::<CanExecuteChanged>().add_handler(&heap, cmd, &listener).unwrap();

        assert_eq!(registry.purge_all(&heap), 1);
        assert_eq!(registry.total_sinks(), 0);
        assert_eq!(heap.get(cmd).unwrap().handler_count(), 0);
    }

    #[test]
    fn foreign_shutdown_leaves_sources_untouched() {
        let mut heap = Heap::new();
        let mut registry = BrokerRegistry::new();
        let cmd = heap.alloc(Command::new("x"));
        let listener = Listener::<CanExecuteChanged>::unbound(|_, _| {});
        registry.broker::<CanExecuteChanged>().add_handler(&heap, cmd, &listener).unwrap();

        assert_eq!(registry.shutdown(&heap, Access::Foreign), 1);
        assert_eq!(registry.total_sinks(), 0);
        assert_eq!(heap.get(cmd).unwrap().handler_count(), 1);
    }
}
