#![forbid(unsafe_code)]

//! Per-source sink lists.
//!
//! Keys are [`ObjectId`]s, which never keep the source alive. The table
//! itself enforces nothing about emptiness; the broker drops an entry as
//! soon as its list empties.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tether_core::ObjectId;

use crate::notification::Notification;
use crate::sink::Sink;

pub(crate) struct SourceTable<K: Notification> {
    lists: FxHashMap<ObjectId, Vec<Rc<Sink<K>>>>,
}

impl<K: Notification> Default for SourceTable<K> {
    fn default() -> Self {
        Self {
            lists: FxHashMap::default(),
        }
    }
}

impl<K: Notification> fmt::Debug for SourceTable<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceTable")
            .field("sources", &self.lists.len())
            .field("sinks", &self.total_sinks())
            .finish()
    }
}

impl<K: Notification> SourceTable<K> {
    /// Append `sink` to the list for `source`, creating the list on demand.
    pub(crate) fn push(&mut self, source: ObjectId, sink: Rc<Sink<K>>) {
        self.lists.entry(source).or_default().push(sink);
    }

    pub(crate) fn get(&self, source: ObjectId) -> Option<&[Rc<Sink<K>>]> {
        self.lists.get(&source).map(Vec::as_slice)
    }

    pub(crate) fn get_mut(&mut self, source: ObjectId) -> Option<&mut Vec<Rc<Sink<K>>>> {
        self.lists.get_mut(&source)
    }

    /// Detach the whole list for `source` from the table.
    pub(crate) fn take(&mut self, source: ObjectId) -> Option<Vec<Rc<Sink<K>>>> {
        self.lists.remove(&source)
    }

    /// Drop the entry for `source` if its list is empty.
    pub(crate) fn drop_if_empty(&mut self, source: ObjectId) -> bool {
        if self.lists.get(&source).is_some_and(Vec::is_empty) {
            self.lists.remove(&source);
            true
        } else {
            false
        }
    }

    /// Snapshot of the current keys, for passes that mutate the table.
    pub(crate) fn sources(&self) -> Vec<ObjectId> {
        self.lists.keys().copied().collect()
    }

    pub(crate) fn contains(&self, source: ObjectId) -> bool {
        self.lists.contains_key(&source)
    }

    pub(crate) fn len(&self) -> usize {
        self.lists.len()
    }

    pub(crate) fn sink_count(&self, source: ObjectId) -> usize {
        self.lists.get(&source).map_or(0, Vec::len)
    }

    pub(crate) fn total_sinks(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }
}
