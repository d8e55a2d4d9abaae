#![forbid(unsafe_code)]

//! Listener retention keyed by target.
//!
//! Sinks reference their listener weakly, so something else must keep the
//! listener delegate alive for as long as its target is alive, without
//! keeping the target itself alive. [`AliveTable`] is that something: it
//! maps each target to the delegate(s) registered against it. Keys are
//! [`Target`]s (weak), values are strong delegates.
//!
//! The common case is one delegate per target, stored inline. A target that
//! subscribes more than once is upgraded to a list.
//!
//! # Invariants
//!
//! 1. Releasing the last delegate for a target removes the entry.
//! 2. After [`AliveTable::sweep`], no entry has a dead target.
//! 3. All unbound delegates share the [`Target::Static`] key.

use std::collections::hash_map::Entry;
use std::fmt;

use rustc_hash::FxHashMap;
use tether_core::{Delegate, Heap, Target};

enum Retained<S, A> {
    Single(Delegate<S, A>),
    Many(Vec<Delegate<S, A>>),
}

/// Storage shape of one entry, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetainedShape {
    /// One delegate stored inline.
    Single,
    /// Delegates stored in a list of the given length.
    Many(usize),
}

/// Target-keyed retention table for listener delegates.
pub struct AliveTable<S, A> {
    entries: FxHashMap<Target, Retained<S, A>>,
}

impl<S, A> Default for AliveTable<S, A> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<S, A> fmt::Debug for AliveTable<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliveTable")
            .field("targets", &self.entries.len())
            .field("delegates", &self.delegate_count())
            .finish()
    }
}

impl<S, A> AliveTable<S, A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `delegate` alive for as long as its target is.
    pub fn retain(&mut self, delegate: &Delegate<S, A>) {
        match self.entries.entry(delegate.target()) {
            Entry::Vacant(slot) => {
                slot.insert(Retained::Single(delegate.clone()));
            }
            Entry::Occupied(mut slot) => {
                let retained = slot.get_mut();
                match retained {
                    Retained::Many(list) => list.push(delegate.clone()),
                    Retained::Single(old) => {
                        let old = old.clone();
                        *retained = Retained::Many(vec![old, delegate.clone()]);
                    }
                }
            }
        }
    }

    /// Drop one retention of `delegate`. Returns `false` if it was not held.
    pub fn release(&mut self, delegate: &Delegate<S, A>) -> bool {
        let target = delegate.target();
        let Some(retained) = self.entries.get_mut(&target) else {
            return false;
        };
        let (released, emptied) = match retained {
            Retained::Single(held) => {
                let hit = held.ptr_eq(delegate);
                (hit, hit)
            }
            Retained::Many(list) => match list.iter().position(|d| d.ptr_eq(delegate)) {
                Some(pos) => {
                    list.remove(pos);
                    (true, list.is_empty())
                }
                None => (false, false),
            },
        };
        if emptied {
            self.entries.remove(&target);
        }
        released
    }

    /// Drop every entry whose target is dead. Returns how many were dropped.
    pub fn sweep(&mut self, heap: &Heap) -> usize {
        let before = self.entries.len();
        self.entries.retain(|target, _| target.is_alive(heap));
        before - self.entries.len()
    }

    /// Whether `delegate` is currently retained.
    #[must_use]
    pub fn holds(&self, delegate: &Delegate<S, A>) -> bool {
        match self.entries.get(&delegate.target()) {
            Some(Retained::Single(held)) => held.ptr_eq(delegate),
            Some(Retained::Many(list)) => list.iter().any(|d| d.ptr_eq(delegate)),
            None => false,
        }
    }

    #[must_use]
    pub fn contains_target(&self, target: Target) -> bool {
        self.entries.contains_key(&target)
    }

    #[must_use]
    pub fn shape(&self, target: Target) -> Option<RetainedShape> {
        self.entries.get(&target).map(|retained| match retained {
            Retained::Single(_) => RetainedShape::Single,
            Retained::Many(list) => RetainedShape::Many(list.len()),
        })
    }

    /// Number of targets with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of retained delegates across all targets.
    #[must_use]
    pub fn delegate_count(&self) -> usize {
        self.entries
            .values()
            .map(|retained| match retained {
                Retained::Single(_) => 1,
                Retained::Many(list) => list.len(),
            })
            .sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
