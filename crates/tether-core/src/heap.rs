#![forbid(unsafe_code)]

//! Object heap for one UI thread.
//!
//! The heap stands in for a managed object space. Objects are allocated
//! into a generation-checked [`Arena`] and referenced from the outside only
//! through [`WeakHandle`]s. Liveness is an explicit query instead of a
//! collector fact: an object is alive until [`Heap::release`] retires it.
//!
//! # Failure Modes
//!
//! - **Transient strong refs**: [`Heap::upgrade`] hands out an `Rc<T>`.
//!   Holding it past a `release` keeps the value's memory around, but the
//!   handle is still reported dead. Callers use upgraded refs for the
//!   duration of a call, never store them.
//! - **Wrong type**: upgrading a handle minted for another type yields
//!   `None`, indistinguishable from a dead object.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::arena::Arena;
use crate::handle::{ObjectId, WeakHandle};

/// Object space with generation-checked weak handles.
#[derive(Default)]
pub struct Heap {
    objects: Arena<Rc<dyn Any>>,
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("live", &self.objects.len())
            .finish()
    }
}

impl Heap {
    /// Create an empty heap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `value` and return a weak handle to it.
    pub fn alloc<T: 'static>(&mut self, value: T) -> WeakHandle<T> {
        let key = self.objects.insert(Rc::new(value));
        let handle = WeakHandle::new(ObjectId(key));
        trace!(object = %handle.id(), ty = std::any::type_name::<T>(), "heap alloc");
        handle
    }

    /// Recover a strong reference while the object is alive.
    #[must_use]
    pub fn upgrade<T: 'static>(&self, handle: WeakHandle<T>) -> Option<Rc<T>> {
        let any = self.objects.get(handle.id().key())?;
        Rc::clone(any).downcast::<T>().ok()
    }

    /// Borrow the object behind `handle` while it is alive.
    #[must_use]
    pub fn get<T: 'static>(&self, handle: WeakHandle<T>) -> Option<&T> {
        let any = self.objects.get(handle.id().key())?;
        (**any).downcast_ref::<T>()
    }

    /// Whether the object named by `id` is still alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: impl Into<ObjectId>) -> bool {
        self.objects.contains(id.into().key())
    }

    /// Retire an object. Every handle to it stops resolving.
    ///
    /// Returns `false` if it was already released.
    pub fn release(&mut self, id: impl Into<ObjectId>) -> bool {
        let id = id.into();
        let released = self.objects.remove(id.key()).is_some();
        if released {
            trace!(object = %id, "heap release");
        }
        released
    }

    /// Number of live objects.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.objects.len()
    }

    /// Release every object.
    pub fn clear(&mut self) {
        self.objects.clear();
    }
}
