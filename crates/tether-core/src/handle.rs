#![forbid(unsafe_code)]

//! Weak object handles.
//!
//! An [`ObjectId`] names one object in a [`Heap`](crate::heap::Heap) for
//! exactly one lifetime: once the object is released the id never resolves
//! again, even if its slot is reused. [`WeakHandle<T>`] is the typed form
//! callers pass around.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::arena::ArenaKey;

/// Untyped identity of a heap object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) ArenaKey);

impl ObjectId {
    #[inline]
    #[must_use]
    pub(crate) fn key(self) -> ArenaKey {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:?})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.0.index(), self.0.generation())
    }
}

/// A reference to a heap object that does not keep it alive.
///
/// Resolve it with [`Heap::upgrade`](crate::heap::Heap::upgrade); test
/// liveness with [`Heap::is_alive`](crate::heap::Heap::is_alive).
pub struct WeakHandle<T> {
    id: ObjectId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> WeakHandle<T> {
    #[inline]
    pub(crate) fn new(id: ObjectId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Untyped identity of the referenced object.
    #[inline]
    #[must_use]
    pub fn id(self) -> ObjectId {
        self.id
    }
}

// Manual impls: `T` need not be Clone/Eq/Hash for the handle to be.
impl<T> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for WeakHandle<T> {}

impl<T> PartialEq for WeakHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for WeakHandle<T> {}

impl<T> Hash for WeakHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakHandle<{}>({})", short_type_name::<T>(), self.id)
    }
}

impl<T> From<WeakHandle<T>> for ObjectId {
    fn from(handle: WeakHandle<T>) -> Self {
        handle.id
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
