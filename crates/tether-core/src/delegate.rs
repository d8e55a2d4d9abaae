#![forbid(unsafe_code)]

//! Listener callbacks with an identifiable target.
//!
//! A [`Delegate`] is a reference-counted callback plus the [`Target`] whose
//! lifetime should govern it: the receiver object the callback is bound to,
//! or [`Target::Static`] when it has none. Bound delegates hold only a
//! [`WeakHandle`] to their receiver and resolve it through the heap on every
//! call, so a delegate never keeps its target alive.
//!
//! Identity is pointer identity: clones of a delegate are the same
//! delegate; two delegates built from equal closures are not.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::handle::{ObjectId, WeakHandle};
use crate::heap::Heap;

/// The object whose lifetime governs a delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// No receiver; shares one sentinel key.
    Static,
    /// Bound to a heap object.
    Object(ObjectId),
}

impl Target {
    /// Whether the target is still alive. [`Target::Static`] always is.
    #[must_use]
    pub fn is_alive(self, heap: &Heap) -> bool {
        match self {
            Self::Static => true,
            Self::Object(id) => heap.is_alive(id),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Object(id) => write!(f, "{id}"),
        }
    }
}

type Thunk<S, A> = dyn Fn(&Heap, &Rc<S>, &A) -> bool;

struct DelegateInner<S, A> {
    target: Target,
    thunk: Box<Thunk<S, A>>,
}

/// A listener callback receiving `(sender, args)`.
pub struct Delegate<S, A> {
    inner: Rc<DelegateInner<S, A>>,
}

impl<S, A> Clone for Delegate<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, A> fmt::Debug for Delegate<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("target", &self.inner.target)
            .field("ptr", &Rc::as_ptr(&self.inner))
            .finish()
    }
}

impl<S: 'static, A: 'static> Delegate<S, A> {
    /// A delegate with no receiver.
    pub fn unbound(f: impl Fn(&Rc<S>, &A) + 'static) -> Self {
        Self {
            inner: Rc::new(DelegateInner {
                target: Target::Static,
                thunk: Box::new(move |_: &Heap, sender: &Rc<S>, args: &A| {
                    f(sender, args);
                    true
                }),
            }),
        }
    }

    /// A delegate bound to `target`. The receiver is resolved at call time.
    pub fn bound<T: 'static>(target: WeakHandle<T>, f: impl Fn(&T, &Rc<S>, &A) + 'static) -> Self {
        Self {
            inner: Rc::new(DelegateInner {
                target: Target::Object(target.id()),
                thunk: Box::new(move |heap: &Heap, sender: &Rc<S>, args: &A| match heap.get(target) {
                    Some(receiver) => {
                        f(receiver, sender, args);
                        true
                    }
                    None => false,
                }),
            }),
        }
    }
}

impl<S, A> Delegate<S, A> {
    #[inline]
    #[must_use]
    pub fn target(&self) -> Target {
        self.inner.target
    }

    #[inline]
    #[must_use]
    pub fn is_target_alive(&self, heap: &Heap) -> bool {
        self.inner.target.is_alive(heap)
    }

    /// Call the delegate. Returns `false` if the bound receiver is gone.
    pub fn invoke(&self, heap: &Heap, sender: &Rc<S>, args: &A) -> bool {
        (self.inner.thunk)(heap, sender, args)
    }

    /// Same delegate (not merely an equal closure).
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A reference that does not keep the delegate alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakDelegate<S, A> {
        WeakDelegate {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Number of strong references, including this one.
    #[must_use]
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

/// Non-owning reference to a [`Delegate`].
pub struct WeakDelegate<S, A> {
    inner: Weak<DelegateInner<S, A>>,
}

impl<S, A> Clone for WeakDelegate<S, A> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<S, A> fmt::Debug for WeakDelegate<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDelegate")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<S, A> WeakDelegate<S, A> {
    /// Recover the delegate if anything still holds it.
    #[must_use]
    pub fn upgrade(&self) -> Option<Delegate<S, A>> {
        self.inner.upgrade().map(|inner| Delegate { inner })
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Whether this refers to `delegate`.
    #[must_use]
    pub fn refers_to(&self, delegate: &Delegate<S, A>) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Rc::as_ptr(&delegate.inner))
    }
}
