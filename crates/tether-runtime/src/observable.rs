#![forbid(unsafe_code)]

//! Observable value with change notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value in a `RefCell` and exposes a
//! [`ValueChange`] event. When the value changes (determined by
//! `PartialEq`), every handler on the event is notified in registration
//! order. Observables are ordinary heap objects, so listeners normally
//! subscribe through the broker under the [`ValueChanged<T>`] kind and are
//! never kept alive by the observable.
//!
//! # Performance
//!
//! | Operation     | Complexity                  |
//! |---------------|-----------------------------|
//! | `get()`       | O(1) + clone                |
//! | `set()`       | O(H) where H = handlers     |
//! | `version()`   | O(1)                        |
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: the value borrow is released before handlers run,
//!   so a handler may call `set()` again. The nested change is delivered
//!   before the outer raise finishes.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

use tether_core::{Event, HandlerRef, Heap};

use crate::notification::Notification;

/// Payload of a value change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueChange<T> {
    pub old: T,
    pub new: T,
    /// Version after the change.
    pub version: u64,
}

struct ObservableInner<T> {
    value: T,
    version: u64,
}

/// A version-tracked value with change notification.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing mutation.
/// 2. `set(v)` where `v == current` is a no-op.
/// 3. Handlers are notified in registration order.
pub struct Observable<T> {
    inner: RefCell<ObservableInner<T>>,
    changed: Event<ValueChange<T>>,
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("handler_count", &self.changed.handler_count())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable with the given initial value.
    ///
    /// The initial version is 0 and no handlers are registered.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(ObservableInner { value, version: 0 }),
            changed: Event::new(),
        }
    }

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Set a new value, notifying handlers if it differs.
    pub fn set(&self, heap: &Heap, value: T) {
        let change = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            let old = std::mem::replace(&mut inner.value, value);
            inner.version += 1;
            ValueChange {
                old,
                new: inner.value.clone(),
                version: inner.version,
            }
        };
        self.changed.raise(heap, &change);
    }

    /// Modify the value in place, notifying handlers if it changed.
    pub fn update(&self, heap: &Heap, f: impl FnOnce(&mut T)) {
        let change = {
            let mut inner = self.inner.borrow_mut();
            let old = inner.value.clone();
            f(&mut inner.value);
            if inner.value == old {
                return;
            }
            inner.version += 1;
            ValueChange {
                old,
                new: inner.value.clone(),
                version: inner.version,
            }
        };
        self.changed.raise(heap, &change);
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of handlers on the change event.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.changed.handler_count()
    }
}

/// "Value changed" notification raised by [`Observable<T>`].
pub struct ValueChanged<T>(PhantomData<fn() -> T>);

impl<T: Clone + PartialEq + 'static> Notification for ValueChanged<T> {
    type Source = Observable<T>;
    type Args = ValueChange<T>;

    const NAME: &'static str = "ValueChanged";

    fn subscribe(_heap: &Heap, source: &Observable<T>, handler: HandlerRef<ValueChange<T>>) {
        source.changed.add(handler);
    }

    fn unsubscribe(_heap: &Heap, source: &Observable<T>, handler: &HandlerRef<ValueChange<T>>) -> bool {
        source.changed.remove(handler)
    }
}
