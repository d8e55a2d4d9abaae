#![forbid(unsafe_code)]

//! Notification kinds.
//!
//! A [`Notification`] names one kind of change notification and tells the
//! broker how to attach to it: which source type raises it, what payload it
//! carries, and where the source's event registration point is. The
//! registration point may live on a different object than the source (a
//! proxy event); listeners still see the source as sender.

use tether_core::{Delegate, HandlerRef, Heap};

/// One kind of change notification.
pub trait Notification: 'static {
    /// Object that raises the notification.
    type Source: 'static;
    /// Payload delivered with each raise.
    type Args: 'static;

    /// Stable name used in logs.
    const NAME: &'static str;

    /// Attach `handler` to the source's event.
    fn subscribe(heap: &Heap, source: &Self::Source, handler: HandlerRef<Self::Args>);

    /// Detach `handler` from the source's event. Returns `false` if it
    /// was not attached.
    fn unsubscribe(heap: &Heap, source: &Self::Source, handler: &HandlerRef<Self::Args>) -> bool;
}

/// Listener delegate for notification kind `K`.
pub type Listener<K> = Delegate<<K as Notification>::Source, <K as Notification>::Args>;
