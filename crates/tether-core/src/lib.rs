#![forbid(unsafe_code)]

//! Core: object heap, weak handles, events, and listener delegates.
//!
//! # Role in Tether
//! `tether-core` is the object model the subscription broker is written
//! against. It owns no policy: it only answers "is this object still
//! alive?" and "who is registered on this event?".
//!
//! # Primary responsibilities
//! - **Arena**: generation-checked slot storage; stale keys never resolve.
//! - **Heap / WeakHandle**: per-thread object space with weak handles and
//!   explicit release, the stand-in for collector-managed lifetimes.
//! - **Event**: multicast registration point with add/remove semantics.
//! - **Delegate**: listener callback with an identifiable target.
//!
//! # How it fits in the system
//! `tether-runtime` builds the weak-event broker on top of these types.
//! Toolkit objects expose [`Event`]s; listeners are [`Delegate`]s bound to
//! widgets living in the [`Heap`].

pub mod arena;
pub mod delegate;
pub mod event;
pub mod handle;
pub mod heap;

pub use arena::{Arena, ArenaKey};
pub use delegate::{Delegate, Target, WeakDelegate};
pub use event::{Event, Handler, HandlerRef};
pub use handle::{ObjectId, WeakHandle};
pub use heap::Heap;
