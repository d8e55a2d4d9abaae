#![forbid(unsafe_code)]

//! Runtime: the weak event subscription broker.
//!
//! # Role in Tether
//! `tether-runtime` wires change notifications (a command's availability,
//! an observable's value) to many UI listeners without letting the wiring
//! keep either side alive. Objects leave the [`Heap`](tether_core::Heap)
//! on their own schedule; the broker delivers to whatever is still alive
//! and quietly forgets the rest.
//!
//! # Primary responsibilities
//! - **Broker**: add/remove subscriptions, deferred and forced purges.
//! - **AliveTable**: keeps listener delegates alive exactly as long as
//!   their target object.
//! - **BrokerRegistry / UiContext**: one broker per notification kind,
//!   scoped to the UI thread's context.
//! - **Notification kinds**: [`CanExecuteChanged`] on [`Command`] and
//!   [`ValueChanged`] on [`Observable`].
//!
//! # How it fits in the system
//! Toolkit code allocates sources and widgets in a [`UiContext`], subscribes
//! with [`UiContext::add_handler`], and calls [`UiContext::process_idle`]
//! from the dispatcher's idle hook so scheduled cleanups run off the
//! delivery path.

pub mod alive;
pub mod broker;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod notification;
pub mod observable;
pub mod registry;
mod sink;
mod source_table;

pub use alive::{AliveTable, RetainedShape};
pub use broker::{Access, Broker, BrokerStats};
pub use command::{CanExecuteChanged, Command, RequeryHub};
pub use config::{BrokerConfig, RuntimeConfig};
pub use context::UiContext;
pub use error::BrokerError;
pub use notification::{Listener, Notification};
pub use observable::{Observable, ValueChange, ValueChanged};
pub use registry::{AnyBroker, BrokerRegistry};
