#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! In-process event callbacks
//!
//! A small observer-pattern helper: an event owns an ordered list of
//! listeners and invokes them with the same arguments.
//!
//! - [`SyncEvent`]: plain functions, called one after another.
//! - [`AsyncEvent`]: async functions, either awaited one after another
//!   ([`AsyncEvent::ainvoke`]) or all at once ([`AsyncEvent::ginvoke`]).
//!
//! Listeners are `Arc` handles so the same handle can later be passed to
//! `unregister`. Registering a handle twice adds it twice.

pub mod async_event;
pub mod error;
pub mod registry;
pub mod sync_event;

pub use async_event::{AsyncEvent, AsyncListener};
pub use error::{EventError, EventResult, GatherError, ListenerFailure};
pub use registry::ListenerList;
pub use sync_event::{SyncEvent, SyncListener};
