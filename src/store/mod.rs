//! Simulated object store.
//!
//! [`ObjectTracker`] holds typed objects keyed by resource, namespace and
//! name. [`Client`] fronts it with an ordered chain of [`Reactor`]s that see
//! every [`Action`](crate::Action) first and may answer it themselves, the
//! way a fake API client lets tests inject failures without touching stored
//! state. Successful writes are published as [`WatchEvent`]s for the
//! simulated controller manager.

mod client;
mod reactor;
mod tracker;
mod watch;

pub use client::{Client, ReactorId};
pub use reactor::{Reaction, Reactor, Response};
pub use tracker::ObjectTracker;
pub use watch::{WatchEvent, WatchEventKind};
