//! Simulated controller manager.
//!
//! Runs [`Reconciler`]s as Tokio tasks next to the test driver. Writes that
//! reach the store are routed to every controller watching the written
//! resource as a [`Request`] naming the changed object.

mod controller;
mod handler;
mod manager;
mod router;

pub use controller::{Reconciler, Request};
pub use manager::Manager;
