//! ctrlcheck - deterministic test harness for controllers
//!
//! Runs controllers against a simulated object store and checks, event by
//! event, which actions they issue: wait for an expected action with a
//! timeout, assert over everything they did, and override store responses
//! to exercise error paths.
//!
//! - [`store`]: the simulated store, its [`Client`](store::Client) and the
//!   reaction chain every action flows through.
//! - [`sim`]: a controller manager running [`Reconciler`](sim::Reconciler)s
//!   on tokio tasks, fed by store watch events.
//! - [`testing`]: filters, verifiers, assertions, reactors and the
//!   [`ControllerTestCase`](testing::ControllerTestCase) driver.
//!
//! See `demos/widget_controller.rs`.

mod action;
mod config;
mod error;
mod object;
mod reporter;
mod resource;

pub mod sim;
pub mod store;
pub mod testing;

pub use action::{Action, ActionScope};
pub use config::Config;
pub use error::{BoxError, Error};
pub use object::{AsAny, Object, ObjectMeta, ObjectRef, accessor};
pub use reporter::{Failure, Report, Reporter};
pub use resource::GroupVersionResource;

#[cfg(feature = "macros")]
pub use ctrlcheck_macros::Object;

pub type Result<T = ()> = std::result::Result<T, Error>;
