//! Declarative expectations about what controllers do to the store.
//!
//! A test case is a series of events. Each event issues a trigger (usually a
//! write through the [`Client`](crate::store::Client)) and declares:
//!
//! - a **verifier**, the action the controllers must eventually issue
//!   ([`verify`], [`verify_in_order`], [`verify_all`]);
//! - **assertions**, checked over every matching action once the verifier
//!   fired or timed out ([`assertion`], [`assert_in_order`]);
//! - **reactors**, overriding the outcome of matching actions for the
//!   duration of the event ([`react_to`]).
//!
//! All three are built on an [`ActionFilter`] with wildcard dimensions.
//!
//! # Example
//!
//! ```rust
//! use ctrlcheck::testing::{ControllerTestEvent, assertion, client_fails, react_to, verify};
//!
//! let event = ControllerTestEvent::new("install", |client| async move { Ok(()) })
//!     .with_verifier(verify("update").on("widgets/status").named("w1").is_seen())
//!     .with_assertion(assertion("delete").on("widgets").is_not_seen())
//!     .with_reactor(react_to("get").on("configmaps").with(client_fails()).times(1));
//! ```

mod action_filter;
mod assertion;
mod builder;
mod completion;
mod orchestrator;
mod reaction;
mod sequence;
mod test_case;
mod verifier;

pub use action_filter::{ActionFilter, WILDCARD};
pub use assertion::{ActionAssertion, Capture, InOrderAssertion, assert_in_order};
pub use builder::{
    FilterBuilder, ForAssertion, ForReactor, ForVerifier, assertion, react_to, verify,
};
pub use orchestrator::run_event;
pub use reaction::{
    FilteredReactor, already_exists, client_fails, fails_with, not_found, passthrough, returns,
};
pub use sequence::{AllOf, InOrder, verify_all, verify_in_order};
pub use test_case::{AddControllerFn, ControllerTestCase, ControllerTestEvent, GenerateEventFn};
pub use verifier::{ActionVerifier, Verifier};
