use std::{fmt, future::Future};

use crate::{Error, Result};

/// Names the object a reconcile pass should look at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Request {
    pub namespace: String,
    pub name: String,
}

impl Request {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// The controller under test.
///
/// A reconciler is built by the factory passed to
/// [`Manager::add_controller`](super::Manager::add_controller), which hands
/// it the [`Client`](crate::store::Client) it should talk to the store with.
/// It is then driven with one [`Request`] per observed change.
///
/// Although the trait methods return futures, you can implement them as
/// `async fn`; no `#[async_trait]` is required.
///
/// # Example
///
/// ```rust
/// use ctrlcheck::{GroupVersionResource, Result, sim::{Reconciler, Request}, store::Client};
///
/// struct PodWatcher {
///     client: Client,
/// }
///
/// impl Reconciler for PodWatcher {
///     async fn reconcile(&mut self, request: &Request) -> Result {
///         let pods = GroupVersionResource::core("v1", "pods");
///         let _pod = self.client.get(&pods, &request.namespace, &request.name)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Reconciler: Send + 'static {
    /// Bring the world in line with the object named by `request`.
    ///
    /// Equivalent to:
    ///
    /// ```ignore
    /// async fn reconcile(&mut self, request: &Request) -> Result;
    /// ```
    fn reconcile(&mut self, request: &Request) -> impl Future<Output = Result> + Send;

    /// Called when [`reconcile`](Reconciler::reconcile) fails.
    ///
    /// Return `Ok(())` to keep the controller running, or `Err(error)` to
    /// stop it; the error then surfaces from
    /// [`Manager::stop`](super::Manager::stop).
    ///
    /// # Default Behavior
    ///
    /// Logs the error and keeps going, the way a controller manager requeues
    /// failed requests instead of crashing.
    fn on_error(&self, request: &Request, error: Error) -> Result {
        tracing::warn!(%request, %error, "reconcile failed");
        Ok(())
    }
}
