use std::{fmt, future::Future, sync::Arc, time::Duration};

use futures_util::future::BoxFuture;
use tracing::Instrument;

use super::{ActionAssertion, ActionVerifier, orchestrator::run_event};
use crate::{
    Config, GroupVersionResource, ObjectRef, Report, Reporter, Result,
    sim::Manager,
    store::{Client, Reactor},
};

/// Issues an event's trigger through the client and returns once it was issued.
pub type GenerateEventFn = Box<dyn FnOnce(Client) -> BoxFuture<'static, Result> + Send>;

/// Registers controllers with the manager before it starts.
pub type AddControllerFn = Box<dyn FnOnce(&mut Manager) -> Result + Send>;

/// One step of a [`ControllerTestCase`]: a trigger plus what the controllers
/// are expected to do in response.
///
/// ```rust
/// use std::time::Duration;
/// use ctrlcheck::GroupVersionResource;
/// use ctrlcheck::testing::{ControllerTestEvent, assertion, verify};
///
/// let widgets = GroupVersionResource::new("example.com", "v1", "widgets");
/// let event = ControllerTestEvent::new("delete-widget", move |client| async move {
///     client.delete(&widgets, "ns", "w1")
/// })
/// .with_verifier(verify("delete").on("widgets").named("w1").is_seen())
/// .with_assertion(assertion("create").is_not_seen())
/// .with_timeout(Duration::from_secs(1));
/// ```
pub struct ControllerTestEvent {
    pub name: String,
    pub execute: GenerateEventFn,
    pub verifier: Option<Arc<dyn ActionVerifier>>,
    pub assertions: Vec<Arc<dyn ActionAssertion>>,
    pub reactors: Vec<Arc<dyn Reactor>>,
    /// Overrides [`Config::default_timeout`] for this event.
    pub timeout: Option<Duration>,
}

impl ControllerTestEvent {
    pub fn new<F, Fut>(name: impl Into<String>, execute: F) -> Self
    where
        F: FnOnce(Client) -> Fut + Send + 'static,
        Fut: Future<Output = Result> + Send + 'static,
    {
        Self {
            name: name.into(),
            execute: Box::new(move |client| -> BoxFuture<'static, Result> {
                Box::pin(execute(client))
            }),
            verifier: None,
            assertions: Vec::new(),
            reactors: Vec::new(),
            timeout: None,
        }
    }

    /// Wait for `verifier` to fire before running the assertions.
    /// Without a verifier the assertions run right after the trigger.
    pub fn with_verifier(mut self, verifier: impl ActionVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    pub fn with_assertion(mut self, assertion: impl ActionAssertion + 'static) -> Self {
        self.assertions.push(Arc::new(assertion));
        self
    }

    /// Install `reactor` for the duration of this event.
    pub fn with_reactor(mut self, reactor: impl Reactor + 'static) -> Self {
        self.reactors.push(Arc::new(reactor));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl fmt::Debug for ControllerTestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerTestEvent")
            .field("name", &self.name)
            .field("verifier", &self.verifier.as_ref().map(|v| v.pending()))
            .field("assertions", &self.assertions.len())
            .field("reactors", &self.reactors.len())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Drives controllers through a scripted series of events.
///
/// - Seeds the store with `resources` (no watch events, but controllers see
///   them through their initial resync).
/// - Registers controllers, starts the manager.
/// - Runs every event in order; see [`ControllerTestEvent`].
/// - Stops the manager and returns the [`Report`].
///
/// Failures never abort the run, so one report lists everything that went
/// wrong. Finish with [`Report::assert_passed`] in a `#[tokio::test]`.
///
/// # Example
///
/// ```rust
/// use ctrlcheck::{GroupVersionResource, Result, sim::{Reconciler, Request}};
/// use ctrlcheck::testing::{ControllerTestCase, ControllerTestEvent, verify};
///
/// struct Noop;
/// impl Reconciler for Noop {
///     async fn reconcile(&mut self, _request: &Request) -> Result { Ok(()) }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let configmaps = GroupVersionResource::core("v1", "configmaps");
/// let watches = [configmaps.clone()];
///
/// let report = ControllerTestCase::new("lookup")
///     .with_controller(move |manager| manager.add_controller("noop", &watches, |_| Noop))
///     .with_event(
///         ControllerTestEvent::new("list", move |client| async move {
///             client.list(&configmaps, "ns").map(|_| ())
///         })
///         .with_verifier(verify("list").on("configmaps").is_seen()),
///     )
///     .run()
///     .await;
///
/// report.assert_passed();
/// # }
/// ```
pub struct ControllerTestCase {
    pub name: String,
    pub config: Config,
    pub add_controllers: Vec<AddControllerFn>,
    pub resources: Vec<(GroupVersionResource, ObjectRef)>,
    pub events: Vec<ControllerTestEvent>,
}

impl ControllerTestCase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: Config::default(),
            add_controllers: Vec::new(),
            resources: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_controller<F>(mut self, add: F) -> Self
    where
        F: FnOnce(&mut Manager) -> Result + Send + 'static,
    {
        self.add_controllers.push(Box::new(add));
        self
    }

    /// Seed the store with `object` before the controllers start.
    pub fn with_resource(mut self, resource: GroupVersionResource, object: ObjectRef) -> Self {
        self.resources.push((resource, object));
        self
    }

    pub fn with_event(mut self, event: ControllerTestEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Run the test case to completion.
    pub async fn run(self) -> Report {
        let span = tracing::info_span!("test_case", name = %self.name);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> Report {
        let ControllerTestCase {
            name,
            config,
            add_controllers,
            resources,
            events,
        } = self;
        let reporter = Reporter::new(name);
        let client = Client::new();

        for (resource, object) in resources {
            if let Err(e) = client.tracker().add(&resource, object) {
                reporter.error(format!("failed to seed {resource}: {e}"));
            }
        }

        let mut manager = match Manager::new(client.clone(), config.clone()) {
            Ok(manager) => manager,
            Err(e) => {
                reporter.error(format!("failed to create the manager: {e}"));
                return reporter.report();
            }
        };
        for add in add_controllers {
            if let Err(e) = add(&mut manager) {
                reporter.error(format!("failed to add controller: {e}"));
                return reporter.report();
            }
        }
        if let Err(e) = manager.start().await {
            reporter.error(format!("failed to start the manager: {e}"));
            return reporter.report();
        }

        for event in events {
            run_event(&client, event, &reporter, &config).await;
        }

        if let Err(e) = manager.stop().await {
            reporter.error(format!("controller manager failed: {e}"));
        }

        let report = reporter.report();
        tracing::info!(
            passed = report.passed(),
            failures = report.failures().len(),
            "test case finished"
        );
        report
    }
}

impl fmt::Debug for ControllerTestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerTestCase")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("controllers", &self.add_controllers.len())
            .field("resources", &self.resources.len())
            .field("events", &self.events)
            .finish()
    }
}
