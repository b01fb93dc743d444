use std::sync::Arc;

use tracing::Instrument;

use super::ControllerTestEvent;
use crate::{
    Config, Reporter,
    store::{Client, Reactor, ReactorId},
};

/// Removes the event's reactors from the client when dropped, so nothing an
/// event installed outlives it, even if the driver is cancelled mid-wait.
struct Installed<'a> {
    client: &'a Client,
    ids: Vec<ReactorId>,
}

impl<'a> Installed<'a> {
    fn new(client: &'a Client) -> Self {
        Self {
            client,
            ids: Vec::new(),
        }
    }

    fn add(&mut self, reactor: Arc<dyn Reactor>) {
        self.ids.push(self.client.add_reactor(reactor));
    }
}

impl Drop for Installed<'_> {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            self.client.remove_reactor(id);
        }
    }
}

/// Run a single event against the controllers behind `client`.
///
/// 1. Installs the verifier, the assertions, then the event's reactors.
/// 2. Issues the trigger.
/// 3. Waits for the verifier, at most the event's timeout.
/// 4. Runs every assertion.
/// 5. Uninstalls everything it installed.
///
/// Failures are reported under `<case>/<event>`; none of them stops the event
/// early, except a failing trigger, which skips the wait.
pub async fn run_event(
    client: &Client,
    event: ControllerTestEvent,
    reporter: &Reporter,
    config: &Config,
) {
    let span = tracing::info_span!("event", name = %event.name);
    drive(client, event, reporter, config).instrument(span).await
}

async fn drive(client: &Client, event: ControllerTestEvent, reporter: &Reporter, config: &Config) {
    let ControllerTestEvent {
        name,
        execute,
        verifier,
        assertions,
        reactors,
        timeout,
    } = event;
    let reporter = reporter.scoped(&name);
    let timeout = timeout.unwrap_or(config.default_timeout);

    // Observers go first so actions overridden by a reactor are still seen.
    let mut installed = Installed::new(client);
    if let Some(verifier) = &verifier {
        verifier.inject_reporter(reporter.clone());
        installed.add(verifier.clone());
    }
    for assertion in &assertions {
        installed.add(assertion.clone());
    }
    for reactor in reactors {
        installed.add(reactor);
    }

    tracing::debug!("triggering event");
    match execute(client.clone()).await {
        Err(e) => reporter.error(format!("event trigger failed: {e}")),
        Ok(()) => {
            if let Some(verifier) = &verifier {
                if verifier.wait(timeout).await {
                    let message = format!(
                        "timed out after {timeout:?} waiting for {}",
                        verifier.pending()
                    );
                    match verifier.location() {
                        Some(location) => reporter.error_at(message, location),
                        None => reporter.error(message),
                    }
                }
            }
        }
    }

    for assertion in &assertions {
        assertion.assert(&reporter);
    }
    drop(installed);
    tracing::debug!(failed = reporter.has_failed(), "event finished");
}
