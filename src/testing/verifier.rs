use std::{
    fmt,
    panic::Location,
    sync::{Mutex, OnceLock, PoisonError},
    time::Duration,
};

use futures_util::future::BoxFuture;

use super::{ActionFilter, FilterBuilder, ForVerifier, completion::Completion};
use crate::{
    Action, BoxError, Reporter,
    store::{Reaction, Reactor},
};

/// A reactor the test driver can wait on.
///
/// A verifier fires at most once, from whichever task first issues an
/// action it accepts; the driver blocks in [`wait`](Self::wait) until then
/// or until the timeout elapses. Verifiers never claim actions.
pub trait ActionVerifier: Reactor {
    /// Wait until the verifier fired. Returns true if `timeout` elapsed first.
    ///
    /// Meant to be called once; later calls return `!has_fired()` right away.
    fn wait(&self, timeout: Duration) -> BoxFuture<'_, bool>;

    fn has_fired(&self) -> bool;

    /// Hand the verifier the reporter for failures found while observing
    /// actions. Must happen before the verifier is installed.
    fn inject_reporter(&self, reporter: Reporter);

    /// Rendering of what the verifier is still waiting for.
    fn pending(&self) -> String;

    /// Where the verifier was declared.
    fn location(&self) -> Option<&'static Location<'static>> {
        None
    }
}

type CheckFn = Box<dyn Fn(&Action) -> Result<bool, BoxError> + Send + Sync>;

/// Fires on the first action matching its filter and, if present, its
/// verification function.
///
/// Built with [`verify`](super::verify):
///
/// ```rust
/// use ctrlcheck::testing::verify;
///
/// // Any update of a widget's status
/// let seen = verify("update").on("widgets/status").is_seen();
///
/// // The first create of `w1` that carries metadata
/// let checked = verify("create").on("widgets").named("w1").passes(|action| {
///     Ok(action.object().is_some())
/// });
/// ```
pub struct Verifier {
    filter: ActionFilter,
    check: Option<CheckFn>,
    completion: Completion,
    /// Serializes evaluation so only the firing action is checked.
    gate: Mutex<()>,
    reporter: OnceLock<Reporter>,
    location: &'static Location<'static>,
}

impl Verifier {
    #[track_caller]
    pub fn new(filter: ActionFilter) -> Self {
        Self {
            filter,
            check: None,
            completion: Completion::new(),
            gate: Mutex::new(()),
            reporter: OnceLock::new(),
            location: Location::caller(),
        }
    }

    /// A verifier that fires only once `check` returns `Ok(true)`.
    ///
    /// `Ok(false)` keeps waiting for another action. An `Err` is reported as
    /// a failure and the verifier fires anyway, so the event doesn't hang
    /// until its timeout.
    #[track_caller]
    pub fn with_check<F>(filter: ActionFilter, check: F) -> Self
    where
        F: Fn(&Action) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self {
            check: Some(Box::new(check)),
            ..Self::new(filter)
        }
    }

    pub fn filter(&self) -> &ActionFilter {
        &self.filter
    }

    fn report(&self, message: String) {
        match self.reporter.get() {
            Some(reporter) => reporter.error_at(message, self.location),
            None => tracing::warn!(filter = %self.filter, "{message}"),
        }
    }
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("filter", &self.filter)
            .field("fired", &self.completion.has_fired())
            .finish_non_exhaustive()
    }
}

impl Reactor for Verifier {
    fn handles(&self, action: &Action) -> bool {
        self.filter.handles(action)
    }

    fn react(&self, action: &Action) -> Reaction {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        if self.completion.has_fired() {
            return Reaction::Passthrough;
        }
        let accepted = match &self.check {
            None => true,
            Some(check) => match check(action) {
                Ok(accepted) => accepted,
                Err(err) => {
                    self.report(format!("verification of `{action}` failed: {err}"));
                    true
                }
            },
        };
        if accepted && self.completion.fire() {
            tracing::debug!(filter = %self.filter, %action, "verifier fired");
        }
        Reaction::Passthrough
    }
}

impl ActionVerifier for Verifier {
    fn wait(&self, timeout: Duration) -> BoxFuture<'_, bool> {
        Box::pin(self.completion.wait(timeout))
    }

    fn has_fired(&self) -> bool {
        self.completion.has_fired()
    }

    fn inject_reporter(&self, reporter: Reporter) {
        let _ = self.reporter.set(reporter);
    }

    fn pending(&self) -> String {
        self.filter.to_string()
    }

    fn location(&self) -> Option<&'static Location<'static>> {
        Some(self.location)
    }
}

impl FilterBuilder<ForVerifier> {
    /// Fire on the first matching action.
    #[track_caller]
    pub fn is_seen(self) -> Verifier {
        Verifier::new(self.filter)
    }

    /// Fire on the first matching action `check` accepts.
    /// See [`Verifier::with_check`].
    #[track_caller]
    pub fn passes<F>(self, check: F) -> Verifier
    where
        F: Fn(&Action) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Verifier::with_check(self.filter, check)
    }
}
