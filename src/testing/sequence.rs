use std::{
    panic::Location,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures_util::future::BoxFuture;

use super::{ActionVerifier, completion::Completion};
use crate::{
    Action, Reporter,
    store::{Reaction, Reactor},
};

/// Fires once every step fired, each one only after its predecessor.
///
/// Only the current step is offered actions, so an action matching a later
/// step before its turn is ignored.
///
/// ```rust
/// use ctrlcheck::testing::{verify, verify_in_order};
///
/// let rollout = verify_in_order([
///     verify("create").on("widgets").is_seen(),
///     verify("update").on("widgets/status").is_seen(),
/// ]);
/// ```
#[track_caller]
pub fn verify_in_order<V>(steps: impl IntoIterator<Item = V>) -> InOrder
where
    V: ActionVerifier + 'static,
{
    InOrder::new(boxed(steps))
}

/// Fires once every step fired, in any order.
///
/// An action satisfies at most one step, so listing the same expectation
/// twice waits for two matching actions.
#[track_caller]
pub fn verify_all<V>(steps: impl IntoIterator<Item = V>) -> AllOf
where
    V: ActionVerifier + 'static,
{
    AllOf::new(boxed(steps))
}

fn boxed<V>(steps: impl IntoIterator<Item = V>) -> Vec<Box<dyn ActionVerifier>>
where
    V: ActionVerifier + 'static,
{
    steps
        .into_iter()
        .map(|step| Box::new(step) as Box<dyn ActionVerifier>)
        .collect()
}

pub struct InOrder {
    steps: Vec<Box<dyn ActionVerifier>>,
    next: AtomicUsize,
    gate: Mutex<()>,
    completion: Completion,
    location: &'static Location<'static>,
}

impl InOrder {
    #[track_caller]
    pub fn new(steps: Vec<Box<dyn ActionVerifier>>) -> Self {
        let sequence = Self {
            steps,
            next: AtomicUsize::new(0),
            gate: Mutex::new(()),
            completion: Completion::new(),
            location: Location::caller(),
        };
        if sequence.steps.is_empty() {
            sequence.completion.fire();
        }
        sequence
    }

    fn current(&self) -> Option<(usize, &(dyn ActionVerifier + 'static))> {
        let index = self.next.load(Ordering::Acquire);
        self.steps.get(index).map(|step| (index, &**step))
    }
}

impl Reactor for InOrder {
    fn handles(&self, action: &Action) -> bool {
        self.current().is_some_and(|(_, step)| step.handles(action))
    }

    fn react(&self, action: &Action) -> Reaction {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((index, step)) = self.current() else {
            return Reaction::Passthrough;
        };
        if !step.handles(action) {
            return Reaction::Passthrough;
        }
        step.react(action);
        if step.has_fired() {
            self.next.store(index + 1, Ordering::Release);
            tracing::debug!(step = index, total = self.steps.len(), "sequence advanced");
            if index + 1 == self.steps.len() {
                self.completion.fire();
            }
        }
        Reaction::Passthrough
    }
}

impl ActionVerifier for InOrder {
    fn wait(&self, timeout: Duration) -> BoxFuture<'_, bool> {
        Box::pin(self.completion.wait(timeout))
    }

    fn has_fired(&self) -> bool {
        self.completion.has_fired()
    }

    fn inject_reporter(&self, reporter: Reporter) {
        for step in &self.steps {
            step.inject_reporter(reporter.clone());
        }
    }

    fn pending(&self) -> String {
        match self.current() {
            Some((index, step)) => format!(
                "{} (step {} of {})",
                step.pending(),
                index + 1,
                self.steps.len()
            ),
            None => String::new(),
        }
    }

    fn location(&self) -> Option<&'static Location<'static>> {
        Some(self.location)
    }
}

pub struct AllOf {
    steps: Vec<Box<dyn ActionVerifier>>,
    gate: Mutex<()>,
    completion: Completion,
    location: &'static Location<'static>,
}

impl AllOf {
    #[track_caller]
    pub fn new(steps: Vec<Box<dyn ActionVerifier>>) -> Self {
        let all = Self {
            steps,
            gate: Mutex::new(()),
            completion: Completion::new(),
            location: Location::caller(),
        };
        if all.steps.is_empty() {
            all.completion.fire();
        }
        all
    }

    fn armed(&self) -> impl Iterator<Item = &(dyn ActionVerifier + 'static)> {
        self.steps.iter().map(|step| &**step).filter(|step| !step.has_fired())
    }
}

impl Reactor for AllOf {
    fn handles(&self, action: &Action) -> bool {
        self.armed().any(|step| step.handles(action))
    }

    fn react(&self, action: &Action) -> Reaction {
        let _gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner);
        for step in self.armed() {
            if !step.handles(action) {
                continue;
            }
            step.react(action);
            if step.has_fired() {
                break;
            }
        }
        if self.steps.iter().all(|step| step.has_fired()) && self.completion.fire() {
            tracing::debug!(total = self.steps.len(), "all verifiers fired");
        }
        Reaction::Passthrough
    }
}

impl ActionVerifier for AllOf {
    fn wait(&self, timeout: Duration) -> BoxFuture<'_, bool> {
        Box::pin(self.completion.wait(timeout))
    }

    fn has_fired(&self) -> bool {
        self.completion.has_fired()
    }

    fn inject_reporter(&self, reporter: Reporter) {
        for step in &self.steps {
            step.inject_reporter(reporter.clone());
        }
    }

    fn pending(&self) -> String {
        self.armed()
            .map(|step| step.pending())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn location(&self) -> Option<&'static Location<'static>> {
        Some(self.location)
    }
}
