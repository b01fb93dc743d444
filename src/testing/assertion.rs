use std::{
    fmt,
    panic::Location,
    sync::{Mutex, PoisonError},
};

use super::{ActionFilter, FilterBuilder, ForAssertion};
use crate::{
    Action, Reporter,
    store::{Reaction, Reactor},
};

/// A reactor that accumulates observations during an event and checks them
/// once the event's wait resolved.
pub trait ActionAssertion: Reactor {
    /// Compare what was observed against the expectation; report any
    /// mismatch through `reporter`.
    fn assert(&self, reporter: &Reporter);
}

type SatisfiesFn = Box<dyn Fn(&[Action]) -> Result<(), String> + Send + Sync>;

enum Expectation {
    Seen,
    NotSeen,
    Exactly(usize),
    AtLeast(usize),
    Satisfies(SatisfiesFn),
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Seen => f.write_str("Seen"),
            Expectation::NotSeen => f.write_str("NotSeen"),
            Expectation::Exactly(n) => f.debug_tuple("Exactly").field(n).finish(),
            Expectation::AtLeast(n) => f.debug_tuple("AtLeast").field(n).finish(),
            Expectation::Satisfies(_) => f.write_str("Satisfies"),
        }
    }
}

/// Captures every action matching its filter and checks the capture
/// against an expectation.
///
/// Built with [`assertion`](super::assertion):
///
/// ```rust
/// use ctrlcheck::testing::assertion;
///
/// let no_deletes = assertion("delete").on("widgets").is_not_seen();
/// let two_status_writes = assertion("update").on("widgets/status").seen_count_is(2);
/// ```
#[derive(Debug)]
pub struct Capture {
    filter: ActionFilter,
    expectation: Expectation,
    seen: Mutex<Vec<Action>>,
    location: &'static Location<'static>,
}

impl Capture {
    #[track_caller]
    fn new(filter: ActionFilter, expectation: Expectation) -> Self {
        Self {
            filter,
            expectation,
            seen: Mutex::new(Vec::new()),
            location: Location::caller(),
        }
    }

    pub fn filter(&self) -> &ActionFilter {
        &self.filter
    }

    /// Number of matching actions observed so far.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// The matching actions observed so far, in arrival order.
    pub fn captured(&self) -> Vec<Action> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Action>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Reactor for Capture {
    fn handles(&self, action: &Action) -> bool {
        self.filter.handles(action)
    }

    fn react(&self, action: &Action) -> Reaction {
        self.lock().push(action.clone());
        Reaction::Passthrough
    }
}

impl ActionAssertion for Capture {
    fn assert(&self, reporter: &Reporter) {
        let seen = self.lock();
        let count = seen.len();
        let failure = match &self.expectation {
            Expectation::Seen if count == 0 => {
                Some(format!("expected {} to be seen, but it was not", self.filter))
            }
            Expectation::NotSeen if count > 0 => Some(format!(
                "expected {} not to be seen, but it was seen {count} time(s)",
                self.filter
            )),
            Expectation::Exactly(n) if count != *n => Some(format!(
                "expected {} to be seen {n} time(s), but it was seen {count} time(s)",
                self.filter
            )),
            Expectation::AtLeast(n) if count < *n => Some(format!(
                "expected {} to be seen at least {n} time(s), but it was seen {count} time(s)",
                self.filter
            )),
            Expectation::Satisfies(check) => check(seen.as_slice())
                .err()
                .map(|message| format!("{}: {message}", self.filter)),
            _ => None,
        };
        if let Some(message) = failure {
            reporter.error_at(message, self.location);
        }
    }
}

impl FilterBuilder<ForAssertion> {
    /// At least one matching action.
    #[track_caller]
    pub fn is_seen(self) -> Capture {
        Capture::new(self.filter, Expectation::Seen)
    }

    /// No matching action at all.
    #[track_caller]
    pub fn is_not_seen(self) -> Capture {
        Capture::new(self.filter, Expectation::NotSeen)
    }

    #[track_caller]
    pub fn seen_count_is(self, count: usize) -> Capture {
        Capture::new(self.filter, Expectation::Exactly(count))
    }

    #[track_caller]
    pub fn seen_count_is_at_least(self, count: usize) -> Capture {
        Capture::new(self.filter, Expectation::AtLeast(count))
    }

    /// Run `check` over every matching action, in arrival order. An `Err`
    /// is reported as the failure message.
    ///
    /// ```rust
    /// use ctrlcheck::testing::assertion;
    ///
    /// // Only w1 and w2 may be touched
    /// let scoped = assertion("*").on("widgets").satisfies(|actions| {
    ///     match actions.iter().find(|a| !matches!(a.name(), Some("w1" | "w2") | None)) {
    ///         Some(stray) => Err(format!("unexpected {stray}")),
    ///         None => Ok(()),
    ///     }
    /// });
    /// ```
    #[track_caller]
    pub fn satisfies<F>(self, check: F) -> Capture
    where
        F: Fn(&[Action]) -> Result<(), String> + Send + Sync + 'static,
    {
        Capture::new(self.filter, Expectation::Satisfies(Box::new(check)))
    }
}

/// Checks that the actions matching `filters` were issued in that order.
///
/// The observed stream must contain a match of every filter as an ordered
/// subsequence; unrelated actions in between are allowed.
///
/// ```rust
/// use ctrlcheck::testing::{assert_in_order, assertion};
///
/// let get_before_update = assert_in_order([
///     assertion("get").on("widgets"),
///     assertion("update").on("widgets"),
/// ]);
/// ```
#[track_caller]
pub fn assert_in_order<F>(filters: impl IntoIterator<Item = F>) -> InOrderAssertion
where
    F: Into<ActionFilter>,
{
    InOrderAssertion {
        filters: filters.into_iter().map(Into::into).collect(),
        seen: Mutex::new(Vec::new()),
        location: Location::caller(),
    }
}

#[derive(Debug)]
pub struct InOrderAssertion {
    filters: Vec<ActionFilter>,
    seen: Mutex<Vec<Action>>,
    location: &'static Location<'static>,
}

impl InOrderAssertion {
    /// Length of the longest prefix of `filters` found, in order, in the
    /// observed stream.
    fn matched_prefix(&self) -> usize {
        let seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = 0;
        for action in seen.iter() {
            if self
                .filters
                .get(next)
                .is_some_and(|filter| filter.handles(action))
            {
                next += 1;
            }
        }
        next
    }
}

impl Reactor for InOrderAssertion {
    fn handles(&self, action: &Action) -> bool {
        self.filters.iter().any(|filter| filter.handles(action))
    }

    fn react(&self, action: &Action) -> Reaction {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action.clone());
        Reaction::Passthrough
    }
}

impl ActionAssertion for InOrderAssertion {
    fn assert(&self, reporter: &Reporter) {
        let matched = self.matched_prefix();
        let Some(missing) = self.filters.get(matched) else {
            return;
        };
        let message = match matched.checked_sub(1).and_then(|i| self.filters.get(i)) {
            Some(previous) => format!("expected {missing} to be seen after {previous}"),
            None => format!("expected {missing} to be seen first"),
        };
        reporter.error_at(message, self.location);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{GroupVersionResource, Object, ObjectMeta, testing::assertion};

    #[derive(Debug)]
    struct Widget {
        metadata: ObjectMeta,
    }

    impl Object for Widget {
        fn meta(&self) -> Option<&ObjectMeta> {
            Some(&self.metadata)
        }
    }

    fn widgets() -> GroupVersionResource {
        GroupVersionResource::new("example.com", "v1", "widgets")
    }

    fn create(name: &str) -> Action {
        Action::create(
            widgets(),
            "ns",
            Arc::new(Widget {
                metadata: ObjectMeta::new("ns", name),
            }),
        )
    }

    fn update(name: &str) -> Action {
        Action::update(
            widgets(),
            "ns",
            Arc::new(Widget {
                metadata: ObjectMeta::new("ns", name),
            }),
        )
    }

    fn feed(assertion: &dyn ActionAssertion, actions: &[Action]) {
        for action in actions {
            if assertion.handles(action) {
                assertion.react(action);
            }
        }
    }

    fn mixed_stream() -> Vec<Action> {
        vec![
            create("a"),
            update("a"),
            create("b"),
            update("b"),
            create("c"),
        ]
    }

    #[test]
    fn counts_only_matching_actions() {
        let creates = assertion("create").seen_count_is(3);
        feed(&creates, &mixed_stream());
        assert_eq!(creates.count(), 3);
        assert_eq!(
            creates
                .captured()
                .iter()
                .filter_map(|a| a.name().map(str::to_owned))
                .collect::<Vec<_>>(),
            ["a", "b", "c"]
        );

        let reporter = Reporter::new("case");
        creates.assert(&reporter);
        assert!(!reporter.has_failed());
    }

    #[test]
    fn count_mismatch_is_reported_at_declaration() {
        let reporter = Reporter::new("case");
        let updates = assertion("update").on("widgets").seen_count_is(1);
        feed(&updates, &mixed_stream());
        updates.assert(&reporter);

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].message(),
            "expected update on widgets named * in * to be seen 1 time(s), but it was seen 2 time(s)"
        );
        assert!(failures[0].location().file().ends_with("assertion.rs"));
    }

    #[test]
    fn seen_and_not_seen() {
        let reporter = Reporter::new("case");
        let seen = assertion("create").named("b").is_seen();
        let unseen = assertion("delete").is_not_seen();
        let missing = assertion("create").named("z").is_seen();
        let present = assertion("update").is_not_seen();
        for a in [&seen as &dyn ActionAssertion, &unseen, &missing, &present] {
            feed(a, &mixed_stream());
            a.assert(&reporter);
        }

        let messages: Vec<_> = reporter
            .failures()
            .iter()
            .map(|f| f.message().to_owned())
            .collect();
        assert_eq!(
            messages,
            [
                "expected create on */* named z in * to be seen, but it was not",
                "expected update on */* named * in * not to be seen, but it was seen 2 time(s)",
            ]
        );
    }

    #[test]
    fn at_least() {
        let reporter = Reporter::new("case");
        let enough = assertion("create").seen_count_is_at_least(2);
        let too_few = assertion("update").seen_count_is_at_least(3);
        feed(&enough, &mixed_stream());
        feed(&too_few, &mixed_stream());
        enough.assert(&reporter);
        too_few.assert(&reporter);
        assert_eq!(reporter.failures().len(), 1);
        assert!(reporter.failures()[0].message().contains("at least 3"));
    }

    #[test]
    fn satisfies_reports_the_returned_message() {
        let reporter = Reporter::new("case");
        let names_a_only = assertion("update").satisfies(|actions| {
            match actions.iter().find(|a| a.name() != Some("a")) {
                Some(stray) => Err(format!("unexpected {stray}")),
                None => Ok(()),
            }
        });
        feed(&names_a_only, &mixed_stream());
        names_a_only.assert(&reporter);

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].message(),
            "update on */* named * in *: unexpected update widgets b in ns"
        );
    }

    #[test]
    fn in_order_accepts_a_subsequence() {
        let reporter = Reporter::new("case");
        let order = assert_in_order([
            assertion("create").named("a"),
            assertion("create").named("b"),
            assertion("update").named("b"),
        ]);
        feed(&order, &mixed_stream());
        order.assert(&reporter);
        assert!(!reporter.has_failed());
    }

    #[test]
    fn in_order_reports_the_first_missing_step() {
        let reporter = Reporter::new("case");
        let order = assert_in_order([
            assertion("create").named("c"),
            assertion("update").named("a"),
        ]);
        feed(&order, &mixed_stream());
        order.assert(&reporter);

        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(
            failures[0].message(),
            "expected update on */* named a in * to be seen after create on */* named c in *"
        );
    }
}
