use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

use super::{ActionFilter, FilterBuilder, ForReactor};
use crate::{
    Action, Error, ObjectRef,
    store::{Reaction, Reactor},
};

type ReactionFn = Box<dyn Fn(&Action) -> Reaction + Send + Sync>;

/// Overrides the outcome of matching actions.
///
/// ```rust
/// use ctrlcheck::testing::{client_fails, react_to};
///
/// // Fail the first two status writes, then let them through
/// let flaky = react_to("update").on("widgets/status").with(client_fails()).times(2);
/// ```
pub struct FilteredReactor {
    filter: ActionFilter,
    reaction: ReactionFn,
    limit: Option<usize>,
    reacted: AtomicUsize,
}

impl FilteredReactor {
    pub fn new<F>(filter: ActionFilter, reaction: F) -> Self
    where
        F: Fn(&Action) -> Reaction + Send + Sync + 'static,
    {
        Self {
            filter,
            reaction: Box::new(reaction),
            limit: None,
            reacted: AtomicUsize::new(0),
        }
    }

    /// Only react to the first `count` matching actions; later ones pass
    /// through untouched.
    pub fn times(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    pub fn filter(&self) -> &ActionFilter {
        &self.filter
    }

    /// How many actions this reactor answered.
    pub fn reacted(&self) -> usize {
        let reacted = self.reacted.load(Ordering::Acquire);
        self.limit.map_or(reacted, |limit| reacted.min(limit))
    }
}

impl fmt::Debug for FilteredReactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilteredReactor")
            .field("filter", &self.filter)
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl Reactor for FilteredReactor {
    fn handles(&self, action: &Action) -> bool {
        self.filter.handles(action)
    }

    fn react(&self, action: &Action) -> Reaction {
        let previous = self.reacted.fetch_add(1, Ordering::AcqRel);
        if self.limit.is_some_and(|limit| previous >= limit) {
            return Reaction::Passthrough;
        }
        let reaction = (self.reaction)(action);
        if reaction.is_handled() {
            tracing::debug!(filter = %self.filter, %action, "action overridden");
        }
        reaction
    }
}

impl FilterBuilder<ForReactor> {
    /// Answer matching actions with `reaction`.
    pub fn with<F>(self, reaction: F) -> FilteredReactor
    where
        F: Fn(&Action) -> Reaction + Send + Sync + 'static,
    {
        FilteredReactor::new(self.filter, reaction)
    }
}

/// Fail every matching action with an internal error.
pub fn client_fails() -> impl Fn(&Action) -> Reaction + Send + Sync + 'static {
    |action: &Action| Reaction::fail(Error::internal(format!("simulated failure of `{action}`")))
}

/// Fail every matching action with [`Error::NotFound`].
pub fn not_found() -> impl Fn(&Action) -> Reaction + Send + Sync + 'static {
    |action: &Action| {
        Reaction::fail(Error::NotFound {
            resource: action.resource().group_resource().into(),
            name: action.name().unwrap_or_default().into(),
        })
    }
}

/// Fail every matching action with [`Error::AlreadyExists`].
pub fn already_exists() -> impl Fn(&Action) -> Reaction + Send + Sync + 'static {
    |action: &Action| {
        Reaction::fail(Error::AlreadyExists {
            resource: action.resource().group_resource().into(),
            name: action.name().unwrap_or_default().into(),
        })
    }
}

/// Answer every matching action with `object`.
pub fn returns(object: ObjectRef) -> impl Fn(&Action) -> Reaction + Send + Sync + 'static {
    move |_: &Action| Reaction::respond(object.clone())
}

/// Fail every matching action with the error `make` builds for it.
pub fn fails_with<F>(make: F) -> impl Fn(&Action) -> Reaction + Send + Sync + 'static
where
    F: Fn(&Action) -> Error + Send + Sync + 'static,
{
    move |action: &Action| Reaction::fail(make(action))
}

/// Observe matching actions without changing their outcome.
pub fn passthrough() -> impl Fn(&Action) -> Reaction + Send + Sync + 'static {
    |_: &Action| Reaction::Passthrough
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        GroupVersionResource, Object, ObjectMeta,
        store::{Client, Response},
        testing::react_to,
    };

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

    fn widget(name: &str) -> ObjectRef {
        Arc::new(Widget {
            metadata: ObjectMeta::new("ns", name),
        })
    }

    #[test]
    fn overridden_writes_leave_the_store_untouched() {
        let client = Client::new();
        client.add_reactor(Arc::new(react_to("create").on("widgets").with(client_fails())));

        let err = client.create(&widgets(), widget("w1")).unwrap_err();
        assert!(err.to_string().contains("simulated failure of `create widgets w1 in ns`"));
        assert!(client.tracker().is_empty());
        assert_eq!(client.actions().len(), 1);
    }

    #[test]
    fn times_limits_the_override() {
        let client = Client::new();
        let reactor = Arc::new(react_to("create").with(already_exists()).times(1));
        client.add_reactor(reactor.clone());

        assert!(client.create(&widgets(), widget("w1")).unwrap_err().is_already_exists());
        assert!(client.create(&widgets(), widget("w1")).is_ok());
        assert_eq!(reactor.reacted(), 1);
    }

    #[test]
    fn returns_substitutes_the_object() {
        let client = Client::new();
        client.add_reactor(Arc::new(react_to("get").named("ghost").with(returns(widget("ghost")))));

        let object = client.get(&widgets(), "ns", "ghost").unwrap();
        assert_eq!(object.meta().unwrap().name, "ghost");
        assert!(client.get(&widgets(), "ns", "other").unwrap_err().is_not_found());
    }

    #[test]
    fn fails_with_builds_the_error_from_the_action() {
        let reactor = react_to("delete").with(fails_with(|action| {
            Error::external(format!("refusing {}", action.verb()))
        }));
        let action = Action::delete(widgets(), "ns", "w1");
        assert!(reactor.handles(&action));
        match reactor.react(&action) {
            Reaction::Handled(Err(Error::External(message))) => {
                assert_eq!(&*message, "refusing delete")
            }
            other => panic!("unexpected reaction {other:?}"),
        }
    }

    #[test]
    fn passthrough_never_claims() {
        let reactor = react_to("*").with(passthrough());
        let action = Action::list(widgets(), "ns");
        assert!(matches!(reactor.react(&action), Reaction::Passthrough));
        assert!(!matches!(
            reactor.react(&action),
            Reaction::Handled(Ok(Response::Empty))
        ));
    }
}
