use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use uuid::Uuid;

use crate::{
    Action, Error, GroupVersionResource, ObjectRef, Result,
    object::accessor,
    store::{ObjectTracker, Reaction, Reactor, Response, WatchEvent, WatchEventKind},
};

/// Handle of an installed reactor, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReactorId(u128);

impl ReactorId {
    fn new() -> Self {
        Self(Uuid::new_v4().as_u128())
    }
}

struct Installed {
    id: ReactorId,
    reactor: Arc<dyn Reactor>,
}

struct Inner {
    tracker: ObjectTracker,
    reactors: RwLock<Vec<Installed>>,
    actions: Mutex<Vec<Action>>,
    watch_sender: UnboundedSender<WatchEvent>,
    watch_receiver: Mutex<Option<UnboundedReceiver<WatchEvent>>>,
}

/// Client of the simulated store, shared by the test driver and the
/// controllers under test.
///
/// Every request becomes an [`Action`] that is recorded, offered to the
/// installed reactors in order, and, unless one of them claims it, applied
/// to the [`ObjectTracker`]. Clones are cheap and share the same store.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use ctrlcheck::{Error, GroupVersionResource, Object, ObjectMeta, store::Client};
/// use ctrlcheck::testing::{not_found, react_to};
///
/// #[derive(Debug)]
/// struct ConfigMap { metadata: ObjectMeta }
/// impl Object for ConfigMap {
///     fn meta(&self) -> Option<&ObjectMeta> { Some(&self.metadata) }
/// }
///
/// let configmaps = GroupVersionResource::core("v1", "configmaps");
/// let client = Client::new();
/// client.create(&configmaps, Arc::new(ConfigMap { metadata: ObjectMeta::new("ns", "cm") }))?;
///
/// // Simulate a read failure without touching stored state
/// let id = client.add_reactor(Arc::new(react_to("get").on("configmaps").with(not_found())));
/// assert!(client.get(&configmaps, "ns", "cm").unwrap_err().is_not_found());
///
/// client.remove_reactor(id);
/// assert!(client.get(&configmaps, "ns", "cm").is_ok());
/// # Ok::<(), Error>(())
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("objects", &self.inner.tracker.len())
            .field("reactors", &self.read_reactors().len())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            inner: Arc::new(Inner {
                tracker: ObjectTracker::new(),
                reactors: RwLock::new(Vec::new()),
                actions: Mutex::new(Vec::new()),
                watch_sender: tx,
                watch_receiver: Mutex::new(Some(rx)),
            }),
        }
    }

    /// Direct access to the backing store, bypassing reactors and watches.
    pub fn tracker(&self) -> &ObjectTracker {
        &self.inner.tracker
    }

    // ==================== Reaction chain ====================

    /// Install a reactor behind the already installed ones.
    pub fn add_reactor(&self, reactor: Arc<dyn Reactor>) -> ReactorId {
        let id = ReactorId::new();
        self.write_reactors().push(Installed { id, reactor });
        tracing::debug!(reactor = ?id, "reactor installed");
        id
    }

    /// Install a reactor in front of the already installed ones.
    pub fn prepend_reactor(&self, reactor: Arc<dyn Reactor>) -> ReactorId {
        let id = ReactorId::new();
        self.write_reactors().insert(0, Installed { id, reactor });
        tracing::debug!(reactor = ?id, "reactor installed");
        id
    }

    /// Remove an installed reactor. Returns false if it was already gone.
    pub fn remove_reactor(&self, id: ReactorId) -> bool {
        let mut reactors = self.write_reactors();
        let before = reactors.len();
        reactors.retain(|installed| installed.id != id);
        let removed = reactors.len() != before;
        if removed {
            tracing::debug!(reactor = ?id, "reactor removed");
        }
        removed
    }

    fn read_reactors(&self) -> std::sync::RwLockReadGuard<'_, Vec<Installed>> {
        self.inner
            .reactors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_reactors(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Installed>> {
        self.inner
            .reactors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run an action through the reaction chain and, unless a reactor
    /// claimed it, the tracker.
    pub fn invoke(&self, action: Action) -> Result<Response> {
        tracing::trace!(%action, "invoke");
        self.inner
            .actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action.clone());

        // Reactors may call back into the client, so no lock is held while they run.
        let chain: Vec<Arc<dyn Reactor>> = self
            .read_reactors()
            .iter()
            .map(|installed| installed.reactor.clone())
            .collect();

        for reactor in chain {
            if !reactor.handles(&action) {
                continue;
            }
            if let Reaction::Handled(result) = reactor.react(&action) {
                tracing::trace!(%action, ok = result.is_ok(), "action claimed by reactor");
                return result;
            }
        }

        let response = self.inner.tracker.apply(&action)?;
        self.publish(&action);
        Ok(response)
    }

    fn publish(&self, action: &Action) {
        let (kind, name) = match action {
            Action::Create { .. } => (WatchEventKind::Added, action.name()),
            Action::Update { .. } => (WatchEventKind::Modified, action.name()),
            Action::Delete { name, .. } => (WatchEventKind::Deleted, Some(name.as_str())),
            Action::Get { .. } | Action::List { .. } | Action::Generic { .. } => return,
        };
        let Some(name) = name else { return };
        let event = WatchEvent {
            kind,
            resource: action.resource().clone(),
            namespace: action.namespace().to_owned(),
            name: name.to_owned(),
        };
        // Nobody listens when no manager runs; that's fine.
        let _ = self.inner.watch_sender.send(event);
    }

    pub(crate) fn take_watch_receiver(&self) -> Option<UnboundedReceiver<WatchEvent>> {
        self.inner
            .watch_receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Every action invoked so far, in order, including the ones a reactor claimed.
    pub fn actions(&self) -> Vec<Action> {
        self.inner
            .actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ==================== Typed requests ====================

    /// Create `object` in the namespace named by its metadata.
    pub fn create(&self, resource: &GroupVersionResource, object: ObjectRef) -> Result<ObjectRef> {
        let namespace = accessor(object.as_ref())?.namespace.clone();
        let action = Action::create(resource.clone(), namespace, object.clone());
        self.object_or(action, object)
    }

    /// Replace the stored `object`.
    pub fn update(&self, resource: &GroupVersionResource, object: ObjectRef) -> Result<ObjectRef> {
        let namespace = accessor(object.as_ref())?.namespace.clone();
        let action = Action::update(resource.clone(), namespace, object.clone());
        self.object_or(action, object)
    }

    /// Replace the stored `object` through its `status` subresource.
    pub fn update_status(
        &self,
        resource: &GroupVersionResource,
        object: ObjectRef,
    ) -> Result<ObjectRef> {
        let namespace = accessor(object.as_ref())?.namespace.clone();
        let action =
            Action::update(resource.clone(), namespace, object.clone()).with_subresource("status");
        self.object_or(action, object)
    }

    pub fn delete(&self, resource: &GroupVersionResource, namespace: &str, name: &str) -> Result {
        self.invoke(Action::delete(resource.clone(), namespace, name))
            .map(|_| ())
    }

    pub fn get(
        &self,
        resource: &GroupVersionResource,
        namespace: &str,
        name: &str,
    ) -> Result<ObjectRef> {
        self.invoke(Action::get(resource.clone(), namespace, name))?
            .into_object()
            .ok_or_else(|| Error::NotFound {
                resource: resource.group_resource().into(),
                name: name.into(),
            })
    }

    /// List `resource` in `namespace`; an empty namespace lists all of them.
    pub fn list(&self, resource: &GroupVersionResource, namespace: &str) -> Result<Vec<ObjectRef>> {
        self.invoke(Action::list(resource.clone(), namespace))
            .map(Response::into_list)
    }

    fn object_or(&self, action: Action, fallback: ObjectRef) -> Result<ObjectRef> {
        Ok(self.invoke(action)?.into_object().unwrap_or(fallback))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{Object, ObjectMeta};

    #[derive(Debug)]
    struct ConfigMap {
        metadata: ObjectMeta,
    }

    impl Object for ConfigMap {
        fn meta(&self) -> Option<&ObjectMeta> {
            Some(&self.metadata)
        }
    }

    fn configmaps() -> GroupVersionResource {
        GroupVersionResource::core("v1", "configmaps")
    }

    fn configmap(name: &str) -> ObjectRef {
        Arc::new(ConfigMap {
            metadata: ObjectMeta::new("ns", name),
        })
    }

    /// Fails every create and counts how often it was asked.
    struct DenyCreate {
        seen: AtomicUsize,
    }

    impl Reactor for DenyCreate {
        fn handles(&self, action: &Action) -> bool {
            action.verb() == "create"
        }

        fn react(&self, _action: &Action) -> Reaction {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Reaction::fail(Error::internal("denied"))
        }
    }

    /// Observes everything, claims nothing.
    struct Observer {
        seen: AtomicUsize,
    }

    impl Reactor for Observer {
        fn handles(&self, _action: &Action) -> bool {
            true
        }

        fn react(&self, _action: &Action) -> Reaction {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Reaction::Passthrough
        }
    }

    #[test]
    fn handled_error_never_reaches_tracker() {
        let client = Client::new();
        let observer = Arc::new(Observer {
            seen: AtomicUsize::new(0),
        });
        client.add_reactor(observer.clone());
        client.add_reactor(Arc::new(DenyCreate {
            seen: AtomicUsize::new(0),
        }));

        let err = client.create(&configmaps(), configmap("a")).unwrap_err();
        assert!(matches!(err, Error::Internal(msg) if &*msg == "denied"));
        assert!(client.tracker().is_empty());
        assert_eq!(observer.seen.load(Ordering::SeqCst), 1);
        assert_eq!(client.actions().len(), 1);
    }

    #[test]
    fn first_handling_reactor_wins() {
        let client = Client::new();
        let first = Arc::new(DenyCreate {
            seen: AtomicUsize::new(0),
        });
        let second = Arc::new(DenyCreate {
            seen: AtomicUsize::new(0),
        });
        client.add_reactor(first.clone());
        client.add_reactor(second.clone());

        let _ = client.create(&configmaps(), configmap("a"));
        assert_eq!(first.seen.load(Ordering::SeqCst), 1);
        assert_eq!(second.seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn prepended_reactor_runs_first() {
        let client = Client::new();
        let observer = Arc::new(Observer {
            seen: AtomicUsize::new(0),
        });
        client.add_reactor(Arc::new(DenyCreate {
            seen: AtomicUsize::new(0),
        }));
        client.prepend_reactor(observer.clone());

        let _ = client.create(&configmaps(), configmap("a"));
        assert_eq!(observer.seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_reactor_no_longer_intercepts() {
        let client = Client::new();
        let id = client.add_reactor(Arc::new(DenyCreate {
            seen: AtomicUsize::new(0),
        }));
        assert!(client.create(&configmaps(), configmap("a")).is_err());

        assert!(client.remove_reactor(id));
        assert!(!client.remove_reactor(id));
        assert!(client.create(&configmaps(), configmap("a")).is_ok());
        assert_eq!(client.list(&configmaps(), "ns").unwrap().len(), 1);
    }

    #[test]
    fn writes_publish_watch_events() {
        let client = Client::new();
        let mut watch = client.take_watch_receiver().unwrap();
        assert!(client.take_watch_receiver().is_none());

        client.create(&configmaps(), configmap("a")).unwrap();
        client.get(&configmaps(), "ns", "a").unwrap();
        client.update_status(&configmaps(), configmap("a")).unwrap();
        client.delete(&configmaps(), "ns", "a").unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| watch.try_recv().ok())
            .map(|event| (event.kind, event.name))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (WatchEventKind::Added, "a".to_string()),
                (WatchEventKind::Modified, "a".to_string()),
                (WatchEventKind::Deleted, "a".to_string()),
            ]
        );
    }
}
