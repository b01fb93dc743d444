use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use crate::{
    Action, Error, GroupVersionResource, ObjectRef, Result, object::accessor, store::Response,
};

type Key = (GroupVersionResource, String, String);

/// In-memory object store keyed by resource, namespace and name.
///
/// The tracker is the last stage of a [`Client`](super::Client)'s reaction
/// chain: any action no reactor claimed is applied here. Subresource reads
/// and updates address the parent object; creating or deleting a
/// subresource isn't supported.
#[derive(Debug, Default)]
pub struct ObjectTracker {
    objects: Mutex<BTreeMap<Key, ObjectRef>>,
}

impl ObjectTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<Key, ObjectRef>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an object, replacing any existing one.
    ///
    /// Unlike [`create`](Self::create), seeding bypasses reactors and
    /// publishes no watch event. The namespace is read from the object.
    pub fn add(&self, resource: &GroupVersionResource, object: ObjectRef) -> Result {
        let meta = accessor(object.as_ref())?;
        let key = (resource.clone(), meta.namespace.clone(), meta.name.clone());
        self.objects().insert(key, object);
        Ok(())
    }

    pub fn get(
        &self,
        resource: &GroupVersionResource,
        namespace: &str,
        name: &str,
    ) -> Result<ObjectRef> {
        let key = (resource.clone(), namespace.to_owned(), name.to_owned());
        self.objects()
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found(resource, name))
    }

    /// Objects of `resource` in `namespace`, ordered by name.
    /// An empty namespace lists across all namespaces.
    pub fn list(&self, resource: &GroupVersionResource, namespace: &str) -> Vec<ObjectRef> {
        self.objects()
            .iter()
            .filter(|((r, ns, _), _)| r == resource && (namespace.is_empty() || ns == namespace))
            .map(|(_, object)| object.clone())
            .collect()
    }

    pub fn create(
        &self,
        resource: &GroupVersionResource,
        namespace: &str,
        object: ObjectRef,
    ) -> Result<ObjectRef> {
        let name = accessor(object.as_ref())?.name.clone();
        let mut objects = self.objects();
        let key = (resource.clone(), namespace.to_owned(), name);
        if objects.contains_key(&key) {
            return Err(Error::AlreadyExists {
                resource: resource.group_resource().into(),
                name: key.2.into(),
            });
        }
        objects.insert(key, object.clone());
        Ok(object)
    }

    pub fn update(
        &self,
        resource: &GroupVersionResource,
        namespace: &str,
        object: ObjectRef,
    ) -> Result<ObjectRef> {
        let name = accessor(object.as_ref())?.name.clone();
        let mut objects = self.objects();
        let key = (resource.clone(), namespace.to_owned(), name);
        match objects.get_mut(&key) {
            Some(stored) => {
                *stored = object.clone();
                Ok(object)
            }
            None => Err(not_found(resource, &key.2)),
        }
    }

    pub fn delete(&self, resource: &GroupVersionResource, namespace: &str, name: &str) -> Result {
        let key = (resource.clone(), namespace.to_owned(), name.to_owned());
        self.objects()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| not_found(resource, name))
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Apply an action nobody intercepted.
    pub(crate) fn apply(&self, action: &Action) -> Result<Response> {
        let scope = action.scope();
        let (resource, namespace) = (&scope.resource, scope.namespace.as_str());
        match action {
            Action::Create { object, .. } if scope.subresource.is_empty() => self
                .create(resource, namespace, object.clone())
                .map(Response::Object),
            Action::Update { object, .. } => self
                .update(resource, namespace, object.clone())
                .map(Response::Object),
            Action::Delete { name, .. } if scope.subresource.is_empty() => {
                self.delete(resource, namespace, name).map(|_| Response::Empty)
            }
            Action::Get { name, .. } => self.get(resource, namespace, name).map(Response::Object),
            Action::List { .. } => Ok(Response::List(self.list(resource, namespace))),
            Action::Create { .. } | Action::Delete { .. } | Action::Generic { .. } => {
                Err(Error::Unsupported(subject(action).into()))
            }
        }
    }
}

fn not_found(resource: &GroupVersionResource, name: &str) -> Error {
    Error::NotFound {
        resource: resource.group_resource().into(),
        name: name.into(),
    }
}

fn subject(action: &Action) -> String {
    if action.subresource().is_empty() {
        action.verb().to_owned()
    } else {
        format!("{} {}", action.verb(), action.subresource())
    }
}
