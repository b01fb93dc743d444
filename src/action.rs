use std::fmt;

use crate::{GroupVersionResource, ObjectRef, object::accessor};

/// Where an action is aimed: the resource collection, an optional
/// subresource and the namespace.
///
/// An empty `subresource` addresses the primary resource; an empty
/// `namespace` addresses cluster-scoped objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ActionScope {
    pub resource: GroupVersionResource,
    pub subresource: String,
    pub namespace: String,
}

impl ActionScope {
    pub fn new(resource: GroupVersionResource, namespace: impl Into<String>) -> Self {
        Self {
            resource,
            subresource: String::new(),
            namespace: namespace.into(),
        }
    }
}

/// A single request issued against the simulated store.
///
/// Actions are produced by the controller under test (through
/// [`Client`](crate::store::Client)) and observed, in arrival order, by
/// every installed [`Reactor`](crate::store::Reactor).
///
/// # Example
///
/// ```rust
/// use ctrlcheck::{Action, GroupVersionResource};
///
/// let pods = GroupVersionResource::core("v1", "pods");
/// let get = Action::get(pods.clone(), "default", "web-1");
/// assert_eq!(get.verb(), "get");
/// assert_eq!(get.name(), Some("web-1"));
///
/// let status = Action::list(pods, "default").with_subresource("status");
/// assert_eq!(status.subresource(), "status");
/// ```
#[derive(Debug, Clone)]
pub enum Action {
    Create { scope: ActionScope, object: ObjectRef },
    Update { scope: ActionScope, object: ObjectRef },
    Delete { scope: ActionScope, name: String },
    Get { scope: ActionScope, name: String },
    List { scope: ActionScope },
    Generic {
        verb: String,
        scope: ActionScope,
        object: Option<ObjectRef>,
    },
}

impl Action {
    pub fn create(
        resource: GroupVersionResource,
        namespace: impl Into<String>,
        object: ObjectRef,
    ) -> Self {
        Action::Create {
            scope: ActionScope::new(resource, namespace),
            object,
        }
    }

    pub fn update(
        resource: GroupVersionResource,
        namespace: impl Into<String>,
        object: ObjectRef,
    ) -> Self {
        Action::Update {
            scope: ActionScope::new(resource, namespace),
            object,
        }
    }

    pub fn delete(
        resource: GroupVersionResource,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Action::Delete {
            scope: ActionScope::new(resource, namespace),
            name: name.into(),
        }
    }

    pub fn get(
        resource: GroupVersionResource,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Action::Get {
            scope: ActionScope::new(resource, namespace),
            name: name.into(),
        }
    }

    pub fn list(resource: GroupVersionResource, namespace: impl Into<String>) -> Self {
        Action::List {
            scope: ActionScope::new(resource, namespace),
        }
    }

    pub fn generic(
        verb: impl Into<String>,
        resource: GroupVersionResource,
        namespace: impl Into<String>,
        object: Option<ObjectRef>,
    ) -> Self {
        Action::Generic {
            verb: verb.into(),
            scope: ActionScope::new(resource, namespace),
            object,
        }
    }

    /// Aims the action at a subresource of its resource, e.g. `status`.
    pub fn with_subresource(mut self, subresource: impl Into<String>) -> Self {
        self.scope_mut().subresource = subresource.into();
        self
    }

    pub fn scope(&self) -> &ActionScope {
        match self {
            Action::Create { scope, .. }
            | Action::Update { scope, .. }
            | Action::Delete { scope, .. }
            | Action::Get { scope, .. }
            | Action::List { scope }
            | Action::Generic { scope, .. } => scope,
        }
    }

    fn scope_mut(&mut self) -> &mut ActionScope {
        match self {
            Action::Create { scope, .. }
            | Action::Update { scope, .. }
            | Action::Delete { scope, .. }
            | Action::Get { scope, .. }
            | Action::List { scope }
            | Action::Generic { scope, .. } => scope,
        }
    }

    pub fn verb(&self) -> &str {
        match self {
            Action::Create { .. } => "create",
            Action::Update { .. } => "update",
            Action::Delete { .. } => "delete",
            Action::Get { .. } => "get",
            Action::List { .. } => "list",
            Action::Generic { verb, .. } => verb,
        }
    }

    #[inline]
    pub fn resource(&self) -> &GroupVersionResource {
        &self.scope().resource
    }

    #[inline]
    pub fn subresource(&self) -> &str {
        &self.scope().subresource
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.scope().namespace
    }

    /// Name of the addressed object.
    ///
    /// Create and Update read it from the carried object and return `None`
    /// when the object exposes no metadata. List and Generic actions address
    /// no single object.
    pub fn name(&self) -> Option<&str> {
        match self {
            Action::Create { object, .. } | Action::Update { object, .. } => {
                accessor(object.as_ref()).ok().map(|meta| meta.name.as_str())
            }
            Action::Delete { name, .. } | Action::Get { name, .. } => Some(name),
            Action::List { .. } | Action::Generic { .. } => None,
        }
    }

    /// The object carried by the action, if any.
    pub fn object(&self) -> Option<&ObjectRef> {
        match self {
            Action::Create { object, .. } | Action::Update { object, .. } => Some(object),
            Action::Generic { object, .. } => object.as_ref(),
            Action::Delete { .. } | Action::Get { .. } | Action::List { .. } => None,
        }
    }

    /// Coarse verb + resource test, ignoring group, version and subresource.
    /// Both comparisons are ASCII case-insensitive.
    pub fn matches(&self, verb: &str, resource: &str) -> bool {
        self.verb().eq_ignore_ascii_case(verb)
            && self.resource().resource.eq_ignore_ascii_case(resource)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.resource().resource)?;
        if !self.subresource().is_empty() {
            write!(f, "/{}", self.subresource())?;
        }
        if let Some(name) = self.name() {
            write!(f, " {name}")?;
        }
        if !self.namespace().is_empty() {
            write!(f, " in {}", self.namespace())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Object, ObjectMeta};

    #[derive(Debug)]
    struct Pod {
        metadata: ObjectMeta,
    }

    impl Object for Pod {
        fn meta(&self) -> Option<&ObjectMeta> {
            Some(&self.metadata)
        }
    }

    #[derive(Debug)]
    struct Blob;
    impl Object for Blob {}

    fn pods() -> GroupVersionResource {
        GroupVersionResource::core("v1", "pods")
    }

    #[test]
    fn name_comes_from_object_or_action() {
        let pod = Arc::new(Pod {
            metadata: ObjectMeta::new("ns", "web-1"),
        });
        assert_eq!(Action::create(pods(), "ns", pod).name(), Some("web-1"));
        assert_eq!(Action::delete(pods(), "ns", "web-2").name(), Some("web-2"));
        assert_eq!(Action::list(pods(), "ns").name(), None);
        assert_eq!(Action::create(pods(), "ns", Arc::new(Blob)).name(), None);
    }

    #[test]
    fn coarse_match_ignores_case_and_subresource() {
        let action = Action::get(pods(), "ns", "web-1").with_subresource("status");
        assert!(action.matches("GET", "Pods"));
        assert!(!action.matches("get", "deployments"));
        assert!(!action.matches("*", "pods"));
    }

    #[test]
    fn display_is_compact() {
        let action = Action::get(pods(), "ns", "web-1").with_subresource("log");
        assert_eq!(action.to_string(), "get pods/log web-1 in ns");
        assert_eq!(Action::list(pods(), "").to_string(), "list pods");
    }
}
