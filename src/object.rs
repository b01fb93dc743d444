use std::{any::Any, fmt::Debug, sync::Arc};

use crate::{Error, Result};

/// Shared handle to a stored object.
pub type ObjectRef = Arc<dyn Object>;

/// Identity metadata of a resource instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Metadata for a cluster-scoped object (empty namespace).
    pub fn cluster(name: impl Into<String>) -> Self {
        Self::new("", name)
    }
}

/// Upcast helper so stored objects can be downcast back to their concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A typed resource object the simulated store can hold.
///
/// Objects expose their identity through [`meta`](Object::meta). Types that
/// don't carry [`ObjectMeta`] keep the default, which returns `None`; the
/// [`accessor`] then fails and action filters treat such objects as unnamed.
///
/// Use `#[derive(Object)]` for structs with a `metadata: ObjectMeta` field.
///
/// # Example
///
/// ```rust
/// use ctrlcheck::{Object, ObjectMeta};
///
/// #[derive(Debug)]
/// struct Widget {
///     metadata: ObjectMeta,
/// }
///
/// impl Object for Widget {
///     fn meta(&self) -> Option<&ObjectMeta> {
///         Some(&self.metadata)
///     }
/// }
/// ```
pub trait Object: AsAny + Debug + Send + Sync + 'static {
    fn meta(&self) -> Option<&ObjectMeta> {
        None
    }

    /// Name of the concrete type, used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl dyn Object {
    /// Returns the object as `T` if it is one.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Reads the identity metadata of an arbitrary object.
///
/// Fails with [`Error::MissingObjectMeta`] when the object doesn't expose any.
pub fn accessor(object: &dyn Object) -> Result<&ObjectMeta> {
    object
        .meta()
        .ok_or_else(|| Error::MissingObjectMeta(object.type_name()))
}
