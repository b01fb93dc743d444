//! Action matching for verifiers, assertions and reactors.

use std::fmt;

use crate::{Action, object::accessor};

/// Matches any value in a filter dimension.
pub const WILDCARD: &str = "*";

/// Describes which actions a verifier, assertion or reactor applies to.
///
/// Each dimension (verb, resource, subresource, namespace, name) holds a
/// literal or [`WILDCARD`]. A fresh filter is a wildcard in every dimension
/// but the verb; narrow it with [`on`](Self::on),
/// [`in_namespace`](Self::in_namespace) and [`named`](Self::named).
///
/// # Example
///
/// ```rust
/// use ctrlcheck::testing::ActionFilter;
///
/// let filter = ActionFilter::new("update")
///     .on("pods/status")
///     .in_namespace("ns-a")
///     .named("web-1");
/// assert_eq!(filter.to_string(), "update on pods/status named web-1 in ns-a");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionFilter {
    verb: String,
    resource: String,
    subresource: String,
    namespace: String,
    name: String,
}

impl ActionFilter {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            resource: WILDCARD.to_owned(),
            subresource: WILDCARD.to_owned(),
            namespace: WILDCARD.to_owned(),
            name: WILDCARD.to_owned(),
        }
    }

    /// A filter matching every action.
    pub fn any() -> Self {
        Self::new(WILDCARD)
    }

    /// Set the resource, and optionally the subresource after a slash, e.g.
    /// `deployments/status`. Without a slash the filter targets the primary
    /// resource only (empty subresource); a bare `*` matches every resource
    /// and subresource.
    pub fn on(mut self, resource: &str) -> Self {
        match resource.split_once('/') {
            Some((resource, subresource)) => {
                self.resource = resource.to_owned();
                self.subresource = subresource.to_owned();
            }
            None if resource == WILDCARD => {
                self.resource = WILDCARD.to_owned();
                self.subresource = WILDCARD.to_owned();
            }
            None => {
                self.resource = resource.to_owned();
                self.subresource = String::new();
            }
        }
        self
    }

    /// Set the namespace; `*` matches all namespaces.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the object name; `*` matches all names.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn subresource(&self) -> &str {
        &self.subresource
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if `action` matches every dimension of this filter.
    ///
    /// Verb and resource first go through the action's coarse,
    /// case-insensitive [`Action::matches`]; if that fails they are compared
    /// one by one so wildcards and verbs unknown to the coarse test still
    /// match. An object that exposes no metadata never matches a literal name.
    pub fn handles(&self, action: &Action) -> bool {
        let verb_and_resource = action.matches(&self.verb, &self.resource)
            || (dimension_matches(&self.verb, action.verb())
                && dimension_matches(&self.resource, &action.resource().resource));

        verb_and_resource
            && dimension_matches(&self.subresource, action.subresource())
            && dimension_matches(&self.namespace, action.namespace())
            && self.handles_name(action)
    }

    fn handles_name(&self, action: &Action) -> bool {
        if self.name == WILDCARD {
            return true;
        }
        match action {
            Action::Create { object, .. } | Action::Update { object, .. } => {
                accessor(object.as_ref()).is_ok_and(|meta| meta.name == self.name)
            }
            Action::Delete { name, .. } | Action::Get { name, .. } => *name == self.name,
            // No single object is addressed
            Action::List { .. } | Action::Generic { .. } => true,
        }
    }
}

impl Default for ActionFilter {
    fn default() -> Self {
        Self::any()
    }
}

fn dimension_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

impl fmt::Display for ActionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subresource.is_empty() {
            write!(
                f,
                "{} on {} named {} in {}",
                self.verb, self.resource, self.name, self.namespace
            )
        } else {
            write!(
                f,
                "{} on {}/{} named {} in {}",
                self.verb, self.resource, self.subresource, self.name, self.namespace
            )
        }
    }
}
