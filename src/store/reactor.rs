use crate::{Action, ObjectRef, Result};

/// Result of an action served by the store or by a reactor.
#[derive(Debug, Clone, Default)]
pub enum Response {
    /// The action succeeded without returning an object (e.g. delete).
    #[default]
    Empty,
    Object(ObjectRef),
    List(Vec<ObjectRef>),
}

impl Response {
    pub fn into_object(self) -> Option<ObjectRef> {
        match self {
            Response::Object(object) => Some(object),
            Response::Empty | Response::List(_) => None,
        }
    }

    pub fn into_list(self) -> Vec<ObjectRef> {
        match self {
            Response::List(objects) => objects,
            Response::Object(object) => vec![object],
            Response::Empty => Vec::new(),
        }
    }
}

/// What a [`Reactor`] decided to do with an action.
#[derive(Debug)]
pub enum Reaction {
    /// Let the action continue to the next reactor and finally the tracker.
    Passthrough,
    /// Claim the action: the result is returned to the caller as if the
    /// store produced it, and the tracker never sees the action.
    Handled(Result<Response>),
}

impl Reaction {
    /// Claim the action and answer it with `object`.
    pub fn respond(object: ObjectRef) -> Self {
        Reaction::Handled(Ok(Response::Object(object)))
    }

    /// Claim the action and fail it with `error`.
    pub fn fail(error: crate::Error) -> Self {
        Reaction::Handled(Err(error))
    }

    pub fn is_handled(&self) -> bool {
        matches!(self, Reaction::Handled(_))
    }
}

/// Interception point of the store.
///
/// Installed reactors are consulted in registration order. `react` is only
/// called when `handles` returned true; the first reactor returning
/// [`Reaction::Handled`] ends the chain.
///
/// Both methods may be called concurrently from any controller task, so
/// implementations keep their own state synchronized.
pub trait Reactor: Send + Sync {
    fn handles(&self, action: &Action) -> bool;

    fn react(&self, action: &Action) -> Reaction;
}
