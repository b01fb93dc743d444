use std::sync::Arc;

use tokio::sync::mpsc::error::SendError;

use crate::sim::Request;

/// Boxed error returned by user-supplied verification functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: Arc<str>, name: Arc<str> },

    #[error("{resource} \"{name}\" already exists")]
    AlreadyExists { resource: Arc<str>, name: Arc<str> },

    #[error("object of type {0} does not expose object metadata")]
    MissingObjectMeta(&'static str),

    #[error("the object store does not support '{0}' actions")]
    Unsupported(Arc<str>),

    #[error("Internal error: {0}")]
    Internal(Arc<str>),

    #[error("Manager has already started.")]
    ManagerAlreadyStarted,

    #[error("Client is already driven by another manager.")]
    ClientAlreadyManaged,

    #[error("Controller with name '{0}' already exists.")]
    ControllerAlreadyExists(Arc<str>),

    #[error("Couldn't send the message: {0}")]
    SendError(String),

    #[error("Controller task join error: {0}")]
    ControllerJoinError(#[from] tokio::task::JoinError),

    #[error("Error external to ctrlcheck occured: {0}")]
    External(Arc<str>),
}

impl Error {
    /// Shorthand for an [`Error::Internal`] with the given message.
    pub fn internal(message: impl Into<Arc<str>>) -> Self {
        Error::Internal(message.into())
    }

    /// Shorthand for an [`Error::External`] with the given message.
    pub fn external(message: impl Into<Arc<str>>) -> Self {
        Error::External(message.into())
    }

    /// Returns true if this is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Returns true if this is a [`Error::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }
}

impl From<SendError<Request>> for Error {
    fn from(e: SendError<Request>) -> Self {
        Error::SendError(e.to_string())
    }
}
