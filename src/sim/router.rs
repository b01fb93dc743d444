use std::{collections::HashSet, sync::Arc};

use tokio::{
    select,
    sync::mpsc::{Sender, UnboundedReceiver},
};
use tokio_util::sync::CancellationToken;

use super::Request;
use crate::{
    Error, GroupVersionResource, Result,
    object::accessor,
    store::{Client, WatchEvent},
};

#[derive(Debug)]
pub(crate) struct Subscriber {
    pub(crate) name: Arc<str>,
    pub(crate) watches: HashSet<GroupVersionResource>,
    pub(crate) sender: Sender<Request>,
}

impl Subscriber {
    pub fn new(name: Arc<str>, watches: &[GroupVersionResource], sender: Sender<Request>) -> Self {
        Self {
            name,
            watches: watches.iter().cloned().collect(),
            sender,
        }
    }
}

/// Fans watch events out to the controllers watching the changed resource.
pub(crate) struct WatchRouter {
    client: Client,
    receiver: UnboundedReceiver<WatchEvent>,
    subscribers: Vec<Subscriber>,
    cancel_token: Arc<CancellationToken>,
}

impl WatchRouter {
    pub fn new(
        client: Client,
        receiver: UnboundedReceiver<WatchEvent>,
        cancel_token: Arc<CancellationToken>,
    ) -> Self {
        Self {
            client,
            receiver,
            subscribers: Vec::new(),
            cancel_token,
        }
    }

    pub(crate) fn add_subscriber(&mut self, subscriber: Subscriber) -> Result {
        if self.subscribers.iter().any(|s| s.name == subscriber.name) {
            return Err(Error::ControllerAlreadyExists(subscriber.name.clone()));
        }
        self.subscribers.push(subscriber);
        Ok(())
    }

    async fn route(&self, resource: &GroupVersionResource, request: Request) -> Result {
        for subscriber in self
            .subscribers
            .iter()
            .filter(|s| s.watches.contains(resource) && !s.sender.is_closed())
        {
            subscriber.sender.send(request.clone()).await?;
        }
        Ok(())
    }

    /// Enqueue every object that already exists for the watched resources,
    /// the way an informer's initial list does.
    async fn resync(&self) -> Result {
        let resources: HashSet<&GroupVersionResource> =
            self.subscribers.iter().flat_map(|s| s.watches.iter()).collect();
        for resource in resources {
            for object in self.client.tracker().list(resource, "") {
                if let Ok(meta) = accessor(object.as_ref()) {
                    let request = Request::new(meta.namespace.clone(), meta.name.clone());
                    self.route(resource, request).await?;
                }
            }
        }
        Ok(())
    }

    pub async fn run(&mut self) -> Result {
        self.resync().await?;
        loop {
            select! {
                _ = self.cancel_token.cancelled() => break,
                Some(event) = self.receiver.recv() => {
                    tracing::trace!(
                        kind = ?event.kind,
                        resource = %event.resource.resource,
                        name = %event.name,
                        "watch event"
                    );
                    let request = Request::new(event.namespace, event.name);
                    self.route(&event.resource, request).await?;
                },
                else => break
            }
        }
        Ok(())
    }
}
