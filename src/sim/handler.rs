use std::sync::Arc;

use tokio::{select, sync::mpsc::Receiver};
use tokio_util::sync::CancellationToken;

use super::{Reconciler, Request};
use crate::Result;

pub(crate) struct ControllerHandler<R: Reconciler> {
    pub(crate) name: Arc<str>,
    pub(crate) reconciler: R,
    pub(crate) receiver: Receiver<Request>,
    pub(crate) cancel_token: Arc<CancellationToken>,
}

impl<R: Reconciler> ControllerHandler<R> {
    pub async fn run(&mut self) -> Result {
        loop {
            select! {
                _ = self.cancel_token.cancelled() => break,
                Some(request) = self.receiver.recv() => {
                    tracing::debug!(controller = %self.name, %request, "reconcile");
                    if let Err(e) = self.reconciler.reconcile(&request).await {
                        self.reconciler.on_error(&request, e)?;
                    }
                },
                else => break
            }
        }
        tracing::debug!(controller = %self.name, "controller stopped");
        Ok(())
    }
}
