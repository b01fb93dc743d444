use std::sync::Arc;

use tokio::{
    select,
    sync::{Mutex, Notify, mpsc::channel},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use super::{
    Reconciler,
    handler::ControllerHandler,
    router::{Subscriber, WatchRouter},
};
use crate::{Config, Error, GroupVersionResource, Result, store::Client};

/// Runs the controllers under test and feeds them store changes.
///
/// - Register controllers with `add_controller(name, watches, |client| Reconciler)`.
/// - `start()` spawns the watch router and returns immediately (non-blocking).
///   Objects that already exist for a watched resource are enqueued first.
/// - `stop()` graceful shutdown; cancels controllers and awaits their tasks.
///
/// A manager takes over the watch stream of its [`Client`]; only one manager
/// can drive a given client.
///
/// # Example
///
/// ```rust
/// use ctrlcheck::{
///     Config, GroupVersionResource, Result,
///     sim::{Manager, Reconciler, Request},
///     store::Client,
/// };
///
/// struct Noop;
/// impl Reconciler for Noop {
///     async fn reconcile(&mut self, _request: &Request) -> Result { Ok(()) }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result {
/// let mut manager = Manager::new(Client::new(), Config::default())?;
/// manager.add_controller("noop", &[GroupVersionResource::core("v1", "pods")], |_client| Noop)?;
/// manager.start().await?;
/// manager.stop().await
/// # }
/// ```
pub struct Manager {
    config: Arc<Config>,
    client: Client,
    router: Arc<Mutex<WatchRouter>>,
    tasks: JoinSet<Result>,
    cancel_token: Arc<CancellationToken>,
    router_cancel_token: Arc<CancellationToken>,
    start_notifier: Arc<Notify>,
    started: bool,
}

impl Manager {
    /// Create a manager driving `client`.
    ///
    /// Fails with [`Error::ClientAlreadyManaged`] if another manager already
    /// took the client's watch stream.
    pub fn new(client: Client, config: Config) -> Result<Self> {
        let receiver = client
            .take_watch_receiver()
            .ok_or(Error::ClientAlreadyManaged)?;
        let router_cancel_token = Arc::new(CancellationToken::new());
        let router = WatchRouter::new(client.clone(), receiver, router_cancel_token.clone());
        Ok(Self {
            config: Arc::new(config),
            client,
            router: Arc::new(Mutex::new(router)),
            tasks: JoinSet::new(),
            cancel_token: Arc::new(CancellationToken::new()),
            router_cancel_token,
            start_notifier: Arc::new(Notify::new()),
            started: false,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    /// Register a controller built by `factory`, reconciling changes to any
    /// of the `watches` resources.
    ///
    /// Controllers must be added before [`start`](Self::start), otherwise
    /// this fails with [`Error::ManagerAlreadyStarted`]. The name must be
    /// unique.
    pub fn add_controller<R, F>(
        &mut self,
        name: &str,
        watches: &[GroupVersionResource],
        factory: F,
    ) -> Result
    where
        R: Reconciler,
        F: FnOnce(Client) -> R,
    {
        if self.started {
            return Err(Error::ManagerAlreadyStarted);
        }
        let mut router = self
            .router
            .try_lock()
            .map_err(|_| Error::ManagerAlreadyStarted)?;

        let name: Arc<str> = Arc::from(name);
        let (tx, rx) = channel(self.config.queue_size);
        router.add_subscriber(Subscriber::new(name.clone(), watches, tx))?;

        let mut handler = ControllerHandler {
            name,
            reconciler: factory(self.client.clone()),
            receiver: rx,
            cancel_token: self.cancel_token.clone(),
        };

        let notified = self.start_notifier.clone().notified_owned();
        let cancelled = self.cancel_token.clone();
        self.tasks.spawn(async move {
            select! {
                _ = notified => handler.run().await,
                _ = cancelled.cancelled() => Ok(()),
            }
        });

        Ok(())
    }

    /// Start the watch router in a background task. This returns immediately.
    pub async fn start(&mut self) -> Result {
        if self.started {
            return Err(Error::ManagerAlreadyStarted);
        }
        self.started = true;
        let router = self.router.clone();
        self.tasks.spawn(async move { router.lock().await.run().await });
        self.start_notifier.notify_waiters();
        tracing::debug!("manager started");
        Ok(())
    }

    /// Request a graceful shutdown, then await all controller tasks.
    ///
    /// # Shutdown Process
    ///
    /// 1. Sleeps for `sleep_on_shutdown` so in-flight requests get routed
    /// 2. Stops the watch router
    /// 3. Cancels all controllers and waits for their tasks
    pub async fn stop(&mut self) -> Result {
        tokio::time::sleep(self.config.sleep_on_shutdown).await;

        self.router_cancel_token.cancel();
        self.cancel_token.cancel();
        while let Some(res) = self.tasks.join_next().await {
            res??;
        }
        tracing::debug!("manager stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{Object, ObjectMeta, sim::Request};

    #[derive(Debug)]
    struct Pod {
        metadata: ObjectMeta,
    }

    impl Object for Pod {
        fn meta(&self) -> Option<&ObjectMeta> {
            Some(&self.metadata)
        }
    }

    struct Counter {
        seen: Arc<AtomicUsize>,
        notify: Arc<Notify>,
    }

    impl Reconciler for Counter {
        async fn reconcile(&mut self, _request: &Request) -> Result {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.notify.notify_one();
            Ok(())
        }
    }

    fn pods() -> GroupVersionResource {
        GroupVersionResource::core("v1", "pods")
    }

    #[tokio::test]
    async fn controllers_see_existing_and_new_objects() {
        let client = Client::new();
        client
            .tracker()
            .add(
                &pods(),
                Arc::new(Pod {
                    metadata: ObjectMeta::new("ns", "seeded"),
                }),
            )
            .unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let notify = Arc::new(Notify::new());
        let mut manager = Manager::new(client.clone(), Config::default()).unwrap();
        let (s, n) = (seen.clone(), notify.clone());
        manager
            .add_controller("counter", &[pods()], move |_| Counter { seen: s, notify: n })
            .unwrap();
        manager.start().await.unwrap();

        notify.notified().await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        client
            .create(
                &pods(),
                Arc::new(Pod {
                    metadata: ObjectMeta::new("ns", "created"),
                }),
            )
            .unwrap();
        notify.notified().await;
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn controllers_cannot_be_added_after_start() {
        let mut manager = Manager::new(Client::new(), Config::default()).unwrap();
        manager.start().await.unwrap();

        let result = manager.add_controller("late", &[pods()], |_| Counter {
            seen: Arc::new(AtomicUsize::new(0)),
            notify: Arc::new(Notify::new()),
        });
        assert!(matches!(result, Err(Error::ManagerAlreadyStarted)));
        assert!(matches!(manager.start().await, Err(Error::ManagerAlreadyStarted)));
        manager.stop().await.unwrap();
    }

    #[tokio::test]
    async fn one_manager_per_client() {
        let client = Client::new();
        let _first = Manager::new(client.clone(), Config::default()).unwrap();
        assert!(matches!(
            Manager::new(client, Config::default()),
            Err(Error::ClientAlreadyManaged)
        ));
    }

    #[tokio::test]
    async fn stop_without_start_returns() {
        let mut manager = Manager::new(Client::new(), Config::default()).unwrap();
        manager
            .add_controller("idle", &[pods()], |_| Counter {
                seen: Arc::new(AtomicUsize::new(0)),
                notify: Arc::new(Notify::new()),
            })
            .unwrap();
        manager.stop().await.unwrap();
    }
}
