use std::time::Duration;

/// Harness configuration for test cases and the simulated controller manager.
///
/// Passed explicitly to [`ControllerTestCase`](crate::testing::ControllerTestCase)
/// and [`Manager`](crate::sim::Manager); nothing is read from the environment.
/// Use the builder pattern to customize, or use [`Default`] for sensible defaults.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use ctrlcheck::Config;
///
/// let config = Config::default()
///     .with_default_timeout(Duration::from_secs(2)) // Shorter waits for fast controllers
///     .with_queue_size(32);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// How long an event waits for its verifier when the event itself
    /// doesn't set a timeout.
    /// Default: 5 s
    pub default_timeout: Duration,

    /// Size of each controller's request queue.
    /// Determines how many reconcile requests can be pending before the
    /// watch router applies backpressure.
    /// Default: 128
    pub queue_size: usize,

    /// Duration to wait during shutdown before cancelling controllers.
    /// This gives the watch router time to forward in-flight requests.
    /// Default: 10 ms. Set to Duration::ZERO for immediate shutdown.
    pub sleep_on_shutdown: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_timeout: Duration::from_secs(5),
            queue_size: 128,
            sleep_on_shutdown: Duration::from_millis(10),
        }
    }
}

impl Config {
    /// Set the wait bound used by events that don't declare their own timeout.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the per-controller request queue size.
    ///
    /// When a queue is full, the watch router waits for the controller
    /// to catch up (backpressure) rather than dropping requests.
    pub fn with_queue_size(mut self, size: usize) -> Self {
        self.queue_size = size;
        self
    }

    /// Set the grace period applied before controllers are cancelled.
    pub fn with_sleep_on_shutdown(mut self, duration: Duration) -> Self {
        self.sleep_on_shutdown = duration;
        self
    }
}
