//! Access token refresh scheduler
//!
//! One background task per scheduler. It asks the backend how long a fresh
//! access token lives, sleeps until `margin` before expiry, refreshes, and
//! starts over. Any failure ends the loop; nothing is retried.

use crate::config::Settings;
use crate::{DaemonError, Result};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokenkeep_core::{
    AccessTokenLifetime, CoreError, CoreResult, FailureCause, FailurePolicy, RefreshSchedule,
    SchedulerState, TokenEndpoint,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{Instrument, error, info, warn};
use url::Url;

/// Default upper bound for a single lifetime or refresh call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Told when the session can no longer be kept alive
pub trait SignInHandler: Send + Sync {
    fn sign_in_required(&self, sign_in_url: &Url);
}

impl<F> SignInHandler for F
where
    F: Fn(&Url) + Send + Sync,
{
    fn sign_in_required(&self, sign_in_url: &Url) {
        self(sign_in_url);
    }
}

/// Builder for configuring a [`RefreshScheduler`]
pub struct RefreshSchedulerBuilder {
    endpoint: Arc<dyn TokenEndpoint>,
    schedule: RefreshSchedule,
    request_timeout: Duration,
    policy: FailurePolicy,
    sign_in_url: Option<Url>,
    handler: Option<Arc<dyn SignInHandler>>,
}

impl RefreshSchedulerBuilder {
    pub fn new(endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self {
            endpoint,
            schedule: RefreshSchedule::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            policy: FailurePolicy::default(),
            sign_in_url: None,
            handler: None,
        }
    }

    /// Builder preloaded from the `[refresh]` settings
    pub fn from_settings(settings: &Settings, endpoint: Arc<dyn TokenEndpoint>) -> Result<Self> {
        Ok(Self::new(endpoint)
            .schedule(settings.schedule()?)
            .request_timeout(settings.request_timeout())
            .on_refresh_failure(settings.refresh.on_refresh_failure)
            .sign_in_url(settings.sign_in_url()?))
    }

    #[must_use]
    pub fn schedule(mut self, schedule: RefreshSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn on_refresh_failure(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn sign_in_url(mut self, url: Url) -> Self {
        self.sign_in_url = Some(url);
        self
    }

    #[must_use]
    pub fn sign_in_handler(mut self, handler: Arc<dyn SignInHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Spawn the refresh loop on the current tokio runtime
    ///
    /// # Errors
    ///
    /// Returns [`DaemonError::InvalidConfig`] when the redirect policy is
    /// selected without both a sign-in URL and a handler, or when the
    /// request timeout is zero.
    pub fn start(self) -> Result<RefreshScheduler> {
        if self.request_timeout.is_zero() {
            return Err(DaemonError::InvalidConfig(
                "request timeout must be positive".to_string(),
            ));
        }

        let redirect = match (self.policy, self.sign_in_url, self.handler) {
            (FailurePolicy::Silent, _, _) => None,
            (FailurePolicy::Redirect, Some(url), Some(handler)) => Some(Redirect { url, handler }),
            (FailurePolicy::Redirect, _, _) => {
                return Err(DaemonError::InvalidConfig(
                    "redirect policy needs a sign-in URL and a handler".to_string(),
                ));
            }
        };

        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let refresh_loop = RefreshLoop {
            endpoint: self.endpoint,
            schedule: self.schedule,
            request_timeout: self.request_timeout,
            redirect,
            state_tx,
        };

        info!(
            margin_secs = self.schedule.margin().as_secs(),
            min_delay_ms = u64::try_from(self.schedule.min_delay().as_millis()).unwrap_or(u64::MAX),
            policy = %self.policy,
            "Starting refresh scheduler"
        );

        let task = tokio::spawn(
            refresh_loop
                .run(shutdown_rx)
                .instrument(tracing::info_span!("refresh_scheduler")),
        );

        Ok(RefreshScheduler {
            state_rx,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }
}

/// Handle to a running refresh loop; dropping it stops the loop
pub struct RefreshScheduler {
    state_rx: watch::Receiver<SchedulerState>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn builder(endpoint: Arc<dyn TokenEndpoint>) -> RefreshSchedulerBuilder {
        RefreshSchedulerBuilder::new(endpoint)
    }

    /// Current scheduler state
    pub fn state(&self) -> SchedulerState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state_rx.clone()
    }

    /// Wait until the loop has failed or stopped
    pub async fn wait_terminal(&self) -> SchedulerState {
        let mut rx = self.state_rx.clone();
        if let Ok(state) = rx.wait_for(SchedulerState::is_terminal).await {
            return state.clone();
        }
        // The loop went away without reporting, e.g. it panicked
        rx.borrow().clone()
    }

    /// Stop the loop and wait for it to exit
    ///
    /// A loop that already failed keeps its `Failed` state.
    pub async fn shutdown(&self) -> SchedulerState {
        self.shutdown_tx.send_replace(true);

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!("Refresh loop ended abnormally: {}", e);
        }

        self.state()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown_tx.send_replace(true);
    }
}

struct Redirect {
    url: Url,
    handler: Arc<dyn SignInHandler>,
}

struct RefreshLoop {
    endpoint: Arc<dyn TokenEndpoint>,
    schedule: RefreshSchedule,
    request_timeout: Duration,
    redirect: Option<Redirect>,
    state_tx: watch::Sender<SchedulerState>,
}

impl RefreshLoop {
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        tokio::select! {
            biased;
            _ = shutdown_rx.wait_for(|stop| *stop) => {
                info!("Refresh scheduler shutting down");
                self.state_tx.send_if_modified(|state| {
                    if state.is_terminal() {
                        false
                    } else {
                        *state = SchedulerState::Stopped;
                        true
                    }
                });
            }
            () = self.cycle() => {}
        }
    }

    /// Initialize, then refresh every time the timer fires until a call fails
    async fn cycle(&self) {
        let mut lifetime = match self.fetch_lifetime().await {
            Ok(lifetime) => lifetime,
            Err(e) => return self.fail(FailureCause::LifetimeFetch(e.to_string())),
        };
        let mut cycle = 0;

        loop {
            let delay = self.arm(lifetime, cycle);
            time::sleep(delay).await;

            self.state_tx.send_replace(SchedulerState::Refreshing { cycle });
            if let Err(e) = self.bounded(self.endpoint.refresh()).await {
                return self.fail(FailureCause::Refresh(e.to_string()));
            }
            cycle += 1;
            info!(cycle, "Access token refreshed");

            lifetime = match self.fetch_lifetime().await {
                Ok(lifetime) => lifetime,
                Err(e) => return self.fail(FailureCause::LifetimeFetch(e.to_string())),
            };
        }
    }

    async fn fetch_lifetime(&self) -> CoreResult<AccessTokenLifetime> {
        self.bounded(self.endpoint.access_token_lifetime()).await
    }

    async fn bounded<T>(&self, call: impl Future<Output = CoreResult<T>>) -> CoreResult<T> {
        time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| CoreError::timeout(self.request_timeout))?
    }

    fn arm(&self, lifetime: AccessTokenLifetime, cycle: u64) -> Duration {
        let delay = self.schedule.delay_for(lifetime);
        info!(
            lifetime = %lifetime,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            cycle,
            "Next access token refresh scheduled"
        );
        self.state_tx.send_replace(SchedulerState::Scheduled {
            delay,
            lifetime,
            cycle,
        });
        delay
    }

    fn fail(&self, cause: FailureCause) {
        error!(%cause, "Refresh scheduler stopped");

        let redirect = match (&cause, &self.redirect) {
            (FailureCause::Refresh(_), Some(redirect)) => Some(redirect),
            _ => None,
        };
        self.state_tx.send_replace(SchedulerState::Failed(cause));

        if let Some(redirect) = redirect {
            info!(url = %redirect.url, "Session expired, sign-in required");
            redirect.handler.sign_in_required(&redirect.url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenkeep_core::tests::ScriptedEndpoint;

    fn endpoint() -> Arc<dyn TokenEndpoint> {
        Arc::new(ScriptedEndpoint::new(
            AccessTokenLifetime::from_secs(900).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_redirect_requires_url_and_handler() {
        let result = RefreshScheduler::builder(endpoint())
            .on_refresh_failure(FailurePolicy::Redirect)
            .start();
        assert!(matches!(result, Err(DaemonError::InvalidConfig(_))));

        let result = RefreshScheduler::builder(endpoint())
            .on_refresh_failure(FailurePolicy::Redirect)
            .sign_in_url(Url::parse("http://localhost/sign-in/").unwrap())
            .start();
        assert!(matches!(result, Err(DaemonError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_zero_request_timeout_is_rejected() {
        let result = RefreshScheduler::builder(endpoint())
            .request_timeout(Duration::ZERO)
            .start();
        assert!(matches!(result, Err(DaemonError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_from_settings() {
        let mut settings = Settings::default();
        settings.refresh.on_refresh_failure = FailurePolicy::Redirect;

        let scheduler = RefreshSchedulerBuilder::from_settings(&settings, endpoint())
            .unwrap()
            .sign_in_handler(Arc::new(|_: &Url| {}))
            .start()
            .unwrap();
        assert!(!scheduler.state().is_terminal());
        assert_eq!(scheduler.shutdown().await, SchedulerState::Stopped);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_refresh_is_logged_at_info() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let scheduler = RefreshScheduler::builder(endpoint()).start().unwrap();
        time::sleep(Duration::from_secs(601)).await;
        scheduler.shutdown().await;

        let logs = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let line = logs
            .lines()
            .find(|line| line.contains("Access token refreshed"))
            .unwrap();
        assert!(line.contains("INFO"));
        assert!(line.contains("cycle=1"));
    }
}
