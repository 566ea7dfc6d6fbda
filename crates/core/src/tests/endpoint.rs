//! Scripted in-memory token endpoint
//!
//! Responses are queued per operation and popped in order. Once a queue runs
//! dry, lifetime queries answer with the fallback lifetime and refreshes
//! succeed. Every call sleeps for the configured latency on the tokio clock,
//! so tests driven by a paused runtime can observe in-flight requests.

use crate::{AccessTokenLifetime, CoreResult, TokenEndpoint};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct ScriptedEndpoint {
    fallback_lifetime: AccessTokenLifetime,
    lifetimes: Mutex<VecDeque<CoreResult<AccessTokenLifetime>>>,
    refreshes: Mutex<VecDeque<CoreResult<()>>>,
    lifetime_latency: Duration,
    refresh_latency: Duration,
    lifetime_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedEndpoint {
    /// Endpoint that always reports `fallback_lifetime` and always refreshes
    #[must_use]
    pub fn new(fallback_lifetime: AccessTokenLifetime) -> Self {
        Self {
            fallback_lifetime,
            lifetimes: Mutex::new(VecDeque::new()),
            refreshes: Mutex::new(VecDeque::new()),
            lifetime_latency: Duration::ZERO,
            refresh_latency: Duration::ZERO,
            lifetime_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Queue the next lifetime answer
    #[must_use]
    pub fn then_lifetime(self, result: CoreResult<AccessTokenLifetime>) -> Self {
        lock(&self.lifetimes).push_back(result);
        self
    }

    /// Queue the next refresh answer
    #[must_use]
    pub fn then_refresh(self, result: CoreResult<()>) -> Self {
        lock(&self.refreshes).push_back(result);
        self
    }

    #[must_use]
    pub fn with_lifetime_latency(mut self, latency: Duration) -> Self {
        self.lifetime_latency = latency;
        self
    }

    #[must_use]
    pub fn with_refresh_latency(mut self, latency: Duration) -> Self {
        self.refresh_latency = latency;
        self
    }

    pub fn lifetime_calls(&self) -> usize {
        self.lifetime_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Highest number of refreshes that were in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenEndpoint for ScriptedEndpoint {
    async fn access_token_lifetime(&self) -> CoreResult<AccessTokenLifetime> {
        self.lifetime_calls.fetch_add(1, Ordering::SeqCst);
        if !self.lifetime_latency.is_zero() {
            tokio::time::sleep(self.lifetime_latency).await;
        }
        lock(&self.lifetimes)
            .pop_front()
            .unwrap_or(Ok(self.fallback_lifetime))
    }

    async fn refresh(&self) -> CoreResult<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        if !self.refresh_latency.is_zero() {
            tokio::time::sleep(self.refresh_latency).await;
        }
        lock(&self.refreshes).pop_front().unwrap_or(Ok(()))
    }
}

/// Decrements the in-flight counter even when the call is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
