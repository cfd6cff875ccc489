//! Retry-with-backoff policy for capability calls.
//!
//! [`Retrying`] applies a [`RetryPolicy`] to any capability.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::{debug, error, warn};

use readagent_types::RetrySettings;

use crate::capability::{Answerer, BoundaryOracle, Completion, PageSelector, Summarizer};
use crate::error::CapabilityError;

/// Bounded exponential backoff.
///
/// Only transient errors are retried; anything else is returned at once.
/// Exhausting `max_attempts` returns the last error.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    /// 0.0 gives a fixed schedule
    pub randomization_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_interval: Duration::from_millis(settings.initial_interval_ms),
            multiplier: settings.multiplier,
            max_interval: Duration::from_secs(settings.max_interval_secs),
            randomization_factor: 0.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Override the attempt bound.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the first delay.
    pub fn with_initial_interval(mut self, interval: Duration) -> Self {
        self.initial_interval = interval;
        self
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_multiplier(self.multiplier)
            .with_max_interval(self.max_interval)
            .with_randomization_factor(self.randomization_factor)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Delays between consecutive attempts, `max_attempts - 1` entries.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        (1..self.max_attempts)
            .filter_map(|_| backoff.next_backoff())
            .collect()
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, CapabilityError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, CapabilityError>> + Send,
        T: Send,
    {
        let mut backoff = self.backoff();
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(operation, attempt = attempts, "Invoking capability");

            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => {
                    error!(operation, error = %e, "Capability failed permanently");
                    return Err(e);
                }
                Err(e) => {
                    if attempts >= self.max_attempts {
                        error!(operation, attempts, error = %e, "Max retries exceeded");
                        return Err(e);
                    }

                    match backoff.next_backoff() {
                        Some(duration) => {
                            warn!(
                                operation,
                                error = %e,
                                retry_in_ms = duration.as_millis() as u64,
                                "Capability call failed, retrying"
                            );
                            tokio::time::sleep(duration).await;
                        }
                        None => {
                            error!(operation, error = %e, "Backoff exhausted");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }
}

/// Applies a [`RetryPolicy`] to every capability the inner value implements.
pub struct Retrying<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C> Retrying<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: BoundaryOracle> BoundaryOracle for Retrying<C> {
    async fn propose_boundary(
        &self,
        preceding: &str,
        passage: &str,
        end_tag: &str,
    ) -> Result<String, CapabilityError> {
        self.policy
            .execute("pagination", || {
                self.inner.propose_boundary(preceding, passage, end_tag)
            })
            .await
    }
}

#[async_trait]
impl<C: Summarizer> Summarizer for Retrying<C> {
    async fn shorten(&self, page_text: &str) -> Result<String, CapabilityError> {
        self.policy
            .execute("gisting", || self.inner.shorten(page_text))
            .await
    }
}

#[async_trait]
impl<C: PageSelector> PageSelector for Retrying<C> {
    async fn select_pages(
        &self,
        shortened_article: &str,
        question: &str,
        max_lookup_pages: usize,
    ) -> Result<Completion, CapabilityError> {
        self.policy
            .execute("lookup", || {
                self.inner
                    .select_pages(shortened_article, question, max_lookup_pages)
            })
            .await
    }
}

#[async_trait]
impl<C: Answerer> Answerer for Retrying<C> {
    async fn answer(
        &self,
        context: &str,
        question: &str,
        options: Option<&[String]>,
    ) -> Result<Completion, CapabilityError> {
        self.policy
            .execute("answer", || self.inner.answer(context, question, options))
            .await
    }
}
