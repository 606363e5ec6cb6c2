//! The retry decorator itself, grounded on the upstream Go
//! `handlers/retry/handler.go` control flow (attempt loop, `isAlive(ctx)`
//! check, `panicOnTooManyAttempts`, `sleep`) fused with
//! `resilience::retry`'s exponential-backoff-with-jitter calculation, per
//! spec.md §9's direction to treat the fuller backoff policy as the
//! authoritative behavior for this port.

use crate::config::RetryConfig;
use crate::error::RetryFailure;
use crate::monitor::{Monitor, NopMonitor};
use async_trait::async_trait;
use messaging_contracts::{CancellationToken, Delivery, Handler};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a given failure should be retried without any delay.
/// Replaces the upstream `immediate map[interface{}]struct{}` (which
/// required errors to be Go-comparable) with a predicate, since arbitrary
/// `anyhow::Error` values have no such equality.
pub type ImmediateRetryPredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Wraps an inner [`Handler`], retrying it against the same batch of
/// deliveries until it succeeds, the retry budget is exhausted, or `cancel`
/// fires.
pub struct RetryHandler<H: Handler> {
    inner: H,
    config: RetryConfig,
    monitor: Arc<dyn Monitor>,
    immediate_retry: Option<ImmediateRetryPredicate>,
}

impl<H: Handler> RetryHandler<H> {
    pub fn new(inner: H, config: RetryConfig) -> Self {
        Self {
            inner,
            config,
            monitor: Arc::new(NopMonitor),
            immediate_retry: None,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Errors matching `predicate` are retried without waiting out the
    /// backoff delay first.
    pub fn with_immediate_retry(mut self, predicate: ImmediateRetryPredicate) -> Self {
        self.immediate_retry = Some(predicate);
        self
    }
}

#[async_trait]
impl<H: Handler> Handler for RetryHandler<H> {
    async fn handle(&self, cancel: CancellationToken, deliveries: &[Delivery]) -> anyhow::Result<()> {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryFailure::Cancelled { attempts: attempt }.into());
            }

            match self.inner.handle(cancel.clone(), deliveries).await {
                Ok(()) => {
                    self.monitor.handle_attempted(attempt, None);
                    if attempt > 0 {
                        tracing::info!(
                            attempt,
                            "operation completed successfully after {attempt} failed attempt(s)"
                        );
                    }
                    return Ok(());
                }
                Err(error) => {
                    self.monitor.handle_attempted(attempt, Some(&error));
                    self.log_failure(attempt, &error);

                    if self.config.max_attempts > 0 && attempt >= self.config.max_attempts {
                        return Err(RetryFailure::MaxAttemptsExceeded {
                            attempts: attempt + 1,
                            source: error,
                        }
                        .into());
                    }

                    let immediate = self
                        .immediate_retry
                        .as_ref()
                        .map(|predicate| predicate(&error))
                        .unwrap_or(false);

                    if !immediate {
                        let delay = backoff_for_attempt(attempt, &self.config);
                        let delay = jittered(delay, self.config.jitter_factor);
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => {
                                return Err(RetryFailure::Cancelled { attempts: attempt + 1 }.into());
                            }
                        }
                    }

                    attempt += 1;
                }
            }
        }
    }
}

impl<H: Handler> RetryHandler<H> {
    fn log_failure(&self, attempt: u32, error: &anyhow::Error) {
        if self.config.log_stack_trace {
            tracing::info!(attempt, %error, backtrace = %error.backtrace(), "attempt failed");
        } else {
            tracing::info!(attempt, %error, "attempt failed");
        }
    }
}

/// `min_backoff * 2^min(n, 63)`, capped at `max_backoff` unless that's zero
/// (zero means "no exponential growth, just `min_backoff`", spec.md §4.4).
fn backoff_for_attempt(attempt: u32, config: &RetryConfig) -> Duration {
    let shift = attempt.min(63);
    let scaled = (config.min_backoff.as_nanos() as u128).saturating_mul(1u128 << shift);
    let scaled = Duration::from_nanos(scaled.min(u64::MAX as u128) as u64);

    if config.max_backoff.is_zero() {
        config.min_backoff
    } else {
        scaled.min(config.max_backoff)
    }
}

/// Samples uniformly from `[delay*(1-j), delay*(1+j)]` for `j` in `(0, 1]`;
/// returns `delay` unchanged when `j` is `0` (spec.md §4.4 step 5).
fn jittered(delay: Duration, jitter_factor: f64) -> Duration {
    if jitter_factor <= 0.0 {
        return delay;
    }
    let mut rng = rand::thread_rng();
    let factor = 1.0 + rng.gen_range(-jitter_factor..=jitter_factor);
    Duration::from_nanos((delay.as_nanos() as f64 * factor).max(0.0) as u64)
}
