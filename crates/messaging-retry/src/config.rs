use std::time::Duration;

/// Retry policy configuration (spec.md §4.4/§6).
///
/// `min_backoff`/`max_backoff`/`jitter_factor` are grounded on
/// `resilience::retry::RetryConfig`'s exponential-backoff-with-jitter
/// calculation; `max_attempts`, `immediate_retry`, and `log_stack_trace`
/// carry over the upstream Go `retry.Options` surface (`Timeout` becomes
/// `min_backoff` here since spec.md's fuller backoff policy supersedes the
/// original's single fixed sleep — see spec.md §9).
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Base delay before the first retry; doubles on every subsequent
    /// failure (spec.md §4.4 step 5: `min_backoff * 2^min(n, 63)`).
    pub min_backoff: Duration,
    /// Ceiling the exponential backoff is capped at. `Duration::ZERO` means
    /// "no exponential growth, just `min_backoff`" (spec.md §4.4).
    pub max_backoff: Duration,
    /// Fraction in `[0, 1]` the computed delay is randomized by: `0` is no
    /// jitter, `1` samples uniformly from `[0, 2*delay]` (spec.md §4.4).
    pub jitter_factor: f64,
    /// Attempts (including the first) permitted before giving up. `0` means
    /// unlimited, mirroring the upstream default of `1<<32 - 1`.
    pub max_attempts: u32,
    /// Include a captured backtrace in failure logs.
    pub log_stack_trace: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_backoff: Duration::from_secs(5),
            max_backoff: Duration::ZERO,
            jitter_factor: 0.0,
            max_attempts: 0,
            log_stack_trace: true,
        }
    }
}

impl RetryConfig {
    pub fn with_min_backoff(mut self, value: Duration) -> Self {
        self.min_backoff = value;
        self
    }

    pub fn with_max_backoff(mut self, value: Duration) -> Self {
        self.max_backoff = value;
        self
    }

    /// Clamped to `[0, 1]`, matching spec.md §4.4's `jitter-factor ∈ [0,1]`.
    pub fn with_jitter_factor(mut self, value: f64) -> Self {
        self.jitter_factor = value.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_attempts(mut self, value: u32) -> Self {
        self.max_attempts = value;
        self
    }

    pub fn with_log_stack_trace(mut self, value: bool) -> Self {
        self.log_stack_trace = value;
        self
    }
}
