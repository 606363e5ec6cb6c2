/// Told about every attempt, success or failure. Grounded on the upstream
/// `retry.monitor.HandleAttempted(attempt, err)`.
pub trait Monitor: Send + Sync {
    fn handle_attempted(&self, attempt: u32, error: Option<&anyhow::Error>);
}

/// Observes nothing, matching the upstream package's `nop` default.
pub struct NopMonitor;

impl Monitor for NopMonitor {
    fn handle_attempted(&self, _attempt: u32, _error: Option<&anyhow::Error>) {}
}

/// Logs every attempt through `tracing`, replacing the upstream `logger`
/// interface (`Printf`) with the ecosystem's structured-logging facade.
pub struct TracingMonitor;

impl Monitor for TracingMonitor {
    fn handle_attempted(&self, attempt: u32, error: Option<&anyhow::Error>) {
        match error {
            Some(error) => tracing::warn!(attempt, %error, "retry attempt failed"),
            None if attempt > 0 => {
                tracing::info!(attempt, "operation succeeded after prior failed attempt(s)")
            }
            None => {}
        }
    }
}
