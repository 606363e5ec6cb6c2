/// Told about the three phases of a transaction's lifecycle. Grounded on the
/// upstream `Monitor.TransactionStarted/Committed/RolledBack`.
pub trait TransactionMonitor: Send + Sync {
    fn transaction_started(&self, error: Option<&anyhow::Error>);
    fn transaction_committed(&self, error: Option<&anyhow::Error>);
    fn transaction_rolled_back(&self, error: Option<&anyhow::Error>);
}

pub struct NopTransactionMonitor;

impl TransactionMonitor for NopTransactionMonitor {
    fn transaction_started(&self, _error: Option<&anyhow::Error>) {}
    fn transaction_committed(&self, _error: Option<&anyhow::Error>) {}
    fn transaction_rolled_back(&self, _error: Option<&anyhow::Error>) {}
}

pub struct TracingTransactionMonitor;

impl TransactionMonitor for TracingTransactionMonitor {
    fn transaction_started(&self, error: Option<&anyhow::Error>) {
        match error {
            Some(error) => tracing::warn!(%error, "unable to begin transaction"),
            None => tracing::debug!("transaction started"),
        }
    }

    fn transaction_committed(&self, error: Option<&anyhow::Error>) {
        match error {
            Some(error) => tracing::warn!(%error, "unable to commit transaction"),
            None => tracing::debug!("transaction committed"),
        }
    }

    fn transaction_rolled_back(&self, error: Option<&anyhow::Error>) {
        match error {
            Some(error) => tracing::warn!(%error, "rollback failed"),
            None => tracing::info!("transaction rolled back"),
        }
    }
}
