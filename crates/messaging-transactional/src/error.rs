use thiserror::Error;

/// Grounded on the upstream handler's three `panic(err)` sites (connect
/// failure, commit-writer-open failure, commit failure), each replaced by a
/// `Result` variant per spec.md §9.
#[derive(Error, Debug)]
pub enum TransactionalError {
    #[error("unable to begin transaction: {0}")]
    BeginFailed(#[source] anyhow::Error),

    #[error("transaction handler failed: {0}")]
    HandlerFailed(#[source] anyhow::Error),

    #[error("unable to commit transaction: {0}")]
    CommitFailed(#[source] anyhow::Error),

    #[error("transaction rolled back after handler failure: {handler_error}")]
    RolledBack {
        handler_error: anyhow::Error,
        #[source]
        rollback_error: Option<anyhow::Error>,
    },
}
