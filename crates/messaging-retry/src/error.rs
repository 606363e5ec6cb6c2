use thiserror::Error;

/// Surfaced instead of the upstream Go handler's `panic(ErrMaxRetriesExceeded)`
/// (spec.md §9 REDESIGN FLAGS: "replace panic-as-signal with `Result`").
#[derive(Error, Debug)]
pub enum RetryFailure {
    #[error("operation failed after {attempts} attempt(s): {source}")]
    MaxAttemptsExceeded {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("retry loop cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}
