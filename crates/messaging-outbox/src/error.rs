/// Grounded on `transactional-outbox::error::OutboxError`, adapted to the
/// store/receiver/sender split spec.md §4.6-§4.8 describes.
#[derive(thiserror::Error, Debug)]
pub enum OutboxError {
    #[error("outbox database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Rows-affected (or rows-returned) after an insert did not equal the
    /// number of dispatches submitted (spec.md §4.6, §7 "Storage integrity").
    #[error("outbox insert affected {actual} rows, expected {expected}")]
    RowCountMismatch { expected: usize, actual: usize },

    /// The identity column did not report any inserted rows at all.
    #[error("outbox insert did not return an identity value")]
    IdentityFailure,

    #[error("outbox operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type OutboxResult<T> = Result<T, OutboxError>;
