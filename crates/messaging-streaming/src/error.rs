/// Construction-time fatal errors (spec.md §7 "Configuration error"),
/// grounded on the upstream `subscription_config.go`'s `panic("no workers
/// configured")`.
#[derive(thiserror::Error, Debug)]
pub enum StreamingError {
    #[error("a subscription must have at least one handler")]
    NoHandlers,
}
