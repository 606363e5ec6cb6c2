use messaging_contracts::CommitWriter;
use std::any::Any;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Handed to the handler factory once a transaction's `CommitWriter` is open.
///
/// Grounded on the upstream `transactionalContext.State()`, which exposes
/// `Tx *sql.Tx` and `Writer messaging.CommitWriter`. `Tx` is generalized here
/// to an opaque `extension` slot set via [`State::with_extension`] so that,
/// for example, the outbox store can stash its `sqlx::Transaction` without
/// this crate depending on `sqlx`.
#[derive(Clone)]
pub struct State {
    writer: Arc<Mutex<Box<dyn CommitWriter>>>,
    extension: Option<Arc<dyn Any + Send + Sync>>,
}

impl State {
    pub(crate) fn new(writer: Box<dyn CommitWriter>) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            extension: None,
        }
    }

    pub(crate) fn with_extension(mut self, extension: Arc<dyn Any + Send + Sync>) -> Self {
        self.extension = Some(extension);
        self
    }

    /// The open `CommitWriter` for this transaction. Shared (not exclusively
    /// owned) since the handler factory's inner handler is the only thing
    /// that writes through it before the outer handler commits or rolls it
    /// back.
    pub fn writer(&self) -> Arc<Mutex<Box<dyn CommitWriter>>> {
        self.writer.clone()
    }

    /// Downcasts the extension slot set by the connector/store that opened
    /// this transaction, if any.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.extension
            .as_ref()
            .and_then(|value| value.clone().downcast::<T>().ok())
    }
}
