//! The transactional handler, grounded on the upstream
//! `handlers/transactional/handler.go`: connect, open a `CommitWriter`,
//! build an inner handler from the resulting [`State`], run it, and commit
//! only if it succeeds — rolling back and propagating the failure otherwise.
//!
//! The upstream `handler.go` panics on a `nil` `ctx`; that check has no
//! counterpart here because `CancellationToken` is never null in Rust.

use crate::error::TransactionalError;
use crate::monitor::{NopTransactionMonitor, TransactionMonitor};
use crate::state::State;
use async_trait::async_trait;
use messaging_contracts::{CancellationToken, Connector, Delivery, Handler};
use std::sync::Arc;

/// Builds the handler that runs inside the transaction from its [`State`].
pub type HandlerFactory = Arc<dyn Fn(State) -> Arc<dyn Handler> + Send + Sync>;

pub struct TransactionalHandler {
    connector: Arc<dyn Connector>,
    factory: HandlerFactory,
    monitor: Arc<dyn TransactionMonitor>,
}

impl TransactionalHandler {
    pub fn new(connector: Arc<dyn Connector>, factory: HandlerFactory) -> Self {
        Self {
            connector,
            factory,
            monitor: Arc::new(NopTransactionMonitor),
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn TransactionMonitor>) -> Self {
        self.monitor = monitor;
        self
    }
}

#[async_trait]
impl Handler for TransactionalHandler {
    async fn handle(&self, cancel: CancellationToken, deliveries: &[Delivery]) -> anyhow::Result<()> {
        let connection = self.connector.connect(cancel.clone()).await.map_err(|error| {
            let error = anyhow::Error::from(error);
            self.monitor.transaction_started(Some(&error));
            TransactionalError::BeginFailed(error)
        })?;

        let writer = match connection.commit_writer(cancel.clone()).await {
            Ok(writer) => writer,
            Err(error) => {
                let error = anyhow::Error::from(error);
                self.monitor.transaction_started(Some(&error));
                let _ = connection.close().await;
                return Err(TransactionalError::BeginFailed(error).into());
            }
        };

        self.monitor.transaction_started(None);
        let extension = writer.extension();
        let mut state = State::new(writer);
        if let Some(extension) = extension {
            state = state.with_extension(extension);
        }
        let inner = (self.factory)(state.clone());

        let handler_result = inner.handle(cancel, deliveries).await;

        let outcome = match handler_result {
            Ok(()) => self.commit(&state).await,
            Err(handler_error) => Err(self.rollback(&state, handler_error).await),
        };

        let _ = connection.close().await;
        outcome
    }
}

impl TransactionalHandler {
    async fn commit(&self, state: &State) -> anyhow::Result<()> {
        let mut writer = state.writer().lock_owned().await;
        match writer.commit().await {
            Ok(()) => {
                self.monitor.transaction_committed(None);
                Ok(())
            }
            Err(error) => {
                let error = anyhow::Error::from(error);
                self.monitor.transaction_committed(Some(&error));
                Err(TransactionalError::CommitFailed(error).into())
            }
        }
    }

    async fn rollback(&self, state: &State, handler_error: anyhow::Error) -> anyhow::Error {
        let mut writer = state.writer().lock_owned().await;
        match writer.rollback().await {
            Ok(()) => {
                self.monitor.transaction_rolled_back(None);
                TransactionalError::RolledBack {
                    handler_error,
                    rollback_error: None,
                }
                .into()
            }
            Err(error) => {
                let error = anyhow::Error::from(error);
                self.monitor.transaction_rolled_back(Some(&error));
                TransactionalError::RolledBack {
                    handler_error,
                    rollback_error: Some(error),
                }
                .into()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging_contracts::{CommitWriter, Connection, Dispatch, Reader, TransportError, Writer};
    use std::any::Any;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeWriter {
        committed: Arc<AtomicBool>,
        rolled_back: Arc<AtomicBool>,
        extension: Option<Arc<dyn Any + Send + Sync>>,
    }

    #[async_trait]
    impl Writer for FakeWriter {
        async fn write(
            &mut self,
            _cancel: CancellationToken,
            _dispatches: &[Dispatch],
        ) -> Result<usize, TransportError> {
            Ok(0)
        }
        async fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    #[async_trait]
    impl CommitWriter for FakeWriter {
        async fn commit(&mut self) -> Result<(), TransportError> {
            self.committed.store(true, Ordering::SeqCst);
            Ok(())
        }
        async fn rollback(&mut self) -> Result<(), TransportError> {
            self.rolled_back.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn extension(&self) -> Option<Arc<dyn Any + Send + Sync>> {
            self.extension.clone()
        }
    }

    struct FakeConnection {
        committed: Arc<AtomicBool>,
        rolled_back: Arc<AtomicBool>,
        extension: Option<Arc<dyn Any + Send + Sync>>,
    }

    #[async_trait]
    impl Connection for FakeConnection {
        async fn reader(&self, _cancel: CancellationToken) -> Result<Box<dyn Reader>, TransportError> {
            unimplemented!()
        }
        async fn writer(&self, _cancel: CancellationToken) -> Result<Box<dyn Writer>, TransportError> {
            unimplemented!()
        }
        async fn commit_writer(
            &self,
            _cancel: CancellationToken,
        ) -> Result<Box<dyn CommitWriter>, TransportError> {
            Ok(Box::new(FakeWriter {
                committed: self.committed.clone(),
                rolled_back: self.rolled_back.clone(),
                extension: self.extension.clone(),
            }))
        }
        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct FakeConnector {
        committed: Arc<AtomicBool>,
        rolled_back: Arc<AtomicBool>,
        extension: Option<Arc<dyn Any + Send + Sync>>,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(
            &self,
            _cancel: CancellationToken,
        ) -> Result<Box<dyn Connection>, TransportError> {
            Ok(Box::new(FakeConnection {
                committed: self.committed.clone(),
                rolled_back: self.rolled_back.clone(),
                extension: self.extension.clone(),
            }))
        }
        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct SucceedingHandler;
    #[async_trait]
    impl Handler for SucceedingHandler {
        async fn handle(&self, _cancel: CancellationToken, _deliveries: &[Delivery]) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct FailingHandler;
    #[async_trait]
    impl Handler for FailingHandler {
        async fn handle(&self, _cancel: CancellationToken, _deliveries: &[Delivery]) -> anyhow::Result<()> {
            anyhow::bail!("handler blew up")
        }
    }

    #[tokio::test]
    async fn commits_when_the_inner_handler_succeeds() {
        let committed = Arc::new(AtomicBool::new(false));
        let rolled_back = Arc::new(AtomicBool::new(false));
        let connector = Arc::new(FakeConnector {
            committed: committed.clone(),
            rolled_back: rolled_back.clone(),
            extension: None,
        });

        let handler = TransactionalHandler::new(
            connector,
            Arc::new(|_state| Arc::new(SucceedingHandler) as Arc<dyn Handler>),
        );

        let result = handler.handle(CancellationToken::new(), &[]).await;
        assert!(result.is_ok());
        assert!(committed.load(Ordering::SeqCst));
        assert!(!rolled_back.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn rolls_back_when_the_inner_handler_fails() {
        let committed = Arc::new(AtomicBool::new(false));
        let rolled_back = Arc::new(AtomicBool::new(false));
        let connector = Arc::new(FakeConnector {
            committed: committed.clone(),
            rolled_back: rolled_back.clone(),
            extension: None,
        });

        let handler = TransactionalHandler::new(
            connector,
            Arc::new(|_state| Arc::new(FailingHandler) as Arc<dyn Handler>),
        );

        let result = handler.handle(CancellationToken::new(), &[]).await;
        assert!(result.is_err());
        assert!(!committed.load(Ordering::SeqCst));
        assert!(rolled_back.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn the_factory_can_read_back_the_writer_extension_through_state() {
        let committed = Arc::new(AtomicBool::new(false));
        let rolled_back = Arc::new(AtomicBool::new(false));
        let marker: Arc<dyn Any + Send + Sync> = Arc::new(42_u32);
        let connector = Arc::new(FakeConnector {
            committed: committed.clone(),
            rolled_back: rolled_back.clone(),
            extension: Some(marker),
        });

        let seen = Arc::new(AtomicBool::new(false));
        let seen_in_factory = seen.clone();
        let handler = TransactionalHandler::new(
            connector,
            Arc::new(move |state: State| {
                if let Some(value) = state.extension::<u32>() {
                    seen_in_factory.store(*value == 42, Ordering::SeqCst);
                }
                Arc::new(SucceedingHandler) as Arc<dyn Handler>
            }),
        );

        let result = handler.handle(CancellationToken::new(), &[]).await;
        assert!(result.is_ok());
        assert!(seen.load(Ordering::SeqCst));
    }
}
