//! The batch commit writer: open (lazily, on first use) → write → commit →
//! optionally close, grounded on the upstream `batch.Writer`. An empty
//! `write` call is a no-op; any failure tears every open handle down so the
//! next call starts clean.

use crate::config::BatchWriterConfig;
use async_trait::async_trait;
use messaging_contracts::{
    CancellationToken, CommitWriter, Connection, Connector, Dispatch, TransportError,
    TransportResult, Writer,
};
use std::sync::Arc;
use tracing::debug;

pub struct BatchWriter {
    connector: Arc<dyn Connector>,
    config: BatchWriterConfig,
    connection: Option<Box<dyn Connection>>,
    writer: Option<Box<dyn CommitWriter>>,
}

impl BatchWriter {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self::with_config(connector, BatchWriterConfig::default())
    }

    pub fn with_config(connector: Arc<dyn Connector>, config: BatchWriterConfig) -> Self {
        Self {
            connector,
            config,
            connection: None,
            writer: None,
        }
    }

    async fn ensure_writer(&mut self, cancel: CancellationToken) -> TransportResult<()> {
        if self.writer.is_some() {
            return Ok(());
        }

        let connection = self.connector.connect(cancel.clone()).await?;
        let writer = connection.commit_writer(cancel).await?;
        self.connection = Some(connection);
        self.writer = Some(writer);
        debug!("batch writer: opened a new commit writer");
        Ok(())
    }

    async fn write_and_commit(
        &mut self,
        cancel: CancellationToken,
        dispatches: &[Dispatch],
    ) -> TransportResult<usize> {
        self.ensure_writer(cancel.clone()).await?;
        let writer = self
            .writer
            .as_mut()
            .expect("ensure_writer leaves writer populated on success");

        let count = writer.write(cancel, dispatches).await?;
        writer.commit().await?;
        Ok(count)
    }

    async fn close_handles(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.close().await;
        }
        if let Some(connection) = self.connection.take() {
            let _ = connection.close().await;
        }
        if self.config.close_connector {
            let _ = self.connector.close().await;
        }
    }
}

#[async_trait]
impl Writer for BatchWriter {
    async fn write(
        &mut self,
        cancel: CancellationToken,
        dispatches: &[Dispatch],
    ) -> TransportResult<usize> {
        if dispatches.is_empty() {
            return Ok(0);
        }

        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        match self.write_and_commit(cancel, dispatches).await {
            Ok(count) => {
                if !self.config.reuse_writer {
                    self.close_handles().await;
                }
                Ok(count)
            }
            Err(error) => {
                self.close_handles().await;
                Err(error)
            }
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.close_handles().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use messaging_contracts::{Reader, Stream};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWriter {
        connect_count: Arc<AtomicUsize>,
        write_count: Arc<AtomicUsize>,
        commit_count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Writer for CountingWriter {
        async fn write(
            &mut self,
            _cancel: CancellationToken,
            dispatches: &[Dispatch],
        ) -> TransportResult<usize> {
            self.write_count.fetch_add(1, Ordering::SeqCst);
            Ok(dispatches.len())
        }
        async fn close(&mut self) -> TransportResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl CommitWriter for CountingWriter {
        async fn commit(&mut self) -> TransportResult<()> {
            self.commit_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn rollback(&mut self) -> TransportResult<()> {
            Ok(())
        }
    }

    struct CountingConnection {
        connect_count: Arc<AtomicUsize>,
        write_count: Arc<AtomicUsize>,
        commit_count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connection for CountingConnection {
        async fn reader(&self, _cancel: CancellationToken) -> TransportResult<Box<dyn Reader>> {
            unimplemented!()
        }
        async fn writer(&self, _cancel: CancellationToken) -> TransportResult<Box<dyn Writer>> {
            unimplemented!()
        }
        async fn commit_writer(
            &self,
            _cancel: CancellationToken,
        ) -> TransportResult<Box<dyn CommitWriter>> {
            Ok(Box::new(CountingWriter {
                connect_count: self.connect_count.clone(),
                write_count: self.write_count.clone(),
                commit_count: self.commit_count.clone(),
            }))
        }
        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    struct CountingConnector {
        connect_count: Arc<AtomicUsize>,
        write_count: Arc<AtomicUsize>,
        commit_count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn connect(
            &self,
            _cancel: CancellationToken,
        ) -> TransportResult<Box<dyn Connection>> {
            self.connect_count.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingConnection {
                connect_count: self.connect_count.clone(),
                write_count: self.write_count.clone(),
                commit_count: self.commit_count.clone(),
            }))
        }
        async fn close(&self) -> TransportResult<()> {
            Ok(())
        }
    }

    fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
        )
    }

    fn sample_dispatch() -> Dispatch {
        Dispatch {
            payload: vec![1],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn empty_write_is_a_no_op() {
        let (connect_count, write_count, commit_count) = counters();
        let connector = Arc::new(CountingConnector {
            connect_count: connect_count.clone(),
            write_count,
            commit_count,
        });
        let mut writer = BatchWriter::new(connector);

        let written = writer.write(CancellationToken::new(), &[]).await.unwrap();
        assert_eq!(written, 0);
        assert_eq!(connect_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reuse_writer_keeps_one_connection_across_calls() {
        let (connect_count, write_count, commit_count) = counters();
        let connector = Arc::new(CountingConnector {
            connect_count: connect_count.clone(),
            write_count: write_count.clone(),
            commit_count: commit_count.clone(),
        });
        let mut writer = BatchWriter::new(connector);

        writer
            .write(CancellationToken::new(), &[sample_dispatch()])
            .await
            .unwrap();
        writer
            .write(CancellationToken::new(), &[sample_dispatch()])
            .await
            .unwrap();

        assert_eq!(connect_count.load(Ordering::SeqCst), 1);
        assert_eq!(write_count.load(Ordering::SeqCst), 2);
        assert_eq!(commit_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn disabling_reuse_writer_reconnects_every_call() {
        let (connect_count, write_count, commit_count) = counters();
        let connector = Arc::new(CountingConnector {
            connect_count: connect_count.clone(),
            write_count,
            commit_count,
        });
        let config = BatchWriterConfig::default().with_reuse_writer(false);
        let mut writer = BatchWriter::with_config(connector, config);

        writer
            .write(CancellationToken::new(), &[sample_dispatch()])
            .await
            .unwrap();
        writer
            .write(CancellationToken::new(), &[sample_dispatch()])
            .await
            .unwrap();

        assert_eq!(connect_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancelled_token_fails_without_writing() {
        let (connect_count, write_count, commit_count) = counters();
        let connector = Arc::new(CountingConnector {
            connect_count: connect_count.clone(),
            write_count,
            commit_count,
        });
        let mut writer = BatchWriter::new(connector);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = writer.write(cancel, &[sample_dispatch()]).await;
        assert!(result.is_err());
        assert_eq!(connect_count.load(Ordering::SeqCst), 0);
    }
}
