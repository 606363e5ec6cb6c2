//! Runs one [`Subscription`] to completion: opens a connection and its
//! streams, runs one [`Worker`] per handler, and winds them down again when
//! asked, grounded on the upstream `streaming/subscriber.go`.

use crate::subscription::{ShutdownStrategy, Subscription};
use crate::worker::{Worker, WorkerConfig};
use messaging_contracts::{CancellationToken, Connection, ConnectionPool, Stream, TransportError};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct Subscriber {
    pool: Arc<ConnectionPool>,
    subscription: Subscription,
    soft: CancellationToken,
}

impl Subscriber {
    pub fn new(pool: Arc<ConnectionPool>, subscription: Subscription, soft: CancellationToken) -> Self {
        Self { pool, subscription, soft }
    }

    /// Opens a connection, opens every configured stream against it, runs one
    /// worker per handler, and winds everything back down before returning.
    /// Returns once the streams are exhausted, `soft` is honored, or opening
    /// the connection/streams fails.
    pub async fn listen(&self) -> Result<(), TransportError> {
        let connection = self.pool.active(self.soft.clone()).await?;

        let streams = match self.open_streams(&connection).await {
            Ok(streams) => streams,
            Err(error) => {
                self.pool.dispose(connection).await;
                return Err(error);
            }
        };

        // `Immediate` needs no separate hard token: soft already means "stop
        // now, mid-batch" for this strategy, so the worker pool can share it.
        let hard = if self.subscription.shutdown_strategy == ShutdownStrategy::Immediate {
            self.soft.clone()
        } else {
            CancellationToken::new()
        };

        let handles: Vec<JoinHandle<()>> = self
            .subscription
            .handlers
            .iter()
            .map(|handler| {
                let worker = Worker::new(WorkerConfig {
                    streams: streams.clone(),
                    handler: Some(handler.clone()),
                    soft: self.soft.clone(),
                    hard: hard.clone(),
                    batch_capacity: self.subscription.batch_capacity,
                    buffer_capacity: self.subscription.buffer_capacity,
                    buffer_timeout: self.subscription.buffer_timeout,
                    shutdown_strategy: self.subscription.shutdown_strategy,
                    handle_delivery: self.subscription.handle_delivery,
                    delivery_to_context: self.subscription.delivery_to_context,
                });
                tokio::spawn(worker.listen())
            })
            .collect();

        self.shutdown(&streams, handles, &hard).await;
        self.pool.dispose(connection).await;

        Ok(())
    }

    async fn open_streams(
        &self,
        connection: &Arc<dyn Connection>,
    ) -> Result<Vec<Arc<dyn Stream>>, TransportError> {
        let reader = connection.reader(self.soft.clone()).await?;
        let mut streams: Vec<Arc<dyn Stream>> = Vec::with_capacity(self.subscription.stream_configs.len());
        let exclusive = self.subscription.handlers.len() == 1;

        for config in &self.subscription.stream_configs {
            let mut config = config.clone();
            if exclusive {
                config.exclusive_stream = true;
            }
            match reader.stream(self.soft.clone(), config).await {
                Ok(stream) => streams.push(Arc::from(stream)),
                Err(error) => {
                    for opened in &streams {
                        let _ = opened.close().await;
                    }
                    let _ = reader.close().await;
                    return Err(error);
                }
            }
        }

        if let Err(error) = reader.close().await {
            tracing::debug!(%error, "subscriber: error closing reader after opening streams");
        }

        Ok(streams)
    }

    /// Waits for every worker to finish, or for `soft` to fire first. Either
    /// way the streams are closed as soon as that first signal arrives — on
    /// early worker completion there is nothing left to read; on soft cancel
    /// closing stops new deliveries from arriving while in-flight batches
    /// keep draining (spec.md §4.9 step 6). Only once streams are closed do
    /// we give the workers `shutdown_timeout` to finish before escalating to
    /// `hard`.
    async fn shutdown(
        &self,
        streams: &[Arc<dyn Stream>],
        handles: Vec<JoinHandle<()>>,
        hard: &CancellationToken,
    ) {
        let workers_done = futures_join_all(handles);
        tokio::pin!(workers_done);

        tokio::select! {
            _ = &mut workers_done => {
                Self::close_streams(streams).await;
                return;
            }
            _ = self.soft.cancelled() => {
                Self::close_streams(streams).await;
            }
        }

        tokio::select! {
            _ = &mut workers_done => {}
            _ = tokio::time::sleep(self.subscription.shutdown_timeout) => {
                hard.cancel();
                workers_done.await;
            }
        }
    }

    async fn close_streams(streams: &[Arc<dyn Stream>]) {
        for stream in streams {
            if let Err(error) = stream.close().await {
                tracing::debug!(%error, "subscriber: error closing stream");
            }
        }
    }
}

async fn futures_join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(error) = handle.await {
            tracing::warn!(%error, "subscriber: worker task panicked");
        }
    }
}
