//! One worker per handler (spec.md §4.10), grounded on the upstream
//! `streaming/worker.go`: a reader task per stream feeds a shared bounded
//! channel; a single dispatcher task batches deliveries and hands them to
//! the handler.
//!
//! Rust's bounded `mpsc` channel closes itself once every sender drops, so
//! unlike `worker.go` there is no separate `awaitStreamClosure` goroutine:
//! reader tasks simply drop their `Sender` when they return.

use crate::delivery_context::{self, DeliverySummary};
use crate::subscription::ShutdownStrategy;
use messaging_contracts::{CancellationToken, Delivery, Handler, Stream};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct WorkerConfig {
    pub streams: Vec<Arc<dyn Stream>>,
    /// `None` means "silently drain the buffer", a test hook (spec.md
    /// §4.10 edge cases).
    pub handler: Option<Arc<dyn Handler>>,
    pub soft: CancellationToken,
    pub hard: CancellationToken,
    pub batch_capacity: u16,
    pub buffer_capacity: u16,
    pub buffer_timeout: Duration,
    pub shutdown_strategy: ShutdownStrategy,
    /// When `false`, only deliveries with a non-nil `decoded_message` are
    /// handed to the handler; the rest are still acknowledged (spec.md
    /// §4.10: "batch holds decoded messages, skipping deliveries where
    /// decoded-message is nil").
    pub handle_delivery: bool,
    /// When `true`, the unacknowledged batch is additionally stashed under a
    /// well-known context key for the duration of the handler call (spec.md
    /// §4.10), readable via [`crate::current_deliveries`].
    pub delivery_to_context: bool,
}

pub struct Worker {
    streams: Vec<Arc<dyn Stream>>,
    handler: Option<Arc<dyn Handler>>,
    soft: CancellationToken,
    hard: CancellationToken,
    batch_capacity: u16,
    buffer_capacity: u16,
    buffer_timeout: Duration,
    shutdown_strategy: ShutdownStrategy,
    handle_delivery: bool,
    delivery_to_context: bool,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            streams: config.streams,
            handler: config.handler,
            soft: config.soft,
            hard: config.hard,
            batch_capacity: config.batch_capacity,
            buffer_capacity: config.buffer_capacity,
            buffer_timeout: config.buffer_timeout,
            shutdown_strategy: config.shutdown_strategy,
            handle_delivery: config.handle_delivery,
            delivery_to_context: config.delivery_to_context,
        }
    }

    /// Runs until every reader has stopped and the dispatcher has drained
    /// what remains in the channel. Consumes `self`: owned by the task the
    /// subscriber spawns for it.
    pub async fn listen(self) {
        let (tx, rx) = mpsc::channel::<Delivery>(self.buffer_capacity.max(1) as usize);
        let stream_ctx = self.hard.child_token();

        for stream in &self.streams {
            let stream = stream.clone();
            let hard = self.hard.clone();
            let stream_ctx = stream_ctx.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                Self::read_from_stream(stream, hard, stream_ctx, tx).await;
            });
        }
        drop(tx);

        self.dispatch_loop(rx).await;
    }

    async fn read_from_stream(
        stream: Arc<dyn Stream>,
        hard: CancellationToken,
        stream_ctx: CancellationToken,
        tx: mpsc::Sender<Delivery>,
    ) {
        loop {
            let delivery = match stream.read(hard.clone()).await {
                Ok(delivery) => delivery,
                Err(_) => break,
            };

            tokio::select! {
                _ = stream_ctx.cancelled() => break,
                result = tx.send(delivery) => {
                    if result.is_err() {
                        break;
                    }
                }
            }
        }
        stream_ctx.cancel();
    }

    async fn dispatch_loop(&self, mut rx: mpsc::Receiver<Delivery>) {
        if self.handler.is_none() {
            while rx.recv().await.is_some() {}
            return;
        }

        let mut unacked: Vec<Delivery> = Vec::with_capacity(self.batch_capacity.max(1) as usize);

        while let Some(delivery) = rx.recv().await {
            if self.is_complete(ShutdownStrategy::Immediate) {
                break;
            }

            unacked.push(delivery);

            if rx.len() > 0 && unacked.len() < self.batch_capacity as usize {
                continue;
            }

            if !self.deliver_batch(&mut unacked).await {
                break;
            }

            if self.is_complete(ShutdownStrategy::CurrentBatch) {
                break;
            }

            self.sleep_between_batches(&rx).await;
            unacked.clear();
        }
    }

    fn is_complete(&self, strategy: ShutdownStrategy) -> bool {
        self.shutdown_strategy == strategy && self.soft.is_cancelled()
    }

    /// Delivers `unacked` to the handler and acknowledges it. Returns
    /// `false` if the worker should stop without clearing the batch (handler
    /// or acknowledge failure).
    ///
    /// Splits `unacked` around `handle_delivery`: when `true` the full batch
    /// goes to the handler; when `false` only deliveries with a decoded
    /// message do, and the rest are acknowledged without ever reaching the
    /// handler. Either way `unacked` is restored to its full contents before
    /// acknowledgement, since every delivery that was read is acknowledged
    /// regardless of whether the handler saw it.
    async fn deliver_batch(&self, unacked: &mut Vec<Delivery>) -> bool {
        if let Some(handler) = &self.handler {
            let to_handle: Vec<Delivery> = if self.handle_delivery {
                std::mem::take(unacked)
            } else {
                let mut keep = Vec::with_capacity(unacked.len());
                let mut rest = Vec::with_capacity(unacked.len());
                for delivery in unacked.drain(..) {
                    if delivery.decoded_message.is_some() {
                        keep.push(delivery);
                    } else {
                        rest.push(delivery);
                    }
                }
                *unacked = rest;
                keep
            };

            let result = if to_handle.is_empty() {
                Ok(())
            } else if self.delivery_to_context {
                let summary: Vec<DeliverySummary> = to_handle
                    .iter()
                    .chain(unacked.iter())
                    .map(DeliverySummary::from)
                    .collect();
                delivery_context::scope(
                    Arc::new(summary),
                    handler.handle(self.hard.clone(), &to_handle),
                )
                .await
            } else {
                handler.handle(self.hard.clone(), &to_handle).await
            };

            unacked.splice(0..0, to_handle);

            if let Err(error) = result {
                tracing::warn!(%error, "worker: handler failed; stopping without acknowledging");
                return false;
            }
        }

        if unacked.is_empty() {
            return true;
        }

        if self.streams.len() > 1 {
            // Multi-stream acknowledgement is suppressed: spec.md §9
            // documents this as a known limitation, not a bug.
            return true;
        }

        match self.streams[0].acknowledge(self.hard.clone(), unacked).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(%error, "worker: acknowledge failed");
                false
            }
        }
    }

    async fn sleep_between_batches(&self, rx: &mpsc::Receiver<Delivery>) {
        if self.buffer_timeout.is_zero() || rx.len() > 0 {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.buffer_timeout) => {}
            _ = self.soft.cancelled() => {}
        }
    }
}
