//! End-to-end coverage of the two shutdown scenarios spec.md §8 calls out by
//! name: a `drain` subscriber that lets an in-flight handler finish before
//! `Listen` returns, and one whose handler overruns its shutdown timeout and
//! gets hard-cancelled instead.

use async_trait::async_trait;
use messaging::contracts::{CancellationToken, ConnectionPool};
use messaging::streaming::{ShutdownStrategy, Subscriber, Subscription};
use messaging::{CommitWriter, Connection, Connector, Delivery, Handler, Reader, Stream, Writer};
use messaging_contracts::{StreamConfig, TransportError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Yields exactly one delivery, then blocks until `close` is called, the
/// way a real broker stream's blocked `Read` unblocks with an error once the
/// underlying connection is torn down.
struct OneShotStream {
    delivered: AtomicBool,
    closed: CancellationToken,
    acknowledged: Arc<AtomicUsize>,
}

#[async_trait]
impl Stream for OneShotStream {
    async fn read(&self, cancel: CancellationToken) -> Result<Delivery, TransportError> {
        if !self.delivered.swap(true, Ordering::SeqCst) {
            return Ok(Delivery::default());
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            _ = self.closed.cancelled() => Err(TransportError::ReadFailed("stream closed".into())),
        }
    }

    async fn acknowledge(
        &self,
        _cancel: CancellationToken,
        deliveries: &[Delivery],
    ) -> Result<(), TransportError> {
        self.acknowledged.fetch_add(deliveries.len(), Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.cancel();
        Ok(())
    }
}

struct FakeReader {
    stream: Arc<OneShotStream>,
}

#[async_trait]
impl Reader for FakeReader {
    async fn stream(
        &self,
        _cancel: CancellationToken,
        _config: StreamConfig,
    ) -> Result<Box<dyn Stream>, TransportError> {
        Ok(Box::new(FakeStreamHandle {
            stream: self.stream.clone(),
        }))
    }
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// `Subscriber::open_streams` needs a fresh `Box<dyn Stream>` per open call;
/// this forwards to the one shared `OneShotStream` so the subscriber's
/// `close` reaches the same stream the worker is reading from.
struct FakeStreamHandle {
    stream: Arc<OneShotStream>,
}

#[async_trait]
impl Stream for FakeStreamHandle {
    async fn read(&self, cancel: CancellationToken) -> Result<Delivery, TransportError> {
        self.stream.read(cancel).await
    }
    async fn acknowledge(
        &self,
        cancel: CancellationToken,
        deliveries: &[Delivery],
    ) -> Result<(), TransportError> {
        self.stream.acknowledge(cancel, deliveries).await
    }
    async fn close(&self) -> Result<(), TransportError> {
        self.stream.close().await
    }
}

struct FakeConnection {
    stream: Arc<OneShotStream>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn reader(&self, _cancel: CancellationToken) -> Result<Box<dyn Reader>, TransportError> {
        Ok(Box::new(FakeReader {
            stream: self.stream.clone(),
        }))
    }
    async fn writer(&self, _cancel: CancellationToken) -> Result<Box<dyn Writer>, TransportError> {
        unimplemented!("this fixture never writes")
    }
    async fn commit_writer(
        &self,
        _cancel: CancellationToken,
    ) -> Result<Box<dyn CommitWriter>, TransportError> {
        unimplemented!("this fixture never writes")
    }
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

struct FakeConnector {
    stream: Arc<OneShotStream>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _cancel: CancellationToken) -> Result<Box<dyn Connection>, TransportError> {
        Ok(Box::new(FakeConnection {
            stream: self.stream.clone(),
        }))
    }
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A handler that takes `delay` to finish, but honors `cancel` instead of
/// running it to completion regardless — the behavior spec.md §5 expects of
/// a well-written handler under the hard context.
struct SlowHandler {
    delay: Duration,
}

#[async_trait]
impl Handler for SlowHandler {
    async fn handle(&self, cancel: CancellationToken, _deliveries: &[Delivery]) -> anyhow::Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = cancel.cancelled() => {}
        }
        Ok(())
    }
}

fn subscriber_with(
    handler_delay: Duration,
    shutdown_timeout: Duration,
) -> (Subscriber, Arc<AtomicUsize>, CancellationToken) {
    let acknowledged = Arc::new(AtomicUsize::new(0));
    let stream = Arc::new(OneShotStream {
        delivered: AtomicBool::new(false),
        closed: CancellationToken::new(),
        acknowledged: acknowledged.clone(),
    });
    let connector = Arc::new(FakeConnector { stream });
    let pool = Arc::new(ConnectionPool::new(connector));

    let subscription = Subscription::builder()
        .add_stream(StreamConfig::new())
        .add_handler(Arc::new(SlowHandler { delay: handler_delay }))
        .shutdown_strategy(ShutdownStrategy::Drain, shutdown_timeout)
        .build()
        .unwrap();

    let soft = CancellationToken::new();
    let subscriber = Subscriber::new(pool, subscription, soft.clone());
    (subscriber, acknowledged, soft)
}

/// spec.md §8 scenario 5: a handler that finishes well inside the shutdown
/// timeout gets to run to completion, and its batch is acknowledged before
/// `Listen` returns.
#[tokio::test]
async fn drain_lets_a_fast_handler_finish_and_acknowledge() {
    let (subscriber, acknowledged, soft) =
        subscriber_with(Duration::from_millis(20), Duration::from_millis(200));

    let listen = tokio::spawn(async move { subscriber.listen().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    soft.cancel();

    let result = tokio::time::timeout(Duration::from_millis(500), listen)
        .await
        .expect("listen should return well within the shutdown timeout")
        .unwrap();

    assert!(result.is_ok());
    assert_eq!(acknowledged.load(Ordering::SeqCst), 1);
}

/// spec.md §8 scenario 6: a handler that would outlive the shutdown timeout
/// is hard-cancelled instead, so `Listen` returns close to the timeout
/// rather than waiting out the handler's full delay.
#[tokio::test]
async fn a_handler_that_overruns_the_timeout_is_hard_cancelled() {
    let shutdown_timeout = Duration::from_millis(50);
    let (subscriber, acknowledged, soft) =
        subscriber_with(Duration::from_millis(500), shutdown_timeout);

    let listen = tokio::spawn(async move { subscriber.listen().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let cancel_at = tokio::time::Instant::now();
    soft.cancel();

    tokio::time::timeout(Duration::from_millis(500), listen)
        .await
        .expect("hard cancel should bound how long listen can take")
        .unwrap()
        .unwrap();

    assert!(cancel_at.elapsed() < shutdown_timeout + Duration::from_millis(200));
    // The handler bailed out on cancellation rather than running to
    // completion, so its (empty) batch still gets acknowledged once.
    assert_eq!(acknowledged.load(Ordering::SeqCst), 1);
}
