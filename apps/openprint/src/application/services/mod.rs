//! Application Services
//!
//! Services that connect the detector's emissions to the feed session.
//!
//! - [`UnsubscribeQueue`]: non-blocking handoff from the event loop
//! - [`UnsubscribeWorker`]: drains the queue and drives the feed session
//!
//! The event-processing path and the worker share nothing but the bounded
//! channel between them; a slow or failing unsubscribe call can therefore
//! never stall trade-event ingestion.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::ports::MarketStream;

/// Sending half of the unsubscribe handoff.
///
/// `notify` never blocks. The channel is sized to the worst case (every
/// subscribed symbol firing on the same day); if that sizing is ever
/// violated the symbol is dropped and logged. Correctness survives a drop:
/// the dedup table already holds the symbol, the feed just keeps sending
/// events that get filtered out.
#[derive(Debug, Clone)]
pub struct UnsubscribeQueue {
    tx: mpsc::Sender<String>,
}

impl UnsubscribeQueue {
    /// Create a queue with `capacity` slots, returning the receiving half
    /// for the worker.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue a symbol whose opening print just fired.
    pub fn notify(&self, symbol: &str) {
        match self.tx.try_send(symbol.to_owned()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(symbol)) => {
                tracing::warn!(symbol = %symbol, "unsubscribe queue full, dropping symbol");
            }
            Err(mpsc::error::TrySendError::Closed(symbol)) => {
                tracing::warn!(symbol = %symbol, "unsubscribe worker gone, dropping symbol");
            }
        }
    }
}

/// Drains the unsubscribe queue and issues the feed-session calls.
///
/// Runs on its own task. A failed unsubscribe is logged and the worker
/// moves on: the affected symbol keeps generating events that the dedup
/// table suppresses, so only efficiency degrades.
pub struct UnsubscribeWorker<S> {
    stream: Arc<S>,
    rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
}

impl<S: MarketStream> UnsubscribeWorker<S> {
    /// Create a worker draining `rx` into `stream`.
    #[must_use]
    pub fn new(stream: Arc<S>, rx: mpsc::Receiver<String>, cancel: CancellationToken) -> Self {
        Self { stream, rx, cancel }
    }

    /// Run until cancelled or the queue closes.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("unsubscribe worker cancelled");
                    return;
                }
                symbol = self.rx.recv() => {
                    let Some(symbol) = symbol else {
                        tracing::debug!("unsubscribe queue closed");
                        return;
                    };
                    if let Err(err) = self.stream.unsubscribe_trades(&symbol).await {
                        tracing::warn!(symbol = %symbol, error = %err, "unsubscribe failed");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::ports::{MarketStreamError, MockMarketStream};
    use super::*;

    #[tokio::test]
    async fn worker_unsubscribes_each_notified_symbol() {
        let mut stream = MockMarketStream::new();
        stream
            .expect_unsubscribe_trades()
            .times(2)
            .returning(|_| Ok(()));

        let (queue, rx) = UnsubscribeQueue::bounded(8);
        let cancel = CancellationToken::new();
        let worker = UnsubscribeWorker::new(Arc::new(stream), rx, cancel.clone());
        let handle = tokio::spawn(worker.run());

        queue.notify("AAPL");
        queue.notify("MSFT");
        tokio::time::sleep(Duration::from_millis(20)).await;

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn worker_continues_after_unsubscribe_error() {
        let mut stream = MockMarketStream::new();
        let mut calls = 0_u32;
        stream.expect_unsubscribe_trades().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(MarketStreamError::SessionClosed)
            } else {
                Ok(())
            }
        });

        let (queue, rx) = UnsubscribeQueue::bounded(8);
        let cancel = CancellationToken::new();
        let worker = UnsubscribeWorker::new(Arc::new(stream), rx, cancel.clone());
        let handle = tokio::spawn(worker.run());

        queue.notify("AAPL");
        queue.notify("MSFT");
        tokio::time::sleep(Duration::from_millis(20)).await;

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn notify_on_full_queue_drops_without_blocking() {
        // No worker draining: the second notify must return immediately.
        let (queue, _rx) = UnsubscribeQueue::bounded(1);
        queue.notify("AAPL");
        queue.notify("MSFT");
    }

    #[tokio::test]
    async fn notify_after_worker_exit_is_harmless() {
        let (queue, rx) = UnsubscribeQueue::bounded(1);
        drop(rx);
        queue.notify("AAPL");
    }

    #[tokio::test]
    async fn worker_stops_when_queue_closes() {
        let stream = MockMarketStream::new();
        let (queue, rx) = UnsubscribeQueue::bounded(1);
        let worker = UnsubscribeWorker::new(Arc::new(stream), rx, CancellationToken::new());
        let handle = tokio::spawn(worker.run());

        drop(queue);
        handle.await.unwrap();
    }
}
