//! Bridges the blocking event source onto the async consumer.
//!
//! The source reads its HTTP response synchronously, so it runs on a
//! dedicated worker thread. Events cross to the consumer through a bounded
//! channel; an internal end marker closes the sequence and never reaches
//! the caller. Producer faults are converted into a single terminal error
//! event at the thread boundary, so the consumer's await loop terminates
//! for every producer outcome.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;

use futures_util::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::event::AnalysisEvent;
use crate::core::event_source::SourceError;

/// Backpressure bound: the worker blocks once this many events are queued.
const CHANNEL_CAPACITY: usize = 32;

enum BridgeMessage {
    Event(AnalysisEvent),
    End,
}

/// Consumer half of the bridge: a lazy, finite, non-restartable sequence of
/// analysis events. Obtain one from [`EventStream::spawn`].
pub struct EventStream {
    rx: mpsc::Receiver<BridgeMessage>,
    finished: bool,
}

impl EventStream {
    /// Start the blocking `producer` on its own worker thread and return
    /// the async side of the channel.
    ///
    /// The worker checks `cancel` between records, so cancelling actually
    /// stops the blocking loop rather than abandoning its output. The
    /// thread is detached; it exits on its own when the stream ends, the
    /// token is cancelled, or the consumer is dropped.
    pub fn spawn<P, I>(producer: P, cancel: CancellationToken) -> EventStream
    where
        P: FnOnce() -> Result<I, SourceError> + Send + 'static,
        I: Iterator<Item = Result<AnalysisEvent, SourceError>>,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        let worker_tx = tx.clone();
        let spawned = thread::Builder::new()
            .name("loglens-source".to_string())
            .spawn(move || run_producer(producer, worker_tx, cancel));

        if let Err(err) = spawned {
            let _ = tx.try_send(BridgeMessage::Event(AnalysisEvent::error(format!(
                "Failed to start stream worker: {err}"
            ))));
            let _ = tx.try_send(BridgeMessage::End);
        }

        EventStream {
            rx,
            finished: false,
        }
    }

    /// Next event, or `None` once the stream has ended. The internal end
    /// marker is consumed here and never yielded.
    pub async fn recv(&mut self) -> Option<AnalysisEvent> {
        if self.finished {
            return None;
        }

        match self.rx.recv().await {
            Some(BridgeMessage::Event(event)) => Some(event),
            // A worker that died without the end marker closes the channel;
            // either way the sequence is over.
            Some(BridgeMessage::End) | None => {
                self.finished = true;
                self.rx.close();
                None
            }
        }
    }
}

impl Stream for EventStream {
    type Item = AnalysisEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(BridgeMessage::Event(event))) => Poll::Ready(Some(event)),
            Poll::Ready(Some(BridgeMessage::End)) | Poll::Ready(None) => {
                self.finished = true;
                self.rx.close();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

fn run_producer<P, I>(producer: P, tx: mpsc::Sender<BridgeMessage>, cancel: CancellationToken)
where
    P: FnOnce() -> Result<I, SourceError>,
    I: Iterator<Item = Result<AnalysisEvent, SourceError>>,
{
    let mut records = match producer() {
        Ok(records) => records,
        Err(err) => {
            finish_with_error(&tx, err);
            return;
        }
    };

    loop {
        if cancel.is_cancelled() {
            tracing::debug!("stream cancelled, stopping worker");
            return;
        }

        let Some(record) = records.next() else {
            break;
        };

        match record {
            Ok(event) => {
                // blocking_send gives backpressure against a stalled
                // consumer and fails once the consumer is gone.
                if tx.blocking_send(BridgeMessage::Event(event)).is_err() {
                    return;
                }
            }
            Err(err) => {
                finish_with_error(&tx, err);
                return;
            }
        }
    }

    let _ = tx.blocking_send(BridgeMessage::End);
}

/// Exactly one error event, then the end marker, wherever the fault
/// happened.
fn finish_with_error(tx: &mpsc::Sender<BridgeMessage>, err: SourceError) {
    let _ = tx.blocking_send(BridgeMessage::Event(AnalysisEvent::error(err.to_string())));
    let _ = tx.blocking_send(BridgeMessage::End);
}
