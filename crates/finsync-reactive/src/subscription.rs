//! Explicit subscription handles.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// A running stream pipeline with an explicit unsubscribe.
///
/// The pipeline is driven on its own task and items are buffered for the
/// consumer. Unsubscribing, or dropping the handle, cancels the driver, which
/// drops the pipeline and with it every remote listener it holds.
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Subscription<T> {
    /// Spawn a driver for `stream`. Must be called within a tokio runtime.
    pub fn spawn(stream: BoxStream<'static, T>, buffer: usize) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let cancel = CancellationToken::new();
        let driver = tokio::spawn(drive(stream, tx, cancel.clone()));
        Self {
            rx,
            cancel,
            driver: Some(driver),
        }
    }
}

impl<T> Subscription<T> {
    /// Next item, or `None` once the pipeline has ended and the buffer is drained.
    pub async fn next(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Whether the pipeline is still running.
    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled() && self.driver.as_ref().is_some_and(|d| !d.is_finished())
    }

    /// Cancel the pipeline and wait until its listeners are released.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        if let Some(driver) = self.driver.take()
            && let Err(e) = driver.await
        {
            warn!(error = %e, "Subscription driver failed");
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drive<T>(mut stream: BoxStream<'static, T>, tx: mpsc::Sender<T>, cancel: CancellationToken) {
    loop {
        let item = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = stream.next() => item,
        };
        let Some(item) = item else {
            trace!("Subscription stream ended");
            break;
        };
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = tx.send(item) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}
