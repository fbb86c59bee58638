use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;

/// Receiving end of a cell subscription.
///
/// The first item is the value the cell held when the subscription was
/// created; every later item is a committed change. The stream ends when the
/// owning cell is disposed. Dropping the subscription unsubscribes.
pub struct Subscription<T> {
    source: Box<dyn Source<T>>,
}

trait Source<T>: Send {
    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>>;
    fn try_recv(&mut self) -> Option<T>;
}

impl<T: Send> Source<T> for mpsc::UnboundedReceiver<T> {
    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        mpsc::UnboundedReceiver::poll_recv(self, cx)
    }

    fn try_recv(&mut self) -> Option<T> {
        mpsc::UnboundedReceiver::try_recv(self).ok()
    }
}

struct Mapped<S, T> {
    rx: mpsc::UnboundedReceiver<S>,
    forward: Arc<dyn Fn(&S) -> T + Send + Sync>,
}

impl<S: Send, T> Source<T> for Mapped<S, T> {
    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.rx
            .poll_recv(cx)
            .map(|item| item.map(|value| (self.forward)(&value)))
    }

    fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok().map(|value| (self.forward)(&value))
    }
}

impl<T: Send + 'static> Subscription<T> {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<T>) -> Self {
        Self {
            source: Box::new(rx),
        }
    }

    pub(crate) fn mapped<S: Send + 'static>(
        rx: mpsc::UnboundedReceiver<S>,
        forward: Arc<dyn Fn(&S) -> T + Send + Sync>,
    ) -> Self {
        Self {
            source: Box::new(Mapped { rx, forward }),
        }
    }

    /// Take the next queued value without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        self.source.try_recv()
    }

    /// Wait for the next value. Returns `None` once the cell is disposed.
    pub async fn next(&mut self) -> Option<T> {
        std::future::poll_fn(|cx| self.source.poll_recv(cx)).await
    }

    /// Take every value queued so far.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        while let Some(value) = self.try_next() {
            values.push(value);
        }
        values
    }
}

impl<T: Send + 'static> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().source.poll_recv(cx)
    }
}
