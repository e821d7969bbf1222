//! Per-request event hand-off
//!
//! One unbounded FIFO channel per request carries events from the filter
//! (producer side) to the SSE publishing loop (consumer side). Sends never
//! block; ordering is strictly first-in first-out.

use tokio::sync::mpsc;

use super::events::StreamEvent;

/// Create a connected sender/receiver pair for one request.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer half of a request's token stream.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl EventSender {
    /// Enqueue an event. Never blocks; if the consumer is gone (client
    /// disconnected) the event is discarded.
    pub fn send(&self, event: StreamEvent) {
        let _ = self.tx.send(event);
    }
}

/// Consumer half of a request's token stream.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<StreamEvent>,
}

impl EventReceiver {
    /// Wait for the next event in FIFO order. Resolves to `None` once every
    /// sender has been dropped, so a cancelled producer releases the
    /// consumer instead of hanging it.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Unwrap the underlying receiver for adapter-based consumption.
    pub fn into_inner(self) -> mpsc::UnboundedReceiver<StreamEvent> {
        self.rx
    }
}
