//! Event publishing over SSE
//!
//! Bridges a request's `EventReceiver` to the axum SSE response. Dropping
//! the response stream (client disconnect) aborts the producing task, so
//! no generation work outlives its request.

use std::convert::Infallible;

use axum::response::sse::Event;
use futures::Stream;
use futures::StreamExt;
use tokio::task::AbortHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::streaming::{EventReceiver, StreamEvent};

/// Turn a request's event receiver into an SSE event stream that cancels
/// the producer when the client goes away.
pub fn publish(
    rx: EventReceiver,
    producer: AbortHandle,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let guard = AbortOnDrop(producer);

    UnboundedReceiverStream::new(rx.into_inner()).map(move |event| {
        let _ = &guard;
        Ok(to_sse_event(&event))
    })
}

fn to_sse_event(event: &StreamEvent) -> Event {
    // Serialization of StreamEvent cannot fail; the fallback satisfies the
    // no-panic rule
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default())
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
